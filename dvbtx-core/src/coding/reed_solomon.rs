//! Shortened Reed-Solomon (204,188) systematic encoder over GF(256).
//!
//! The field is generated by p(x) = x^8 + x^4 + x^3 + x^2 + 1 and the code
//! generator is g(x) = (x - a^0)(x - a^1)...(x - a^15), carried below as
//! 16 coefficients in exponent form. Parity is the remainder of
//! message(x) * x^16 mod g(x), computed by the usual feedback long
//! division over the log/antilog tables. The shortening to 188 message
//! bytes is implicit: the 51 virtual zero bytes of the (255,239) mother
//! code never move the remainder.

use tracing::debug;

use crate::config::{TxConfig, RS_CODEWORD_BYTES, TS_PACKET_BYTES};
use crate::stage::Stage;

const PARITY_BYTES: usize = RS_CODEWORD_BYTES - TS_PACKET_BYTES;

/// Exponent used as log(0); never a valid generator exponent.
const A0: u8 = 255;

/// Logarithm table: LOG[a^i] = i, LOG[0] = 255.
#[rustfmt::skip]
const LOG: [u8; 256] = [
    255, 0, 1, 25, 2, 50, 26, 198, 3, 223, 51, 238, 27, 104, 199, 75,
    4, 100, 224, 14, 52, 141, 239, 129, 28, 193, 105, 248, 200, 8, 76, 113,
    5, 138, 101, 47, 225, 36, 15, 33, 53, 147, 142, 218, 240, 18, 130, 69,
    29, 181, 194, 125, 106, 39, 249, 185, 201, 154, 9, 120, 77, 228, 114, 166,
    6, 191, 139, 98, 102, 221, 48, 253, 226, 152, 37, 179, 16, 145, 34, 136,
    54, 208, 148, 206, 143, 150, 219, 189, 241, 210, 19, 92, 131, 56, 70, 64,
    30, 66, 182, 163, 195, 72, 126, 110, 107, 58, 40, 84, 250, 133, 186, 61,
    202, 94, 155, 159, 10, 21, 121, 43, 78, 212, 229, 172, 115, 243, 167, 87,
    7, 112, 192, 247, 140, 128, 99, 13, 103, 74, 222, 237, 49, 197, 254, 24,
    227, 165, 153, 119, 38, 184, 180, 124, 17, 68, 146, 217, 35, 32, 137, 46,
    55, 63, 209, 91, 149, 188, 207, 205, 144, 135, 151, 178, 220, 252, 190, 97,
    242, 86, 211, 171, 20, 42, 93, 158, 132, 60, 57, 83, 71, 109, 65, 162,
    31, 45, 67, 216, 183, 123, 164, 118, 196, 23, 73, 236, 127, 12, 111, 246,
    108, 161, 59, 82, 41, 157, 85, 170, 251, 96, 134, 177, 187, 204, 62, 90,
    203, 89, 95, 176, 156, 169, 160, 81, 11, 245, 22, 235, 122, 117, 44, 215,
    79, 174, 213, 233, 230, 231, 173, 232, 116, 214, 244, 234, 168, 80, 88, 175,
];

/// Antilogarithm table: ALPHA[i] = a^i, ALPHA[255] = 0.
#[rustfmt::skip]
const ALPHA: [u8; 256] = [
    1, 2, 4, 8, 16, 32, 64, 128, 29, 58, 116, 232, 205, 135, 19, 38,
    76, 152, 45, 90, 180, 117, 234, 201, 143, 3, 6, 12, 24, 48, 96, 192,
    157, 39, 78, 156, 37, 74, 148, 53, 106, 212, 181, 119, 238, 193, 159, 35,
    70, 140, 5, 10, 20, 40, 80, 160, 93, 186, 105, 210, 185, 111, 222, 161,
    95, 190, 97, 194, 153, 47, 94, 188, 101, 202, 137, 15, 30, 60, 120, 240,
    253, 231, 211, 187, 107, 214, 177, 127, 254, 225, 223, 163, 91, 182, 113, 226,
    217, 175, 67, 134, 17, 34, 68, 136, 13, 26, 52, 104, 208, 189, 103, 206,
    129, 31, 62, 124, 248, 237, 199, 147, 59, 118, 236, 197, 151, 51, 102, 204,
    133, 23, 46, 92, 184, 109, 218, 169, 79, 158, 33, 66, 132, 21, 42, 84,
    168, 77, 154, 41, 82, 164, 85, 170, 73, 146, 57, 114, 228, 213, 183, 115,
    230, 209, 191, 99, 198, 145, 63, 126, 252, 229, 215, 179, 123, 246, 241, 255,
    227, 219, 171, 75, 150, 49, 98, 196, 149, 55, 110, 220, 165, 87, 174, 65,
    130, 25, 50, 100, 200, 141, 7, 14, 28, 56, 112, 224, 221, 167, 83, 166,
    81, 162, 89, 178, 121, 242, 249, 239, 195, 155, 43, 86, 172, 69, 138, 9,
    18, 36, 72, 144, 61, 122, 244, 245, 247, 243, 251, 235, 203, 139, 11, 22,
    44, 88, 176, 125, 250, 233, 207, 131, 27, 54, 108, 216, 173, 71, 142, 0,
];

/// Generator polynomial coefficients g_0..g_15 as exponents (g_16 = 1).
#[rustfmt::skip]
const GEN_EXP: [u8; 16] = [
    120, 225, 194, 182, 169, 147, 191, 91, 3, 76, 161, 102, 109, 107, 104, 120,
];

#[inline]
fn mod_255(x: u16) -> usize {
    (if x >= 255 { x - 255 } else { x }) as usize
}

/// Compute the 16 parity bytes for one 188-byte message, highest-order
/// coefficient first (transmission order).
pub fn packet_parity(message: &[u8; TS_PACKET_BYTES]) -> [u8; PARITY_BYTES] {
    // remainder[0] is the highest-order parity coefficient.
    let mut rem = [0u8; PARITY_BYTES];
    for &byte in message {
        let feedback = LOG[(byte ^ rem[0]) as usize];
        if feedback != A0 {
            for j in 0..PARITY_BYTES - 1 {
                rem[j] = rem[j + 1]
                    ^ ALPHA[mod_255(GEN_EXP[PARITY_BYTES - 1 - j] as u16 + feedback as u16)];
            }
            rem[PARITY_BYTES - 1] = ALPHA[mod_255(GEN_EXP[0] as u16 + feedback as u16)];
        } else {
            rem.copy_within(1.., 0);
            rem[PARITY_BYTES - 1] = 0;
        }
    }
    rem
}

/// RS(204,188) encoder stage: one TS packet in, one codeword out.
///
/// Partial packets are held until complete, so output length is always
/// 204 * floor((input + carried) / 188).
pub struct ReedSolomonEncoder {
    packet: [u8; TS_PACKET_BYTES],
    ts_offset: usize,
    debug: bool,
}

impl ReedSolomonEncoder {
    pub fn new(config: &TxConfig) -> Self {
        Self {
            packet: [0; TS_PACKET_BYTES],
            ts_offset: 0,
            debug: config.debug,
        }
    }
}

impl Stage<u8, u8> for ReedSolomonEncoder {
    fn process(&mut self, input: &[u8], output: &mut Vec<u8>) {
        let packets = (input.len() + self.ts_offset) / TS_PACKET_BYTES;
        if self.debug {
            debug!(
                "rs in/out: {}(+{})/{}",
                input.len(),
                self.ts_offset,
                packets * RS_CODEWORD_BYTES
            );
        }
        output.reserve(packets * RS_CODEWORD_BYTES);
        for &byte in input {
            self.packet[self.ts_offset] = byte;
            self.ts_offset += 1;
            if self.ts_offset == TS_PACKET_BYTES {
                self.ts_offset = 0;
                output.extend_from_slice(&self.packet);
                output.extend_from_slice(&packet_parity(&self.packet));
            }
        }
    }

    fn reset(&mut self) {
        self.packet = [0; TS_PACKET_BYTES];
        self.ts_offset = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gf_mul(a: u8, b: u8) -> u8 {
        if a == 0 || b == 0 {
            0
        } else {
            ALPHA[mod_255(LOG[a as usize] as u16 + LOG[b as usize] as u16)]
        }
    }

    /// Evaluate a codeword polynomial (highest-order coefficient first) at a^power.
    fn eval_at_alpha(codeword: &[u8], power: u8) -> u8 {
        let x = ALPHA[power as usize];
        codeword.iter().fold(0, |acc, &c| gf_mul(acc, x) ^ c)
    }

    #[test]
    fn zero_message_has_zero_parity() {
        let parity = packet_parity(&[0; TS_PACKET_BYTES]);
        assert_eq!(parity, [0; PARITY_BYTES]);
    }

    #[test]
    fn codeword_is_systematic() {
        let mut enc = ReedSolomonEncoder::new(&TxConfig::default());
        let message: Vec<u8> = (0..TS_PACKET_BYTES as u32).map(|i| (i * 7 + 1) as u8).collect();
        let mut out = Vec::new();
        enc.process(&message, &mut out);
        assert_eq!(out.len(), RS_CODEWORD_BYTES);
        assert_eq!(&out[..TS_PACKET_BYTES], message.as_slice());
    }

    #[test]
    fn codeword_vanishes_at_generator_roots() {
        let mut message = [0u8; TS_PACKET_BYTES];
        for (i, byte) in message.iter_mut().enumerate() {
            *byte = (i as u8).wrapping_mul(31).wrapping_add(5);
        }
        let parity = packet_parity(&message);
        let mut codeword = Vec::with_capacity(RS_CODEWORD_BYTES);
        codeword.extend_from_slice(&message);
        codeword.extend_from_slice(&parity);
        for power in 0..PARITY_BYTES as u8 {
            assert_eq!(eval_at_alpha(&codeword, power), 0, "root a^{power}");
        }
    }

    #[test]
    fn partial_packets_are_carried() {
        let mut whole = ReedSolomonEncoder::new(&TxConfig::default());
        let mut split = ReedSolomonEncoder::new(&TxConfig::default());
        let message: Vec<u8> = (0..2 * TS_PACKET_BYTES).map(|i| i as u8).collect();

        let mut expected = Vec::new();
        whole.process(&message, &mut expected);
        assert_eq!(expected.len(), 2 * RS_CODEWORD_BYTES);

        let mut actual = Vec::new();
        let (head, tail) = message.split_at(100);
        split.process(head, &mut actual);
        assert!(actual.is_empty());
        split.process(tail, &mut actual);
        assert_eq!(expected, actual);
    }
}
