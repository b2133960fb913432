//! Inner convolutional encoder, rate 1/2, constraint length 7.
//!
//! Generators are G1 = 171 octal and G2 = 133 octal. Each input byte is
//! consumed MSB first; every bit shifted into the register produces two
//! output bits (X then Y), one element per bit, so the stage emits 16
//! bytes per input byte.

use tracing::debug;

use crate::config::TxConfig;
use crate::stage::Stage;

/// G1 = 171 octal, bit-reversed to index the shifted-in register layout.
const G1: u8 = 0x4F;

/// G2 = 133 octal, bit-reversed likewise.
const G2: u8 = 0x6D;

/// Parity of every register-AND-generator product.
fn parity_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    for (value, slot) in table.iter_mut().enumerate() {
        *slot = (value.count_ones() & 1) as u8;
    }
    table
}

/// The inner encoder stage: bytes in, one output element per code bit.
pub struct ConvEncoder {
    parity: [u8; 256],
    /// Encoder state, the last 7 bits shifted in (bit 0 newest).
    state: u8,
    debug: bool,
}

impl ConvEncoder {
    pub fn new(config: &TxConfig) -> Self {
        Self {
            parity: parity_table(),
            state: 0,
            debug: config.debug,
        }
    }
}

impl Stage<u8, u8> for ConvEncoder {
    fn process(&mut self, input: &[u8], output: &mut Vec<u8>) {
        if self.debug {
            debug!("conv encoder in/out: {}/{}", input.len(), input.len() * 16);
        }
        output.reserve(input.len() * 16);
        for &byte in input {
            for bit in (0..8).rev() {
                self.state = (self.state << 1) | ((byte >> bit) & 1);
                output.push(self.parity[(self.state & G1) as usize]);
                output.push(self.parity[(self.state & G2) as usize]);
            }
        }
    }

    fn reset(&mut self) {
        self.state = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoder() -> ConvEncoder {
        ConvEncoder::new(&TxConfig::default())
    }

    #[test]
    fn zero_input_encodes_to_zero() {
        let mut enc = encoder();
        let mut out = Vec::new();
        enc.process(&[0u8; 32], &mut out);
        assert_eq!(out.len(), 32 * 16);
        assert!(out.iter().all(|&b| b == 0));
    }

    #[test]
    fn sixteen_output_bits_per_byte() {
        let mut enc = encoder();
        let mut out = Vec::new();
        enc.process(&[0xA5, 0x3C, 0x01], &mut out);
        assert_eq!(out.len(), 3 * 16);
        assert!(out.iter().all(|&b| b <= 1));
    }

    #[test]
    fn single_one_bit_yields_generator_taps() {
        // From zero state, the impulse response of each branch spells out
        // its generator polynomial, MSB first.
        let mut enc = encoder();
        let mut out = Vec::new();
        enc.process(&[0x80], &mut out); // single 1 followed by zeros
        let x: Vec<u8> = out.iter().step_by(2).copied().collect();
        let y: Vec<u8> = out.iter().skip(1).step_by(2).copied().collect();
        // 171 octal = 1111001, 133 octal = 1011011
        assert_eq!(&x[..7], &[1, 1, 1, 1, 0, 0, 1]);
        assert_eq!(&y[..7], &[1, 0, 1, 1, 0, 1, 1]);
    }

    #[test]
    fn flipped_bit_perturbation_is_bounded() {
        let zeros = [0u8; 8];
        let mut flipped = zeros;
        flipped[2] = 0x10; // one flipped input bit

        let mut enc_a = encoder();
        let mut enc_b = encoder();
        let (mut ref_out, mut alt_out) = (Vec::new(), Vec::new());
        enc_a.process(&zeros, &mut ref_out);
        enc_b.process(&flipped, &mut alt_out);

        let diff: Vec<usize> = ref_out
            .iter()
            .zip(alt_out.iter())
            .enumerate()
            .filter(|(_, (a, b))| a != b)
            .map(|(i, _)| i)
            .collect();
        let weight = diff.len();
        // Free distance 10: at least 10 bits differ, all within the
        // 7-bit constraint span (14 output bits).
        assert!(weight >= 10, "weight {weight}");
        assert!(diff.last().unwrap() - diff.first().unwrap() < 14);
    }

    #[test]
    fn state_carries_across_calls() {
        let mut whole = encoder();
        let mut split = encoder();
        let input = [0x12, 0x34, 0x56, 0x78];

        let mut expected = Vec::new();
        whole.process(&input, &mut expected);

        let mut actual = Vec::new();
        split.process(&input[..1], &mut actual);
        split.process(&input[1..], &mut actual);
        assert_eq!(expected, actual);
    }
}
