//! Energy dispersal (TS scrambler).
//!
//! A 15-bit PRBS with polynomial 1 + x^14 + x^15 randomises the transport
//! stream over groups of 8 TS packets. The register is re-seeded at the
//! start of every group and keeps clocking through the sync bytes of the
//! remaining 7 packets with its output gated off, so the whole group is
//! covered by a fixed 1504-byte mask: 0xFF at the group-leading sync
//! (0x47 -> 0xB8), 0x00 at the other 7 sync positions, key-stream bytes
//! everywhere else.

use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::{TxConfig, TS_PACKET_BYTES, TS_SYNC_BYTE};
use crate::stage::Stage;

const GROUP_BYTES: usize = TS_PACKET_BYTES * 8;
const PRBS_SEED: u16 = 0b100_1010_1000_0000;

/// Build the per-group dispersal mask.
fn group_mask() -> Box<[u8; GROUP_BYTES]> {
    let mut mask = Box::new([0u8; GROUP_BYTES]);
    // Register bit 1 is the MSB of the seed literal; the output taps are
    // bits 14 and 15 and the feedback re-enters at bit 1.
    let mut reg: u16 = PRBS_SEED;
    let mut clock8 = || {
        let mut byte = 0u8;
        for _ in 0..8 {
            let out = ((reg >> 1) ^ reg) & 1;
            byte = (byte << 1) | out as u8;
            reg = (reg >> 1) | (out << 14);
        }
        byte
    };
    mask[0] = 0xFF;
    for i in 1..GROUP_BYTES {
        let key = clock8();
        // Output disabled on the 7 non-inverted sync bytes.
        mask[i] = if i % TS_PACKET_BYTES == 0 { 0x00 } else { key };
    }
    mask
}

/// Energy dispersal stage: one input octet in, one output octet out.
pub struct Scrambler {
    mask: Box<[u8; GROUP_BYTES]>,
    /// Byte offset within the 1504-byte group cycle.
    offset: usize,
    /// Set once the leading 0x47 has been observed.
    aligned: bool,
    debug: bool,
    report_interval: u64,
    report_start: Instant,
    done_bytes: u64,
}

impl Scrambler {
    pub fn new(config: &TxConfig) -> Self {
        Self {
            mask: group_mask(),
            offset: 0,
            aligned: false,
            debug: config.debug,
            report_interval: config.report_interval,
            report_start: Instant::now(),
            done_bytes: 0,
        }
    }

    /// The dispersal mask byte applied at a given group offset.
    pub fn mask_at(&self, offset: usize) -> u8 {
        self.mask[offset % GROUP_BYTES]
    }

    fn report(&mut self, processed: usize) {
        if self.report_interval == 0 {
            return;
        }
        self.done_bytes += processed as u64;
        let elapsed = self.report_start.elapsed();
        if elapsed.as_secs() >= self.report_interval {
            info!(
                "Current TS bitrate: {} Mbps",
                8.0 * self.done_bytes as f64 / elapsed.as_micros() as f64
            );
            self.report_start = Instant::now();
            self.done_bytes = 0;
        }
    }
}

impl Stage<u8, u8> for Scrambler {
    fn process(&mut self, input: &[u8], output: &mut Vec<u8>) {
        if self.debug {
            debug!("scrambler in/out: {}/{}", input.len(), input.len());
        }
        output.reserve(input.len());
        for &byte in input {
            if !self.aligned {
                // Forward unrandomised until the stream presents a sync
                // byte, then start the group cycle on it.
                if byte != TS_SYNC_BYTE {
                    output.push(byte);
                    continue;
                }
                self.aligned = true;
                self.offset = 0;
            }
            if self.offset % TS_PACKET_BYTES == 0 && byte != TS_SYNC_BYTE {
                warn!(
                    "TS sync lost at group offset {} (got {byte:#04x}), realigning",
                    self.offset
                );
                self.aligned = false;
                output.push(byte);
                continue;
            }
            output.push(byte ^ self.mask[self.offset]);
            self.offset += 1;
            if self.offset == GROUP_BYTES {
                self.offset = 0;
            }
        }
        self.report(input.len());
    }

    fn reset(&mut self) {
        self.offset = 0;
        self.aligned = false;
        self.report_start = Instant::now();
        self.done_bytes = 0;
    }
}
