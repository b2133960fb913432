//! Symbol interleaver.
//!
//! Groups of N_max nu-bit symbols are permuted by the EN 300 744 address
//! scrambler H(q): a maximal-length sequence over N_bit - 1 bits is wire-
//! permuted into an FFT address, addresses below N_max are accepted in
//! generation order, and the LSB of the generation index toggles the top
//! address bit. Even input blocks write through H, odd blocks read
//! through it, which is the inverse mapping.

use tracing::debug;

use crate::config::{OfdmMode, TxConfig};
use crate::stage::Stage;

/// LFSR feedback taps and wire permutation per OFDM mode.
fn mode_tables(mode: OfdmMode) -> (&'static [usize], &'static [usize]) {
    match mode {
        OfdmMode::M2k => (&[0, 3], &[4, 3, 9, 6, 2, 8, 1, 5, 7, 0]),
        OfdmMode::M4k => (&[0, 2], &[6, 3, 0, 9, 4, 2, 1, 8, 5, 10, 7]),
        OfdmMode::M8k => (&[0, 1, 4, 6], &[7, 1, 4, 2, 9, 6, 8, 10, 0, 3, 11, 5]),
    }
}

/// Materialise H(q) for a mode: a bijection over [0, N_max).
pub fn build_address_permutation(mode: OfdmMode) -> Vec<u32> {
    let n_bit = mode.address_bits();
    let m_max = 1usize << n_bit;
    let n_max = mode.data_carriers();
    let reg_bits = n_bit - 1;
    let (taps, wire) = mode_tables(mode);

    let mut h = Vec::with_capacity(n_max);
    let mut reg: u32 = 0;
    for i in 0..m_max {
        match i {
            0 | 1 => reg = 0,
            2 => reg = 1,
            _ => {
                let feedback = taps.iter().fold(0u32, |acc, &t| acc ^ ((reg >> t) & 1));
                reg = (reg >> 1) | (feedback << (reg_bits - 1));
            }
        }
        let mut addr = ((i as u32) & 1) << (n_bit - 1);
        for (j, &target) in wire.iter().enumerate() {
            addr |= ((reg >> j) & 1) << target;
        }
        if (addr as usize) < n_max {
            h.push(addr);
        }
    }
    h
}

/// The symbol interleaver stage: nu-bit symbols in and out, block size
/// N_max, direction alternating per block.
pub struct SymbolInterleaver {
    h: Vec<u32>,
    register: Vec<u8>,
    fill: usize,
    /// Parity of the current block; block 0 is even.
    odd: bool,
    debug: bool,
}

impl SymbolInterleaver {
    pub fn new(config: &TxConfig) -> Self {
        let n_max = config.ofdm_mode.data_carriers();
        Self {
            h: build_address_permutation(config.ofdm_mode),
            register: vec![0; n_max],
            fill: 0,
            odd: false,
            debug: config.debug,
        }
    }
}

impl Stage<u8, u8> for SymbolInterleaver {
    fn process(&mut self, input: &[u8], output: &mut Vec<u8>) {
        let n_max = self.register.len();
        let blocks = (input.len() + self.fill) / n_max;
        if self.debug {
            debug!("symbol interleaver in/out: {}/{}", input.len(), blocks * n_max);
        }
        output.reserve(blocks * n_max);
        for &symbol in input {
            self.register[self.fill] = symbol;
            self.fill += 1;
            if self.fill == n_max {
                self.fill = 0;
                let start = output.len();
                if self.odd {
                    // y_q = x_{H(q)}
                    output.extend(self.h.iter().map(|&hq| self.register[hq as usize]));
                } else {
                    // y_{H(q)} = x_q
                    output.resize(start + n_max, 0);
                    for (q, &hq) in self.h.iter().enumerate() {
                        output[start + hq as usize] = self.register[q];
                    }
                }
                self.odd = !self.odd;
            }
        }
    }

    fn reset(&mut self) {
        self.register.fill(0);
        self.fill = 0;
        self.odd = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interleaver(mode: OfdmMode) -> SymbolInterleaver {
        SymbolInterleaver::new(&TxConfig {
            ofdm_mode: mode,
            ..TxConfig::default()
        })
    }

    #[test]
    fn address_permutation_is_bijective() {
        for mode in [OfdmMode::M2k, OfdmMode::M4k, OfdmMode::M8k] {
            let h = build_address_permutation(mode);
            let n_max = mode.data_carriers();
            assert_eq!(h.len(), n_max, "{mode:?}");
            let mut seen = vec![false; n_max];
            for &addr in &h {
                assert!(!seen[addr as usize], "{mode:?} repeats {addr}");
                seen[addr as usize] = true;
            }
        }
    }

    #[test]
    fn generation_order_leading_addresses() {
        // i = 0 yields address 0, i = 1 only sets the toggled top bit.
        let h = build_address_permutation(OfdmMode::M2k);
        assert_eq!(h[0], 0);
        assert_eq!(h[1], 1024);
    }

    #[test]
    fn odd_block_inverts_even_block() {
        let mode = OfdmMode::M2k;
        let n_max = mode.data_carriers();
        let mut il = interleaver(mode);
        let data: Vec<u8> = (0..n_max as u32).map(|i| (i % 64) as u8).collect();

        let mut even_out = Vec::new();
        il.process(&data, &mut even_out);
        // Feeding an even block's output back through the following odd
        // block recovers the original order.
        let mut round_trip = Vec::new();
        il.process(&even_out, &mut round_trip);
        assert_eq!(round_trip, data);
    }

    #[test]
    fn blocks_alternate_direction() {
        let mode = OfdmMode::M2k;
        let n_max = mode.data_carriers();
        let mut il = interleaver(mode);
        let data: Vec<u8> = (0..n_max as u32).map(|i| (i % 63) as u8).collect();

        let mut out = Vec::new();
        il.process(&data, &mut out);
        il.process(&data, &mut out);
        let h = build_address_permutation(mode);
        // Even block: y[H(q)] = x[q]; odd block: y[q] = x[H(q)].
        assert_eq!(out[h[5] as usize], data[5]);
        assert_eq!(out[n_max + 5], data[h[5] as usize]);
    }

    #[test]
    fn partial_group_is_held() {
        let mode = OfdmMode::M2k;
        let n_max = mode.data_carriers();
        let mut il = interleaver(mode);
        let mut out = Vec::new();
        il.process(&vec![1u8; n_max - 1], &mut out);
        assert!(out.is_empty());
        il.process(&[1], &mut out);
        assert_eq!(out.len(), n_max);
    }
}
