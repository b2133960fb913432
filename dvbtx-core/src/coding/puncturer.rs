//! Code-bit puncturer for the five DVB-T inner rates.
//!
//! Each rate keeps a fixed subset of k_out bits out of every k_in
//! consecutive encoder output bits, raising the effective code rate from
//! 1/2 to (k_in/2)/k_out. Bits are accumulated in a window and a
//! full window is punctured at once, so output length is exactly
//! floor((in + offset) / k_in) * k_out.

use tracing::debug;

use crate::config::{CodeRate, TxConfig};
use crate::stage::Stage;

struct RateParams {
    period_in: usize,
    period_out: usize,
    /// 0-based indices kept from each k_in-bit window.
    keep: &'static [usize],
}

fn rate_params(rate: CodeRate) -> RateParams {
    match rate {
        CodeRate::R1_2 => RateParams {
            period_in: 2,
            period_out: 2,
            keep: &[0, 1],
        },
        CodeRate::R2_3 => RateParams {
            period_in: 4,
            period_out: 3,
            keep: &[0, 1, 3],
        },
        CodeRate::R3_4 => RateParams {
            period_in: 6,
            period_out: 4,
            keep: &[0, 1, 3, 4],
        },
        CodeRate::R5_6 => RateParams {
            period_in: 10,
            period_out: 6,
            keep: &[0, 1, 3, 4, 7, 8],
        },
        CodeRate::R7_8 => RateParams {
            period_in: 14,
            period_out: 8,
            keep: &[0, 1, 3, 5, 7, 8, 11, 12],
        },
    }
}

/// The puncturing stage: code bits in, surviving code bits out.
pub struct Puncturer {
    params: RateParams,
    window: [u8; 14],
    fill: usize,
    debug: bool,
}

impl Puncturer {
    pub fn new(config: &TxConfig) -> Self {
        let params = rate_params(config.hp_code_rate);
        debug_assert_eq!(params.keep.len(), params.period_out);
        Self {
            params,
            window: [0; 14],
            fill: 0,
            debug: config.debug,
        }
    }
}

impl Stage<u8, u8> for Puncturer {
    fn process(&mut self, input: &[u8], output: &mut Vec<u8>) {
        let windows = (input.len() + self.fill) / self.params.period_in;
        if self.debug {
            debug!(
                "puncturer in/out: {}(+{})/{}",
                input.len(),
                self.fill,
                windows * self.params.period_out
            );
        }
        output.reserve(windows * self.params.period_out);
        for &bit in input {
            self.window[self.fill] = bit;
            self.fill += 1;
            if self.fill == self.params.period_in {
                self.fill = 0;
                for &idx in self.params.keep {
                    output.push(self.window[idx]);
                }
            }
        }
    }

    fn reset(&mut self) {
        self.window = [0; 14];
        self.fill = 0;
    }
}
