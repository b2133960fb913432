//! OFDM modulator.
//!
//! Every K input cells become one OFDM symbol: positive carrier offsets
//! land in the low IFFT bins, negative offsets wrap to the top, the gap
//! in between stays empty. Each bin is scaled by the resampler
//! precorrection and the power-loading factor before an unnormalised
//! inverse FFT; the time-domain symbol is scaled for the configured
//! output power and preceded by its cyclic prefix.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use atomic_float::AtomicF32;
use num_complex::Complex32;
use rustfft::{Fft, FftPlanner};
use tracing::debug;

use crate::config::{TxConfig, BASEBAND_RATE};
use crate::dsp::window;
use crate::ofdm::power::{self, PowerLoader};
use crate::stage::Stage;

/// Order of the downstream resampler kernel the precorrection models.
const PRECORRECTION_ORDER: usize = 4;

/// Per-bin magnitude correction for the resampler droop.
///
/// Identity when the DAC runs at the native 64/7 Msps rate; otherwise the
/// reciprocal of the Blackman-sinc kernel's response at each carrier
/// frequency, normalised to the centre bin. Indexed by `n_fft/2 + offset`.
fn precorrection(n_fft: usize, k_max: usize, dac_rate: f64) -> Vec<f32> {
    let mut factors = vec![1.0f32; n_fft];
    if dac_rate == BASEBAND_RATE {
        return factors;
    }
    let num_pos = k_max / 2 + 1;
    let num_neg = num_pos - 1;
    let dt_base = (1.0 / BASEBAND_RATE) / 100.0;
    let h_base = window::blackman_sinc(1.0 / BASEBAND_RATE, dt_base, PRECORRECTION_ORDER);
    let center = n_fft / 2;
    for offset in -(num_neg as isize)..num_pos as isize {
        let f = offset as f64 * BASEBAND_RATE / n_fft as f64;
        let modulus = window::frequency_response_modulus(&h_base, dt_base, f);
        factors[(center as isize + offset) as usize] = (1.0 / modulus) as f32;
    }
    let reference = factors[center];
    for factor in &mut factors {
        *factor /= reference;
    }
    factors
}

/// The OFDM stage: K cells in, N_FFT + L samples out per symbol.
pub struct OfdmModulator {
    n_fft: usize,
    k_max: usize,
    n_delta: usize,
    register: Vec<Complex32>,
    bins: Vec<Complex32>,
    fft: Arc<dyn Fft<f32>>,
    scratch: Vec<Complex32>,
    mult_factor: f32,
    /// Indexed `n_fft/2 + offset`, like the power table.
    precorrection: Vec<f32>,
    power: Arc<Vec<AtomicF32>>,
    _loader: Option<PowerLoader>,
    debug: bool,
}

impl OfdmModulator {
    pub fn new(config: &TxConfig) -> Self {
        let mode = config.ofdm_mode;
        let n_fft = mode.fft_size();
        let k_max = mode.active_carriers();
        let n_max = mode.data_carriers();
        let tps_count = mode.tps_carriers();
        let n_delta = n_fft / config.guard.denominator();

        // Average active-carrier power: data and TPS cells at 1, pilots
        // boosted to 16/9.
        let pilot_count = k_max - n_max - tps_count;
        let carrier_power =
            (n_max as f32 + (16.0 / 9.0) * pilot_count as f32 + tps_count as f32) / n_fft as f32;
        let mult_factor =
            ((config.out_power as f32 / 100.0) / (carrier_power * n_fft as f32)).sqrt() / 3.0;

        let dac_rate = TxConfig::effective_rate(config.dac_sample_rate);
        let power = power::unity_factors(n_fft);
        let loader = config.power_file.as_ref().map(|path| {
            PowerLoader::spawn(path.clone(), config.power_interval, Arc::clone(&power))
        });

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_inverse(n_fft);
        let scratch = vec![Complex32::new(0.0, 0.0); fft.get_inplace_scratch_len()];

        Self {
            n_fft,
            k_max,
            n_delta,
            register: Vec::with_capacity(k_max),
            bins: vec![Complex32::new(0.0, 0.0); n_fft],
            fft,
            scratch,
            mult_factor,
            precorrection: precorrection(n_fft, k_max, dac_rate),
            power,
            _loader: loader,
            debug: config.debug,
        }
    }

    /// Samples per emitted OFDM symbol.
    pub fn block_len(&self) -> usize {
        self.n_fft + self.n_delta
    }

    /// The global time-domain scale factor m.
    pub fn mult_factor(&self) -> f32 {
        self.mult_factor
    }

    fn emit_symbol(&mut self, output: &mut Vec<Complex32>) {
        let num_pos = self.k_max / 2 + 1;
        let num_neg = num_pos - 1;
        let center = self.n_fft / 2;

        // Positive offsets (including DC) at the bottom of the spectrum,
        // negative offsets at the top, nothing in between.
        for i in 0..num_pos {
            let weight = self.precorrection[center + i]
                * self.power[center + i].load(Ordering::Relaxed);
            self.bins[i] = self.register[num_neg + i] * weight;
        }
        for i in 0..num_neg {
            let weight = self.precorrection[center - num_neg + i]
                * self.power[center - num_neg + i].load(Ordering::Relaxed);
            self.bins[self.n_fft - num_neg + i] = self.register[i] * weight;
        }
        for bin in &mut self.bins[num_pos..self.n_fft - num_neg] {
            *bin = Complex32::new(0.0, 0.0);
        }

        self.fft
            .process_with_scratch(&mut self.bins, &mut self.scratch);
        for bin in &mut self.bins {
            *bin *= self.mult_factor;
        }

        output.extend_from_slice(&self.bins[self.n_fft - self.n_delta..]);
        output.extend_from_slice(&self.bins);
        self.register.clear();
    }
}

impl Stage<Complex32, Complex32> for OfdmModulator {
    fn process(&mut self, input: &[Complex32], output: &mut Vec<Complex32>) {
        let symbols = (input.len() + self.register.len()) / self.k_max;
        if self.debug {
            debug!("ofdm in/out: {}/{}", input.len(), symbols * self.block_len());
        }
        output.reserve(symbols * self.block_len());
        for &cell in input {
            self.register.push(cell);
            if self.register.len() == self.k_max {
                self.emit_symbol(output);
            }
        }
    }

    fn reset(&mut self) {
        self.register.clear();
        self.bins.fill(Complex32::new(0.0, 0.0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Write;

    fn modulator() -> OfdmModulator {
        OfdmModulator::new(&TxConfig {
            out_power: 10.0,
            ..TxConfig::default()
        })
    }

    fn one_symbol(mdl: &mut OfdmModulator) -> Vec<Complex32> {
        let cells = vec![Complex32::new(1.0, 0.0); 1705];
        let mut out = Vec::new();
        mdl.process(&cells, &mut out);
        out
    }

    #[test]
    fn emits_fft_plus_guard_samples_per_symbol() {
        let mut mdl = modulator();
        let out = one_symbol(&mut mdl);
        assert_eq!(out.len(), 2048 + 64);
    }

    #[test]
    fn cyclic_prefix_copies_the_tail() {
        let mut mdl = modulator();
        let out = one_symbol(&mut mdl);
        let guard = 64;
        let useful = &out[guard..];
        for i in 0..guard {
            assert_eq!(out[i], useful[2048 - guard + i], "cp sample {i}");
        }
    }

    #[test]
    fn dc_sample_is_the_scaled_carrier_sum() {
        // With every active cell at 1 the first useful sample is the sum
        // of all K bins times the power scale.
        let mut mdl = modulator();
        let m = mdl.mult_factor();
        let out = one_symbol(&mut mdl);
        assert_relative_eq!(out[64].re, m * 1705.0, epsilon = 1e-2);
        assert_relative_eq!(out[64].im, 0.0, epsilon = 1e-3);
    }

    #[test]
    fn symbol_energy_follows_parseval() {
        let mut mdl = modulator();
        let m = mdl.mult_factor();
        let out = one_symbol(&mut mdl);
        let energy: f64 = out[64..]
            .iter()
            .map(|s| s.norm_sqr() as f64)
            .sum();
        let expected = (m as f64).powi(2) * 2048.0 * 1705.0;
        assert_relative_eq!(energy, expected, max_relative = 1e-3);
    }

    #[test]
    fn native_dac_rate_skips_precorrection() {
        let factors = precorrection(2048, 1705, BASEBAND_RATE);
        assert!(factors.iter().all(|&f| f == 1.0));
    }

    #[test]
    fn offset_dac_rate_lifts_band_edges() {
        let factors = precorrection(2048, 1705, 1.0e7);
        let center = 1024;
        assert_relative_eq!(factors[center], 1.0);
        // The kernel droops toward the band edge, so the correction grows
        // monotonically away from the centre.
        let edge = factors[center + 852];
        assert!(edge > factors[center + 400]);
        assert!(factors[center + 400] > 1.0);
        // And the correction is symmetric in frequency.
        assert_relative_eq!(factors[center - 852], edge, epsilon = 1e-5);
    }

    #[test]
    fn power_loading_scales_bins() {
        // A -6 dB load on every bin halves the time-domain amplitude.
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for _ in 0..2048 {
            writeln!(file, "-6.0205999").unwrap();
        }
        let mut flat = modulator();
        let reference = one_symbol(&mut flat);

        let mut loaded = modulator();
        power::load_power_file(file.path(), &loaded.power).unwrap();
        let out = one_symbol(&mut loaded);
        for (r, o) in reference.iter().zip(out.iter()) {
            assert_relative_eq!(o.re, r.re * 0.5, epsilon = 1e-4);
            assert_relative_eq!(o.im, r.im * 0.5, epsilon = 1e-4);
        }
    }
}
