//! Transmit shaping filter.
//!
//! An optional Kaiser-windowed linear-phase lowpass confining the OFDM
//! spectrum: the transition band runs from the last active carrier to the
//! configured stopband edge, and the attenuation picks the Kaiser beta
//! and order. The order is rounded up to the next even value so the tap
//! count stays odd and the delay integral. When the attenuation is zero
//! or a design guard trips, the stage degenerates to the identity filter.

use num_complex::Complex32;
use tracing::{debug, error, info};

use crate::config::{TxConfig, BASEBAND_RATE};
use crate::dsp::window::sinc;
use crate::stage::Stage;

/// Longest tolerated filter; longer designs are rejected.
pub const MAX_FILTER_LENGTH: usize = 127;

/// Fraction of the FFT occupied by active carriers (same in all modes).
const OCCUPIED_RATIO: f64 = 1705.0 / 2048.0;

/// Small-order modified Bessel function of the first kind, I0.
fn bessel_i0(x: f64) -> f64 {
    let mut sum = 1.0;
    let mut term = 1.0;
    for i in 1..=20 {
        term *= (x / 2.0) / i as f64;
        sum += term * term;
    }
    sum
}

/// Kaiser's estimate of filter order and beta for a linear ripple and a
/// transition width normalised to the sampling rate.
fn kaiser_design(ripple: f64, width: f64) -> (usize, f64) {
    let attenuation = -20.0 * ripple.log10();
    let tw = 2.0 * std::f64::consts::PI * width;
    let order = if attenuation > 21.0 {
        ((attenuation - 7.95) / (2.285 * tw)).ceil() as usize
    } else {
        (5.79 / tw).ceil() as usize
    };
    let beta = if attenuation <= 21.0 {
        0.0
    } else if attenuation <= 50.0 {
        0.5842 * (attenuation - 21.0).powf(0.4) + 0.07886 * (attenuation - 21.0)
    } else {
        0.1102 * (attenuation - 8.7)
    };
    (order, beta)
}

/// Kaiser window value at lag n of an order-`order` filter.
fn kaiser_window(n: usize, order: usize, beta: f64) -> f64 {
    let frac = (2 * n) as f64 / order as f64 - 1.0;
    bessel_i0(beta * (1.0 - frac * frac).sqrt()) / bessel_i0(beta)
}

/// Design the windowed lowpass; `None` when a guard trips.
fn design(config: &TxConfig) -> Option<Vec<f32>> {
    let sample_rate = TxConfig::effective_rate(config.sample_rate);
    let occupied = BASEBAND_RATE * OCCUPIED_RATIO;
    let stopband = config.stopband;
    let attenuation = config.attenuation;

    if stopband < 0.515 * occupied {
        error!("The selected stopband is too close to the passband: {stopband}");
        return None;
    }
    if stopband > 0.485 * sample_rate {
        error!("The selected stopband is too close to the sampling band: {sample_rate}");
        return None;
    }
    if attenuation > 40.0 {
        error!("A maximum attenuation of 40 dB can be specified");
        return None;
    }
    if attenuation < 5.0 {
        error!("A minimum attenuation of 5 dB can be specified");
        return None;
    }

    // Transition between the last carrier edge and the stopband; cutoff
    // centred in it, both normalised to the sampling rate.
    let tw = (stopband - 0.5 * occupied) / sample_rate;
    let fc = (0.501 * occupied + (stopband - 0.5 * occupied) / 2.0) / sample_rate;
    let ripple = 10.0f64.powf(-attenuation / 20.0);

    let (order, beta) = kaiser_design(ripple, tw);
    let length = 2 * ((order + 1) / 2) + 1;
    if length > MAX_FILTER_LENGTH {
        error!("The maximum filter length has been exceeded: relax the filtering performance");
        return None;
    }
    let order = length - 1;

    let taps: Vec<f32> = (0..length)
        .map(|i| {
            let base = 2.0 * fc * sinc(2.0 * std::f64::consts::PI * fc * (i as f64 - order as f64 / 2.0));
            (base * kaiser_window(i, order, beta)) as f32
        })
        .collect();
    Some(taps)
}

/// The shaping stage: one complex sample in, one out, group delay
/// (length - 1) / 2 samples.
pub struct ShapingFilter {
    taps: Vec<f32>,
    symmetric: bool,
    /// The last length - 1 input samples of the previous call.
    tail: Vec<Complex32>,
    debug: bool,
}

impl ShapingFilter {
    pub fn new(config: &TxConfig) -> Self {
        let taps = if config.attenuation <= 0.0 {
            vec![1.0]
        } else {
            design(config).unwrap_or_else(|| {
                error!("Filter design failed, falling back to the identity filter");
                vec![1.0]
            })
        };

        if let Some(path) = &config.coeffs_file {
            let mut text = String::with_capacity(taps.len() * 12);
            for tap in &taps {
                text.push_str(&format!("{tap:.8}\n"));
            }
            if let Err(err) = std::fs::write(path, text) {
                tracing::warn!("Could not dump filter taps to {path:?}: {err}");
            }
        }

        let tolerance = 1.0e-8;
        let asymmetry: f64 = (0..taps.len() / 2)
            .map(|m| (taps[m] - taps[taps.len() - 1 - m]).abs() as f64)
            .sum();
        let symmetric = asymmetry < tolerance;
        info!(
            "{} filter, {} taps",
            if symmetric { "Symmetric" } else { "Asymmetric" },
            taps.len()
        );

        Self {
            tail: vec![Complex32::new(0.0, 0.0); taps.len() - 1],
            taps,
            symmetric,
            debug: config.debug,
        }
    }

    /// The designed impulse response.
    pub fn taps(&self) -> &[f32] {
        &self.taps
    }
}

impl Stage<Complex32, Complex32> for ShapingFilter {
    fn process(&mut self, input: &[Complex32], output: &mut Vec<Complex32>) {
        if self.debug {
            debug!("filter in/out: {}/{}", input.len(), input.len());
        }
        let length = self.taps.len();
        if length == 1 {
            output.extend(input.iter().map(|&s| s * self.taps[0]));
            return;
        }

        // Work buffer: carried tail followed by this call's input; output
        // sample n is the convolution ending at work[n + length - 1].
        let mut work = Vec::with_capacity(self.tail.len() + input.len());
        work.extend_from_slice(&self.tail);
        work.extend_from_slice(input);

        output.reserve(input.len());
        let half = length / 2;
        for n in 0..input.len() {
            let window = &work[n..n + length];
            let mut acc = Complex32::new(0.0, 0.0);
            if self.symmetric {
                // Fold mirrored samples before the multiply.
                for m in 0..half {
                    acc += (window[length - 1 - m] + window[m]) * self.taps[m];
                }
                acc += window[half] * self.taps[half];
            } else {
                for (m, &tap) in self.taps.iter().enumerate() {
                    acc += window[length - 1 - m] * tap;
                }
            }
            output.push(acc);
        }

        // Refresh the carried tail from the end of the work buffer.
        let keep = work.len() - (length - 1);
        self.tail.copy_from_slice(&work[keep..]);
    }

    fn reset(&mut self) {
        self.tail.fill(Complex32::new(0.0, 0.0));
    }
}
