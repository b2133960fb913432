//! Fractional-rate interpolator.
//!
//! The rate change out/in is approximated by the best rational p/q with
//! q <= 2000 (Stern-Brocot mediant walk), then realised as a polyphase
//! filter: p output phases, order + 1 taps each, the tap values linearly
//! interpolated from a densely sampled Blackman-windowed sinc modelling
//! an analog reconstruction at the input rate. Exactly q input samples
//! produce p output samples; the last order + 1 register samples wrap to
//! the head of the register between blocks.

use num_complex::Complex32;
use tracing::{debug, info};

use crate::config::TxConfig;
use crate::dsp::window;
use crate::errors::{DspError, Result};
use crate::stage::Stage;

/// Polyphase filter order; taps per phase is this plus one.
pub const RESAMPLE_ORDER: usize = 4;

/// Largest denominator the rational approximation may use.
pub const MAX_DENOMINATOR: u32 = 2000;

/// Densification factor of the base kernel grid.
const KERNEL_GRID: f64 = 100.0;

/// Best rational approximation of `x` with denominator bounded by `n`,
/// walking mediants down the Stern-Brocot tree.
pub fn rational_approximation(x: f64, n: u32) -> (u32, u32) {
    let (mut a, mut b, mut c, mut d) = (0u32, 1u32, 1u32, 0u32);
    while b <= n && d <= n {
        let mediant = (a + c) as f64 / (b + d) as f64;
        if x == mediant {
            return if b + d <= n {
                (a + c, b + d)
            } else if d > b {
                (c, d)
            } else {
                (a, b)
            };
        } else if x > mediant {
            a += c;
            b += d;
        } else {
            c += a;
            d += b;
        }
    }
    if b > n {
        (c, d)
    } else {
        (a, b)
    }
}

/// The interpolation stage: q samples in, p samples out per block.
pub struct Interpolator {
    /// Output samples per block.
    p: usize,
    /// Input samples per block.
    q: usize,
    /// Tap matrix, laid out `[k * p + j]` for tap k of output phase j.
    taps: Vec<f32>,
    /// Input base point per output phase.
    basepoints: Vec<usize>,
    /// `q + order + 1` samples; incoming data fills past the carry region.
    register: Vec<Complex32>,
    fill: usize,
    debug: bool,
}

impl Interpolator {
    pub fn new(config: &TxConfig) -> Result<Self> {
        let in_rate = TxConfig::effective_rate(config.in_sample_rate);
        let out_rate = TxConfig::effective_rate(config.out_sample_rate);
        let ratio = out_rate / in_rate;
        let (p, q) = rational_approximation(ratio, MAX_DENOMINATOR);
        if p == 0 || q == 0 {
            return Err(DspError::ResampleApproxFailed {
                ratio,
                max_den: MAX_DENOMINATOR,
            }
            .into());
        }
        info!("Original sampling rate: {in_rate} sps");
        info!(
            "Effective sampling rate (x{p}/{q}): {} sps",
            in_rate * p as f64 / q as f64
        );
        let (p, q) = (p as usize, q as usize);

        let basepoints: Vec<usize> = (0..p)
            .map(|j| (in_rate * (j as f64 / out_rate)).floor() as usize)
            .collect();

        // Base kernel sampled 100x denser than the input grid.
        let dt_base = (1.0 / in_rate) / KERNEL_GRID;
        let h_base = window::blackman_sinc(1.0 / in_rate, dt_base, RESAMPLE_ORDER);
        let mut taps = vec![0.0f32; p * (RESAMPLE_ORDER + 1)];
        for k in 0..=RESAMPLE_ORDER {
            for (j, &bp) in basepoints.iter().enumerate() {
                let t = (j as f64 / out_rate) - ((bp as f64 - k as f64) / in_rate);
                taps[k * p + j] = window::interp_response(&h_base, dt_base, t) as f32;
            }
        }

        if let Some(path) = &config.response_file {
            let mut text = String::with_capacity(h_base.len() * 14);
            for tap in &h_base {
                text.push_str(&format!("{tap:.10}\n"));
            }
            if let Err(err) = std::fs::write(path, text) {
                tracing::warn!("Could not dump interpolator response to {path:?}: {err}");
            }
        }

        Ok(Self {
            p,
            q,
            taps,
            basepoints,
            register: vec![Complex32::new(0.0, 0.0); q + RESAMPLE_ORDER + 1],
            fill: 0,
            debug: config.debug,
        })
    }

    /// The p/q rational rate change in use.
    pub fn ratio(&self) -> (usize, usize) {
        (self.p, self.q)
    }

    fn emit_block(&mut self, output: &mut Vec<Complex32>) {
        let carry = RESAMPLE_ORDER + 1;
        for j in 0..self.p {
            let bp = self.basepoints[j] + carry;
            let mut acc = Complex32::new(0.0, 0.0);
            for k in 0..carry {
                acc += self.register[bp - k] * self.taps[k * self.p + j];
            }
            output.push(acc);
        }
        // Keep the tail as history for the next block's low base points.
        self.register.copy_within(self.q.., 0);
    }
}

impl Stage<Complex32, Complex32> for Interpolator {
    fn process(&mut self, input: &[Complex32], output: &mut Vec<Complex32>) {
        let blocks = (input.len() + self.fill) / self.q;
        if self.debug {
            debug!("interpolator in/out: {}/{}", input.len(), blocks * self.p);
        }
        output.reserve(blocks * self.p);
        let carry = RESAMPLE_ORDER + 1;
        for &sample in input {
            self.register[carry + self.fill] = sample;
            self.fill += 1;
            if self.fill == self.q {
                self.fill = 0;
                self.emit_block(output);
            }
        }
    }

    fn reset(&mut self) {
        self.register.fill(Complex32::new(0.0, 0.0));
        self.fill = 0;
    }
}
