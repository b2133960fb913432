//! Windowed-sinc helpers shared by the OFDM precorrection and the
//! interpolator: both model the resampler kernel as a Blackman-windowed
//! sinc sampled on a dense grid.

use std::f64::consts::PI;

/// sin(x)/x with the removable singularity filled in.
pub fn sinc(x: f64) -> f64 {
    if x == 0.0 {
        1.0
    } else {
        x.sin() / x
    }
}

/// Densely sampled Blackman-windowed sinc.
///
/// `t_extent` is the time extent of one sinc lobe spacing, `dt` the grid
/// step; the kernel spans `order + 1` lobes, so the returned vector has
/// `(order + 1) * floor(t_extent / dt)` points. The window uses the
/// exact Blackman coefficients (a0 = 7938/18608).
pub fn blackman_sinc(t_extent: f64, dt: f64, order: usize) -> Vec<f64> {
    let a0 = 7938.0 / 18608.0;
    let a1 = 9240.0 / 18608.0;
    let a2 = 1430.0 / 18608.0;
    let n0 = (t_extent / dt).floor() as usize;
    let n = (order + 1) * n0;
    let center = (n / 2) as f64;
    (0..n)
        .map(|i| {
            let phase = 2.0 * PI * i as f64 / (n - 1) as f64;
            let w = a0 - a1 * phase.cos() + a2 * (2.0 * phase).cos();
            w * sinc(PI * (i as f64 - center) * dt / t_extent)
        })
        .collect()
}

/// Modulus of the DTFT of a sampled impulse response at frequency `f`.
///
/// Plain direct evaluation; the callers only probe a few thousand points
/// at setup time.
pub fn frequency_response_modulus(h: &[f64], dt: f64, f: f64) -> f64 {
    let arg = 2.0 * PI * f * dt;
    let mut re = 0.0;
    let mut im = 0.0;
    for (i, &tap) in h.iter().enumerate() {
        let angle = arg * i as f64;
        re += tap * angle.cos() * dt;
        im -= tap * angle.sin() * dt;
    }
    (re * re + im * im).sqrt()
}

/// Linearly interpolate a sampled response at time `t`; zero outside.
pub fn interp_response(h: &[f64], dt: f64, t: f64) -> f64 {
    if t < 0.0 || t >= h.len() as f64 * dt {
        return 0.0;
    }
    let n0 = (t / dt).floor() as usize;
    let h0 = h[n0];
    let h1 = if n0 == h.len() - 1 { 0.0 } else { h[n0 + 1] };
    h0 + ((h1 - h0) / dt) * (t - n0 as f64 * dt)
}
