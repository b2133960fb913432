//! Gray-coded QAM constellation mapper.
//!
//! The packed symbol bits y0..y(nu-1) split into an I set (y0, y2, y4) and
//! a Q set (y1, y3, y5): the leading bit of each set selects the sign, the
//! remaining bits Gray-select the odd-integer magnitude. Under hierarchy
//! alpha the quadrant gap widens by alpha - 1, and the finished table is
//! scaled to unit average energy.

use num_complex::Complex32;
use tracing::debug;

use crate::config::{Constellation, TxConfig};
use crate::stage::Stage;

/// Gray-decode a small MSB-first bit pattern.
fn gray_decode(bits: u32, width: usize) -> u32 {
    let mut value = 0;
    let mut acc = 0;
    for pos in (0..width).rev() {
        acc ^= (bits >> pos) & 1;
        value = (value << 1) | acc;
    }
    value
}

/// One axis coordinate from its sign bit and magnitude bits.
fn axis(sign: u32, mag_bits: u32, mag_width: usize) -> f32 {
    let levels = 1u32 << mag_width;
    let magnitude = (2 * levels - 1) - 2 * gray_decode(mag_bits, mag_width);
    if sign == 0 {
        magnitude as f32
    } else {
        -(magnitude as f32)
    }
}

/// Build the unit-energy lookup table for a constellation.
pub fn constellation_table(constellation: Constellation, alpha: f32) -> Vec<Complex32> {
    let nu = constellation.bits_per_symbol();
    let mag_width = nu / 2 - 1;
    let size = 1usize << nu;

    let mut points = Vec::with_capacity(size);
    for index in 0..size as u32 {
        let bit = |b: usize| (index >> (nu - 1 - b)) & 1;
        let mut i_mag = 0;
        let mut q_mag = 0;
        for k in 0..mag_width {
            i_mag = (i_mag << 1) | bit(2 * k + 2);
            q_mag = (q_mag << 1) | bit(2 * k + 3);
        }
        let mut re = axis(bit(0), i_mag, mag_width);
        let mut im = axis(bit(1), q_mag, mag_width);
        re += (alpha - 1.0) * re.signum();
        im += (alpha - 1.0) * im.signum();
        points.push(Complex32::new(re, im));
    }

    let energy =
        (points.iter().map(|p| p.norm_sqr()).sum::<f32>() / size as f32).sqrt();
    for point in &mut points {
        *point /= energy;
    }
    points
}

/// The mapping stage: one nu-bit symbol in, one complex cell out.
pub struct Mapper {
    table: Vec<Complex32>,
    debug: bool,
}

impl Mapper {
    pub fn new(config: &TxConfig) -> Self {
        // Hierarchy alpha > 1 is validated away upstream; the table
        // builder still honours it for completeness.
        let alpha = if config.hierarchy_mode == 0 {
            1.0
        } else {
            config.hierarchy_mode as f32
        };
        Self {
            table: constellation_table(config.constellation, alpha),
            debug: config.debug,
        }
    }
}

impl Stage<u8, Complex32> for Mapper {
    fn process(&mut self, input: &[u8], output: &mut Vec<Complex32>) {
        if self.debug {
            debug!("mapper in/out: {}/{}", input.len(), input.len());
        }
        let mask = self.table.len() - 1;
        output.reserve(input.len());
        output.extend(input.iter().map(|&s| self.table[s as usize & mask]));
    }

    fn reset(&mut self) {}
}
