//! Analog-side DSP: the shared windowed-sinc helpers, the fractional-rate
//! interpolator and the transmit shaping filter.

pub mod interpolator;
pub mod shaping;
pub mod window;

pub use interpolator::Interpolator;
pub use shaping::ShapingFilter;
