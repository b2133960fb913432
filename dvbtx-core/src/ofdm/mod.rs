//! OFDM modulation: frequency-domain cell placement, inverse FFT, cyclic
//! prefix, output power scaling, and the per-bin correction factors
//! (resampler precorrection and file-driven power loading).

pub mod modulator;
pub mod power;

pub use modulator::OfdmModulator;
pub use power::PowerLoader;
