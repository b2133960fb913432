//! dvbtx core library
//!
//! A software-defined DVB-T (ETSI EN 300 744, non-hierarchical mode)
//! transmitter. The crate turns an MPEG-2 transport stream into baseband
//! complex samples ready for an SDR front end: energy dispersal,
//! RS(204,188), outer interleaving, rate-1/2 convolutional coding with
//! puncturing, bit and symbol interleaving, QAM mapping, frame/pilot/TPS
//! assembly, OFDM modulation, fractional resampling and transmit shaping.
//!
//! Every stage is a resumable block transformer (see [`stage::Stage`]);
//! [`pipeline::DvbtPipeline`] chains them in transmission order.

pub mod coding;
pub mod config;
pub mod dsp;
pub mod errors;
pub mod framing;
pub mod mapping;
pub mod ofdm;
pub mod pipeline;
pub mod sink;
pub mod stage;

pub use config::TxConfig;
pub use errors::{Result, TxError};
pub use pipeline::DvbtPipeline;

/// Complex baseband sample type used on every analog-side edge.
pub type Sample = num_complex::Complex32;
