//! Outer and inner channel coding: energy dispersal, RS(204,188), the
//! Forney byte interleaver, the rate-1/2 convolutional encoder and the
//! puncturer.

pub mod conv_encoder;
pub mod outer_interleaver;
pub mod puncturer;
pub mod reed_solomon;
pub mod scrambler;

pub use conv_encoder::ConvEncoder;
pub use outer_interleaver::OuterInterleaver;
pub use puncturer::Puncturer;
pub use reed_solomon::ReedSolomonEncoder;
pub use scrambler::Scrambler;
