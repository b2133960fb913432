//! OFDM frame assembly: pilot geometry, TPS signalling and the framer
//! state machine that merges data cells with the reference information.

pub mod framer;
pub mod pilots;
pub mod tps;

pub use framer::Framer;
