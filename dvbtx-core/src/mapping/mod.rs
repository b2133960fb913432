//! Inner interleaving and constellation mapping: the 126-bit block bit
//! interleaver, the per-mode symbol interleaver and the Gray QAM mapper.

pub mod bit_interleaver;
pub mod mapper;
pub mod symbol_interleaver;

pub use bit_interleaver::BitInterleaver;
pub use mapper::Mapper;
pub use symbol_interleaver::SymbolInterleaver;
