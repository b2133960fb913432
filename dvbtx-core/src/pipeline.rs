//! The transmission pipeline.
//!
//! Chains the twelve stages in transmission order, TS bytes in, baseband
//! samples out. Intermediate buffers are owned by the pipeline and reused
//! across calls; every stage keeps its own carry state, so input may be
//! fed in chunks of any size and the output length per call follows the
//! stages' block accounting.

use num_complex::Complex32;

use crate::coding::{ConvEncoder, OuterInterleaver, Puncturer, ReedSolomonEncoder, Scrambler};
use crate::config::TxConfig;
use crate::dsp::{Interpolator, ShapingFilter};
use crate::errors::Result;
use crate::framing::Framer;
use crate::mapping::{BitInterleaver, Mapper, SymbolInterleaver};
use crate::ofdm::OfdmModulator;
use crate::stage::Stage;

/// TS-to-baseband processing chain.
pub struct DvbtPipeline {
    scrambler: Scrambler,
    rs_encoder: ReedSolomonEncoder,
    outer_interleaver: OuterInterleaver,
    conv_encoder: ConvEncoder,
    puncturer: Puncturer,
    bit_interleaver: BitInterleaver,
    symbol_interleaver: SymbolInterleaver,
    mapper: Mapper,
    framer: Framer,
    ofdm: OfdmModulator,
    interpolator: Interpolator,
    filter: ShapingFilter,

    bytes_a: Vec<u8>,
    bytes_b: Vec<u8>,
    cells_a: Vec<Complex32>,
    cells_b: Vec<Complex32>,
}

impl DvbtPipeline {
    /// Build the full chain; fails on an invalid configuration.
    pub fn new(config: &TxConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            scrambler: Scrambler::new(config),
            rs_encoder: ReedSolomonEncoder::new(config),
            outer_interleaver: OuterInterleaver::new(config),
            conv_encoder: ConvEncoder::new(config),
            puncturer: Puncturer::new(config),
            bit_interleaver: BitInterleaver::new(config),
            symbol_interleaver: SymbolInterleaver::new(config),
            mapper: Mapper::new(config),
            framer: Framer::new(config),
            ofdm: OfdmModulator::new(config),
            interpolator: Interpolator::new(config)?,
            filter: ShapingFilter::new(config),
            bytes_a: Vec::new(),
            bytes_b: Vec::new(),
            cells_a: Vec::new(),
            cells_b: Vec::new(),
        })
    }

    /// Push a chunk of transport stream through the whole chain,
    /// appending produced baseband samples to `samples`.
    pub fn process(&mut self, ts: &[u8], samples: &mut Vec<Complex32>) {
        self.bytes_a.clear();
        self.scrambler.process(ts, &mut self.bytes_a);
        self.bytes_b.clear();
        self.rs_encoder.process(&self.bytes_a, &mut self.bytes_b);
        self.bytes_a.clear();
        self.outer_interleaver
            .process(&self.bytes_b, &mut self.bytes_a);
        self.bytes_b.clear();
        self.conv_encoder.process(&self.bytes_a, &mut self.bytes_b);
        self.bytes_a.clear();
        self.puncturer.process(&self.bytes_b, &mut self.bytes_a);
        self.bytes_b.clear();
        self.bit_interleaver
            .process(&self.bytes_a, &mut self.bytes_b);
        self.bytes_a.clear();
        self.symbol_interleaver
            .process(&self.bytes_b, &mut self.bytes_a);

        self.cells_a.clear();
        self.mapper.process(&self.bytes_a, &mut self.cells_a);
        self.cells_b.clear();
        self.framer.process(&self.cells_a, &mut self.cells_b);
        self.cells_a.clear();
        self.ofdm.process(&self.cells_b, &mut self.cells_a);
        self.cells_b.clear();
        self.interpolator.process(&self.cells_a, &mut self.cells_b);
        self.filter.process(&self.cells_b, samples);
    }

    /// Drop every stage's carried state.
    pub fn reset(&mut self) {
        self.scrambler.reset();
        self.rs_encoder.reset();
        self.outer_interleaver.reset();
        self.conv_encoder.reset();
        self.puncturer.reset();
        self.bit_interleaver.reset();
        self.symbol_interleaver.reset();
        self.mapper.reset();
        self.framer.reset();
        self.ofdm.reset();
        self.interpolator.reset();
        self.filter.reset();
    }

    /// Samples one OFDM symbol occupies before resampling.
    pub fn ofdm_block_len(&self) -> usize {
        self.ofdm.block_len()
    }
}
