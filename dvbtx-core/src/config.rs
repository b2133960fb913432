//! Configuration types for the dvbtx pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::errors::ConfigError;

/// The DVB-T elementary period sample rate, 64/7 Msps.
pub const BASEBAND_RATE: f64 = 64.0e6 / 7.0;

/// Bytes in one MPEG-2 transport stream packet.
pub const TS_PACKET_BYTES: usize = 188;

/// Bytes in one RS(204,188) codeword.
pub const RS_CODEWORD_BYTES: usize = 204;

/// MPEG-2 TS sync byte.
pub const TS_SYNC_BYTE: u8 = 0x47;

/// OFDM symbols per DVB-T frame.
pub const BLOCKS_PER_FRAME: usize = 68;

/// DVB-T frames per superframe.
pub const FRAMES_PER_SUPERFRAME: usize = 4;

/// QAM constellation selection (the `qammapping` option).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Constellation {
    Qpsk,
    #[default]
    Qam16,
    Qam64,
}

impl Constellation {
    pub fn from_points(points: u32) -> Result<Self, ConfigError> {
        match points {
            4 => Ok(Constellation::Qpsk),
            16 => Ok(Constellation::Qam16),
            64 => Ok(Constellation::Qam64),
            _ => Err(ConfigError::InvalidConstellation { value: points }),
        }
    }

    /// Bits per constellation point, the nu of EN 300 744.
    pub fn bits_per_symbol(self) -> usize {
        match self {
            Constellation::Qpsk => 2,
            Constellation::Qam16 => 4,
            Constellation::Qam64 => 6,
        }
    }

    /// TPS constellation field (s25, s26).
    pub fn tps_code(self) -> u8 {
        match self {
            Constellation::Qpsk => 0b00,
            Constellation::Qam16 => 0b01,
            Constellation::Qam64 => 0b10,
        }
    }
}

/// Inner code rate after puncturing (the `coderate` option, e.g. 34 = 3/4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CodeRate {
    R1_2,
    R2_3,
    #[default]
    R3_4,
    R5_6,
    R7_8,
}

impl CodeRate {
    pub fn from_code(code: u32) -> Result<Self, ConfigError> {
        match code {
            12 => Ok(CodeRate::R1_2),
            23 => Ok(CodeRate::R2_3),
            34 => Ok(CodeRate::R3_4),
            56 => Ok(CodeRate::R5_6),
            78 => Ok(CodeRate::R7_8),
            _ => Err(ConfigError::InvalidCodeRate { value: code }),
        }
    }

    /// TPS code rate field (3 bits).
    pub fn tps_code(self) -> u8 {
        match self {
            CodeRate::R1_2 => 0b000,
            CodeRate::R2_3 => 0b001,
            CodeRate::R3_4 => 0b010,
            CodeRate::R5_6 => 0b011,
            CodeRate::R7_8 => 0b100,
        }
    }
}

/// OFDM transmission mode (the `ofdmmode` option).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OfdmMode {
    #[default]
    M2k,
    M4k,
    M8k,
}

impl OfdmMode {
    pub fn from_fft_size(size: u32) -> Result<Self, ConfigError> {
        match size {
            2048 => Ok(OfdmMode::M2k),
            4096 => Ok(OfdmMode::M4k),
            8192 => Ok(OfdmMode::M8k),
            _ => Err(ConfigError::InvalidOfdmMode { value: size }),
        }
    }

    pub fn fft_size(self) -> usize {
        match self {
            OfdmMode::M2k => 2048,
            OfdmMode::M4k => 4096,
            OfdmMode::M8k => 8192,
        }
    }

    /// Active carriers per OFDM symbol (K).
    pub fn active_carriers(self) -> usize {
        match self {
            OfdmMode::M2k => 1705,
            OfdmMode::M4k => 3409,
            OfdmMode::M8k => 6817,
        }
    }

    /// Data cells per OFDM symbol (N_max).
    pub fn data_carriers(self) -> usize {
        match self {
            OfdmMode::M2k => 1512,
            OfdmMode::M4k => 3024,
            OfdmMode::M8k => 6048,
        }
    }

    /// TPS carriers per OFDM symbol.
    pub fn tps_carriers(self) -> usize {
        match self {
            OfdmMode::M2k => 17,
            OfdmMode::M4k => 34,
            OfdmMode::M8k => 68,
        }
    }

    /// FFT address width used by the symbol interleaver.
    pub fn address_bits(self) -> usize {
        match self {
            OfdmMode::M2k => 11,
            OfdmMode::M4k => 12,
            OfdmMode::M8k => 13,
        }
    }

    /// TPS transmission mode field (s38, s39).
    pub fn tps_code(self) -> u8 {
        match self {
            OfdmMode::M2k => 0b00,
            OfdmMode::M8k => 0b01,
            OfdmMode::M4k => 0b10,
        }
    }
}

/// Cyclic prefix ratio 1/delta (the `deltamode` option).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum GuardInterval {
    #[default]
    G1_32,
    G1_16,
    G1_8,
    G1_4,
}

impl GuardInterval {
    pub fn from_denominator(delta: u32) -> Result<Self, ConfigError> {
        match delta {
            32 => Ok(GuardInterval::G1_32),
            16 => Ok(GuardInterval::G1_16),
            8 => Ok(GuardInterval::G1_8),
            4 => Ok(GuardInterval::G1_4),
            _ => Err(ConfigError::InvalidGuardInterval { value: delta }),
        }
    }

    pub fn denominator(self) -> usize {
        match self {
            GuardInterval::G1_32 => 32,
            GuardInterval::G1_16 => 16,
            GuardInterval::G1_8 => 8,
            GuardInterval::G1_4 => 4,
        }
    }

    /// TPS guard interval field (s36, s37).
    pub fn tps_code(self) -> u8 {
        match self {
            GuardInterval::G1_32 => 0b00,
            GuardInterval::G1_16 => 0b01,
            GuardInterval::G1_8 => 0b10,
            GuardInterval::G1_4 => 0b11,
        }
    }
}

/// Unified per-stage configuration.
///
/// One struct carries every recognised option; each stage constructor takes
/// a reference and reads the fields it cares about, so the geometry-linked
/// parameters (constellation, mode, guard) cannot drift apart between
/// stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TxConfig {
    /// QAM constellation shared by bit interleaver, mapper and framer.
    pub constellation: Constellation,
    /// Hierarchy alpha (0 = non-hierarchical, the only implemented mode).
    pub hierarchy_mode: u32,
    /// HP-stream (or single-stream) puncturing rate.
    pub hp_code_rate: CodeRate,
    /// LP-stream rate; signalled in TPS, unused while non-hierarchical.
    pub lp_code_rate: CodeRate,
    /// FFT size selection.
    pub ofdm_mode: OfdmMode,
    /// Cyclic prefix ratio.
    pub guard: GuardInterval,
    /// Cell identifier carried in TPS; -1 disables.
    pub cell_id: i64,
    /// Reserved DVB-H interleaver, must stay false.
    pub in_depth_interleaver: bool,

    /// Shaping-filter input rate in Hz; 0 means 64e6/7.
    pub sample_rate: f64,
    /// DAC rate used by the OFDM precorrection; 0 means 64e6/7.
    pub dac_sample_rate: f64,
    /// Interpolator input rate in Hz; 0 means 64e6/7.
    pub in_sample_rate: f64,
    /// Interpolator output rate in Hz; 0 means 64e6/7.
    pub out_sample_rate: f64,

    /// Shaping-filter stopband edge in Hz.
    pub stopband: f64,
    /// Shaping-filter stopband attenuation in dB; <= 0 disables the filter.
    pub attenuation: f64,
    /// OFDM output power in percent; 100% puts +-3 sigma at +-1.
    pub out_power: f64,

    /// Optional dump path for the designed shaping-filter taps.
    pub coeffs_file: Option<PathBuf>,
    /// Optional dump path for the interpolator base response.
    pub response_file: Option<PathBuf>,
    /// Optional power-loading input file (one dB value per FFT bin).
    pub power_file: Option<PathBuf>,
    /// Power-loading poll period in seconds.
    pub power_interval: f64,
    /// Scrambler throughput report period in seconds; 0 disables.
    pub report_interval: u64,
    /// Per-stage verbose block-size logging.
    pub debug: bool,
}

impl Default for TxConfig {
    fn default() -> Self {
        Self {
            constellation: Constellation::Qam16,
            hierarchy_mode: 0,
            hp_code_rate: CodeRate::R3_4,
            lp_code_rate: CodeRate::R3_4,
            ofdm_mode: OfdmMode::M2k,
            guard: GuardInterval::G1_32,
            cell_id: -1,
            in_depth_interleaver: false,
            sample_rate: 0.0,
            dac_sample_rate: 0.0,
            in_sample_rate: 0.0,
            out_sample_rate: 0.0,
            stopband: 4.0e6,
            attenuation: 35.0,
            out_power: 10.0,
            coeffs_file: None,
            response_file: None,
            power_file: None,
            power_interval: 1.0,
            report_interval: 0,
            debug: false,
        }
    }
}

impl TxConfig {
    /// Reject parameter combinations the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hierarchy_mode != 0 {
            return Err(ConfigError::HierarchyUnimplemented {
                mode: self.hierarchy_mode,
            });
        }
        if self.in_depth_interleaver {
            return Err(ConfigError::InDepthUnimplemented);
        }
        if !(-1..=65535).contains(&self.cell_id) {
            return Err(ConfigError::InvalidCellId { value: self.cell_id });
        }
        for &rate in &[
            self.sample_rate,
            self.dac_sample_rate,
            self.in_sample_rate,
            self.out_sample_rate,
        ] {
            if !rate.is_finite() || rate < 0.0 {
                return Err(ConfigError::InvalidSampleRate { rate });
            }
        }
        if !self.out_power.is_finite() || self.out_power <= 0.0 {
            return Err(ConfigError::InvalidOutPower {
                percent: self.out_power,
            });
        }
        Ok(())
    }

    /// A configured rate with the 0-means-default convention applied.
    pub fn effective_rate(rate: f64) -> f64 {
        if rate == 0.0 {
            BASEBAND_RATE
        } else {
            rate
        }
    }

    /// Apply one option by its wire name, the way the host runtime
    /// addresses stage parameters (e.g. `qammapping=16`, `deltamode=32`).
    pub fn set_option(&mut self, name: &str, value: &str) -> Result<(), ConfigError> {
        fn parsed<T: std::str::FromStr>(
            name: &str,
            value: &str,
        ) -> Result<T, ConfigError> {
            value.parse().map_err(|_| ConfigError::InvalidOptionValue {
                name: name.to_string(),
                value: value.to_string(),
            })
        }

        match name {
            "qammapping" => self.constellation = Constellation::from_points(parsed(name, value)?)?,
            "hyerarchymode" => self.hierarchy_mode = parsed(name, value)?,
            "coderate" | "hpcoderate" => self.hp_code_rate = CodeRate::from_code(parsed(name, value)?)?,
            "lpcoderate" => self.lp_code_rate = CodeRate::from_code(parsed(name, value)?)?,
            "ofdmmode" => self.ofdm_mode = OfdmMode::from_fft_size(parsed(name, value)?)?,
            "deltamode" => self.guard = GuardInterval::from_denominator(parsed(name, value)?)?,
            "cellid" => self.cell_id = parsed(name, value)?,
            "indepthinterleaver" => self.in_depth_interleaver = parsed(name, value)?,
            "samplerate" => self.sample_rate = parsed(name, value)?,
            "dacsamplerate" => self.dac_sample_rate = parsed(name, value)?,
            "insamplerate" => self.in_sample_rate = parsed(name, value)?,
            "outsamplerate" => self.out_sample_rate = parsed(name, value)?,
            "stopband" => self.stopband = parsed(name, value)?,
            "attenuation" => self.attenuation = parsed(name, value)?,
            "outpower" => self.out_power = parsed(name, value)?,
            "coeffsfile" => self.coeffs_file = non_empty_path(value),
            "responsefile" => self.response_file = non_empty_path(value),
            "powerfile" => self.power_file = non_empty_path(value),
            "powerinterval" => self.power_interval = parsed(name, value)?,
            "reportinterval" => self.report_interval = parsed(name, value)?,
            "debug" => self.debug = parsed(name, value)?,
            _ => {
                return Err(ConfigError::UnknownOption {
                    name: name.to_string(),
                })
            }
        }
        Ok(())
    }
}

fn non_empty_path(value: &str) -> Option<PathBuf> {
    if value.is_empty() {
        None
    } else {
        Some(PathBuf::from(value))
    }
}
