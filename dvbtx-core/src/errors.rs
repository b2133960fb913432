//! dvbtx error types with granular categories

use thiserror::Error;

/// Top-level error type for all dvbtx operations
#[derive(Debug, Error)]
pub enum TxError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Channel coding error: {0}")]
    Coding(#[from] CodingError),

    #[error("DSP processing error: {0}")]
    Dsp(#[from] DspError),

    #[error("Transmit sink error: {0}")]
    Sink(#[from] SinkError),
}

/// Configuration errors, all fatal at setup
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid QAM mapping: {value} (must be 4, 16 or 64)")]
    InvalidConstellation { value: u32 },

    #[error("Invalid code rate: {value} (must be 12, 23, 34, 56 or 78)")]
    InvalidCodeRate { value: u32 },

    #[error("Invalid OFDM mode: {value} (must be 2048, 4096 or 8192)")]
    InvalidOfdmMode { value: u32 },

    #[error("Invalid guard interval: 1/{value} (must be 1/32, 1/16, 1/8 or 1/4)")]
    InvalidGuardInterval { value: u32 },

    #[error("Hierarchical mode {mode} is reserved and not implemented")]
    HierarchyUnimplemented { mode: u32 },

    #[error("The in-depth interleaver is reserved and not implemented")]
    InDepthUnimplemented,

    #[error("Invalid cell id: {value} (must be in [-1, 65535])")]
    InvalidCellId { value: i64 },

    #[error("Invalid sample rate: {rate} Hz (must be >= 0, 0 selects 64e6/7)")]
    InvalidSampleRate { rate: f64 },

    #[error("Invalid output power: {percent}% (must be > 0)")]
    InvalidOutPower { percent: f64 },

    #[error("Unknown option: {name}")]
    UnknownOption { name: String },

    #[error("Invalid value {value:?} for option {name}")]
    InvalidOptionValue { name: String, value: String },
}

/// Channel coding errors
#[derive(Debug, Error)]
pub enum CodingError {
    #[error("Reed-Solomon internal math error: {reason}")]
    RsInternalMath { reason: String },
}

/// DSP processing errors
#[derive(Debug, Error)]
pub enum DspError {
    #[error("FFT size {size} is not supported")]
    InvalidFftSize { size: usize },

    #[error("Filter design failed: {reason}")]
    FilterDesignFailed { reason: String },

    #[error("No rational approximation of {ratio} with denominator <= {max_den}")]
    ResampleApproxFailed { ratio: f64, max_den: u32 },
}

/// Transmit sink errors
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Send timed out after {timeout_ms} ms")]
    SendTimeout { timeout_ms: u64 },

    #[error("Failed to lock {source_name}")]
    LockFailure { source_name: String },

    #[error("Sample ring is shut down")]
    RingClosed,

    #[error("Stream I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for dvbtx operations
pub type Result<T> = std::result::Result<T, TxError>;
