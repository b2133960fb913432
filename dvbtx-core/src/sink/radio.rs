//! The radio-opening contract.
//!
//! A driver turns a [`SinkConfig`] into a live [`TxStream`] by the usual
//! streaming-hardware sequence: create the device from its address
//! string, select the subdevice, set rate, frequency (with LO offset),
//! gain, bandwidth and antenna, verify the LO/reference locks, then
//! stream. Hardware drivers live outside this crate; [`LoopbackRadio`]
//! implements the same sequence against an in-memory buffer so the
//! contract stays testable.

use std::sync::{Arc, Mutex};

use tracing::info;

use crate::errors::SinkError;
use crate::sink::{SinkConfig, TxMetadata, TxStream};
use crate::Sample;

/// Opens a transmit stream for a sink configuration.
pub trait RadioDriver {
    fn open(&self, config: &SinkConfig) -> Result<Box<dyn TxStream>, SinkError>;
}

/// Shared capture buffer of a loopback session.
pub type LoopbackBuffer = Arc<Mutex<Vec<Sample>>>;

/// A driver that keeps everything in memory: samples land in a shared
/// buffer and the configuration sequence is logged the way a hardware
/// session would be.
#[derive(Default)]
pub struct LoopbackRadio {
    /// When set, pretend the named lock source never locks.
    pub fail_lock: Option<String>,
    buffer: LoopbackBuffer,
}

impl LoopbackRadio {
    /// The capture buffer every stream of this driver writes into.
    pub fn buffer(&self) -> LoopbackBuffer {
        Arc::clone(&self.buffer)
    }
}

struct LoopbackStream {
    buffer: LoopbackBuffer,
}

impl TxStream for LoopbackStream {
    fn send(&mut self, buffer: &[Sample], _metadata: &TxMetadata) -> Result<usize, SinkError> {
        self.buffer.lock().expect("loopback buffer poisoned").extend_from_slice(buffer);
        Ok(buffer.len())
    }
}

impl RadioDriver for LoopbackRadio {
    fn open(&self, config: &SinkConfig) -> Result<Box<dyn TxStream>, SinkError> {
        info!("Creating the device with args: {}", config.args);
        if !config.subdev.is_empty() {
            info!("Using subdevice: {}", config.subdev);
        }
        let rate = config.effective_rate();
        info!("Setting TX Rate: {} Msps", rate / 1.0e6);
        let lo_offset = if config.lo_offset >= 0.0 {
            config.lo_offset
        } else {
            2.0 * rate
        };
        info!(
            "Setting TX Frequency: {} MHz (LO offset {} MHz)",
            config.frequency / 1.0e6,
            lo_offset / 1.0e6
        );
        info!("Setting TX Gain: {} dB", config.gain);
        if config.bandwidth != 0.0 {
            info!("Setting TX Bandwidth: {} MHz", config.bandwidth / 1.0e6);
        }
        if !config.antenna.is_empty() {
            info!("Using TX Antenna: {}", config.antenna.to_uppercase());
        }

        // Lock checks are fatal at open.
        if let Some(source_name) = &self.fail_lock {
            return Err(SinkError::LockFailure {
                source_name: source_name.clone(),
            });
        }
        info!("Clock reference {} locked", config.clock_ref);

        Ok(Box::new(LoopbackStream {
            buffer: self.buffer(),
        }))
    }
}
