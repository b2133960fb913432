//! Transmit sink: a bounded ring of sample buffers between the DSP
//! producer and a streaming consumer thread.
//!
//! The producer fills the current write buffer and advances when it is
//! full, blocking only while the ring is full; the consumer thread hands
//! completed buffers to a [`TxStream`] and blocks only while the ring is
//! empty. One mutex guards the ring state (including the run flag) with
//! one condition variable per direction. Shutdown flushes the partial
//! write buffer, stops the consumer by flag + join, and finishes with an
//! end-of-burst marker.

pub mod radio;

use std::io::Write as _;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use num_complex::Complex32;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::config::BASEBAND_RATE;
use crate::errors::SinkError;
use crate::Sample;

/// Radio-facing configuration, UHD-style.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    /// Device-address string handed to the driver.
    pub args: String,
    /// DAC sample rate in Hz; 0 means 64e6/7.
    pub rate: f64,
    /// RF centre frequency in Hz.
    pub frequency: f64,
    /// Fixed LO offset in Hz; negative selects the driver default.
    pub lo_offset: f64,
    /// Transmit gain in dB.
    pub gain: f64,
    /// Daughterboard antenna selection.
    pub antenna: String,
    /// Daughterboard subdevice specification.
    pub subdev: String,
    /// IF filter bandwidth in Hz; 0 leaves the driver default.
    pub bandwidth: f64,
    /// Clock reference: internal, external or mimo.
    pub clock_ref: String,
    /// Wire sample format (fc64, fc32 or sc16).
    pub wire_format: String,
    /// Samples per ring buffer.
    pub buffer_len: usize,
    /// Number of ring buffers.
    pub num_buffers: usize,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            args: String::new(),
            rate: 0.0,
            frequency: 0.0,
            lo_offset: -1.0,
            gain: 0.0,
            antenna: String::new(),
            subdev: String::new(),
            bandwidth: 0.0,
            clock_ref: "internal".into(),
            wire_format: "fc32".into(),
            buffer_len: 1_000_000,
            num_buffers: 4,
        }
    }
}

impl SinkConfig {
    /// The DAC rate with the 0-means-default convention applied.
    pub fn effective_rate(&self) -> f64 {
        if self.rate == 0.0 {
            BASEBAND_RATE
        } else {
            self.rate
        }
    }
}

/// Per-send metadata, mirroring a streaming driver's burst flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct TxMetadata {
    pub start_of_burst: bool,
    pub end_of_burst: bool,
    /// How long a send may block before reporting a timeout.
    pub timeout: Duration,
}

/// The streaming contract with the SDR front end.
///
/// Implementations own the device handle; the sink only requires that a
/// send either consumes samples or reports a timeout the caller may
/// retry past.
pub trait TxStream: Send {
    fn send(&mut self, buffer: &[Sample], metadata: &TxMetadata) -> Result<usize, SinkError>;
}

/// Discards every sample; useful for benchmarks and dry runs.
#[derive(Default)]
pub struct NullStream;

impl TxStream for NullStream {
    fn send(&mut self, buffer: &[Sample], _metadata: &TxMetadata) -> Result<usize, SinkError> {
        Ok(buffer.len())
    }
}

/// Writes interleaved little-endian f32 I/Q pairs to a file.
pub struct FileStream {
    writer: std::io::BufWriter<std::fs::File>,
}

impl FileStream {
    pub fn create(path: &std::path::Path) -> Result<Self, SinkError> {
        Ok(Self {
            writer: std::io::BufWriter::new(std::fs::File::create(path)?),
        })
    }
}

impl TxStream for FileStream {
    fn send(&mut self, buffer: &[Sample], metadata: &TxMetadata) -> Result<usize, SinkError> {
        for sample in buffer {
            self.writer.write_all(&sample.re.to_le_bytes())?;
            self.writer.write_all(&sample.im.to_le_bytes())?;
        }
        if metadata.end_of_burst {
            self.writer.flush()?;
        }
        Ok(buffer.len())
    }
}

struct RingState {
    buffers: Vec<Vec<Sample>>,
    /// Valid samples per buffer.
    fill: Vec<usize>,
    /// Buffer the consumer drains next.
    read: usize,
    /// Buffer the producer is filling.
    write: usize,
    run: bool,
}

struct Shared {
    state: Mutex<RingState>,
    /// Producer waits here for a free buffer.
    space: Condvar,
    /// Consumer waits here for a completed buffer.
    data: Condvar,
}

/// The bounded-buffer transmit sink.
pub struct TransmitSink {
    shared: Arc<Shared>,
    buffer_len: usize,
    consumer: Option<JoinHandle<()>>,
}

impl TransmitSink {
    /// Start the consumer thread over the given stream.
    pub fn start(config: &SinkConfig, mut stream: Box<dyn TxStream>) -> Self {
        let num_buffers = config.num_buffers.max(2);
        let buffer_len = config.buffer_len.max(1);
        let shared = Arc::new(Shared {
            state: Mutex::new(RingState {
                buffers: (0..num_buffers)
                    .map(|_| vec![Complex32::new(0.0, 0.0); buffer_len])
                    .collect(),
                fill: vec![0; num_buffers],
                read: 0,
                write: 0,
                run: true,
            }),
            space: Condvar::new(),
            data: Condvar::new(),
        });

        let worker = Arc::clone(&shared);
        let metadata = TxMetadata {
            timeout: Duration::from_millis(500),
            ..TxMetadata::default()
        };
        let consumer = std::thread::spawn(move || {
            loop {
                let chunk = {
                    let mut state = worker.state.lock().expect("sink mutex poisoned");
                    while state.run && state.read == state.write {
                        state = worker.data.wait(state).expect("sink mutex poisoned");
                    }
                    if state.read == state.write {
                        // Stopped and drained.
                        break;
                    }
                    let read = state.read;
                    let fill = state.fill[read];
                    let mut chunk = std::mem::take(&mut state.buffers[read]);
                    chunk.truncate(fill);
                    state.fill[read] = 0;
                    state.read = (read + 1) % state.buffers.len();
                    worker.space.notify_one();
                    chunk
                };

                let mut sent = 0;
                while sent < chunk.len() {
                    match stream.send(&chunk[sent..], &metadata) {
                        Ok(n) => sent += n,
                        Err(SinkError::SendTimeout { timeout_ms }) => {
                            warn!("TX send timed out after {timeout_ms} ms, retrying");
                        }
                        Err(err) => {
                            error!("TX stream failed: {err}");
                            let mut state = worker.state.lock().expect("sink mutex poisoned");
                            state.run = false;
                            worker.space.notify_all();
                            return;
                        }
                    }
                }
            }

            // Final end-of-burst marker.
            let eob = TxMetadata {
                end_of_burst: true,
                ..TxMetadata::default()
            };
            if let Err(err) = stream.send(&[], &eob) {
                error!("TX end-of-burst failed: {err}");
            }
            info!("TX consumer stopped");
        });

        Self {
            shared,
            buffer_len,
            consumer: Some(consumer),
        }
    }

    /// Queue samples, blocking while the ring is full.
    pub fn write(&self, mut samples: &[Sample]) -> Result<(), SinkError> {
        while !samples.is_empty() {
            let mut state = self.shared.state.lock().expect("sink mutex poisoned");
            if !state.run {
                return Err(SinkError::RingClosed);
            }
            let write = state.write;
            if state.buffers[write].len() < self.buffer_len {
                // The consumer took this buffer earlier; give it storage back.
                state.buffers[write] = vec![Complex32::new(0.0, 0.0); self.buffer_len];
            }
            let fill = state.fill[write];
            let room = self.buffer_len - fill;
            if room > 0 {
                let take = room.min(samples.len());
                state.buffers[write][fill..fill + take].copy_from_slice(&samples[..take]);
                state.fill[write] += take;
                samples = &samples[take..];
            }
            if state.fill[write] == self.buffer_len {
                let next = (write + 1) % state.buffers.len();
                while state.run && next == state.read {
                    state = self.shared.space.wait(state).expect("sink mutex poisoned");
                }
                if !state.run {
                    return Err(SinkError::RingClosed);
                }
                state.write = next;
                self.shared.data.notify_one();
            }
        }
        Ok(())
    }

    /// Flush the partial buffer, stop and join the consumer.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        {
            let mut state = self.shared.state.lock().expect("sink mutex poisoned");
            if state.run {
                let write = state.write;
                if state.fill[write] > 0 {
                    // Publish the partial buffer before stopping.
                    let fill = state.fill[write];
                    state.buffers[write].truncate(fill);
                    let next = (write + 1) % state.buffers.len();
                    while state.run && next == state.read {
                        state = self.shared.space.wait(state).expect("sink mutex poisoned");
                    }
                    if state.run {
                        state.write = next;
                    }
                }
                state.run = false;
            }
            self.shared.data.notify_all();
            self.shared.space.notify_all();
        }
        if let Some(handle) = self.consumer.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for TransmitSink {
    fn drop(&mut self) {
        self.stop();
    }
}
