//! Background power-loading table updates.
//!
//! A worker thread wakes every 200 ms and, once per configured interval,
//! re-reads the power file: one dB value per line, one line per FFT bin,
//! lowest bin first. Values land in a shared table of atomic floats that
//! the modulator reads relaxed per bin; a torn table between file reads
//! is a valid transient calibration, so no lock is held on either side.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use atomic_float::AtomicF32;
use tracing::info;

/// Worker wakeup granularity.
const WAKEUP_INTERVAL: Duration = Duration::from_millis(200);

/// Shared per-bin amplitude factors, all 1.0 until a file is read.
pub fn unity_factors(n_fft: usize) -> Arc<Vec<AtomicF32>> {
    Arc::new((0..n_fft).map(|_| AtomicF32::new(1.0)).collect())
}

/// Read one dB value per line into linear per-bin factors.
///
/// Returns the number of bins updated; short files update a prefix and
/// unreadable lines keep their previous value, matching the best-effort
/// update contract.
pub fn load_power_file(path: &Path, factors: &[AtomicF32]) -> std::io::Result<usize> {
    let text = std::fs::read_to_string(path)?;
    let mut updated = 0;
    for (line, slot) in text.lines().zip(factors.iter()) {
        if let Some(db) = line
            .split_whitespace()
            .next()
            .and_then(|tok| tok.parse::<f32>().ok())
        {
            slot.store(10.0f32.powf(db / 20.0), Ordering::Relaxed);
            updated += 1;
        }
    }
    Ok(updated)
}

/// Owns the poller thread; dropping stops and joins it.
pub struct PowerLoader {
    run: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl PowerLoader {
    pub fn spawn(path: PathBuf, interval_secs: f64, factors: Arc<Vec<AtomicF32>>) -> Self {
        let run = Arc::new(AtomicBool::new(true));
        let run_flag = Arc::clone(&run);
        let ticks_per_read = ((interval_secs * 1000.0) / WAKEUP_INTERVAL.as_millis() as f64)
            .round()
            .max(1.0) as u64;

        let handle = std::thread::spawn(move || {
            let mut tick: u64 = 0;
            let mut next_read: u64 = 0;
            while run_flag.load(Ordering::Relaxed) {
                if tick == next_read {
                    next_read = tick + ticks_per_read;
                    if load_power_file(&path, &factors).is_err() {
                        info!("Power loading file {path:?} not found");
                    }
                }
                std::thread::sleep(WAKEUP_INTERVAL);
                tick += 1;
            }
        });

        Self {
            run,
            handle: Some(handle),
        }
    }
}

impl Drop for PowerLoader {
    fn drop(&mut self) {
        self.run.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
