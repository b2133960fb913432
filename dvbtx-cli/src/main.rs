mod config;

use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use color_eyre::eyre::{eyre, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::CliConfig;
use dvbtx_core::sink::{FileStream, NullStream, TransmitSink, TxMetadata, TxStream};
use dvbtx_core::{DvbtPipeline, Sample};

/// TS bytes handed to the pipeline per iteration.
const CHUNK_BYTES: usize = 64 * 188;

#[derive(Parser, Debug)]
#[command(author, version, about = "DVB-T software modulator", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file ([tx] and [sink] tables)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// MPEG-2 transport stream to modulate
    #[arg(short, long)]
    input: PathBuf,

    /// Write baseband samples as raw interleaved f32 I/Q
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write baseband samples as a stereo float WAV (I left, Q right)
    #[arg(short = 'w', long)]
    wav_output: Option<PathBuf>,

    /// Override a modulator option by wire name, e.g. --set qammapping=64
    #[arg(long = "set", value_name = "OPTION=VALUE")]
    set: Vec<String>,

    /// Enable verbose diagnostic output
    #[arg(short, long)]
    verbose: bool,
}

/// Stereo float WAV adapter for the transmit sink.
struct WavStream {
    writer: Option<hound::WavWriter<std::io::BufWriter<std::fs::File>>>,
}

impl WavStream {
    fn create(path: &std::path::Path, sample_rate: u32) -> Result<Self> {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        Ok(Self {
            writer: Some(hound::WavWriter::create(path, spec)?),
        })
    }
}

impl TxStream for WavStream {
    fn send(
        &mut self,
        buffer: &[Sample],
        metadata: &TxMetadata,
    ) -> std::result::Result<usize, dvbtx_core::errors::SinkError> {
        let io_err = |e: hound::Error| {
            dvbtx_core::errors::SinkError::Io(std::io::Error::new(std::io::ErrorKind::Other, e))
        };
        if let Some(writer) = self.writer.as_mut() {
            for sample in buffer {
                writer.write_sample(sample.re).map_err(io_err)?;
                writer.write_sample(sample.im).map_err(io_err)?;
            }
            if metadata.end_of_burst {
                if let Some(writer) = self.writer.take() {
                    writer.finalize().map_err(io_err)?;
                }
            }
        }
        Ok(buffer.len())
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if args.verbose { "debug" } else { "info" })
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = match &args.config {
        Some(path) => CliConfig::from_file(path)?,
        None => CliConfig::default(),
    };
    for assignment in &args.set {
        let (name, value) = assignment
            .split_once('=')
            .ok_or_else(|| eyre!("--set expects OPTION=VALUE, got {assignment:?}"))?;
        config
            .tx
            .set_option(name.trim(), value.trim())
            .wrap_err_with(|| format!("Bad option {assignment:?}"))?;
    }
    if args.verbose {
        config.tx.debug = true;
    }

    let ts = std::fs::read(&args.input)
        .wrap_err_with(|| format!("Failed to read transport stream {}", args.input.display()))?;
    if ts.is_empty() {
        return Err(eyre!("Transport stream {} is empty", args.input.display()));
    }
    info!(
        "Modulating {} bytes ({} TS packets)",
        ts.len(),
        ts.len() / 188
    );

    let mut pipeline = DvbtPipeline::new(&config.tx)?;

    let stream: Box<dyn TxStream> = if let Some(path) = &args.wav_output {
        let rate = effective_output_rate(&config) as u32;
        Box::new(WavStream::create(path, rate)?)
    } else if let Some(path) = &args.output {
        Box::new(FileStream::create(path)?)
    } else {
        info!("No output selected, discarding samples");
        Box::new(NullStream)
    };
    let sink = TransmitSink::start(&config.sink, stream);

    let bar = ProgressBar::new(ts.len() as u64).with_style(
        ProgressStyle::with_template("{bar:40} {bytes}/{total_bytes} ({eta})")
            .expect("static progress template"),
    );

    let started = Instant::now();
    let mut produced: u64 = 0;
    let mut samples: Vec<Sample> = Vec::new();
    for chunk in ts.chunks(CHUNK_BYTES) {
        samples.clear();
        pipeline.process(chunk, &mut samples);
        produced += samples.len() as u64;
        sink.write(&samples).map_err(|e| eyre!("sink write failed: {e}"))?;
        bar.inc(chunk.len() as u64);
    }
    sink.shutdown();
    bar.finish();

    let elapsed = started.elapsed().as_secs_f64();
    info!(
        "Produced {produced} samples in {elapsed:.2}s ({:.2} Msps)",
        produced as f64 / elapsed / 1.0e6
    );
    Ok(())
}

/// The rate the emitted samples are nominally clocked at.
fn effective_output_rate(config: &CliConfig) -> f64 {
    if config.tx.out_sample_rate != 0.0 {
        config.tx.out_sample_rate
    } else {
        config.sink.effective_rate()
    }
}
