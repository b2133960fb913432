use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use num_complex::Complex32;

use dvbtx_core::coding::Scrambler;
use dvbtx_core::config::{TxConfig, TS_PACKET_BYTES};
use dvbtx_core::dsp::{Interpolator, ShapingFilter};
use dvbtx_core::framing::Framer;
use dvbtx_core::mapping::{BitInterleaver, SymbolInterleaver};
use dvbtx_core::stage::Stage;

fn bench_config() -> TxConfig {
    TxConfig {
        out_power: 10.0,
        ..TxConfig::default()
    }
}

fn benchmark_scrambler(c: &mut Criterion) {
    let mut ts = Vec::new();
    for p in 0..64usize {
        ts.push(0x47);
        ts.extend((1..TS_PACKET_BYTES).map(|i| (i + p) as u8));
    }
    let mut group = c.benchmark_group("scrambler");
    group.throughput(Throughput::Bytes(ts.len() as u64));
    group.bench_function("64_packets", |b| {
        let mut scrambler = Scrambler::new(&bench_config());
        let mut out = Vec::new();
        b.iter(|| {
            out.clear();
            scrambler.process(black_box(&ts), &mut out);
        })
    });
    group.finish();
}

fn benchmark_interleavers(c: &mut Criterion) {
    let bits: Vec<u8> = (0..126 * 4 * 24).map(|i| (i % 2) as u8).collect();
    let mut group = c.benchmark_group("interleavers");
    group.throughput(Throughput::Elements(bits.len() as u64));
    group.bench_function("bit_24_blocks", |b| {
        let mut interleaver = BitInterleaver::new(&bench_config());
        let mut out = Vec::new();
        b.iter(|| {
            out.clear();
            interleaver.process(black_box(&bits), &mut out);
        })
    });

    let symbols: Vec<u8> = (0..1512 * 4).map(|i| (i % 16) as u8).collect();
    group.throughput(Throughput::Elements(symbols.len() as u64));
    group.bench_function("symbol_4_groups", |b| {
        let mut interleaver = SymbolInterleaver::new(&bench_config());
        let mut out = Vec::new();
        b.iter(|| {
            out.clear();
            interleaver.process(black_box(&symbols), &mut out);
        })
    });
    group.finish();
}

fn benchmark_framer(c: &mut Criterion) {
    let cells = vec![Complex32::new(0.3, -0.3); 1512 * 8];
    let mut group = c.benchmark_group("framer");
    group.throughput(Throughput::Elements(cells.len() as u64));
    group.bench_function("8_symbols", |b| {
        let mut framer = Framer::new(&bench_config());
        let mut out = Vec::new();
        b.iter(|| {
            out.clear();
            framer.process(black_box(&cells), &mut out);
        })
    });
    group.finish();
}

fn benchmark_analog_tail(c: &mut Criterion) {
    let samples = vec![Complex32::new(0.01, -0.01); 32 * 2112];
    let mut group = c.benchmark_group("analog_tail");
    group.throughput(Throughput::Elements(samples.len() as u64));

    group.bench_function("interpolate_35_32", |b| {
        let config = TxConfig {
            out_sample_rate: 1.0e7,
            ..bench_config()
        };
        let mut interpolator = Interpolator::new(&config).unwrap();
        let mut out = Vec::new();
        b.iter(|| {
            out.clear();
            interpolator.process(black_box(&samples), &mut out);
        })
    });

    group.bench_function("shaping_filter", |b| {
        let mut filter = ShapingFilter::new(&bench_config());
        let mut out = Vec::new();
        b.iter(|| {
            out.clear();
            filter.process(black_box(&samples), &mut out);
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    benchmark_scrambler,
    benchmark_interleavers,
    benchmark_framer,
    benchmark_analog_tail
);
criterion_main!(benches);
