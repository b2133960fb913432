//! Cross-mode geometry checks: 4K and 8K carrier layouts through the
//! framer, the OFDM stage and the whole pipeline.

use approx::assert_relative_eq;
use num_complex::Complex32;

use dvbtx_core::config::{
    Constellation, GuardInterval, OfdmMode, TxConfig, BLOCKS_PER_FRAME, TS_PACKET_BYTES,
};
use dvbtx_core::framing::{pilots, Framer};
use dvbtx_core::ofdm::OfdmModulator;
use dvbtx_core::stage::Stage;
use dvbtx_core::DvbtPipeline;

fn mode_config(mode: OfdmMode) -> TxConfig {
    TxConfig {
        ofdm_mode: mode,
        out_power: 10.0,
        attenuation: 0.0,
        ..TxConfig::default()
    }
}

#[test]
fn framer_emits_full_symbols_in_8k() {
    let mode = OfdmMode::M8k;
    let mut framer = Framer::new(&mode_config(mode));
    let n_max = mode.data_carriers();
    let k_max = mode.active_carriers();

    let data = vec![Complex32::new(1.0, 0.0); 4 * n_max];
    let mut out = Vec::new();
    framer.process(&data, &mut out);
    assert_eq!(out.len(), 4 * k_max);

    // The topmost continual pilot sits on the last active carrier.
    let symbol0 = &out[..k_max];
    assert_relative_eq!(symbol0[6816].re.abs(), 4.0 / 3.0, epsilon = 1e-6);
    // The tiled pattern repeats: carrier 48 and 48 + 1704 are pilots.
    assert_relative_eq!(symbol0[48].re.abs(), 4.0 / 3.0, epsilon = 1e-6);
    assert_relative_eq!(symbol0[48 + 1704].re.abs(), 4.0 / 3.0, epsilon = 1e-6);
    // TPS carriers tile likewise.
    for &k in pilots::tps_carriers(mode).iter() {
        assert_relative_eq!(symbol0[k as usize].re.abs(), 1.0, epsilon = 1e-6);
    }
}

#[test]
fn framer_data_cell_count_holds_in_4k() {
    let mode = OfdmMode::M4k;
    let mut framer = Framer::new(&mode_config(mode));
    let n_max = mode.data_carriers();
    let k_max = mode.active_carriers();

    // Tag data cells on the imaginary axis so they stay countable after
    // pilot insertion.
    let data = vec![Complex32::new(0.0, 1.0); 8 * n_max];
    let mut out = Vec::new();
    framer.process(&data, &mut out);
    assert_eq!(out.len(), 8 * k_max);

    for symbol in 0..8 {
        let cells = &out[symbol * k_max..(symbol + 1) * k_max];
        let data_cells = cells.iter().filter(|c| c.im != 0.0).count();
        assert_eq!(data_cells, n_max, "symbol {symbol}");
    }
}

#[test]
fn ofdm_block_sizes_follow_mode_and_guard() {
    for (mode, guard, expected) in [
        (OfdmMode::M2k, GuardInterval::G1_32, 2048 + 64),
        (OfdmMode::M2k, GuardInterval::G1_4, 2048 + 512),
        (OfdmMode::M4k, GuardInterval::G1_8, 4096 + 512),
        (OfdmMode::M8k, GuardInterval::G1_4, 8192 + 2048),
    ] {
        let config = TxConfig {
            guard,
            ..mode_config(mode)
        };
        let mut ofdm = OfdmModulator::new(&config);
        let cells = vec![Complex32::new(1.0, 0.0); mode.active_carriers()];
        let mut out = Vec::new();
        ofdm.process(&cells, &mut out);
        assert_eq!(out.len(), expected, "{mode:?} {guard:?}");
        assert_eq!(ofdm.block_len(), expected);
    }
}

#[test]
fn pipeline_runs_8k_qam64_quarter_guard() {
    let config = TxConfig {
        constellation: Constellation::Qam64,
        guard: GuardInterval::G1_4,
        ..mode_config(OfdmMode::M8k)
    };
    let mut pipeline = DvbtPipeline::new(&config).unwrap();

    let mut ts = Vec::new();
    for p in 0..3000usize {
        ts.push(0x47);
        ts.extend((1..TS_PACKET_BYTES).map(|i| (i * 17 + p) as u8));
    }
    let mut samples = Vec::new();
    pipeline.process(&ts, &mut samples);

    assert!(!samples.is_empty());
    assert_eq!(samples.len() % pipeline.ofdm_block_len(), 0);
    assert_eq!(pipeline.ofdm_block_len(), 8192 + 2048);
}

#[test]
fn superframe_cadence_survives_mode_changes() {
    // 68 symbols per frame in every mode; geometry never drifts.
    for mode in [OfdmMode::M2k, OfdmMode::M4k, OfdmMode::M8k] {
        let mut framer = Framer::new(&mode_config(mode));
        let n_max = mode.data_carriers();
        let k_max = mode.active_carriers();
        let data = vec![Complex32::new(1.0, 0.0); BLOCKS_PER_FRAME * n_max];
        let mut out = Vec::new();
        framer.process(&data, &mut out);
        assert_eq!(out.len(), BLOCKS_PER_FRAME * k_max, "{mode:?}");
    }
}
