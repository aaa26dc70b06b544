use ppg_vitals::dsp::{StorageMode, StreamingSession, SyntheticChannel, SyntheticSource};
use ppg_vitals::{ChannelLayout, PpgConfig, VitalSigns, VitalsRecorder};

const RED: SyntheticChannel = SyntheticChannel {
    dc_level: 20_000.0,
    ac_amplitude: 300.0,
    noise_std: 0.0,
};
const INFRARED: SyntheticChannel = SyntheticChannel {
    dc_level: 25_000.0,
    ac_amplitude: 500.0,
    noise_std: 0.0,
};

fn run(config: PpgConfig, source: SyntheticSource) -> Vec<VitalSigns> {
    let mut session = StreamingSession::new(source, config).unwrap();
    let mut out = Vec::new();
    session
        .run(|vitals| {
            out.push(vitals.clone());
            Ok(())
        })
        .unwrap();
    out
}

fn clean_source(bpm: f64, seconds: f64) -> SyntheticSource {
    SyntheticSource::new(1000.0, bpm, 7)
        .unwrap()
        .with_red(RED)
        .with_infrared(Some(INFRARED))
        .with_duration_secs(seconds)
}

fn native() -> PpgConfig {
    PpgConfig {
        storage: StorageMode::Native,
        ..PpgConfig::default()
    }
}

#[test]
fn recovers_heart_rate_and_ratio_from_synthetic_ppg() {
    for bpm in [75.0_f32, 90.0] {
        let cycles = run(native(), clean_source(f64::from(bpm), 12.0));
        // 2100, 3150, ..., 11550
        assert_eq!(cycles.len(), 10);
        let last = cycles.last().unwrap();
        assert_eq!(last.sample_index, 11_550);
        let hr = last.heart_rate_bpm.unwrap();
        assert!((hr - bpm).abs() < 0.5, "{bpm} BPM estimated as {hr}");
        // (300 / 20000) / (500 / 25000)
        let ratio = last.ratio.unwrap();
        assert!((ratio - 0.75).abs() < 0.01, "ratio {ratio}");
        let spo2 = last.spo2.unwrap();
        assert!((70.0..=100.0).contains(&spo2));
        assert!(!last.spo2_degraded);
        // DC sits above the baseline by the pulse mean, a * 0.08 * sqrt(pi)
        let pulse_mean = 0.08 * std::f32::consts::PI.sqrt();
        let expected_dc = INFRARED.dc_level + INFRARED.ac_amplitude * pulse_mean;
        let infrared_dc = last.infrared.as_ref().unwrap().dc.unwrap();
        assert!((infrared_dc - expected_dc).abs() < 40.0, "ir dc {infrared_dc}");
    }
}

#[test]
fn single_channel_uses_single_channel_range() {
    let config = PpgConfig {
        channels: ChannelLayout::Single,
        ..native()
    };
    let source = clean_source(75.0, 8.0).with_infrared(None);
    let cycles = run(config, source);
    let last = cycles.last().unwrap();
    assert!(last.infrared.is_none());
    assert!((last.heart_rate_bpm.unwrap() - 75.0).abs() < 0.5);
    let spo2 = last.spo2.unwrap();
    assert!((90.0..=100.0).contains(&spo2));
}

#[test]
fn compact_storage_leaves_raw_dc_untouched() {
    let compact = run(PpgConfig::default(), clean_source(75.0, 6.0));
    let full = run(native(), clean_source(75.0, 6.0));
    assert_eq!(compact.len(), full.len());
    for (c, f) in compact.iter().zip(&full) {
        assert_eq!(c.sample_index, f.sample_index);
        assert_eq!(c.red.dc, f.red.dc);
        assert_eq!(c.infrared.as_ref().unwrap().dc, f.infrared.as_ref().unwrap().dc);
    }
}

#[test]
fn short_input_produces_no_cycles() {
    assert!(run(native(), clean_source(75.0, 2.0)).is_empty());
}

#[test]
fn recorder_writes_a_line_per_cycle() {
    let mut session = StreamingSession::new(clean_source(75.0, 5.0), native()).unwrap();
    let mut recorder = VitalsRecorder::from_writer(Vec::new());
    let cycles = session.run(|vitals| recorder.record(vitals)).unwrap();
    let text = String::from_utf8(recorder.finish().unwrap()).unwrap();
    assert_eq!(text.lines().count() as u64, cycles);
    assert_eq!(cycles, 3);
}
