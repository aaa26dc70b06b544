use std::fs;
use std::path::PathBuf;
use ppg_vitals::dsp::{
    analyze_recording, read_signal, FilterMode, SampleSource, SyntheticChannel, SyntheticSource,
};
use ppg_vitals::{save_signal, PpgConfig};

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("ppg_vitals_it_{}_{name}", std::process::id()))
}

fn synthetic(bpm: f64, seconds: f64) -> (Vec<f32>, Vec<f32>) {
    let channel = |dc_level, ac_amplitude| SyntheticChannel {
        dc_level,
        ac_amplitude,
        noise_std: 0.0,
    };
    let mut source = SyntheticSource::new(1000.0, bpm, 3)
        .unwrap()
        .with_red(channel(20_000.0, 300.0))
        .with_infrared(Some(channel(25_000.0, 500.0)))
        .with_duration_secs(seconds);
    let (mut red, mut ir) = (Vec::new(), Vec::new());
    while let Some(frame) = source.next_frame().unwrap() {
        red.push(frame.red);
        ir.push(frame.infrared.unwrap());
    }
    (red, ir)
}

#[test]
fn zero_phase_analysis_of_saved_recording() {
    let (red, ir) = synthetic(75.0, 10.0);
    let red_path = temp_path("red.txt");
    let ir_path = temp_path("ir.txt");
    save_signal(&red_path, &red, 4).unwrap();
    save_signal(&ir_path, &ir, 4).unwrap();

    let red = read_signal(&red_path, None).unwrap();
    let ir = read_signal(&ir_path, None).unwrap();
    assert_eq!(red.len(), 10_000);

    let config = PpgConfig::default();
    let report = analyze_recording(&red, Some(&ir), &config, FilterMode::ZeroPhase).unwrap();
    let hr = report.red.heart_rate.unwrap();
    assert!((hr.bpm - 75.0).abs() < 0.5, "bpm {}", hr.bpm);
    assert_eq!(report.red.peaks.len(), 13);
    let ir_hr = report.infrared.as_ref().unwrap().heart_rate.unwrap();
    assert!((ir_hr.bpm - 75.0).abs() < 0.5);
    let spo2 = report.spo2.unwrap();
    assert!((spo2.ratio - 0.75).abs() < 0.01, "ratio {}", spo2.ratio);
    assert!(report.red.filtered_stats.mean.abs() < 5.0);

    fs::remove_file(red_path).ok();
    fs::remove_file(ir_path).ok();
}

#[test]
fn limited_read_matches_reference_window() {
    let (red, _) = synthetic(75.0, 3.0);
    let path = temp_path("limited.txt");
    save_signal(&path, &red, 2).unwrap();
    let window = read_signal(&path, Some(2100)).unwrap();
    assert_eq!(window.len(), 2100);
    let config = PpgConfig::default();
    let report = analyze_recording(&window, None, &config, FilterMode::OneWay).unwrap();
    assert_eq!(report.samples, 2100);
    assert_eq!(report.red.filtered.len(), 2100);
    assert!((report.red.raw_stats.mean - window.iter().sum::<f32>() / 2100.0).abs() < 1e-2);
    assert!(report.spo2.is_some());
    fs::remove_file(path).ok();
}
