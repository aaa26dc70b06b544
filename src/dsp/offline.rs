use log::{info, warn};
use serde::{Deserialize, Serialize};
use crate::config::PpgConfig;
use crate::dsp::filter::{filter_oneway, filtfilt, CausalBandpassFilter};
use crate::dsp::pipeline::{analyze_window, estimate_spo2, ChannelAnalysis};
use crate::dsp::stats::SignalStats;
use crate::dsp::vitals::{self, HeartRate, Spo2Estimate};
use crate::dsp::PpgError;
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    /// Causal pass after a short warm-up on the leading mean.
    #[default]
    OneWay,
    /// Forward-backward pass; no phase shift.
    ZeroPhase,
}
/// Batch results for one wavelength.
#[derive(Clone, Debug, Serialize)]
pub struct ChannelSummary {
    pub peaks: Vec<usize>,
    pub valleys: Vec<usize>,
    pub ac: Option<f32>,
    pub dc: Option<f32>,
    pub heart_rate: Option<HeartRate>,
    pub raw_stats: SignalStats,
    pub filtered_stats: SignalStats,
    #[serde(skip)]
    pub filtered: Vec<f32>,
}
#[derive(Clone, Debug, Serialize)]
pub struct RecordingReport {
    pub filter_mode: FilterMode,
    pub sample_rate_hz: f64,
    pub samples: usize,
    pub red: ChannelSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub infrared: Option<ChannelSummary>,
    pub spo2: Option<Spo2Estimate>,
}
fn summarize(
    label: &str,
    raw: &[f32],
    config: &PpgConfig,
    mode: FilterMode,
) -> Result<(ChannelAnalysis, ChannelSummary), PpgError> {
    let mut filter = CausalBandpassFilter::new(
        config.low_cutoff_hz,
        config.high_cutoff_hz,
        config.sample_rate_hz,
        config.filter_order,
    )?;
    let filtered = match mode {
        FilterMode::OneWay => filter_oneway(&mut filter, raw, true),
        FilterMode::ZeroPhase => filtfilt(&mut filter, raw),
    };
    let analysis = analyze_window(raw, &filtered, &config.peak_options(), config.ac_method);
    let heart_rate = match vitals::heart_rate(&analysis.peaks, config.sample_rate_hz) {
        Ok(hr) => Some(hr),
        Err(err) => {
            warn!("{label}: heart rate unavailable: {err}");
            None
        }
    };
    let raw_stats = SignalStats::from_signal(raw);
    let filtered_stats = SignalStats::from_signal(&filtered);
    info!(
        "{label}: {} peaks, {} valleys, raw mean {:.2} energy {:.2}, \
         filtered mean {:.2} energy {:.2}",
        analysis.peaks.len(),
        analysis.valleys.len(),
        raw_stats.mean,
        raw_stats.energy,
        filtered_stats.mean,
        filtered_stats.energy
    );
    let summary = ChannelSummary {
        peaks: analysis.peaks.clone(),
        valleys: analysis.valleys.clone(),
        ac: analysis.ac,
        dc: analysis.dc,
        heart_rate,
        raw_stats,
        filtered_stats,
        filtered,
    };
    Ok((analysis, summary))
}
/// Whole-recording analysis: filter each channel, detect peaks and valleys,
/// and estimate heart rate per channel and one SpO2 value.
pub fn analyze_recording(
    red: &[f32],
    infrared: Option<&[f32]>,
    config: &PpgConfig,
    mode: FilterMode,
) -> Result<RecordingReport, PpgError> {
    config.validate()?;
    if red.is_empty() {
        return Err(PpgError::ZeroLength("red signal"));
    }
    if let Some(ir) = infrared {
        if ir.len() != red.len() {
            warn!(
                "channel lengths differ ({} vs {}); analysing the common prefix",
                red.len(),
                ir.len()
            );
        }
    }
    let len = infrared.map_or(red.len(), |ir| ir.len().min(red.len()));
    let red = &red[..len];
    let (red_analysis, red_summary) = summarize("red", red, config, mode)?;
    let infrared = match infrared {
        Some(ir) => Some(summarize("infrared", &ir[..len], config, mode)?),
        None => None,
    };
    let spo2 = match estimate_spo2(red, &red_analysis, infrared.as_ref().map(|(a, _)| a)) {
        Ok(estimate) => {
            info!("SpO2 {:.2} % (R = {:.4})", estimate.spo2, estimate.ratio);
            Some(estimate)
        }
        Err(err) => {
            warn!("SpO2 unavailable: {err}");
            None
        }
    };
    Ok(RecordingReport {
        filter_mode: mode,
        sample_rate_hz: config.sample_rate_hz,
        samples: len,
        red: red_summary,
        infrared: infrared.map(|(_, summary)| summary),
        spo2,
    })
}
