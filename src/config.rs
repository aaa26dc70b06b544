// src/config.rs
use std::fs;
use std::path::Path;
use serde::{Deserialize, Serialize};
use crate::dsp::{AcMethod, PeakOptions, PpgError, StorageMode};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelLayout {
    /// Red only; SpO2 uses the single-channel ratio.
    Single,
    #[default]
    Dual,
}

impl ChannelLayout {
    pub fn channel_count(self) -> usize {
        match self {
            Self::Single => 1,
            Self::Dual => 2,
        }
    }
}

/// Optional peak-detector stages. `None` leaves a stage out.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeakStages {
    pub height: Option<(f32, f32)>,
    pub min_prominence: Option<f32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PpgConfig {
    pub sample_rate_hz: f64,
    pub low_cutoff_hz: f64,
    pub high_cutoff_hz: f64,
    pub filter_order: usize,
    pub analysis_window: usize,
    pub update_interval: usize,
    pub buffer_capacity: usize,
    pub min_peak_interval_secs: f64,
    pub storage: StorageMode,
    pub channels: ChannelLayout,
    // 预热：取前 N 个原始样本的均值，喂给滤波器若干次
    pub warmup_samples: usize,
    pub warmup_iterations: usize,
    pub ac_method: AcMethod,
    pub peak_stages: PeakStages,
    // 文件回放时模拟实时采样节奏
    pub simulate_realtime: bool,
}

impl Default for PpgConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 1000.0,
            low_cutoff_hz: 0.5,
            high_cutoff_hz: 20.0,
            filter_order: 3,
            analysis_window: 2100,
            update_interval: 1050,
            buffer_capacity: 2300,
            min_peak_interval_secs: 0.4,
            storage: StorageMode::Compact,
            channels: ChannelLayout::Dual,
            warmup_samples: 100,
            warmup_iterations: 100,
            ac_method: AcMethod::Flanking,
            peak_stages: PeakStages::default(),
            simulate_realtime: false,
        }
    }
}

impl PpgConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, PpgError> {
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PpgError> {
        if !self.sample_rate_hz.is_finite() || self.sample_rate_hz <= 0.0 {
            return Err(PpgError::InvalidSampleRate);
        }
        if self.filter_order == 0 {
            return Err(PpgError::InvalidFilterOrder);
        }
        let nyquist_hz = self.sample_rate_hz / 2.0;
        let band_ok = self.low_cutoff_hz > 0.0
            && self.low_cutoff_hz < self.high_cutoff_hz
            && self.high_cutoff_hz < nyquist_hz;
        if !band_ok {
            return Err(PpgError::InvalidBand {
                low_hz: self.low_cutoff_hz,
                high_hz: self.high_cutoff_hz,
                nyquist_hz,
            });
        }
        if self.analysis_window == 0 {
            return Err(PpgError::ZeroLength("analysis window"));
        }
        if self.update_interval == 0 {
            return Err(PpgError::ZeroLength("update interval"));
        }
        if self.buffer_capacity < self.analysis_window {
            return Err(PpgError::CapacityTooSmall {
                capacity: self.buffer_capacity,
                window: self.analysis_window,
            });
        }
        Ok(())
    }

    /// Minimum peak spacing in samples (truncated).
    pub fn min_peak_distance(&self) -> usize {
        (self.sample_rate_hz * self.min_peak_interval_secs) as usize
    }

    pub fn peak_options(&self) -> PeakOptions {
        PeakOptions {
            distance: self.min_peak_distance(),
            height: self.peak_stages.height,
            min_prominence: self.peak_stages.min_prominence,
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.channel_count()
    }
}
