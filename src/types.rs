// src/types.rs
use serde::{Deserialize, Serialize};

// 单个采样时刻的红光 / 红外读数
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PpgFrame {
    pub red: f32,
    pub infrared: Option<f32>,
}

impl PpgFrame {
    pub fn single(red: f32) -> Self {
        Self { red, infrared: None }
    }
    pub fn dual(red: f32, infrared: f32) -> Self {
        Self { red, infrared: Some(infrared) }
    }
    pub fn channel_count(&self) -> usize {
        if self.infrared.is_some() { 2 } else { 1 }
    }
}

// 每个通道在一次分析周期里的中间结果
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ChannelReport {
    pub peaks: usize,
    pub valleys: usize,
    pub ac: Option<f32>,
    pub dc: Option<f32>,
}

/// One analysis cycle's output. Every estimate is `None` when the current
/// window cannot support it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VitalSigns {
    /// Value of the sample counter when the cycle fired.
    pub sample_index: u64,
    pub cycle: u64,
    pub heart_rate_bpm: Option<f32>,
    pub hrv_ms: Option<f32>,
    pub spo2: Option<f32>,
    pub ratio: Option<f32>,
    /// SpO2 came from the raw peak-to-peak fallback.
    pub spo2_degraded: bool,
    pub red: ChannelReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub infrared: Option<ChannelReport>,
}
