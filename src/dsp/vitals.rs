//! Heart-rate and SpO2 estimation from detected extrema.
use serde::{Deserialize, Serialize};
use thiserror::Error;
/// Empirical cubic mapping an AC/DC ratio to SpO2, highest power first.
#[allow(clippy::excessive_precision)]
pub const SPO2_COEFFS: [f32; 4] = [-37.465271198, 58.403912586, -37.079378855, 100.16136403];
pub const SINGLE_CHANNEL_SPO2_RANGE: (f32, f32) = (90.0, 100.0);
pub const DUAL_CHANNEL_SPO2_RANGE: (f32, f32) = (70.0, 100.0);
/// RR intervals deviating from the median by more than this fraction are dropped.
pub const OUTLIER_TOLERANCE: f32 = 0.5;
/// Why an estimate could not be produced for the current window.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum EstimateError {
    #[error("need at least {required} peaks, found {found}")]
    InsufficientPeaks { found: usize, required: usize },
    #[error("analysis window is empty")]
    EmptyWindow,
    #[error("DC component is zero")]
    ZeroDc,
    #[error("infrared AC/DC ratio is zero")]
    ZeroInfraredRatio,
    #[error("AC component is undefined (no usable peak/valley pairs)")]
    MissingAc,
}
/// How each peak is paired with valleys when measuring the AC swing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcMethod {
    /// Closest valley by index distance; swing taken as an absolute value.
    Nearest,
    /// Mean of the nearest valley before and after the peak.
    #[default]
    Flanking,
}
/// Mean peak-to-valley swing of `signal`, or `None` when no peak can be
/// paired with a valley.
pub fn ac_component(
    signal: &[f32],
    peaks: &[usize],
    valleys: &[usize],
    method: AcMethod,
) -> Option<f32> {
    if peaks.is_empty() || valleys.is_empty() {
        return None;
    }
    let mut sum = 0.0_f32;
    let mut count = 0usize;
    for &peak in peaks {
        let swing = match method {
            AcMethod::Nearest => {
                nearest_valley(peak, valleys).map(|v| (signal[peak] - signal[v]).abs())
            }
            AcMethod::Flanking => {
                let before = valleys.iter().copied().filter(|&v| v < peak).max();
                let after = valleys.iter().copied().filter(|&v| v > peak).min();
                match (before, after) {
                    (Some(b), Some(a)) => Some(signal[peak] - (signal[b] + signal[a]) / 2.0),
                    (Some(v), None) | (None, Some(v)) => Some(signal[peak] - signal[v]),
                    (None, None) => None,
                }
            }
        };
        if let Some(swing) = swing {
            sum += swing;
            count += 1;
        }
    }
    (count > 0).then(|| sum / count as f32)
}
fn nearest_valley(peak: usize, valleys: &[usize]) -> Option<usize> {
    // min_by_key keeps the first of equal distances
    valleys.iter().copied().min_by_key(|&v| v.abs_diff(peak))
}
/// Mean of the raw window.
pub fn dc_component(raw: &[f32]) -> Option<f32> {
    if raw.is_empty() {
        return None;
    }
    Some(raw.iter().sum::<f32>() / raw.len() as f32)
}
/// Unclamped SpO2 polynomial.
///
/// Evaluated in `f64` with the `f32` coefficients and rounded once.
pub fn spo2_polynomial(ratio: f32) -> f32 {
    let [p3, p2, p1, p0] = SPO2_COEFFS.map(f64::from);
    let r = f64::from(ratio);
    (p3 * r.powi(3) + p2 * r.powi(2) + p1 * r + p0) as f32
}
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Spo2Estimate {
    pub spo2: f32,
    pub ratio: f32,
    /// Set when the max-min fallback replaced the peak-based AC.
    pub degraded: bool,
}
/// Single-channel SpO2 from the AC/DC ratio of one wavelength.
///
/// With fewer than two peaks or valleys the AC is replaced by the raw
/// window's max-min span.
pub fn spo2_single_channel(
    raw: &[f32],
    peaks: &[usize],
    valleys: &[usize],
    ac: Option<f32>,
) -> Result<Spo2Estimate, EstimateError> {
    let dc = dc_component(raw).ok_or(EstimateError::EmptyWindow)?;
    let degraded = peaks.len() < 2 || valleys.len() < 2;
    let ac = if degraded {
        let max = raw.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let min = raw.iter().copied().fold(f32::INFINITY, f32::min);
        max - min
    } else {
        ac.ok_or(EstimateError::MissingAc)?
    };
    if dc == 0.0 {
        return Err(EstimateError::ZeroDc);
    }
    let ratio = ac / dc;
    let (lo, hi) = SINGLE_CHANNEL_SPO2_RANGE;
    Ok(Spo2Estimate {
        spo2: spo2_polynomial(ratio).clamp(lo, hi),
        ratio,
        degraded,
    })
}
/// AC and DC levels of one channel's window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct AcDc {
    pub ac: Option<f32>,
    pub dc: Option<f32>,
}
/// Ratiometric SpO2: `R = (redAC/redDC) / (irAC/irDC)`.
pub fn spo2_dual_channel(red: AcDc, infrared: AcDc) -> Result<Spo2Estimate, EstimateError> {
    let red_dc = red.dc.ok_or(EstimateError::EmptyWindow)?;
    let ir_dc = infrared.dc.ok_or(EstimateError::EmptyWindow)?;
    if red_dc == 0.0 || ir_dc == 0.0 {
        return Err(EstimateError::ZeroDc);
    }
    let red_ac = red.ac.ok_or(EstimateError::MissingAc)?;
    let ir_ac = infrared.ac.ok_or(EstimateError::MissingAc)?;
    let red_ratio = red_ac / red_dc;
    let ir_ratio = ir_ac / ir_dc;
    if ir_ratio == 0.0 {
        return Err(EstimateError::ZeroInfraredRatio);
    }
    let ratio = red_ratio / ir_ratio;
    let (lo, hi) = DUAL_CHANNEL_SPO2_RANGE;
    Ok(Spo2Estimate {
        spo2: spo2_polynomial(ratio).clamp(lo, hi),
        ratio,
        degraded: false,
    })
}
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct HeartRate {
    pub bpm: f32,
    /// Population standard deviation of the kept intervals (SDNN), in ms.
    pub hrv_ms: f32,
    pub mean_interval_s: f32,
    pub intervals_used: usize,
    pub outliers_rejected: usize,
}
/// Heart rate from consecutive peak positions.
pub fn heart_rate(peaks: &[usize], sample_rate_hz: f64) -> Result<HeartRate, EstimateError> {
    if peaks.len() < 2 {
        return Err(EstimateError::InsufficientPeaks {
            found: peaks.len(),
            required: 2,
        });
    }
    let rate = sample_rate_hz as f32;
    let intervals: Vec<f32> = peaks
        .windows(2)
        .map(|w| (w[1] - w[0]) as f32 / rate)
        .collect();
    heart_rate_from_intervals(&intervals)
}
/// Heart rate from RR intervals in seconds, after median-based outlier
/// rejection. Falls back to all intervals if fewer than two survive.
pub fn heart_rate_from_intervals(intervals_s: &[f32]) -> Result<HeartRate, EstimateError> {
    if intervals_s.is_empty() {
        return Err(EstimateError::InsufficientPeaks {
            found: 0,
            required: 2,
        });
    }
    let mut sorted = intervals_s.to_vec();
    sorted.sort_by(f32::total_cmp);
    let median = sorted[sorted.len() / 2];
    let kept: Vec<f32> = intervals_s
        .iter()
        .copied()
        .filter(|x| (x - median).abs() / median <= OUTLIER_TOLERANCE)
        .collect();
    let outliers_rejected = intervals_s.len() - kept.len();
    let used: &[f32] = if kept.len() < 2 { intervals_s } else { &kept };
    let mean = used.iter().sum::<f32>() / used.len() as f32;
    let variance = used.iter().map(|x| (x - mean) * (x - mean)).sum::<f32>() / used.len() as f32;
    Ok(HeartRate {
        bpm: 60.0 / mean,
        hrv_ms: variance.sqrt() * 1000.0,
        mean_interval_s: mean,
        intervals_used: used.len(),
        outliers_rejected: if kept.len() < 2 { 0 } else { outliers_rejected },
    })
}
