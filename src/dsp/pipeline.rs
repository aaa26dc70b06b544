use std::collections::VecDeque;
use std::thread;
use std::time::Duration;
use log::{debug, info, warn};
use crate::config::PpgConfig;
use crate::dsp::source::SampleSource;
use crate::dsp::vitals::{self, AcDc, AcMethod, EstimateError, HeartRate, Spo2Estimate};
use crate::dsp::{
    find_peaks, find_valleys, CausalBandpassFilter, PeakOptions, PpgError, SampleBuffer,
    StorageMode,
};
use crate::types::{ChannelReport, PpgFrame, VitalSigns};
/// Peaks, valleys and AC/DC levels of one channel's analysis window.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChannelAnalysis {
    pub peaks: Vec<usize>,
    pub valleys: Vec<usize>,
    pub ac: Option<f32>,
    pub dc: Option<f32>,
}
impl ChannelAnalysis {
    pub fn ac_dc(&self) -> AcDc {
        AcDc {
            ac: self.ac,
            dc: self.dc,
        }
    }
    pub fn report(&self) -> ChannelReport {
        ChannelReport {
            peaks: self.peaks.len(),
            valleys: self.valleys.len(),
            ac: self.ac,
            dc: self.dc,
        }
    }
}
/// Peak and valley detection on the filtered window; DC from the raw one.
pub fn analyze_window(
    raw: &[f32],
    filtered: &[f32],
    options: &PeakOptions,
    ac_method: AcMethod,
) -> ChannelAnalysis {
    let peaks = find_peaks(filtered, options);
    let valleys = find_valleys(filtered, options);
    let ac = vitals::ac_component(filtered, &peaks, &valleys, ac_method);
    ChannelAnalysis {
        ac,
        dc: vitals::dc_component(raw),
        peaks,
        valleys,
    }
}
/// SpO2 for one cycle: ratiometric when an infrared window exists.
pub(crate) fn estimate_spo2(
    red_raw: &[f32],
    red: &ChannelAnalysis,
    infrared: Option<&ChannelAnalysis>,
) -> Result<Spo2Estimate, EstimateError> {
    match infrared {
        Some(ir) => vitals::spo2_dual_channel(red.ac_dc(), ir.ac_dc()),
        None => vitals::spo2_single_channel(red_raw, &red.peaks, &red.valleys, red.ac),
    }
}
// 单通道：滤波器 + 原始/滤波后两个环形缓冲
// 原始缓冲始终保持全精度，DC 不受 i16 饱和影响
struct ChannelState {
    filter: CausalBandpassFilter,
    raw: SampleBuffer,
    filtered: SampleBuffer,
}
impl ChannelState {
    fn new(config: &PpgConfig) -> Result<Self, PpgError> {
        Ok(Self {
            filter: CausalBandpassFilter::new(
                config.low_cutoff_hz,
                config.high_cutoff_hz,
                config.sample_rate_hz,
                config.filter_order,
            )?,
            raw: SampleBuffer::new(StorageMode::Native, config.buffer_capacity)?,
            filtered: SampleBuffer::new(config.storage, config.buffer_capacity)?,
        })
    }
    fn ingest(&mut self, sample: f32) {
        let filtered = self.filter.process_sample(sample);
        self.raw.push(sample);
        self.filtered.push(filtered);
    }
    fn windows(&self, len: usize) -> (Vec<f32>, Vec<f32>) {
        (self.raw.trailing(len), self.filtered.trailing(len))
    }
    fn clear(&mut self) {
        self.filter.reset();
        self.raw.clear();
        self.filtered.clear();
    }
}
/// Per-sample streaming loop: filter, buffer, and analyse the trailing
/// window every `update_interval` samples once `analysis_window` samples
/// have been seen.
pub struct WindowedAnalysisScheduler {
    config: PpgConfig,
    peak_options: PeakOptions,
    red: ChannelState,
    infrared: Option<ChannelState>,
    sample_count: u64,
    last_trigger: u64,
    cycles: u64,
}
impl WindowedAnalysisScheduler {
    pub fn new(config: PpgConfig) -> Result<Self, PpgError> {
        config.validate()?;
        let red = ChannelState::new(&config)?;
        let infrared = match config.channel_count() {
            2 => Some(ChannelState::new(&config)?),
            _ => None,
        };
        info!(
            "scheduler ready: {} Hz, window {}, interval {}, {} channel(s), {:?} storage",
            config.sample_rate_hz,
            config.analysis_window,
            config.update_interval,
            config.channel_count(),
            config.storage
        );
        Ok(Self {
            peak_options: config.peak_options(),
            config,
            red,
            infrared,
            sample_count: 0,
            last_trigger: 0,
            cycles: 0,
        })
    }
    pub fn config(&self) -> &PpgConfig {
        &self.config
    }
    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }
    pub fn cycles(&self) -> u64 {
        self.cycles
    }
    /// Settles each channel's filter on the mean of `frames`.
    pub fn prime(&mut self, frames: &[PpgFrame]) -> Result<(), PpgError> {
        if frames.is_empty() {
            return Err(PpgError::EmptyWarmupSource);
        }
        for frame in frames {
            self.check_shape(frame)?;
        }
        let n = frames.len() as f32;
        let iterations = self.config.warmup_iterations;
        let red_mean = frames.iter().map(|f| f.red).sum::<f32>() / n;
        self.red.filter.warmup(red_mean, iterations);
        if let Some(ir) = self.infrared.as_mut() {
            let ir_mean = frames.iter().filter_map(|f| f.infrared).sum::<f32>() / n;
            ir.filter.warmup(ir_mean, iterations);
            debug!("primed filters: red mean {red_mean:.1}, infrared mean {ir_mean:.1}");
        } else {
            debug!("primed filter: red mean {red_mean:.1}");
        }
        Ok(())
    }
    /// Feeds one frame. Returns the vitals when this sample fires a cycle.
    pub fn process(&mut self, frame: PpgFrame) -> Result<Option<VitalSigns>, PpgError> {
        self.check_shape(&frame)?;
        self.red.ingest(frame.red);
        if let (Some(ir), Some(value)) = (self.infrared.as_mut(), frame.infrared) {
            ir.ingest(value);
        }
        self.sample_count += 1;
        let window = self.config.analysis_window as u64;
        let interval = self.config.update_interval as u64;
        if self.sample_count >= window && self.sample_count - self.last_trigger >= interval {
            self.last_trigger = self.sample_count;
            self.cycles += 1;
            return Ok(Some(self.analyze()));
        }
        Ok(None)
    }
    /// Drops buffered samples and filter state; the configuration is kept.
    pub fn reset(&mut self) {
        self.red.clear();
        if let Some(ir) = self.infrared.as_mut() {
            ir.clear();
        }
        self.sample_count = 0;
        self.last_trigger = 0;
        self.cycles = 0;
    }
    fn check_shape(&self, frame: &PpgFrame) -> Result<(), PpgError> {
        let expected = self.config.channel_count();
        let actual = frame.channel_count();
        if expected != actual {
            return Err(PpgError::ChannelMismatch { expected, actual });
        }
        Ok(())
    }
    fn analyze(&self) -> VitalSigns {
        let len = self.config.analysis_window;
        let method = self.config.ac_method;
        let (red_raw, red_filtered) = self.red.windows(len);
        let red = analyze_window(&red_raw, &red_filtered, &self.peak_options, method);
        let infrared = self.infrared.as_ref().map(|ir| {
            let (raw, filtered) = ir.windows(len);
            analyze_window(&raw, &filtered, &self.peak_options, method)
        });
        let heart_rate = vitals::heart_rate(&red.peaks, self.config.sample_rate_hz);
        let heart: Option<HeartRate> = match heart_rate {
            Ok(hr) => Some(hr),
            Err(err) => {
                warn!("cycle {}: heart rate unavailable: {err}", self.cycles);
                None
            }
        };
        let spo2 = match estimate_spo2(&red_raw, &red, infrared.as_ref()) {
            Ok(estimate) => Some(estimate),
            Err(err) => {
                warn!("cycle {}: SpO2 unavailable: {err}", self.cycles);
                None
            }
        };
        let vitals = VitalSigns {
            sample_index: self.sample_count,
            cycle: self.cycles,
            heart_rate_bpm: heart.map(|h| h.bpm),
            hrv_ms: heart.map(|h| h.hrv_ms),
            spo2: spo2.map(|s| s.spo2),
            ratio: spo2.map(|s| s.ratio),
            spo2_degraded: spo2.is_some_and(|s| s.degraded),
            red: red.report(),
            infrared: infrared.as_ref().map(ChannelAnalysis::report),
        };
        info!(
            "cycle {} @ {}: HR {} bpm, HRV {} ms, SpO2 {} %, R {}, red peaks/valleys {}/{}",
            vitals.cycle,
            vitals.sample_index,
            fmt_opt(vitals.heart_rate_bpm, 1),
            fmt_opt(vitals.hrv_ms, 1),
            fmt_opt(vitals.spo2, 1),
            fmt_opt(vitals.ratio, 4),
            vitals.red.peaks,
            vitals.red.valleys
        );
        vitals
    }
}
fn fmt_opt(value: Option<f32>, precision: usize) -> String {
    match value {
        Some(v) => format!("{v:.precision$}"),
        None => "--".to_string(),
    }
}
/// Couples a [`SampleSource`] with a scheduler: warm-up from the leading
/// frames, then pull until the next cycle fires.
pub struct StreamingSession<S: SampleSource> {
    source: S,
    scheduler: WindowedAnalysisScheduler,
    // 预热阶段读出的帧，正式处理时按顺序回放
    replay: VecDeque<PpgFrame>,
    primed: bool,
    pace: Option<Duration>,
}
impl<S: SampleSource> StreamingSession<S> {
    pub fn new(source: S, config: PpgConfig) -> Result<Self, PpgError> {
        // 每 10 个样本休眠一次，近似实际采样速率
        let pace = config
            .simulate_realtime
            .then(|| Duration::from_secs_f64(10.0 / config.sample_rate_hz));
        Ok(Self {
            source,
            scheduler: WindowedAnalysisScheduler::new(config)?,
            replay: VecDeque::new(),
            primed: false,
            pace,
        })
    }
    pub fn scheduler(&self) -> &WindowedAnalysisScheduler {
        &self.scheduler
    }
    /// Reads the first `warmup_samples` frames, primes the filters with
    /// their mean and queues them for normal processing. Called lazily by
    /// [`Self::next_vitals`].
    pub fn prime(&mut self) -> Result<(), PpgError> {
        if self.primed {
            return Ok(());
        }
        let wanted = self.scheduler.config().warmup_samples;
        while self.replay.len() < wanted {
            match self.source.next_frame()? {
                Some(frame) => self.replay.push_back(frame),
                None => break,
            }
        }
        let lead: Vec<PpgFrame> = self.replay.iter().copied().collect();
        self.scheduler.prime(&lead)?;
        self.primed = true;
        Ok(())
    }
    fn next_frame(&mut self) -> Result<Option<PpgFrame>, PpgError> {
        match self.replay.pop_front() {
            Some(frame) => Ok(Some(frame)),
            None => self.source.next_frame(),
        }
    }
    /// Runs until the next analysis cycle; `Ok(None)` once the source is
    /// exhausted.
    pub fn next_vitals(&mut self) -> Result<Option<VitalSigns>, PpgError> {
        if !self.primed && self.scheduler.config().warmup_samples > 0 {
            self.prime()?;
        }
        while let Some(frame) = self.next_frame()? {
            let vitals = self.scheduler.process(frame)?;
            if let Some(pace) = self.pace {
                if self.scheduler.sample_count() % 10 == 0 {
                    thread::sleep(pace);
                }
            }
            if vitals.is_some() {
                return Ok(vitals);
            }
        }
        Ok(None)
    }
    /// Drains the source, handing every cycle's vitals to `sink`.
    pub fn run<F>(&mut self, mut sink: F) -> Result<u64, PpgError>
    where
        F: FnMut(&VitalSigns) -> Result<(), PpgError>,
    {
        while let Some(vitals) = self.next_vitals()? {
            sink(&vitals)?;
        }
        info!(
            "source exhausted after {} samples, {} cycles",
            self.scheduler.sample_count(),
            self.scheduler.cycles()
        );
        Ok(self.scheduler.cycles())
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChannelLayout;
    use crate::dsp::source::ManualSource;
    fn small_config(channels: ChannelLayout) -> PpgConfig {
        PpgConfig {
            sample_rate_hz: 100.0,
            low_cutoff_hz: 0.5,
            high_cutoff_hz: 10.0,
            analysis_window: 200,
            update_interval: 50,
            buffer_capacity: 250,
            channels,
            warmup_samples: 20,
            ..PpgConfig::default()
        }
    }
    fn pulse_train(n: usize, period: usize, base: f32) -> Vec<f32> {
        (0..n)
            .map(|i| {
                let phase = (i % period) as f32 / period as f32;
                base + 100.0 * (std::f32::consts::TAU * phase).sin()
            })
            .collect()
    }
    #[test]
    fn triggers_at_window_then_every_interval() {
        let mut scheduler =
            WindowedAnalysisScheduler::new(small_config(ChannelLayout::Single)).unwrap();
        let mut fired = Vec::new();
        for (i, v) in pulse_train(400, 100, 1000.0).into_iter().enumerate() {
            if scheduler.process(PpgFrame::single(v)).unwrap().is_some() {
                fired.push(i + 1);
            }
        }
        assert_eq!(fired, vec![200, 250, 300, 350, 400]);
        assert_eq!(scheduler.cycles(), 5);
    }
    #[test]
    fn reset_restarts_the_trigger_schedule() {
        let mut scheduler =
            WindowedAnalysisScheduler::new(small_config(ChannelLayout::Single)).unwrap();
        for v in pulse_train(260, 100, 1000.0) {
            scheduler.process(PpgFrame::single(v)).unwrap();
        }
        assert_eq!(scheduler.cycles(), 2);
        scheduler.reset();
        assert_eq!(scheduler.sample_count(), 0);
        let fired = pulse_train(200, 100, 1000.0)
            .into_iter()
            .filter_map(|v| scheduler.process(PpgFrame::single(v)).unwrap())
            .count();
        assert_eq!(fired, 1);
    }
    #[test]
    fn interval_longer_than_window_spaces_cycles() {
        let config = PpgConfig {
            update_interval: 300,
            ..small_config(ChannelLayout::Single)
        };
        let mut scheduler = WindowedAnalysisScheduler::new(config).unwrap();
        let mut fired = Vec::new();
        for i in 1..=900u64 {
            if scheduler.process(PpgFrame::single(1.0)).unwrap().is_some() {
                fired.push(i);
            }
        }
        assert_eq!(fired, vec![300, 600, 900]);
    }
    #[test]
    fn rejects_frames_with_wrong_channel_count() {
        let mut scheduler =
            WindowedAnalysisScheduler::new(small_config(ChannelLayout::Dual)).unwrap();
        assert!(matches!(
            scheduler.process(PpgFrame::single(1.0)),
            Err(PpgError::ChannelMismatch { expected: 2, actual: 1 })
        ));
        assert_eq!(scheduler.sample_count(), 0);
    }
    #[test]
    fn empty_warmup_source_is_an_error() {
        let mut scheduler =
            WindowedAnalysisScheduler::new(small_config(ChannelLayout::Single)).unwrap();
        assert!(matches!(scheduler.prime(&[]), Err(PpgError::EmptyWarmupSource)));
    }
    #[test]
    fn invalid_config_is_rejected_at_construction() {
        let config = PpgConfig {
            buffer_capacity: 100,
            ..small_config(ChannelLayout::Single)
        };
        assert!(matches!(
            WindowedAnalysisScheduler::new(config),
            Err(PpgError::CapacityTooSmall { .. })
        ));
    }
    #[test]
    fn periodic_signal_yields_heart_rate() {
        // 周期 100 样本 @ 100 Hz -> 60 BPM
        let mut scheduler =
            WindowedAnalysisScheduler::new(small_config(ChannelLayout::Single)).unwrap();
        let mut last = None;
        for v in pulse_train(1000, 100, 1000.0) {
            if let Some(vitals) = scheduler.process(PpgFrame::single(v)).unwrap() {
                last = Some(vitals);
            }
        }
        let vitals = last.unwrap();
        let bpm = vitals.heart_rate_bpm.unwrap();
        assert!((bpm - 60.0).abs() < 1.0, "bpm {bpm}");
        assert!(vitals.hrv_ms.unwrap() < 20.0);
        let spo2 = vitals.spo2.unwrap();
        assert!((90.0..=100.0).contains(&spo2));
        assert!(vitals.infrared.is_none());
    }
    #[test]
    fn compact_storage_keeps_raw_dc_above_i16_range() {
        let config = PpgConfig {
            warmup_iterations: 5000,
            ..small_config(ChannelLayout::Single)
        };
        let mut scheduler = WindowedAnalysisScheduler::new(config).unwrap();
        assert_eq!(scheduler.config().storage, StorageMode::Compact);
        scheduler.prime(&[PpgFrame::single(100_000.0)]).unwrap();
        let mut last = None;
        for v in pulse_train(400, 100, 100_000.0) {
            if let Some(vitals) = scheduler.process(PpgFrame::single(v)).unwrap() {
                last = Some(vitals);
            }
        }
        let vitals = last.unwrap();
        let dc = vitals.red.dc.unwrap();
        assert!((dc - 100_000.0).abs() < 1.0, "dc {dc}");
        assert!(vitals.ratio.unwrap() < 0.01);
    }
    #[test]
    fn flat_signal_reports_missing_estimates() {
        let config = PpgConfig {
            warmup_iterations: 5000,
            ..small_config(ChannelLayout::Dual)
        };
        let mut scheduler = WindowedAnalysisScheduler::new(config).unwrap();
        scheduler.prime(&[PpgFrame::dual(500.0, 600.0)]).unwrap();
        let mut last = None;
        for _ in 0..200 {
            if let Some(vitals) = scheduler.process(PpgFrame::dual(500.0, 600.0)).unwrap() {
                last = Some(vitals);
            }
        }
        let vitals = last.unwrap();
        assert_eq!(vitals.heart_rate_bpm, None);
        assert_eq!(vitals.spo2, None);
        assert_eq!(vitals.red.peaks, 0);
        assert_eq!(vitals.red.dc, Some(500.0));
        assert_eq!(vitals.infrared.unwrap().dc, Some(600.0));
    }
    #[test]
    fn session_replays_warmup_frames() {
        let red = pulse_train(430, 100, 1000.0);
        let ir = pulse_train(430, 100, 1500.0);
        let source = ManualSource::from_channels(&red, Some(&ir));
        let config = PpgConfig {
            storage: StorageMode::Native,
            ..small_config(ChannelLayout::Dual)
        };
        let mut session = StreamingSession::new(source, config).unwrap();
        let mut seen = Vec::new();
        let cycles = session
            .run(|vitals| {
                seen.push(vitals.sample_index);
                Ok(())
            })
            .unwrap();
        // the 20 warm-up frames are processed too
        assert_eq!(session.scheduler().sample_count(), 430);
        assert_eq!(cycles, 5);
        assert_eq!(seen, vec![200, 250, 300, 350, 400]);
    }
    #[test]
    fn session_on_empty_source_fails_warmup() {
        let source = ManualSource::new(Vec::new());
        let mut session =
            StreamingSession::new(source, small_config(ChannelLayout::Single)).unwrap();
        assert!(matches!(session.next_vitals(), Err(PpgError::EmptyWarmupSource)));
    }
}
