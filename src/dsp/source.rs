use std::collections::VecDeque;
use std::f64::consts::TAU;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use crate::dsp::PpgError;
pub use crate::types::PpgFrame;
/// Anything that can yield PPG frames one sample tick at a time.
/// `Ok(None)` means the source is exhausted.
pub trait SampleSource {
    fn next_frame(&mut self) -> Result<Option<PpgFrame>, PpgError>;
}
/// In-memory source for tests and deterministic playback.
pub struct ManualSource {
    queue: VecDeque<PpgFrame>,
}
impl ManualSource {
    pub fn new(frames: impl IntoIterator<Item = PpgFrame>) -> Self {
        Self {
            queue: frames.into_iter().collect(),
        }
    }
    pub fn from_channels(red: &[f32], infrared: Option<&[f32]>) -> Self {
        match infrared {
            Some(ir) => Self::new(red.iter().zip(ir).map(|(&r, &i)| PpgFrame::dual(r, i))),
            None => Self::new(red.iter().map(|&r| PpgFrame::single(r))),
        }
    }
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}
impl SampleSource for ManualSource {
    fn next_frame(&mut self) -> Result<Option<PpgFrame>, PpgError> {
        Ok(self.queue.pop_front())
    }
}
/// Plain-text recording: one sample per line. An optional second file is
/// read in lockstep for the infrared channel; a line pair where either side
/// fails to parse is skipped.
pub struct TextFileSource {
    red: Lines<BufReader<File>>,
    infrared: Option<Lines<BufReader<File>>>,
    line: usize,
    skipped: usize,
}
impl TextFileSource {
    pub fn open(red: impl AsRef<Path>, infrared: Option<&Path>) -> Result<Self, PpgError> {
        let red = BufReader::new(File::open(red)?).lines();
        let infrared = match infrared {
            Some(path) => Some(BufReader::new(File::open(path)?).lines()),
            None => None,
        };
        Ok(Self {
            red,
            infrared,
            line: 0,
            skipped: 0,
        })
    }
    /// Number of line pairs dropped so far.
    pub fn skipped_lines(&self) -> usize {
        self.skipped
    }
}
fn parse_sample(line: &str) -> Option<f32> {
    line.trim().parse::<f32>().ok().filter(|v| v.is_finite())
}
impl SampleSource for TextFileSource {
    fn next_frame(&mut self) -> Result<Option<PpgFrame>, PpgError> {
        loop {
            let Some(red_line) = self.red.next().transpose()? else {
                return Ok(None);
            };
            let ir_line = match self.infrared.as_mut() {
                Some(lines) => match lines.next().transpose()? {
                    Some(line) => Some(line),
                    None => return Ok(None),
                },
                None => None,
            };
            self.line += 1;
            let red = parse_sample(&red_line);
            let frame = match (red, ir_line.as_deref()) {
                (Some(r), None) => Some(PpgFrame::single(r)),
                (Some(r), Some(ir)) => parse_sample(ir).map(|i| PpgFrame::dual(r, i)),
                (None, _) => None,
            };
            match frame {
                Some(frame) => return Ok(Some(frame)),
                None => {
                    self.skipped += 1;
                    debug!("skipping unparseable sample on line {}", self.line);
                }
            }
        }
    }
}
/// Reads a whitespace-separated signal, stopping at the first token that is
/// not a number or after `max_samples` values. `None` or `Some(0)` reads
/// everything.
pub fn read_signal(
    path: impl AsRef<Path>,
    max_samples: Option<usize>,
) -> Result<Vec<f32>, PpgError> {
    let text = fs::read_to_string(path)?;
    let limit = max_samples.filter(|&n| n > 0).unwrap_or(usize::MAX);
    let signal: Vec<f32> = text
        .split_whitespace()
        .map_while(|token| token.parse::<f32>().ok())
        .take(limit)
        .collect();
    debug!("read {} samples", signal.len());
    Ok(signal)
}
/// Shape parameters of one synthetic wavelength.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SyntheticChannel {
    pub dc_level: f32,
    pub ac_amplitude: f32,
    pub noise_std: f32,
}
/// PPG-like test signal: one Gaussian systolic pulse per beat on a DC
/// baseline with slow wander and uniform noise.
pub struct SyntheticSource {
    sample_rate_hz: f64,
    heart_rate_bpm: f64,
    red: SyntheticChannel,
    infrared: Option<SyntheticChannel>,
    rng: StdRng,
    index: u64,
    limit: Option<u64>,
}
impl SyntheticSource {
    pub fn new(sample_rate_hz: f64, heart_rate_bpm: f64, seed: u64) -> Result<Self, PpgError> {
        if !sample_rate_hz.is_finite() || sample_rate_hz <= 0.0 {
            return Err(PpgError::InvalidSampleRate);
        }
        Ok(Self {
            sample_rate_hz,
            heart_rate_bpm,
            red: SyntheticChannel {
                dc_level: 20_000.0,
                ac_amplitude: 300.0,
                noise_std: 3.0,
            },
            infrared: Some(SyntheticChannel {
                dc_level: 25_000.0,
                ac_amplitude: 500.0,
                noise_std: 3.0,
            }),
            rng: StdRng::seed_from_u64(seed),
            index: 0,
            limit: None,
        })
    }
    pub fn with_red(mut self, channel: SyntheticChannel) -> Self {
        self.red = channel;
        self
    }
    /// `None` produces single-channel frames.
    pub fn with_infrared(mut self, channel: Option<SyntheticChannel>) -> Self {
        self.infrared = channel;
        self
    }
    pub fn with_duration_secs(mut self, seconds: f64) -> Self {
        self.limit = Some((seconds * self.sample_rate_hz) as u64);
        self
    }
    fn pulse(phase: f64) -> f64 {
        (-((phase - 0.25) / 0.08).powi(2)).exp()
    }
    fn sample(&mut self, channel: SyntheticChannel, shape: f64) -> f32 {
        // 均匀噪声，方差与 noise_std^2 一致
        let half_width = channel.noise_std * 3.0_f32.sqrt();
        let noise = if half_width > 0.0 {
            self.rng.gen_range(-half_width..half_width)
        } else {
            0.0
        };
        channel.dc_level + channel.ac_amplitude * shape as f32 + noise
    }
}
impl SampleSource for SyntheticSource {
    fn next_frame(&mut self) -> Result<Option<PpgFrame>, PpgError> {
        if self.limit.is_some_and(|limit| self.index >= limit) {
            return Ok(None);
        }
        let t = self.index as f64 / self.sample_rate_hz;
        let phase = (t * self.heart_rate_bpm / 60.0).fract();
        let shape = Self::pulse(phase) + 0.02 * (TAU * 0.2 * t).sin();
        self.index += 1;
        let red = self.sample(self.red, shape);
        let frame = match self.infrared {
            Some(channel) => PpgFrame::dual(red, self.sample(channel, shape)),
            None => PpgFrame::single(red),
        };
        Ok(Some(frame))
    }
}
