use std::f64::consts::PI;
use log::debug;
use num_complex::Complex64;
use crate::dsp::PpgError;
/// Samples averaged to pick the batch warm-up level.
pub const WARMUP_MEAN_SAMPLES: usize = 100;
/// Warm-up iterations used by [`filter_oneway`].
pub const ONEWAY_WARMUP_ITERATIONS: usize = 50;
#[derive(Clone, Copy, Debug)]
struct BiquadCoeffs {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}
impl BiquadCoeffs {
    fn response(&self, omega: f64) -> Complex64 {
        let z1 = Complex64::from_polar(1.0, -omega);
        let z2 = z1 * z1;
        let num = self.b0 + z1 * self.b1 + z2 * self.b2;
        let den = 1.0 + z1 * self.a1 + z2 * self.a2;
        num / den
    }
}
#[derive(Clone, Copy, Debug, Default)]
struct BiquadState {
    z1: f64,
    z2: f64,
}
#[derive(Clone, Copy, Debug)]
struct BiquadSection {
    coeffs: BiquadCoeffs,
    state: BiquadState,
}
impl BiquadSection {
    fn new(coeffs: BiquadCoeffs) -> Self {
        Self {
            coeffs,
            state: BiquadState::default(),
        }
    }
    fn process(&mut self, input: f64) -> f64 {
        // Transposed direct form II
        let y = self.coeffs.b0 * input + self.state.z1;
        self.state.z1 = self.coeffs.b1 * input - self.coeffs.a1 * y + self.state.z2;
        self.state.z2 = self.coeffs.b2 * input - self.coeffs.a2 * y;
        y
    }
}
/// Coefficients plus delay-line memory of one realized bandpass.
#[derive(Clone, Debug)]
pub struct FilterState {
    sections: Vec<BiquadSection>,
}
impl FilterState {
    pub fn section_count(&self) -> usize {
        self.sections.len()
    }
    pub fn process_sample(&mut self, input: f32) -> f32 {
        let mut value = f64::from(input);
        for section in &mut self.sections {
            value = section.process(value);
        }
        value as f32
    }
    pub fn reset(&mut self) {
        for section in &mut self.sections {
            section.state = BiquadState::default();
        }
    }
    /// Loads the delay lines with the steady state reached after an
    /// unbounded run of constant `input`.
    pub fn settle(&mut self, input: f32) {
        let mut x = f64::from(input);
        for section in &mut self.sections {
            let c = section.coeffs;
            let y = x * (c.b0 + c.b1 + c.b2) / (1.0 + c.a1 + c.a2);
            section.state = BiquadState {
                z1: y - c.b0 * x,
                z2: c.b2 * x - c.a2 * y,
            };
            x = y;
        }
    }
    /// Gain of the cascade at `freq_hz`.
    pub fn magnitude_at(&self, freq_hz: f64, sample_rate_hz: f64) -> f64 {
        let omega = 2.0 * PI * freq_hz / sample_rate_hz;
        self.sections
            .iter()
            .map(|s| s.coeffs.response(omega).norm())
            .product()
    }
}
/// Coefficient synthesis for a bandpass of a given order.
pub trait BandpassDesign {
    fn realize(
        &self,
        order: usize,
        sample_rate_hz: f64,
        center_hz: f64,
        bandwidth_hz: f64,
    ) -> Result<FilterState, PpgError>;
}
/// Digital Butterworth bandpass via the bilinear transform.
///
/// An order-N design yields 2N poles, grouped into N second-order sections
/// that each carry one zero at DC and one at Nyquist. Every section is scaled
/// to unit gain at the center frequency, so the passband peak is 1.
#[derive(Clone, Copy, Debug, Default)]
pub struct Butterworth;
impl BandpassDesign for Butterworth {
    fn realize(
        &self,
        order: usize,
        sample_rate_hz: f64,
        center_hz: f64,
        bandwidth_hz: f64,
    ) -> Result<FilterState, PpgError> {
        if order == 0 {
            return Err(PpgError::InvalidFilterOrder);
        }
        if !(sample_rate_hz > 0.0) {
            return Err(PpgError::InvalidSampleRate);
        }
        // Edges whose geometric mean is `center_hz` and difference `bandwidth_hz`.
        let disc = bandwidth_hz * bandwidth_hz + 4.0 * center_hz * center_hz;
        let high_hz = (bandwidth_hz + disc.sqrt()) / 2.0;
        let low_hz = high_hz - bandwidth_hz;
        let (low_hz, high_hz) = check_band(low_hz, high_hz, sample_rate_hz)?;
        let fs2 = 2.0 * sample_rate_hz;
        let warped_low = fs2 * (PI * low_hz / sample_rate_hz).tan();
        let warped_high = fs2 * (PI * high_hz / sample_rate_hz).tan();
        let w0 = (warped_low * warped_high).sqrt();
        let half_bw = (warped_high - warped_low) / 2.0;
        let to_z = |s: Complex64| (fs2 + s) / (fs2 - s);
        let bandpass_pair = |p: Complex64| {
            let scaled = p * half_bw;
            let disc = (scaled * scaled - w0 * w0).sqrt();
            (to_z(scaled + disc), to_z(scaled - disc))
        };
        let omega_c = 2.0 * (w0 / fs2).atan();
        let mut sections = Vec::with_capacity(order);
        for k in 0..order {
            let upper = 2 * k + 1 < order;
            let real = 2 * k + 1 == order;
            if real {
                let (za, zb) = bandpass_pair(Complex64::new(-1.0, 0.0));
                sections.push(section_from_poles(za, zb, omega_c));
            } else if upper {
                let theta = PI * (2 * k + order + 1) as f64 / (2 * order) as f64;
                let (za, zb) = bandpass_pair(Complex64::from_polar(1.0, theta));
                sections.push(section_from_poles(za, za.conj(), omega_c));
                sections.push(section_from_poles(zb, zb.conj(), omega_c));
            }
        }
        debug!(
            "butterworth bandpass: order {order}, {low_hz:.3}-{high_hz:.3} Hz \
             @ {sample_rate_hz} Hz, {} sections",
            sections.len()
        );
        Ok(FilterState { sections })
    }
}

fn check_band(low_hz: f64, high_hz: f64, sample_rate_hz: f64) -> Result<(f64, f64), PpgError> {
    let nyquist_hz = sample_rate_hz / 2.0;
    if low_hz > 0.0 && low_hz < high_hz && high_hz < nyquist_hz {
        Ok((low_hz, high_hz))
    } else {
        Err(PpgError::InvalidBand {
            low_hz,
            high_hz,
            nyquist_hz,
        })
    }
}
fn section_from_poles(pa: Complex64, pb: Complex64, omega_c: f64) -> BiquadSection {
    let unscaled = BiquadCoeffs {
        b0: 1.0,
        b1: 0.0,
        b2: -1.0,
        a1: -(pa + pb).re,
        a2: (pa * pb).re,
    };
    let gain = 1.0 / unscaled.response(omega_c).norm();
    BiquadSection::new(BiquadCoeffs {
        b0: gain,
        b2: -gain,
        ..unscaled
    })
}
/// Lifecycle of a [`CausalBandpassFilter`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterPhase {
    /// Delay lines are zero.
    Ready,
    /// Delay lines were pre-settled with a constant input.
    Warmed,
    /// At least one real sample has been processed.
    Running,
}
/// Per-channel causal bandpass used on the streaming path.
#[derive(Clone, Debug)]
pub struct CausalBandpassFilter {
    state: FilterState,
    phase: FilterPhase,
    low_hz: f64,
    high_hz: f64,
    sample_rate_hz: f64,
    order: usize,
}
impl CausalBandpassFilter {
    pub fn new(
        low_hz: f64,
        high_hz: f64,
        sample_rate_hz: f64,
        order: usize,
    ) -> Result<Self, PpgError> {
        Self::with_design(&Butterworth, low_hz, high_hz, sample_rate_hz, order)
    }
    pub fn with_design<D: BandpassDesign>(
        design: &D,
        low_hz: f64,
        high_hz: f64,
        sample_rate_hz: f64,
        order: usize,
    ) -> Result<Self, PpgError> {
        if !(sample_rate_hz > 0.0) {
            return Err(PpgError::InvalidSampleRate);
        }
        if order == 0 {
            return Err(PpgError::InvalidFilterOrder);
        }
        check_band(low_hz, high_hz, sample_rate_hz)?;
        let center_hz = (low_hz * high_hz).sqrt();
        let bandwidth_hz = high_hz - low_hz;
        let state = design.realize(order, sample_rate_hz, center_hz, bandwidth_hz)?;
        debug!(
            "bandpass filter ready: {low_hz}-{high_hz} Hz, center {center_hz:.3} Hz, \
             width {bandwidth_hz} Hz, order {order}"
        );
        Ok(Self {
            state,
            phase: FilterPhase::Ready,
            low_hz,
            high_hz,
            sample_rate_hz,
            order,
        })
    }
    pub fn process_sample(&mut self, input: f32) -> f32 {
        self.phase = FilterPhase::Running;
        self.state.process_sample(input)
    }
    pub fn reset(&mut self) {
        self.state.reset();
        self.phase = FilterPhase::Ready;
    }
    /// Resets, then feeds `initial_value` through the filter `iterations`
    /// times with the outputs discarded.
    pub fn warmup(&mut self, initial_value: f32, iterations: usize) {
        self.reset();
        for _ in 0..iterations {
            self.state.process_sample(initial_value);
        }
        self.phase = FilterPhase::Warmed;
        debug!("filter warmed with {initial_value} x {iterations}");
    }
    /// Like [`Self::warmup`] with an unbounded iteration count.
    pub fn settle(&mut self, initial_value: f32) {
        self.state.settle(initial_value);
        self.phase = FilterPhase::Warmed;
    }
    pub fn phase(&self) -> FilterPhase {
        self.phase
    }
    pub fn order(&self) -> usize {
        self.order
    }
    pub fn sample_rate_hz(&self) -> f64 {
        self.sample_rate_hz
    }
    pub fn center_hz(&self) -> f64 {
        (self.low_hz * self.high_hz).sqrt()
    }
    pub fn bandwidth_hz(&self) -> f64 {
        self.high_hz - self.low_hz
    }
    pub fn magnitude_at(&self, freq_hz: f64) -> f64 {
        self.state.magnitude_at(freq_hz, self.sample_rate_hz)
    }
}
/// Single causal pass over a whole signal. With `use_warmup` and more than
/// [`WARMUP_MEAN_SAMPLES`] samples, the filter is first warmed up with the
/// mean of the leading samples for [`ONEWAY_WARMUP_ITERATIONS`] iterations.
pub fn filter_oneway(
    filter: &mut CausalBandpassFilter,
    signal: &[f32],
    use_warmup: bool,
) -> Vec<f32> {
    if use_warmup && signal.len() > WARMUP_MEAN_SAMPLES {
        let lead = &signal[..WARMUP_MEAN_SAMPLES];
        let mean = lead.iter().sum::<f32>() / lead.len() as f32;
        filter.warmup(mean, ONEWAY_WARMUP_ITERATIONS);
    } else {
        filter.reset();
    }
    signal.iter().map(|&x| filter.process_sample(x)).collect()
}
/// Zero-phase filtering: forward pass, reverse, second pass, reverse.
/// Each pass starts settled on its first input sample to suppress the edge
/// transient. Needs the entire signal and is not usable on the streaming
/// path.
pub fn filtfilt(filter: &mut CausalBandpassFilter, signal: &[f32]) -> Vec<f32> {
    let Some(&first) = signal.first() else {
        return Vec::new();
    };
    filter.settle(first);
    let mut work: Vec<f32> = signal.iter().map(|&x| filter.process_sample(x)).collect();
    work.reverse();
    filter.settle(work[0]);
    for value in work.iter_mut() {
        *value = filter.process_sample(*value);
    }
    work.reverse();
    work
}
