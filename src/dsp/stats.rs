use serde::Serialize;
/// Summary statistics of one signal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct SignalStats {
    pub len: usize,
    pub mean: f32,
    /// Mean of the squared samples.
    pub energy: f32,
    pub min: f32,
    pub max: f32,
    /// Population standard deviation.
    pub std_dev: f32,
}
impl SignalStats {
    pub fn from_signal(data: &[f32]) -> Self {
        if data.is_empty() {
            return Self::default();
        }
        let n = data.len() as f32;
        let mean = data.iter().copied().sum::<f32>() / n;
        let energy = data.iter().map(|v| v * v).sum::<f32>() / n;
        let variance = data
            .iter()
            .map(|v| {
                let delta = v - mean;
                delta * delta
            })
            .sum::<f32>()
            / n;
        Self {
            len: data.len(),
            mean,
            energy,
            min: data.iter().copied().fold(f32::INFINITY, f32::min),
            max: data.iter().copied().fold(f32::NEG_INFINITY, f32::max),
            std_dev: variance.sqrt(),
        }
    }
    pub fn peak_to_peak(&self) -> f32 {
        self.max - self.min
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn stats_of_known_signal() {
        let stats = SignalStats::from_signal(&[0.0, 2.0, -2.0, 0.0]);
        assert_eq!(stats.len, 4);
        assert_eq!(stats.mean, 0.0);
        assert_eq!(stats.energy, 2.0);
        assert_eq!(stats.peak_to_peak(), 4.0);
        assert!((stats.std_dev - 2.0_f32.sqrt()).abs() < 1e-6);
    }
    #[test]
    fn empty_signal_has_zero_stats() {
        assert_eq!(SignalStats::from_signal(&[]), SignalStats::default());
    }
}
