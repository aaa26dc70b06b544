//! Peak detection in the style of `scipy.signal.find_peaks`.
//!
//! Everything here is a pure function over a borrowed signal. Empty or short
//! input gives an empty result rather than an error.
use serde::{Deserialize, Serialize};
/// Optional stages of [`find_peaks`]. Stages left as `None` are skipped, so
/// the default pipeline only applies the distance constraint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeakOptions {
    /// Minimum spacing in samples between kept peaks; 0 disables.
    pub distance: usize,
    /// Closed amplitude interval `(min, max)` a peak must fall in.
    pub height: Option<(f32, f32)>,
    pub min_prominence: Option<f32>,
}
impl PeakOptions {
    pub fn with_distance(distance: usize) -> Self {
        Self {
            distance,
            ..Self::default()
        }
    }
}
/// Peak positions plus per-peak properties, all in ascending position order.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PeakSet {
    pub indices: Vec<usize>,
    pub heights: Vec<f32>,
    pub prominences: Vec<f32>,
    pub left_bases: Vec<usize>,
    pub right_bases: Vec<usize>,
}
impl PeakSet {
    pub fn len(&self) -> usize {
        self.indices.len()
    }
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}
/// Prominence of one peak and the positions of the minima it was measured from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Prominence {
    pub value: f32,
    pub left_base: usize,
    pub right_base: usize,
}
/// Interior samples with `s[i-1] < s[i] >= s[i+1]`; plateaus report their
/// leading edge.
pub fn find_local_maxima(signal: &[f32]) -> Vec<usize> {
    if signal.len() < 3 {
        return Vec::new();
    }
    signal
        .windows(3)
        .enumerate()
        .filter(|(_, w)| w[0] < w[1] && w[1] >= w[2])
        .map(|(i, _)| i + 1)
        .collect()
}
/// Greedy suppression: visit peaks from highest to lowest and drop every
/// still-kept peak closer than `distance` samples to the current one.
///
/// Equal amplitudes are visited in position order, so the earlier peak wins.
pub fn filter_by_distance(peaks: &[usize], signal: &[f32], distance: usize) -> Vec<usize> {
    if distance == 0 || peaks.is_empty() {
        return peaks.to_vec();
    }
    let mut order: Vec<usize> = (0..peaks.len()).collect();
    // stable: ties keep ascending position
    order.sort_by(|&a, &b| signal[peaks[b]].total_cmp(&signal[peaks[a]]));
    let mut keep = vec![true; peaks.len()];
    for (rank, &current) in order.iter().enumerate() {
        if !keep[current] {
            continue;
        }
        let pos = peaks[current];
        for &other in &order[rank + 1..] {
            if keep[other] && pos.abs_diff(peaks[other]) < distance {
                keep[other] = false;
            }
        }
    }
    peaks
        .iter()
        .zip(&keep)
        .filter_map(|(&p, &k)| k.then_some(p))
        .collect()
}
pub fn filter_by_height(
    peaks: &[usize],
    signal: &[f32],
    min_height: f32,
    max_height: f32,
) -> Vec<usize> {
    peaks
        .iter()
        .copied()
        .filter(|&p| signal[p] >= min_height && signal[p] <= max_height)
        .collect()
}
/// Walks outward from the peak on each side, tracking the running minimum,
/// until the signal edge or a sample higher than the peak. The base defaults
/// to the signal edge when nothing lower than the peak is found. An index
/// outside the signal yields a zero prominence.
pub fn compute_prominence(signal: &[f32], peak: usize) -> Prominence {
    let Some(&height) = signal.get(peak) else {
        return Prominence {
            value: 0.0,
            left_base: peak,
            right_base: peak,
        };
    };
    let mut left_min = height;
    let mut left_base = 0;
    for i in (0..peak).rev() {
        if signal[i] > height {
            break;
        }
        if signal[i] < left_min {
            left_min = signal[i];
            left_base = i;
        }
    }
    let mut right_min = height;
    let mut right_base = signal.len() - 1;
    for (i, &value) in signal.iter().enumerate().skip(peak + 1) {
        if value > height {
            break;
        }
        if value < right_min {
            right_min = value;
            right_base = i;
        }
    }
    Prominence {
        value: height - left_min.max(right_min),
        left_base,
        right_base,
    }
}
pub fn filter_by_prominence(peaks: &[usize], signal: &[f32], min_prominence: f32) -> Vec<usize> {
    peaks
        .iter()
        .copied()
        .filter(|&p| compute_prominence(signal, p).value >= min_prominence)
        .collect()
}
/// Local maxima, then height (if enabled), distance, prominence (if enabled).
pub fn find_peaks(signal: &[f32], options: &PeakOptions) -> Vec<usize> {
    let mut peaks = find_local_maxima(signal);
    if peaks.is_empty() {
        return peaks;
    }
    if let Some((min_height, max_height)) = options.height {
        peaks = filter_by_height(&peaks, signal, min_height, max_height);
    }
    if options.distance > 0 {
        peaks = filter_by_distance(&peaks, signal, options.distance);
    }
    if let Some(min_prominence) = options.min_prominence {
        peaks = filter_by_prominence(&peaks, signal, min_prominence);
    }
    peaks
}
pub fn find_peaks_with_properties(signal: &[f32], options: &PeakOptions) -> PeakSet {
    let indices = find_peaks(signal, options);
    let mut set = PeakSet {
        heights: Vec::with_capacity(indices.len()),
        prominences: Vec::with_capacity(indices.len()),
        left_bases: Vec::with_capacity(indices.len()),
        right_bases: Vec::with_capacity(indices.len()),
        indices: Vec::new(),
    };
    for &peak in &indices {
        let prominence = compute_prominence(signal, peak);
        set.heights.push(signal[peak]);
        set.prominences.push(prominence.value);
        set.left_bases.push(prominence.left_base);
        set.right_bases.push(prominence.right_base);
    }
    set.indices = indices;
    set
}
/// Valleys are the peaks of the negated signal.
pub fn find_valleys(signal: &[f32], options: &PeakOptions) -> Vec<usize> {
    let inverted: Vec<f32> = signal.iter().map(|v| -v).collect();
    find_peaks(&inverted, options)
}
