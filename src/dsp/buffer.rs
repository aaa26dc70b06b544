use std::collections::VecDeque;
use serde::{Deserialize, Serialize};
use crate::dsp::PpgError;
/// Element type a [`StreamingRingBuffer`] can hold.
///
/// `store` is the only place precision may be lost; `widen` must be exact.
pub trait SampleStorage: Copy + Default {
    fn store(value: f32) -> Self;
    fn widen(self) -> f32;
}
impl SampleStorage for f32 {
    fn store(value: f32) -> Self {
        value
    }
    fn widen(self) -> f32 {
        self
    }
}
/// Compact 16-bit storage. Rounds to nearest (ties away from zero) and
/// saturates at the `i16` range.
impl SampleStorage for i16 {
    fn store(value: f32) -> Self {
        value.round() as i16
    }
    fn widen(self) -> f32 {
        f32::from(self)
    }
}
/// Fixed-capacity FIFO of the most recent samples.
#[derive(Clone, Debug)]
pub struct StreamingRingBuffer<T: SampleStorage> {
    data: VecDeque<T>,
    capacity: usize,
}
impl<T: SampleStorage> StreamingRingBuffer<T> {
    pub fn with_capacity(capacity: usize) -> Result<Self, PpgError> {
        if capacity == 0 {
            return Err(PpgError::ZeroLength("buffer capacity"));
        }
        Ok(Self {
            data: VecDeque::with_capacity(capacity),
            capacity,
        })
    }
    pub fn capacity(&self) -> usize {
        self.capacity
    }
    pub fn push(&mut self, sample: f32) {
        if self.data.len() == self.capacity {
            self.data.pop_front();
        }
        self.data.push_back(T::store(sample));
    }
    /// Copies `[start, start + len)` (offset 0 = oldest retained sample),
    /// truncated to the samples actually held.
    pub fn window(&self, start: usize, len: usize) -> Vec<f32> {
        let start = start.min(self.data.len());
        let end = start.saturating_add(len).min(self.data.len());
        self.data.range(start..end).map(|s| s.widen()).collect()
    }
    /// The trailing `len` samples, or everything held if fewer.
    pub fn trailing(&self, len: usize) -> Vec<f32> {
        let start = self.data.len().saturating_sub(len);
        self.window(start, len)
    }
    pub fn to_vec(&self) -> Vec<f32> {
        self.data.iter().map(|s| s.widen()).collect()
    }
    pub fn len(&self) -> usize {
        self.data.len()
    }
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
    pub fn is_full(&self) -> bool {
        self.data.len() == self.capacity
    }
    pub fn clear(&mut self) {
        self.data.clear();
    }
    /// Most recent sample, `0.0` when empty.
    pub fn latest(&self) -> f32 {
        self.data.back().map(|s| s.widen()).unwrap_or(0.0)
    }
}
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageMode {
    Native,
    /// Halves the footprint; values are rounded to `i16` on push. The
    /// scheduler applies it to the filtered stream only.
    #[default]
    Compact,
}
/// Ring buffer whose representation is chosen at runtime.
#[derive(Clone, Debug)]
pub enum SampleBuffer {
    Native(StreamingRingBuffer<f32>),
    Compact(StreamingRingBuffer<i16>),
}
impl SampleBuffer {
    pub fn new(mode: StorageMode, capacity: usize) -> Result<Self, PpgError> {
        Ok(match mode {
            StorageMode::Native => Self::Native(StreamingRingBuffer::with_capacity(capacity)?),
            StorageMode::Compact => Self::Compact(StreamingRingBuffer::with_capacity(capacity)?),
        })
    }
    pub fn push(&mut self, sample: f32) {
        match self {
            Self::Native(buf) => buf.push(sample),
            Self::Compact(buf) => buf.push(sample),
        }
    }
    pub fn trailing(&self, len: usize) -> Vec<f32> {
        match self {
            Self::Native(buf) => buf.trailing(len),
            Self::Compact(buf) => buf.trailing(len),
        }
    }
    pub fn len(&self) -> usize {
        match self {
            Self::Native(buf) => buf.len(),
            Self::Compact(buf) => buf.len(),
        }
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    pub fn latest(&self) -> f32 {
        match self {
            Self::Native(buf) => buf.latest(),
            Self::Compact(buf) => buf.latest(),
        }
    }
    pub fn clear(&mut self) {
        match self {
            Self::Native(buf) => buf.clear(),
            Self::Compact(buf) => buf.clear(),
        }
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn keeps_last_capacity_samples_in_order() {
        let mut buf = StreamingRingBuffer::<f32>::with_capacity(4).unwrap();
        for v in 0..7 {
            buf.push(v as f32);
        }
        assert_eq!(buf.len(), 4);
        assert!(buf.is_full());
        assert_eq!(buf.to_vec(), vec![3.0, 4.0, 5.0, 6.0]);
        assert_eq!(buf.latest(), 6.0);
    }
    #[test]
    fn partially_filled_buffer_is_not_full() {
        let mut buf = StreamingRingBuffer::<f32>::with_capacity(4).unwrap();
        buf.push(1.0);
        assert_eq!(buf.len(), 1);
        assert!(!buf.is_full());
    }
    #[test]
    fn window_is_relative_to_oldest_and_truncated() {
        let mut buf = StreamingRingBuffer::<f32>::with_capacity(5).unwrap();
        for v in 10..16 {
            buf.push(v as f32);
        }
        // holds 11..=15
        assert_eq!(buf.window(1, 2), vec![12.0, 13.0]);
        assert_eq!(buf.window(3, 10), vec![14.0, 15.0]);
        assert!(buf.window(7, 2).is_empty());
        assert_eq!(buf.trailing(3), vec![13.0, 14.0, 15.0]);
        assert_eq!(buf.trailing(50).len(), 5);
    }
    #[test]
    fn empty_buffer_latest_is_zero() {
        let mut buf = StreamingRingBuffer::<i16>::with_capacity(3).unwrap();
        assert_eq!(buf.latest(), 0.0);
        buf.push(2.0);
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.latest(), 0.0);
    }
    #[test]
    fn compact_storage_rounds_once_on_push() {
        let mut buf = StreamingRingBuffer::<i16>::with_capacity(8).unwrap();
        for v in [1.4_f32, 1.5, -1.5, -2.6, 2.5, 40000.0, -40000.0] {
            buf.push(v);
        }
        assert_eq!(
            buf.to_vec(),
            vec![1.0, 2.0, -2.0, -3.0, 3.0, 32767.0, -32768.0]
        );
    }
    #[test]
    fn compact_error_is_bounded_by_half_unit() {
        let mut buf = SampleBuffer::new(StorageMode::Compact, 64).unwrap();
        let input: Vec<f32> = (0..64).map(|i| (i as f32 * 0.37).sin() * 300.0).collect();
        for &v in &input {
            buf.push(v);
        }
        for (stored, original) in buf.trailing(64).iter().zip(&input) {
            assert!((stored - original).abs() <= 0.5);
        }
    }
    #[test]
    fn zero_capacity_is_rejected() {
        assert!(StreamingRingBuffer::<f32>::with_capacity(0).is_err());
        assert!(SampleBuffer::new(StorageMode::Native, 0).is_err());
    }
}
