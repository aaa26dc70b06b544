// src/dsp/mod.rs
pub mod buffer;
pub mod error;
pub mod filter;
pub mod offline;
pub mod peaks;
pub mod pipeline;
pub mod source;
pub mod stats;
pub mod vitals;
pub use buffer::{SampleBuffer, SampleStorage, StorageMode, StreamingRingBuffer};
pub use error::PpgError;
pub use filter::{
    filter_oneway, filtfilt, BandpassDesign, Butterworth, CausalBandpassFilter, FilterPhase,
    FilterState,
};
pub use offline::{analyze_recording, ChannelSummary, FilterMode, RecordingReport};
pub use peaks::{
    compute_prominence, filter_by_distance, filter_by_height, filter_by_prominence,
    find_local_maxima, find_peaks, find_peaks_with_properties, find_valleys, PeakOptions, PeakSet,
    Prominence,
};
pub use pipeline::{analyze_window, ChannelAnalysis, StreamingSession, WindowedAnalysisScheduler};
pub use source::{
    read_signal, ManualSource, SampleSource, SyntheticChannel, SyntheticSource, TextFileSource,
};
pub use stats::SignalStats;
pub use vitals::{
    ac_component, dc_component, heart_rate, heart_rate_from_intervals, spo2_dual_channel,
    spo2_single_channel, AcDc, AcMethod, EstimateError, HeartRate, Spo2Estimate,
};
