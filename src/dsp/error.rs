use thiserror::Error;
#[derive(Debug, Error)]
pub enum PpgError {
    #[error("sample rate must be greater than zero")]
    InvalidSampleRate,
    #[error("filter order must be at least 1")]
    InvalidFilterOrder,
    #[error("band edges {low_hz} Hz .. {high_hz} Hz must satisfy 0 < low < high < {nyquist_hz} Hz")]
    InvalidBand {
        low_hz: f64,
        high_hz: f64,
        nyquist_hz: f64,
    },
    #[error("buffer capacity {capacity} is smaller than the analysis window {window}")]
    CapacityTooSmall { capacity: usize, window: usize },
    #[error("{0} must be greater than zero")]
    ZeroLength(&'static str),
    #[error("channel count mismatch: expected {expected}, got {actual}")]
    ChannelMismatch { expected: usize, actual: usize },
    #[error("warm-up source is empty; feed at least one frame first")]
    EmptyWarmupSource,
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration file: {0}")]
    Config(#[from] serde_json::Error),
}
