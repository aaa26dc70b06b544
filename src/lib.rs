// src/lib.rs
pub mod config;
pub mod dsp;
pub mod recorder;
pub mod types;

pub use config::{ChannelLayout, PeakStages, PpgConfig};
pub use dsp::PpgError;
pub use recorder::{save_signal, VitalsRecorder};
pub use types::{ChannelReport, PpgFrame, VitalSigns};
