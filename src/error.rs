use std::path::PathBuf;

use thiserror::Error;

/// Failures while sizing or placing the static layout.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("channel count {0} is outside 1..={max}", max = crate::layout::MAX_CHANNELS)]
    InvalidChannelCount(usize),
    #[error("{region} region holds {provided} bytes, {required} required")]
    RegionTooSmall {
        region: &'static str,
        required: usize,
        provided: usize,
    },
}

/// Failures while reading a wavetable into the shared buffer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("wav decode failed: {0}")]
    Wav(#[from] hound::Error),
    #[error("unsupported wav format: {bits} bits, {format:?}")]
    UnsupportedFormat {
        bits: u16,
        format: hound::SampleFormat,
    },
    #[error("wavetable contains no complete waves")]
    Empty,
    #[error("{0} waves do not fit the wavetable buffer (max {max})", max = crate::wavetable::MAX_WAVES)]
    TooManyWaves(usize),
    #[error("wavetable index {index} out of range ({count} available)")]
    IndexOutOfRange { index: usize, count: usize },
    #[error("load worker is not running")]
    WorkerStopped,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}
