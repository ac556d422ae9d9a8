use std::fs;
use std::path::Path;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::wavetable::DEFAULT_FRAME_SIZE;

pub const DEFAULT_SAMPLE_RATE: f32 = 48_000.0;
pub const DEFAULT_CROSSFADE_MS: f32 = 50.0;
pub const DEFAULT_BLOCK_SIZE: usize = 128;

/// Engine settings, usually read from a JSON file.
///
/// Missing fields keep their defaults. `parameters` sets initial values by
/// parameter name, e.g. `{"Position": 250, "Out 1 Mode": 1}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub sample_rate: f32,
    pub crossfade_ms: f32,
    /// Samples per wave when reading wavetable files.
    pub frame_size: usize,
    pub block_size: usize,
    pub parameters: FxHashMap<String, i32>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            crossfade_ms: DEFAULT_CROSSFADE_MS,
            frame_size: DEFAULT_FRAME_SIZE,
            block_size: DEFAULT_BLOCK_SIZE,
            parameters: FxHashMap::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }
}
