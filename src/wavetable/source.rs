use std::fs;
use std::path::{Path, PathBuf};

use dasp_sample::Sample;

use super::{write_mipmaps, WaveTableBuffer, WavetableInfo};
use crate::error::LoadError;

/// Samples per wave when a source does not say otherwise.
pub const DEFAULT_FRAME_SIZE: usize = 2048;

/// Storage that can fill the shared buffer with wavetable `index`.
///
/// `load` runs on the loader thread and may block on I/O.
pub trait WavetableSource: Send {
    fn count(&self) -> usize;

    fn name(&self, index: usize) -> Option<&str>;

    fn load(&self, index: usize, buffer: &mut WaveTableBuffer) -> Result<WavetableInfo, LoadError>;
}

/// Wavetables held in memory as lists of single-cycle frames.
#[derive(Default)]
pub struct MemorySource {
    tables: Vec<(String, Vec<Vec<f32>>)>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, name: impl Into<String>, frames: Vec<Vec<f32>>) -> Self {
        self.push(name, frames);
        self
    }

    pub fn push(&mut self, name: impl Into<String>, frames: Vec<Vec<f32>>) {
        self.tables.push((name.into(), frames));
    }
}

impl WavetableSource for MemorySource {
    fn count(&self) -> usize {
        self.tables.len()
    }

    fn name(&self, index: usize) -> Option<&str> {
        self.tables.get(index).map(|(name, _)| name.as_str())
    }

    fn load(&self, index: usize, buffer: &mut WaveTableBuffer) -> Result<WavetableInfo, LoadError> {
        let (_, frames) = self.tables.get(index).ok_or(LoadError::IndexOutOfRange {
            index,
            count: self.tables.len(),
        })?;
        write_mipmaps(frames, buffer)
    }
}

/// A directory of `.wav` files, each holding consecutive single-cycle waves.
pub struct WavDirectorySource {
    entries: Vec<(String, PathBuf)>,
    frame_size: usize,
}

impl WavDirectorySource {
    /// Lists the `.wav` files in `dir`, sorted by file name.
    pub fn scan(dir: impl AsRef<Path>, frame_size: usize) -> Result<Self, LoadError> {
        let dir = dir.as_ref();
        let read_dir = fs::read_dir(dir).map_err(|source| LoadError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut entries = Vec::new();
        for entry in read_dir {
            let path = entry
                .map_err(|source| LoadError::Io {
                    path: dir.to_path_buf(),
                    source,
                })?
                .path();
            let is_wav = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"));
            if !is_wav {
                continue;
            }
            let name = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default();
            entries.push((name, path));
        }
        entries.sort_by(|a, b| a.1.cmp(&b.1));

        log::info!(
            "found {} wavetables in {} (frame size {})",
            entries.len(),
            dir.display(),
            frame_size
        );

        Ok(Self {
            entries,
            frame_size: frame_size.max(1),
        })
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Reads a wav file, mixes it to mono and splits it into whole frames.
    pub fn read_frames(path: &Path, frame_size: usize) -> Result<Vec<Vec<f32>>, LoadError> {
        let mut reader = hound::WavReader::open(path)?;
        let spec = reader.spec();
        let channels = spec.channels.max(1) as usize;

        let interleaved: Vec<f32> = match (spec.bits_per_sample, spec.sample_format) {
            (32, hound::SampleFormat::Float) => reader.samples::<f32>().collect::<Result<_, _>>()?,
            (16, hound::SampleFormat::Int) => reader
                .samples::<i16>()
                .map(|s| s.map(|v| v.to_sample::<f32>()))
                .collect::<Result<_, _>>()?,
            (24, hound::SampleFormat::Int) => reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / 8_388_608.0))
                .collect::<Result<_, _>>()?,
            (32, hound::SampleFormat::Int) => reader
                .samples::<i32>()
                .map(|s| s.map(|v| v.to_sample::<f32>()))
                .collect::<Result<_, _>>()?,
            (bits, format) => return Err(LoadError::UnsupportedFormat { bits, format }),
        };

        let mono: Vec<f32> = if channels == 1 {
            interleaved
        } else {
            interleaved
                .chunks_exact(channels)
                .map(|frame| frame.iter().sum::<f32>() / channels as f32)
                .collect()
        };

        let frames: Vec<Vec<f32>> = mono
            .chunks_exact(frame_size)
            .map(|chunk| chunk.to_vec())
            .collect();
        if frames.is_empty() {
            return Err(LoadError::Empty);
        }
        Ok(frames)
    }
}

impl WavetableSource for WavDirectorySource {
    fn count(&self) -> usize {
        self.entries.len()
    }

    fn name(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(|(name, _)| name.as_str())
    }

    fn load(&self, index: usize, buffer: &mut WaveTableBuffer) -> Result<WavetableInfo, LoadError> {
        let (name, path) = self.entries.get(index).ok_or(LoadError::IndexOutOfRange {
            index,
            count: self.entries.len(),
        })?;
        let frames = Self::read_frames(path, self.frame_size)?;
        log::debug!("{}: {} waves of {} samples", name, frames.len(), self.frame_size);
        write_mipmaps(&frames, buffer)
    }
}
