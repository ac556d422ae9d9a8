//! Wavetable storage shared between the load subsystem and the kernel builder.
//!
//! A loaded table lives in one flat `i16` buffer holding several resolution
//! levels. The level of size `s` stores `num_waves` consecutive snapshots of
//! `s` samples starting at sample offset `s * num_waves`, so every shorter
//! level sits in front of it.

mod buffer;
mod loader;
mod mipmap;
mod source;

pub use buffer::{WaveTableBuffer, WavetableInfo};
pub use loader::{LoadCompletion, LoadWorker};
pub use mipmap::write_mipmaps;
pub use source::{MemorySource, WavDirectorySource, WavetableSource, DEFAULT_FRAME_SIZE};

/// Total `i16` capacity of the shared wavetable buffer.
pub const WAVETABLE_BUFFER_SAMPLES: usize = 256 * 2048;

/// Resolution levels written for every wave, ascending.
pub const MIP_LEVELS: [usize; 4] = [64, 128, 256, 512];

pub const MAX_LEVEL_SIZE: usize = 512;

/// Largest wave count whose top level still fits the buffer.
pub const MAX_WAVES: usize = WAVETABLE_BUFFER_SAMPLES / (2 * MAX_LEVEL_SIZE);
