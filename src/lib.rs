//! Wavetable-driven FIR convolution effect.
//!
//! Each channel is convolved with a kernel read out of a wavetable at a
//! chosen position. Switching tables crossfades between the old and new
//! kernels, while the audio thread never blocks on the control thread.

pub mod audio;
pub mod audio_engine;
pub mod config;
pub mod error;
pub mod kernel;
pub mod layout;
pub mod nodes;
pub mod utils;
pub mod wavetable;

pub use audio_engine::{build, construct, Controller, LoadStatus, Processor};
pub use config::EngineConfig;
pub use error::{ConfigError, LayoutError, LoadError};
pub use layout::{size_requirements, MemoryRegions, MemoryRequirements};
pub use wavetable::{MemorySource, WavDirectorySource, WavetableSource};
