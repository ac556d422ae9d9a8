//! The effect instance, split between the control thread and the audio
//! thread.
//!
//! [`construct`] places everything inside host-allocated regions and returns
//! the two halves. They share only the kernel mailbox and a handful of
//! atomic scalars.

mod controller;
mod processor;
mod shared;

#[cfg(test)]
mod tests;

use std::sync::Arc;

pub use controller::{Controller, LoadStatus};
pub use processor::Processor;
pub use shared::{AtomicF32, BlockParams, SharedParams};

use crate::config::EngineConfig;
use crate::error::LayoutError;
use crate::kernel::KernelMailbox;
use crate::layout::{size_requirements, MemoryRegions, ParameterLayout};
use crate::wavetable::WaveTableBuffer;

pub fn construct(
    regions: MemoryRegions,
    num_channels: usize,
    config: &EngineConfig,
) -> Result<(Controller, Processor), LayoutError> {
    let req = size_requirements(num_channels)?;
    regions.check(&req)?;

    let MemoryRegions {
        params,
        pages,
        page_indices,
        names,
        working,
        exchange,
        samples,
    } = regions;

    let layout = ParameterLayout::build(params, pages, page_indices, names, num_channels)?;
    let mailbox = Arc::new(KernelMailbox::new(exchange));
    let shared = Arc::new(SharedParams::new());

    let processor = Processor::new(
        working,
        num_channels,
        config,
        Arc::clone(&mailbox),
        Arc::clone(&shared),
    );
    let mut controller = Controller::new(layout, WaveTableBuffer::new(samples), mailbox, shared);
    controller.apply_config(config);

    log::debug!(
        "constructed {} channel instance ({} bytes)",
        num_channels,
        req.total_bytes()
    );
    Ok((controller, processor))
}

/// Sizes, allocates and constructs in one step.
pub fn build(num_channels: usize, config: &EngineConfig) -> Result<(Controller, Processor), LayoutError> {
    let req = size_requirements(num_channels)?;
    construct(MemoryRegions::allocate(&req), num_channels, config)
}
