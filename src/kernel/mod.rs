//! FIR kernels read out of the wavetable, and the slot that carries them to
//! the audio thread.

mod builder;
mod mailbox;

pub use builder::{build_all_kernels, build_kernel, kernel_slot, KernelEnergy};
pub use mailbox::{KernelHeader, KernelMailbox, UpdateKind};

use crate::wavetable::MIP_LEVELS;

/// Selectable kernel lengths; each matches a wavetable resolution level.
pub const KERNEL_SIZES: [usize; 4] = MIP_LEVELS;

pub const MAX_KERNEL_SIZE: usize = 512;

/// Kernel length for a kernel-size parameter value, clamped to the valid range.
pub fn kernel_size_for_index(index: i32) -> usize {
    let index = index.clamp(0, KERNEL_SIZES.len() as i32 - 1) as usize;
    KERNEL_SIZES[index]
}
