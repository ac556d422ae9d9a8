use dasp_sample::Sample;

use super::MAX_KERNEL_SIZE;
use crate::utils::{l1_norm, scale_buffer};
use crate::wavetable::WaveTableBuffer;

/// Kernels whose absolute sum stays at or below this are left unnormalized.
const SILENCE_THRESHOLD: f32 = 1e-3;
/// Spreads below this build one kernel for every channel.
const SPREAD_THRESHOLD: f32 = 1e-3;
/// Keeps the interpolation offset strictly below the last wave.
const OFFSET_MARGIN: f32 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelEnergy {
    /// Scaled so the absolute taps sum to one.
    Normalized,
    /// Too quiet to normalize; taps left as interpolated.
    Silent,
}

/// Fills `out` with the waveform at `position` (0..1) across the table.
///
/// The kernel length is `out.len()` and must be one of the table's levels.
/// Adjacent waves are linearly interpolated, then the result is scaled to
/// unity absolute sum so sweeping the position does not change loudness.
pub fn build_kernel(table: &WaveTableBuffer, position: f32, out: &mut [f32]) -> KernelEnergy {
    let num_waves = table.num_waves();
    if num_waves == 0 {
        out.fill(0.0);
        return KernelEnergy::Silent;
    }

    let position = position.clamp(0.0, 1.0);
    let last = (num_waves - 1) as f32;
    let offset = (position * last).min(last - OFFSET_MARGIN).max(0.0);

    let wave0 = offset as usize;
    let wave1 = (wave0 + 1).min(num_waves - 1);
    let frac = offset - wave0 as f32;

    let size = out.len();
    let (Some(snap0), Some(snap1)) = (table.snapshot(size, wave0), table.snapshot(size, wave1))
    else {
        out.fill(0.0);
        return KernelEnergy::Silent;
    };

    for ((tap, &s0), &s1) in out.iter_mut().zip(snap0).zip(snap1) {
        let v0 = s0.to_sample::<f32>();
        let v1 = s1.to_sample::<f32>();
        *tap = v0 + frac * (v1 - v0);
    }

    let sum = l1_norm(out);
    if sum > SILENCE_THRESHOLD {
        scale_buffer(out, 1.0 / sum);
        KernelEnergy::Normalized
    } else {
        KernelEnergy::Silent
    }
}

/// Builds one kernel per channel into `bank`, a run of
/// [`MAX_KERNEL_SIZE`]-strided slots.
///
/// Channels are spread symmetrically around `position`: channel 0 sits at
/// `position - spread / 2`, the last channel at `position + spread / 2`.
pub fn build_all_kernels(
    table: &WaveTableBuffer,
    position: f32,
    spread: f32,
    num_channels: usize,
    kernel_size: usize,
    bank: &mut [f32],
) {
    if num_channels == 0 {
        return;
    }
    debug_assert!(bank.len() >= num_channels * MAX_KERNEL_SIZE);

    if spread < SPREAD_THRESHOLD || num_channels == 1 {
        build_kernel(table, position, &mut bank[..kernel_size]);
        for ch in 1..num_channels {
            bank.copy_within(0..kernel_size, ch * MAX_KERNEL_SIZE);
        }
        return;
    }

    let last = (num_channels - 1) as f32;
    for ch in 0..num_channels {
        let ch_offset = spread * (ch as f32 / last - 0.5);
        let start = ch * MAX_KERNEL_SIZE;
        build_kernel(table, position + ch_offset, &mut bank[start..start + kernel_size]);
    }
}

/// The kernel of `channel` inside a strided bank.
#[inline]
pub fn kernel_slot(bank: &[f32], channel: usize, kernel_size: usize) -> &[f32] {
    let start = channel * MAX_KERNEL_SIZE;
    &bank[start..start + kernel_size]
}
