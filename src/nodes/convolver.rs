use crate::kernel::MAX_KERNEL_SIZE;

/// Floats of history each channel keeps.
pub const DELAY_LEN: usize = 2 * MAX_KERNEL_SIZE;

/// Write position into a channel's delay line.
///
/// Every input is written twice, at `cursor` and `cursor + kernel_size`, so
/// the most recent `kernel_size` samples always sit contiguously in
/// `delay[cursor + 1..=cursor + kernel_size]` and the FIR never wraps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelState {
    cursor: usize,
}

impl ChannelState {
    pub fn reset(&mut self, delay: &mut [f32]) {
        delay.fill(0.0);
        self.cursor = 0;
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Writes `sample` and returns the window ending with it, oldest first.
    #[inline]
    pub fn push<'d>(&mut self, delay: &'d mut [f32], sample: f32, kernel_size: usize) -> &'d [f32] {
        let cursor = self.cursor;
        delay[cursor] = sample;
        delay[cursor + kernel_size] = sample;
        self.cursor = (cursor + 1) & (kernel_size - 1);
        &delay[cursor + 1..=cursor + kernel_size]
    }

    /// Re-lays out the history for a new kernel size.
    ///
    /// The newest `min(old, new - 1)` samples are kept so the next window
    /// of the new size continues the signal; anything older is zeroed.
    pub fn resize(&mut self, delay: &mut [f32], old_size: usize, new_size: usize) {
        if old_size == new_size {
            return;
        }
        // delay[cursor..cursor + old_size] is the last window, oldest first
        let kept = old_size.min(new_size - 1);
        let end = self.cursor + old_size;
        delay.copy_within(end - kept..end, new_size - kept);
        delay[..new_size - kept].fill(0.0);
        delay[new_size..].fill(0.0);
        self.cursor = 0;
    }
}
