use super::WAVETABLE_BUFFER_SAMPLES;

/// What the last load put into a [`WaveTableBuffer`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WavetableInfo {
    pub num_waves: usize,
    pub using_mipmaps: bool,
}

impl WavetableInfo {
    /// Whether kernels can be read from the table.
    pub fn is_usable(&self) -> bool {
        self.using_mipmaps && self.num_waves > 0
    }
}

/// Flat multi-resolution wavetable storage.
///
/// The buffer is handed to the loader by value and comes back with the
/// completion, so it never has two owners while a load is writing it.
pub struct WaveTableBuffer {
    samples: Box<[i16]>,
    info: WavetableInfo,
}

impl WaveTableBuffer {
    pub fn new(samples: Box<[i16]>) -> Self {
        Self {
            samples,
            info: WavetableInfo::default(),
        }
    }

    /// Allocates a zeroed buffer of the default capacity.
    pub fn zeroed() -> Self {
        Self::new(vec![0; WAVETABLE_BUFFER_SAMPLES].into_boxed_slice())
    }

    pub fn capacity(&self) -> usize {
        self.samples.len()
    }

    pub fn info(&self) -> WavetableInfo {
        self.info
    }

    pub fn num_waves(&self) -> usize {
        self.info.num_waves
    }

    pub(crate) fn set_info(&mut self, info: WavetableInfo) {
        self.info = info;
    }

    /// Zeroes the samples and forgets the previous table.
    pub fn clear(&mut self) {
        self.samples.fill(0);
        self.info = WavetableInfo::default();
    }

    /// Snapshot `wave` of the level whose snapshots are `size` samples long.
    pub fn snapshot(&self, size: usize, wave: usize) -> Option<&[i16]> {
        let start = snapshot_offset(size, self.info.num_waves, wave)?;
        self.samples.get(start..start + size)
    }

    pub(crate) fn snapshot_mut(
        &mut self,
        size: usize,
        num_waves: usize,
        wave: usize,
    ) -> Option<&mut [i16]> {
        let start = snapshot_offset(size, num_waves, wave)?;
        self.samples.get_mut(start..start + size)
    }
}

fn snapshot_offset(size: usize, num_waves: usize, wave: usize) -> Option<usize> {
    if wave >= num_waves {
        return None;
    }
    Some(size * (num_waves + wave))
}
