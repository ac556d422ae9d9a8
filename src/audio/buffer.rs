/// How a channel writes into its output bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Sum into whatever the bus already holds.
    #[default]
    Add,
    /// Overwrite the bus.
    Replace,
}

impl OutputMode {
    pub const LABELS: [&'static str; 2] = ["Add", "Replace"];

    pub fn from_index(index: i32) -> Self {
        if index == 1 {
            OutputMode::Replace
        } else {
            OutputMode::Add
        }
    }

    pub fn index(self) -> i32 {
        match self {
            OutputMode::Add => 0,
            OutputMode::Replace => 1,
        }
    }
}

/// One channel's resolved routing for a block, as 0-based bus indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelRoute {
    pub input: usize,
    pub output: usize,
    pub mode: OutputMode,
    /// False when either bus lies outside the buffer handed to this block.
    pub active: bool,
}

impl ChannelRoute {
    /// Resolves 1-based bus numbers against `num_buses` available buses.
    pub fn resolve(input_bus: i32, output_bus: i32, mode: OutputMode, num_buses: usize) -> Self {
        let to_index = |bus: i32| -> Option<usize> {
            let index = usize::try_from(bus).ok()?.checked_sub(1)?;
            (index < num_buses).then_some(index)
        };
        match (to_index(input_bus), to_index(output_bus)) {
            (Some(input), Some(output)) => Self {
                input,
                output,
                mode,
                active: true,
            },
            _ => Self::default(),
        }
    }
}

/// Bus-major view over the host's block: bus `b` (0-based) occupies
/// `data[b * frames..(b + 1) * frames]`.
///
/// Reads and writes go through indices so a channel may read and write the
/// same bus within one sample.
pub struct BusBuffer<'a> {
    data: &'a mut [f32],
    frames: usize,
}

impl<'a> BusBuffer<'a> {
    pub fn new(data: &'a mut [f32], frames: usize) -> Self {
        Self { data, frames }
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Complete buses present; a trailing partial bus is ignored.
    pub fn num_buses(&self) -> usize {
        if self.frames == 0 {
            0
        } else {
            self.data.len() / self.frames
        }
    }

    #[inline]
    pub fn read(&self, bus: usize, frame: usize) -> f32 {
        self.data[bus * self.frames + frame]
    }

    #[inline]
    pub fn write(&mut self, bus: usize, frame: usize, value: f32, mode: OutputMode) {
        let slot = &mut self.data[bus * self.frames + frame];
        match mode {
            OutputMode::Add => *slot += value,
            OutputMode::Replace => *slot = value,
        }
    }

    pub fn bus(&self, bus: usize) -> &[f32] {
        &self.data[bus * self.frames..(bus + 1) * self.frames]
    }
}
