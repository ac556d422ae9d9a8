use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};

use crate::audio::{ChannelRoute, OutputMode};
use crate::layout::{ChannelParam, FIRST_OUTPUT_BUS, MAX_CHANNELS};
use crate::nodes::SoftClip;

/// `f32` stored as its bit pattern.
#[derive(Debug)]
pub struct AtomicF32(AtomicU32);

impl AtomicF32 {
    pub fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    #[inline]
    pub fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

#[derive(Debug)]
struct RouteCell {
    input: AtomicU8,
    output: AtomicU8,
    mode: AtomicU8,
}

impl RouteCell {
    fn new(channel: usize) -> Self {
        Self {
            input: AtomicU8::new(1 + channel as u8),
            output: AtomicU8::new(FIRST_OUTPUT_BUS as u8 + channel as u8),
            mode: AtomicU8::new(OutputMode::Add.index() as u8),
        }
    }
}

/// Mix settings the processor reads once per block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockParams {
    pub depth: f32,
    pub gain: f32,
    pub clip: Option<SoftClip>,
}

/// Scalars written by the controller and read by the processor.
///
/// Each cell is independent, so Relaxed ordering is enough: a block may
/// see a new depth with an old gain, never a half-written value.
#[derive(Debug)]
pub struct SharedParams {
    depth: AtomicF32,
    gain: AtomicF32,
    saturation: AtomicF32,
    routes: [RouteCell; MAX_CHANNELS],
}

impl Default for SharedParams {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedParams {
    pub fn new() -> Self {
        Self {
            depth: AtomicF32::new(0.5),
            gain: AtomicF32::new(1.0),
            saturation: AtomicF32::new(0.0),
            routes: std::array::from_fn(RouteCell::new),
        }
    }

    pub fn set_depth(&self, depth: f32) {
        self.depth.store(depth);
    }

    pub fn set_gain(&self, gain: f32) {
        self.gain.store(gain);
    }

    pub fn set_saturation(&self, saturation: f32) {
        self.saturation.store(saturation);
    }

    /// Stores one routing value; bus numbers are 1-based.
    pub fn set_route(&self, channel: usize, param: ChannelParam, value: i32) {
        let Some(cell) = self.routes.get(channel) else {
            return;
        };
        let value = value.clamp(0, u8::MAX as i32) as u8;
        let target = match param {
            ChannelParam::Input => &cell.input,
            ChannelParam::Output => &cell.output,
            ChannelParam::Mode => &cell.mode,
        };
        target.store(value, Ordering::Relaxed);
    }

    pub fn block_params(&self) -> BlockParams {
        BlockParams {
            depth: self.depth.load(),
            gain: self.gain.load(),
            clip: SoftClip::new(self.saturation.load()),
        }
    }

    /// Routing of `channel` resolved against the buses of this block.
    pub fn route(&self, channel: usize, num_buses: usize) -> ChannelRoute {
        let cell = &self.routes[channel];
        ChannelRoute::resolve(
            cell.input.load(Ordering::Relaxed) as i32,
            cell.output.load(Ordering::Relaxed) as i32,
            OutputMode::from_index(cell.mode.load(Ordering::Relaxed) as i32),
            num_buses,
        )
    }
}
