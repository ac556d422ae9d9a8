//! Static parameter and memory layout.
//!
//! Sizing is a pure pass over the channel count. The host allocates the
//! regions once, and construction only places data inside them.

mod arena;
mod builder;
mod params;

pub use arena::{MemoryRegions, NameArena};
pub use builder::{size_requirements, MemoryRequirements, ParameterLayout};
pub use params::{
    ChannelPrefix, NameRef, PageDescriptor, ParamDescriptor, ParameterInfo, Scaling, Span, Unit,
};

pub const MAX_CHANNELS: usize = 12;
/// Host buses, numbered from 1.
pub const NUM_BUSES: i32 = 28;

pub const PARAM_WAVETABLE: usize = 0;
pub const PARAM_POSITION: usize = 1;
pub const PARAM_SPREAD: usize = 2;
pub const PARAM_DEPTH: usize = 3;
pub const PARAM_KERNEL_SIZE: usize = 4;
pub const PARAM_GAIN: usize = 5;
pub const PARAM_SATURATION: usize = 6;
pub const NUM_SHARED_PARAMS: usize = 7;

pub const PARAMS_PER_CHANNEL: usize = 3;
pub const MAX_PARAMS: usize = NUM_SHARED_PARAMS + MAX_CHANNELS * PARAMS_PER_CHANNEL;

/// Default output bus of channel 0; later channels follow on.
pub const FIRST_OUTPUT_BUS: i32 = 13;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelParam {
    Input = 0,
    Output = 1,
    Mode = 2,
}

impl ChannelParam {
    pub const ALL: [ChannelParam; PARAMS_PER_CHANNEL] =
        [ChannelParam::Input, ChannelParam::Output, ChannelParam::Mode];
}

/// What a parameter id addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamTarget {
    Wavetable,
    Position,
    Spread,
    Depth,
    KernelSize,
    Gain,
    Saturation,
    Channel(usize, ChannelParam),
}

pub fn channel_param_id(channel: usize, param: ChannelParam) -> usize {
    NUM_SHARED_PARAMS + channel * PARAMS_PER_CHANNEL + param as usize
}

/// Decodes `id` for a layout with `num_channels` channels.
pub fn param_target(id: usize, num_channels: usize) -> Option<ParamTarget> {
    let target = match id {
        PARAM_WAVETABLE => ParamTarget::Wavetable,
        PARAM_POSITION => ParamTarget::Position,
        PARAM_SPREAD => ParamTarget::Spread,
        PARAM_DEPTH => ParamTarget::Depth,
        PARAM_KERNEL_SIZE => ParamTarget::KernelSize,
        PARAM_GAIN => ParamTarget::Gain,
        PARAM_SATURATION => ParamTarget::Saturation,
        _ => {
            let rel = id - NUM_SHARED_PARAMS;
            let channel = rel / PARAMS_PER_CHANNEL;
            if channel >= num_channels {
                return None;
            }
            ParamTarget::Channel(channel, ChannelParam::ALL[rel % PARAMS_PER_CHANNEL])
        }
    };
    Some(target)
}
