use std::fmt::{self, Write};
use std::mem::size_of;

use rustc_hash::FxHashMap;

use super::arena::{measure, NameArena};
use super::params::{
    ChannelPrefix, PageDescriptor, ParamDescriptor, ParameterInfo, Scaling, Span, Unit,
};
use super::{
    channel_param_id, ChannelParam, FIRST_OUTPUT_BUS, MAX_CHANNELS, NUM_BUSES, NUM_SHARED_PARAMS,
    PARAMS_PER_CHANNEL, PARAM_WAVETABLE,
};
use crate::audio::OutputMode;
use crate::error::LayoutError;
use crate::kernel::MAX_KERNEL_SIZE;
use crate::nodes::DELAY_LEN;
use crate::wavetable::WAVETABLE_BUFFER_SAMPLES;

const KERNEL_SIZE_LABELS: [&str; 4] = ["64", "128", "256", "512"];

const SHARED_PARAMS: [ParamDescriptor; NUM_SHARED_PARAMS] = [
    ParamDescriptor::shared("Wavetable", 0, 32767, 0, Unit::None, Scaling::None),
    ParamDescriptor::shared("Position", 0, 1000, 500, Unit::Percent, Scaling::Tenths),
    ParamDescriptor::shared("Spread", 0, 1000, 0, Unit::Percent, Scaling::Tenths),
    ParamDescriptor::shared("Depth", 0, 100, 50, Unit::Percent, Scaling::None),
    ParamDescriptor::choice("Kernel size", &KERNEL_SIZE_LABELS, 0),
    ParamDescriptor::shared("Gain", -240, 240, 0, Unit::Decibels, Scaling::Tenths),
    ParamDescriptor::shared("Saturation", 0, 100, 0, Unit::Percent, Scaling::None),
];

const TONE_PAGE: [u16; 5] = [0, 1, 2, 3, 4];
const OUTPUT_PAGE: [u16; 2] = [5, 6];
const NUM_PAGES: usize = 3;

/// Byte sizes of every region one instance needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryRequirements {
    pub param_bytes: usize,
    pub page_bytes: usize,
    pub page_index_bytes: usize,
    pub name_bytes: usize,
    pub working_memory_bytes: usize,
    pub kernel_exchange_bytes: usize,
    pub sample_buffer_bytes: usize,
}

impl MemoryRequirements {
    pub fn total_bytes(&self) -> usize {
        self.param_bytes
            + self.page_bytes
            + self.page_index_bytes
            + self.name_bytes
            + self.working_memory_bytes
            + self.kernel_exchange_bytes
            + self.sample_buffer_bytes
    }
}

fn write_channel_name(w: &mut dyn fmt::Write, channel: usize, param: ChannelParam) -> fmt::Result {
    let n = channel + 1;
    match param {
        ChannelParam::Input => write!(w, "Input {}", n),
        ChannelParam::Output => write!(w, "Output {}", n),
        ChannelParam::Mode => write!(w, "Out {} Mode", n),
    }
}

fn check_channels(num_channels: usize) -> Result<(), LayoutError> {
    if num_channels == 0 || num_channels > MAX_CHANNELS {
        return Err(LayoutError::InvalidChannelCount(num_channels));
    }
    Ok(())
}

fn num_page_indices(num_channels: usize) -> usize {
    TONE_PAGE.len() + OUTPUT_PAGE.len() + num_channels * PARAMS_PER_CHANNEL
}

pub fn size_requirements(num_channels: usize) -> Result<MemoryRequirements, LayoutError> {
    check_channels(num_channels)?;

    let num_params = NUM_SHARED_PARAMS + num_channels * PARAMS_PER_CHANNEL;
    let name_bytes = (0..num_channels)
        .flat_map(|ch| ChannelParam::ALL.map(|p| (ch, p)))
        .map(|(ch, p)| measure(|w| write_channel_name(w, ch, p)))
        .sum();

    let delay_floats = num_channels * DELAY_LEN;
    let bank_floats = num_channels * MAX_KERNEL_SIZE;

    Ok(MemoryRequirements {
        param_bytes: num_params * size_of::<ParamDescriptor>(),
        page_bytes: NUM_PAGES * size_of::<PageDescriptor>(),
        page_index_bytes: num_page_indices(num_channels) * size_of::<u16>(),
        name_bytes,
        working_memory_bytes: (delay_floats + 2 * bank_floats) * size_of::<f32>(),
        kernel_exchange_bytes: bank_floats * size_of::<f32>(),
        sample_buffer_bytes: WAVETABLE_BUFFER_SAMPLES * size_of::<i16>(),
    })
}

fn place_page(indices: &mut [u16], cursor: &mut usize, ids: impl IntoIterator<Item = u16>) -> Span {
    let start = *cursor;
    for id in ids {
        indices[*cursor] = id;
        *cursor += 1;
    }
    Span {
        start: start as u16,
        len: (*cursor - start) as u16,
    }
}

/// Parameter descriptors, pages and names placed inside host regions.
pub struct ParameterLayout {
    params: Box<[ParamDescriptor]>,
    pages: Box<[PageDescriptor]>,
    page_indices: Box<[u16]>,
    names: NameArena,
    num_params: usize,
    num_channels: usize,
}

impl ParameterLayout {
    /// Fills the given regions. They must already be checked against
    /// [`size_requirements`].
    pub(crate) fn build(
        mut params: Box<[ParamDescriptor]>,
        mut pages: Box<[PageDescriptor]>,
        mut page_indices: Box<[u16]>,
        names: Box<[u8]>,
        num_channels: usize,
    ) -> Result<Self, LayoutError> {
        check_channels(num_channels)?;
        let num_params = NUM_SHARED_PARAMS + num_channels * PARAMS_PER_CHANNEL;
        let num_indices = num_page_indices(num_channels);
        for (region, provided, required) in [
            ("params", params.len(), num_params),
            ("pages", pages.len(), NUM_PAGES),
            ("page_indices", page_indices.len(), num_indices),
        ] {
            if provided < required {
                return Err(LayoutError::RegionTooSmall {
                    region,
                    required,
                    provided,
                });
            }
        }

        let mut names = NameArena::new(names);

        params[..NUM_SHARED_PARAMS].copy_from_slice(&SHARED_PARAMS);
        for ch in 0..num_channels {
            for param in ChannelParam::ALL {
                let name = names.alloc_with(|w| write_channel_name(w, ch, param))?;
                let descriptor = match param {
                    ChannelParam::Input => ParamDescriptor {
                        name,
                        min: 1,
                        max: NUM_BUSES,
                        default: 1 + ch as i32,
                        unit: Unit::AudioInput,
                        ..Default::default()
                    },
                    ChannelParam::Output => ParamDescriptor {
                        name,
                        min: 1,
                        max: NUM_BUSES,
                        default: FIRST_OUTPUT_BUS + ch as i32,
                        unit: Unit::AudioOutput,
                        ..Default::default()
                    },
                    ChannelParam::Mode => ParamDescriptor {
                        name,
                        min: 0,
                        max: 1,
                        default: OutputMode::Add.index(),
                        unit: Unit::Enum,
                        labels: &OutputMode::LABELS,
                        ..Default::default()
                    },
                };
                params[channel_param_id(ch, param)] = ParamDescriptor {
                    channel: Some(ch as u8),
                    ..descriptor
                };
            }
        }

        let mut cursor = 0usize;
        let tone = place_page(&mut page_indices, &mut cursor, TONE_PAGE);
        let output = place_page(&mut page_indices, &mut cursor, OUTPUT_PAGE);
        let routing = place_page(
            &mut page_indices,
            &mut cursor,
            NUM_SHARED_PARAMS as u16..num_params as u16,
        );

        pages[0] = PageDescriptor {
            name: "Tone",
            params: tone,
        };
        pages[1] = PageDescriptor {
            name: "Output",
            params: output,
        };
        pages[2] = PageDescriptor {
            name: "Routing",
            params: routing,
        };

        Ok(Self {
            params,
            pages,
            page_indices,
            names,
            num_params,
            num_channels,
        })
    }

    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    pub fn num_params(&self) -> usize {
        self.num_params
    }

    pub fn descriptors(&self) -> &[ParamDescriptor] {
        &self.params[..self.num_params]
    }

    pub fn descriptor(&self, id: usize) -> Option<&ParamDescriptor> {
        self.descriptors().get(id)
    }

    pub fn name(&self, id: usize) -> Option<&str> {
        self.descriptor(id).map(|d| self.names.resolve(d.name))
    }

    pub fn pages(&self) -> &[PageDescriptor] {
        &self.pages[..NUM_PAGES]
    }

    pub fn page_params(&self, page: &PageDescriptor) -> &[u16] {
        &self.page_indices[page.params.range()]
    }

    pub fn page_of(&self, id: usize) -> Option<&'static str> {
        self.pages()
            .iter()
            .find(|page| self.page_params(page).contains(&(id as u16)))
            .map(|page| page.name)
    }

    /// Display prefix for per-channel parameters, e.g. `"3:"`.
    pub fn ui_prefix(&self, id: usize) -> Option<ChannelPrefix> {
        self.descriptor(id)?.channel.map(ChannelPrefix)
    }

    /// Bytes of the name region actually written.
    pub fn name_bytes_used(&self) -> usize {
        self.names.used()
    }

    /// Narrows the wavetable selector to the tables a source offers.
    pub(crate) fn set_wavetable_count(&mut self, count: usize) {
        let max = count.saturating_sub(1).min(i32::MAX as usize) as i32;
        self.params[PARAM_WAVETABLE].max = max;
    }

    pub fn describe(&self) -> Vec<ParameterInfo> {
        self.descriptors()
            .iter()
            .enumerate()
            .map(|(id, d)| ParameterInfo {
                id,
                name: self.names.resolve(d.name).to_string(),
                min: d.min,
                max: d.max,
                default: d.default,
                unit: d.unit,
                scaling: d.scaling,
                labels: d.labels,
                page: self.page_of(id),
                ui_prefix: self.ui_prefix(id).map(|p| p.to_string()),
            })
            .collect()
    }

    pub fn index_by_name(&self) -> FxHashMap<String, usize> {
        self.descriptors()
            .iter()
            .enumerate()
            .map(|(id, d)| (self.names.resolve(d.name).to_string(), id))
            .collect()
    }
}
