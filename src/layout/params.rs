use std::fmt;

use serde::Serialize;

/// Display unit hint for the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Unit {
    #[default]
    None,
    Percent,
    Decibels,
    AudioInput,
    AudioOutput,
    Enum,
}

/// Decimal scaling of the stored integer for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Scaling {
    #[default]
    None,
    /// Stored value is ten times the displayed one.
    Tenths,
}

/// A parameter name: either a literal or a slice of the name arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameRef {
    Static(&'static str),
    Arena { offset: u32, len: u16 },
}

impl Default for NameRef {
    fn default() -> Self {
        NameRef::Static("")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ParamDescriptor {
    pub name: NameRef,
    pub min: i32,
    pub max: i32,
    pub default: i32,
    pub unit: Unit,
    pub scaling: Scaling,
    pub labels: &'static [&'static str],
    /// Owning channel of per-channel parameters.
    pub channel: Option<u8>,
}

impl ParamDescriptor {
    pub const fn shared(
        name: &'static str,
        min: i32,
        max: i32,
        default: i32,
        unit: Unit,
        scaling: Scaling,
    ) -> Self {
        Self {
            name: NameRef::Static(name),
            min,
            max,
            default,
            unit,
            scaling,
            labels: &[],
            channel: None,
        }
    }

    pub const fn choice(name: &'static str, labels: &'static [&'static str], default: i32) -> Self {
        Self {
            name: NameRef::Static(name),
            min: 0,
            max: labels.len() as i32 - 1,
            default,
            unit: Unit::Enum,
            scaling: Scaling::None,
            labels,
            channel: None,
        }
    }

    pub fn clamp(&self, value: i32) -> i32 {
        value.clamp(self.min, self.max)
    }
}

/// Contiguous run inside the page index region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: u16,
    pub len: u16,
}

impl Span {
    pub fn range(&self) -> std::ops::Range<usize> {
        let start = self.start as usize;
        start..start + self.len as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageDescriptor {
    pub name: &'static str,
    pub params: Span,
}

/// `"N:"` display prefix of a per-channel parameter, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelPrefix(pub u8);

impl fmt::Display for ChannelPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.0 as usize + 1)
    }
}

/// Resolved parameter record for hosts and tooling.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterInfo {
    pub id: usize,
    pub name: String,
    pub min: i32,
    pub max: i32,
    pub default: i32,
    pub unit: Unit,
    pub scaling: Scaling,
    pub labels: &'static [&'static str],
    pub page: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ui_prefix: Option<String>,
}
