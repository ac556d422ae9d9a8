use std::fmt;
use std::mem::size_of;

use super::builder::MemoryRequirements;
use super::params::{NameRef, PageDescriptor, ParamDescriptor};
use crate::error::LayoutError;

/// Bump allocator for generated parameter names.
pub struct NameArena {
    bytes: Box<[u8]>,
    used: usize,
}

impl NameArena {
    pub fn new(bytes: Box<[u8]>) -> Self {
        Self { bytes, used: 0 }
    }

    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    pub fn used(&self) -> usize {
        self.used
    }

    /// Writes one name through `write` and returns where it landed.
    pub fn alloc_with<F>(&mut self, write: F) -> Result<NameRef, LayoutError>
    where
        F: Fn(&mut dyn fmt::Write) -> fmt::Result,
    {
        let start = self.used;
        if write(&mut *self as &mut dyn fmt::Write).is_err() {
            self.used = start;
            return Err(LayoutError::RegionTooSmall {
                region: "names",
                required: start + measure(write),
                provided: self.bytes.len(),
            });
        }
        Ok(NameRef::Arena {
            offset: start as u32,
            len: (self.used - start) as u16,
        })
    }

    pub fn resolve(&self, name: NameRef) -> &str {
        match name {
            NameRef::Static(s) => s,
            NameRef::Arena { offset, len } => {
                let start = offset as usize;
                self.bytes
                    .get(start..start + len as usize)
                    .and_then(|b| std::str::from_utf8(b).ok())
                    .unwrap_or("")
            }
        }
    }
}

impl fmt::Write for NameArena {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let end = self.used + s.len();
        let dst = self.bytes.get_mut(self.used..end).ok_or(fmt::Error)?;
        dst.copy_from_slice(s.as_bytes());
        self.used = end;
        Ok(())
    }
}

/// Counts formatted bytes without storing them.
#[derive(Default)]
pub(super) struct LenCounter(pub usize);

impl fmt::Write for LenCounter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0 += s.len();
        Ok(())
    }
}

/// Bytes `write` produces.
pub(super) fn measure<F>(write: F) -> usize
where
    F: Fn(&mut dyn fmt::Write) -> fmt::Result,
{
    let mut counter = LenCounter::default();
    let _ = write(&mut counter as &mut dyn fmt::Write);
    counter.0
}

/// Host-owned memory for one effect instance, allocated once up front.
pub struct MemoryRegions {
    pub params: Box<[ParamDescriptor]>,
    pub pages: Box<[PageDescriptor]>,
    pub page_indices: Box<[u16]>,
    pub names: Box<[u8]>,
    /// Delay lines followed by the two kernel banks.
    pub working: Box<[f32]>,
    /// Mailbox kernel slot.
    pub exchange: Box<[f32]>,
    /// Wavetable samples.
    pub samples: Box<[i16]>,
}

impl MemoryRegions {
    pub fn allocate(req: &MemoryRequirements) -> Self {
        Self {
            params: vec![ParamDescriptor::default(); req.param_bytes / size_of::<ParamDescriptor>()]
                .into_boxed_slice(),
            pages: vec![PageDescriptor::default(); req.page_bytes / size_of::<PageDescriptor>()]
                .into_boxed_slice(),
            page_indices: vec![0; req.page_index_bytes / size_of::<u16>()].into_boxed_slice(),
            names: vec![0; req.name_bytes].into_boxed_slice(),
            working: vec![0.0; req.working_memory_bytes / size_of::<f32>()].into_boxed_slice(),
            exchange: vec![0.0; req.kernel_exchange_bytes / size_of::<f32>()].into_boxed_slice(),
            samples: vec![0; req.sample_buffer_bytes / size_of::<i16>()].into_boxed_slice(),
        }
    }

    /// Fails on the first region smaller than `req` asks for.
    pub fn check(&self, req: &MemoryRequirements) -> Result<(), LayoutError> {
        let regions = [
            ("params", self.params.len() * size_of::<ParamDescriptor>(), req.param_bytes),
            ("pages", self.pages.len() * size_of::<PageDescriptor>(), req.page_bytes),
            ("page_indices", self.page_indices.len() * size_of::<u16>(), req.page_index_bytes),
            ("names", self.names.len(), req.name_bytes),
            ("working", self.working.len() * size_of::<f32>(), req.working_memory_bytes),
            ("exchange", self.exchange.len() * size_of::<f32>(), req.kernel_exchange_bytes),
            ("samples", self.samples.len() * size_of::<i16>(), req.sample_buffer_bytes),
        ];
        for (region, provided, required) in regions {
            if provided < required {
                return Err(LayoutError::RegionTooSmall {
                    region,
                    required,
                    provided,
                });
            }
        }
        Ok(())
    }
}
