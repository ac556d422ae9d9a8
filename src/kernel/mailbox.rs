use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU8, Ordering};
use std::thread;

const EMPTY: u8 = 0;
const WRITING: u8 = 1;
const READY: u8 = 2;
const READING: u8 = 3;

/// Spins before the producer starts yielding its time slice.
const SPIN_LIMIT: u32 = 64;

/// How the audio thread should install a published kernel set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateKind {
    /// Replace the audible kernels on the next block.
    Immediate,
    /// Fade from the current kernels to the published ones.
    Crossfade,
    /// No usable table; pass input through dry.
    Bypass,
}

impl UpdateKind {
    /// Kind that survives when `next` overwrites an unconsumed `self`.
    fn merge(self, next: UpdateKind) -> UpdateKind {
        match (self, next) {
            (_, UpdateKind::Bypass) => UpdateKind::Bypass,
            (UpdateKind::Crossfade, UpdateKind::Immediate) => UpdateKind::Crossfade,
            (_, next) => next,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelHeader {
    pub kind: UpdateKind,
    pub kernel_size: usize,
    pub num_channels: usize,
}

/// Single-slot handoff of kernel sets from the control thread to the audio
/// thread.
///
/// There is one producer and one consumer. The consumer never waits: when
/// the slot is being written it simply finds nothing to take. The producer
/// waits out an in-progress read, which lasts at most one copy of the
/// kernel set.
pub struct KernelMailbox {
    state: AtomicU8,
    header: UnsafeCell<KernelHeader>,
    kernels: UnsafeCell<Box<[f32]>>,
}

// The state machine grants exclusive access to `header` and `kernels`:
// only the side that moved the state into WRITING or READING touches them.
unsafe impl Sync for KernelMailbox {}

impl KernelMailbox {
    /// Wraps `kernels`, the exchange region of `num_channels` strided slots.
    pub fn new(kernels: Box<[f32]>) -> Self {
        Self {
            state: AtomicU8::new(EMPTY),
            header: UnsafeCell::new(KernelHeader {
                kind: UpdateKind::Bypass,
                kernel_size: 0,
                num_channels: 0,
            }),
            kernels: UnsafeCell::new(kernels),
        }
    }

    /// Writes a kernel set through `fill` and marks it ready.
    ///
    /// An update the consumer has not taken yet is overwritten; its kind
    /// merges with `header.kind`. Must not be called from the audio thread.
    pub fn publish<F>(&self, header: KernelHeader, fill: F)
    where
        F: FnOnce(&mut [f32]),
    {
        let mut spins = 0u32;
        let overwriting = loop {
            let current = self.state.load(Ordering::Relaxed);
            if current == EMPTY || current == READY {
                if self
                    .state
                    .compare_exchange_weak(current, WRITING, Ordering::Acquire, Ordering::Relaxed)
                    .is_ok()
                {
                    break current == READY;
                }
                continue;
            }
            if spins < SPIN_LIMIT {
                spins += 1;
                std::hint::spin_loop();
            } else {
                thread::yield_now();
            }
        };

        // SAFETY: the state is WRITING, so the consumer cannot enter READING.
        let (slot, kernels) = unsafe { (&mut *self.header.get(), &mut *self.kernels.get()) };
        let kind = if overwriting {
            slot.kind.merge(header.kind)
        } else {
            header.kind
        };
        *slot = KernelHeader { kind, ..header };
        if header.kind != UpdateKind::Bypass {
            fill(kernels);
        }

        self.state.store(READY, Ordering::Release);
    }

    /// Hands the pending update to `read`, if there is one. Never blocks.
    pub fn take<R, F>(&self, read: F) -> Option<R>
    where
        F: FnOnce(&KernelHeader, &[f32]) -> R,
    {
        if self
            .state
            .compare_exchange(READY, READING, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return None;
        }

        // SAFETY: the state is READING, so the producer cannot enter WRITING.
        let result = unsafe { read(&*self.header.get(), &*self.kernels.get()) };

        self.state.store(EMPTY, Ordering::Release);
        Some(result)
    }

    pub fn has_pending(&self) -> bool {
        self.state.load(Ordering::Acquire) == READY
    }
}
