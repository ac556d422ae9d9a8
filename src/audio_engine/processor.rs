use std::sync::Arc;

use super::shared::{BlockParams, SharedParams};
use crate::audio::{BusBuffer, ChannelRoute};
use crate::config::EngineConfig;
use crate::kernel::{kernel_slot, KernelHeader, KernelMailbox, UpdateKind, KERNEL_SIZES, MAX_KERNEL_SIZE};
use crate::layout::MAX_CHANNELS;
use crate::nodes::{ChannelState, Crossfade, DELAY_LEN};
use crate::utils::convolve_window;

/// Audio-thread half of the effect.
///
/// Owns the delay lines and both kernel banks. [`Processor::process`]
/// never allocates, locks or logs.
pub struct Processor {
    fir: FirState,
    mailbox: Arc<KernelMailbox>,
    shared: Arc<SharedParams>,
}

/// Everything a mailbox update may touch, kept apart from the mailbox so
/// both can be borrowed at once.
struct FirState {
    /// `[delay lines | bank 0 | bank 1]`
    working: Box<[f32]>,
    num_channels: usize,
    channels: [ChannelState; MAX_CHANNELS],
    active: usize,
    has_kernel: bool,
    kernel_size: usize,
    crossfade: Crossfade,
}

impl Processor {
    pub(crate) fn new(
        working: Box<[f32]>,
        num_channels: usize,
        config: &EngineConfig,
        mailbox: Arc<KernelMailbox>,
        shared: Arc<SharedParams>,
    ) -> Self {
        let mut fir = FirState {
            working,
            num_channels,
            channels: [ChannelState::default(); MAX_CHANNELS],
            active: 0,
            has_kernel: false,
            kernel_size: KERNEL_SIZES[0],
            crossfade: Crossfade::new(config.crossfade_ms, config.sample_rate),
        };
        fir.reset();
        Self {
            fir,
            mailbox,
            shared,
        }
    }

    /// Processes one block in place.
    ///
    /// `buses` holds consecutive buses of `num_frames` samples each; bus
    /// numbers in the routing parameters count from 1.
    pub fn process(&mut self, buses: &mut [f32], num_frames: usize) {
        if num_frames == 0 {
            return;
        }

        let fir = &mut self.fir;
        self.mailbox.take(|header, kernels| fir.install(header, kernels));

        let params = self.shared.block_params();
        let mut buses = BusBuffer::new(buses, num_frames);
        let num_buses = buses.num_buses();

        let mut routes = [ChannelRoute::default(); MAX_CHANNELS];
        for (ch, route) in routes.iter_mut().enumerate().take(self.fir.num_channels) {
            *route = self.shared.route(ch, num_buses);
        }

        self.fir
            .run(&mut buses, &routes[..self.fir.num_channels], &params);
    }

    /// Clears the delay lines.
    pub fn reset(&mut self) {
        self.fir.reset();
    }

    pub fn num_channels(&self) -> usize {
        self.fir.num_channels
    }

    pub fn is_crossfading(&self) -> bool {
        self.fir.crossfade.is_mixing()
    }

    pub fn crossfade_mix(&self) -> f32 {
        self.fir.crossfade.mix()
    }

    pub fn kernel_size(&self) -> usize {
        self.fir.kernel_size
    }

    pub fn has_kernel(&self) -> bool {
        self.fir.has_kernel
    }

    /// Kernel taps currently audible on `channel`.
    pub fn active_kernel(&self, channel: usize) -> Option<&[f32]> {
        if !self.fir.has_kernel || channel >= self.fir.num_channels {
            return None;
        }
        let (active, _) = self.fir.banks();
        Some(kernel_slot(active, channel, self.fir.kernel_size))
    }
}

impl FirState {
    fn delay_floats(&self) -> usize {
        self.num_channels * DELAY_LEN
    }

    fn bank_floats(&self) -> usize {
        self.num_channels * MAX_KERNEL_SIZE
    }

    fn reset(&mut self) {
        for (ch, state) in self.channels.iter_mut().enumerate().take(self.num_channels) {
            state.reset(&mut self.working[ch * DELAY_LEN..(ch + 1) * DELAY_LEN]);
        }
    }

    /// `(active, pending)` banks.
    fn banks(&self) -> (&[f32], &[f32]) {
        let (bank0, bank1) = self.working[self.delay_floats()..].split_at(self.bank_floats());
        if self.active == 0 {
            (bank0, bank1)
        } else {
            (bank1, bank0)
        }
    }

    fn bank_mut(&mut self, which: usize) -> &mut [f32] {
        let start = self.delay_floats() + which * self.bank_floats();
        let len = self.bank_floats();
        &mut self.working[start..start + len]
    }

    fn copy_kernels(&mut self, which: usize, kernels: &[f32], num_channels: usize) {
        let size = self.kernel_size;
        let bank = self.bank_mut(which);
        for ch in 0..num_channels {
            let start = ch * MAX_KERNEL_SIZE;
            bank[start..start + size].copy_from_slice(&kernels[start..start + size]);
        }
    }

    /// Bakes the current blend into the active bank. Convolution is linear in
    /// the taps, so the output is unchanged and a restarted ramp leaves from
    /// where the old one stood.
    fn fold_pending(&mut self) {
        let mix = self.crossfade.mix();
        let size = self.kernel_size;
        let delay_floats = self.delay_floats();
        let bank_floats = self.bank_floats();
        let (bank0, bank1) = self.working[delay_floats..].split_at_mut(bank_floats);
        let (active, pending) = if self.active == 0 {
            (bank0, &*bank1)
        } else {
            (bank1, &*bank0)
        };
        for ch in 0..self.num_channels {
            let start = ch * MAX_KERNEL_SIZE;
            for (a, p) in active[start..start + size]
                .iter_mut()
                .zip(&pending[start..start + size])
            {
                *a = *a * (1.0 - mix) + *p * mix;
            }
        }
    }

    fn install(&mut self, header: &KernelHeader, kernels: &[f32]) {
        if header.kind == UpdateKind::Bypass {
            self.has_kernel = false;
            self.crossfade.cancel();
            return;
        }
        if !KERNEL_SIZES.contains(&header.kernel_size) {
            return;
        }
        let num_channels = header
            .num_channels
            .min(self.num_channels)
            .min(kernels.len() / MAX_KERNEL_SIZE);

        if header.kernel_size != self.kernel_size {
            let (old, new) = (self.kernel_size, header.kernel_size);
            for ch in 0..self.num_channels {
                let delay = &mut self.working[ch * DELAY_LEN..(ch + 1) * DELAY_LEN];
                self.channels[ch].resize(delay, old, new);
            }
            self.kernel_size = new;
            self.crossfade.cancel();
            self.copy_kernels(self.active, kernels, num_channels);
            self.has_kernel = true;
            return;
        }

        let pending = self.active ^ 1;
        if header.kind == UpdateKind::Crossfade && self.has_kernel {
            if self.crossfade.is_mixing() {
                self.fold_pending();
            }
            self.copy_kernels(pending, kernels, num_channels);
            self.crossfade.start();
        } else if self.crossfade.is_mixing() {
            // the fade target already reflects the loaded table
            self.copy_kernels(pending, kernels, num_channels);
        } else {
            self.copy_kernels(self.active, kernels, num_channels);
        }
        self.has_kernel = true;
    }

    fn run(&mut self, buses: &mut BusBuffer<'_>, routes: &[ChannelRoute], params: &BlockParams) {
        let size = self.kernel_size;
        let delay_floats = self.delay_floats();
        let bank_floats = self.bank_floats();
        let (delays, banks) = self.working.split_at_mut(delay_floats);
        let (bank0, bank1) = banks.split_at(bank_floats);

        for frame in 0..buses.frames() {
            let (active, pending) = if self.active == 0 {
                (bank0, bank1)
            } else {
                (bank1, bank0)
            };
            let mixing = self.crossfade.is_mixing();

            for (ch, route) in routes.iter().enumerate() {
                if !route.active {
                    continue;
                }
                let dry = buses.read(route.input, frame);
                let delay = &mut delays[ch * DELAY_LEN..(ch + 1) * DELAY_LEN];
                let window = self.channels[ch].push(delay, dry, size);

                let wet = if !self.has_kernel {
                    dry
                } else if mixing {
                    let old = convolve_window(kernel_slot(active, ch, size), window);
                    let new = convolve_window(kernel_slot(pending, ch, size), window);
                    self.crossfade.blend(old, new)
                } else {
                    convolve_window(kernel_slot(active, ch, size), window)
                };

                let mut mixed = dry * (1.0 - params.depth) + wet * params.depth;
                if let Some(clip) = &params.clip {
                    mixed = clip.apply(mixed);
                }
                mixed *= params.gain;
                buses.write(route.output, frame, mixed, route.mode);
            }

            if self.crossfade.advance() {
                self.active ^= 1;
            }
        }
    }
}
