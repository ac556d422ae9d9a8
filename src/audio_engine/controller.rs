use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::shared::SharedParams;
use crate::config::EngineConfig;
use crate::error::LoadError;
use crate::kernel::{build_all_kernels, kernel_size_for_index, KernelHeader, KernelMailbox, UpdateKind};
use crate::layout::{
    param_target, ParameterLayout, ParamTarget, MAX_PARAMS, PARAM_KERNEL_SIZE, PARAM_POSITION,
    PARAM_SPREAD, PARAM_WAVETABLE,
};
use crate::utils::db_to_linear;
use crate::wavetable::{LoadCompletion, LoadWorker, WaveTableBuffer, WavetableInfo, WavetableSource};

/// Host-visible state of the wavetable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    NoTable,
    Loading,
    Loaded(WavetableInfo),
    Failed,
}

/// Control-thread half of the effect.
///
/// Holds the parameter values and the wavetable buffer, and is the only
/// producer of kernel sets.
pub struct Controller {
    layout: ParameterLayout,
    values: [i32; MAX_PARAMS],
    shared: Arc<SharedParams>,
    mailbox: Arc<KernelMailbox>,
    /// `None` while the loader owns the buffer.
    table: Option<WaveTableBuffer>,
    worker: Option<LoadWorker>,
    awaiting: Option<usize>,
    reload_after_load: bool,
    loaded: Option<WavetableInfo>,
    load_error: bool,
    kernels_live: bool,
}

impl Controller {
    pub(crate) fn new(
        layout: ParameterLayout,
        table: WaveTableBuffer,
        mailbox: Arc<KernelMailbox>,
        shared: Arc<SharedParams>,
    ) -> Self {
        let mut values = [0; MAX_PARAMS];
        for (value, descriptor) in values.iter_mut().zip(layout.descriptors()) {
            *value = descriptor.default;
        }
        let mut controller = Self {
            layout,
            values,
            shared,
            mailbox,
            table: Some(table),
            worker: None,
            awaiting: None,
            reload_after_load: false,
            loaded: None,
            load_error: false,
            kernels_live: false,
        };
        for id in 0..controller.layout.num_params() {
            controller.sync_shared(id);
        }
        controller
    }

    /// Applies the initial parameter values of `config`. Unknown names are
    /// logged and skipped.
    pub fn apply_config(&mut self, config: &EngineConfig) {
        if config.parameters.is_empty() {
            return;
        }
        let by_name = self.layout.index_by_name();
        for (name, &value) in &config.parameters {
            match by_name.get(name) {
                Some(&id) => self.set_parameter(id, value),
                None => log::warn!("unknown parameter '{}' in config", name),
            }
        }
    }

    pub fn layout(&self) -> &ParameterLayout {
        &self.layout
    }

    pub fn num_channels(&self) -> usize {
        self.layout.num_channels()
    }

    pub fn parameter(&self, id: usize) -> Option<i32> {
        (id < self.layout.num_params()).then(|| self.values[id])
    }

    /// Clamps `value` into the parameter's range and reacts to the change.
    pub fn set_parameter(&mut self, id: usize, value: i32) {
        let Some(descriptor) = self.layout.descriptor(id) else {
            log::debug!("ignoring unknown parameter {}", id);
            return;
        };
        self.values[id] = descriptor.clamp(value);
        self.on_parameter_changed(id);
    }

    pub fn on_parameter_changed(&mut self, id: usize) {
        match param_target(id, self.num_channels()) {
            Some(ParamTarget::Wavetable) => {
                if self.awaiting.is_some() {
                    self.reload_after_load = true;
                } else {
                    self.request_wavetable_load();
                }
            }
            Some(ParamTarget::Position | ParamTarget::Spread | ParamTarget::KernelSize) => {
                self.publish_kernels(UpdateKind::Immediate);
            }
            Some(_) => self.sync_shared(id),
            None => {}
        }
    }

    fn sync_shared(&self, id: usize) {
        let value = self.values[id];
        match param_target(id, self.num_channels()) {
            Some(ParamTarget::Depth) => self.shared.set_depth(value as f32 / 100.0),
            Some(ParamTarget::Gain) => self.shared.set_gain(db_to_linear(value as f32 / 10.0)),
            Some(ParamTarget::Saturation) => self.shared.set_saturation(value as f32 / 100.0),
            Some(ParamTarget::Channel(channel, param)) => {
                self.shared.set_route(channel, param, value)
            }
            _ => {}
        }
    }

    /// Starts serving wavetables from `source` and loads the selected one.
    pub fn attach_source(&mut self, source: Box<dyn WavetableSource>) -> io::Result<()> {
        let count = source.count();
        let worker = LoadWorker::spawn(source)?;

        if let Some(previous) = self.worker.replace(worker) {
            if let Some(completion) = previous.shutdown() {
                // result belongs to the old source
                self.table = Some(completion.buffer);
            }
            self.awaiting = None;
            self.reload_after_load = false;
            self.loaded = None;
        }
        log::info!("wavetable source attached with {} tables", count);

        self.layout.set_wavetable_count(count);
        if let Some(descriptor) = self.layout.descriptor(PARAM_WAVETABLE) {
            self.values[PARAM_WAVETABLE] = descriptor.clamp(self.values[PARAM_WAVETABLE]);
        }
        self.request_wavetable_load();
        Ok(())
    }

    pub fn wavetable_count(&self) -> usize {
        self.worker.as_ref().map_or(0, LoadWorker::count)
    }

    pub fn wavetable_name(&self, index: usize) -> Option<&str> {
        self.worker.as_ref()?.name(index)
    }

    /// Hands the buffer to the loader for the selected wavetable.
    ///
    /// Returns false if a load is already in flight or there is no source.
    pub fn request_wavetable_load(&mut self) -> bool {
        if self.awaiting.is_some() {
            return false;
        }
        let Some(worker) = self.worker.as_ref() else {
            return false;
        };
        let Some(buffer) = self.table.take() else {
            return false;
        };

        let index = self.values[PARAM_WAVETABLE].max(0) as usize;
        match worker.request(index, buffer) {
            Ok(()) => {
                log::debug!("requested wavetable {}", index);
                self.awaiting = Some(index);
                true
            }
            Err(buffer) => {
                log::warn!("cannot request wavetable {}: {}", index, LoadError::WorkerStopped);
                self.table = Some(buffer);
                false
            }
        }
    }

    pub fn on_load_complete(&mut self, completion: LoadCompletion) {
        let LoadCompletion {
            index,
            buffer,
            result,
        } = completion;
        self.awaiting = None;
        self.table = Some(buffer);

        match result {
            Ok(info) if info.is_usable() => {
                log::info!("wavetable {} ready with {} waves", index, info.num_waves);
                self.load_error = false;
                self.loaded = Some(info);
                let kind = if self.kernels_live {
                    UpdateKind::Crossfade
                } else {
                    UpdateKind::Immediate
                };
                self.publish_kernels(kind);
            }
            Ok(info) => {
                log::warn!(
                    "wavetable {} has no usable resolution levels, passing audio through",
                    index
                );
                self.load_error = false;
                self.loaded = Some(info);
                self.publish_bypass();
            }
            Err(err) => {
                log::warn!("wavetable {} failed to load: {}", index, err);
                self.load_error = true;
                self.loaded = None;
            }
        }

        if std::mem::take(&mut self.reload_after_load)
            && self.values[PARAM_WAVETABLE].max(0) as usize != index
        {
            self.request_wavetable_load();
        }
    }

    /// Handles finished loads without blocking. Returns how many there were.
    pub fn poll(&mut self) -> usize {
        let mut handled = 0;
        while let Some(completion) = self.worker.as_ref().and_then(LoadWorker::try_complete) {
            self.on_load_complete(completion);
            handled += 1;
        }
        handled
    }

    /// Blocks until no load is in flight or `timeout` passes.
    pub fn wait_for_load(&mut self, timeout: Duration) -> LoadStatus {
        let deadline = Instant::now() + timeout;
        while self.awaiting.is_some() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let completion = self
                .worker
                .as_ref()
                .and_then(|worker| worker.wait_complete(remaining));
            match completion {
                Some(completion) => self.on_load_complete(completion),
                None => break,
            }
        }
        self.status()
    }

    pub fn status(&self) -> LoadStatus {
        if self.awaiting.is_some() {
            LoadStatus::Loading
        } else if self.load_error {
            LoadStatus::Failed
        } else {
            match self.loaded {
                Some(info) => LoadStatus::Loaded(info),
                None => LoadStatus::NoTable,
            }
        }
    }

    pub fn load_error(&self) -> bool {
        self.load_error
    }

    fn publish_kernels(&mut self, kind: UpdateKind) {
        if self.load_error || !self.loaded.is_some_and(|info| info.is_usable()) {
            return;
        }
        let Some(table) = self.table.as_ref() else {
            return;
        };

        let position = self.values[PARAM_POSITION] as f32 / 1000.0;
        let spread = self.values[PARAM_SPREAD] as f32 / 1000.0;
        let kernel_size = kernel_size_for_index(self.values[PARAM_KERNEL_SIZE]);
        let num_channels = self.num_channels();

        let header = KernelHeader {
            kind,
            kernel_size,
            num_channels,
        };
        self.mailbox.publish(header, |bank| {
            build_all_kernels(table, position, spread, num_channels, kernel_size, bank)
        });
        self.kernels_live = true;
    }

    fn publish_bypass(&mut self) {
        let header = KernelHeader {
            kind: UpdateKind::Bypass,
            kernel_size: kernel_size_for_index(self.values[PARAM_KERNEL_SIZE]),
            num_channels: self.num_channels(),
        };
        self.mailbox.publish(header, |_| {});
        self.kernels_live = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_engine::build;
    use crate::wavetable::MemorySource;

    fn tables(count: usize) -> Box<dyn WavetableSource> {
        let frame: Vec<f32> = (0..64).map(|i| (i as f32 * 0.1).sin()).collect();
        let mut source = MemorySource::new();
        for n in 0..count {
            source = source.with_table(format!("table {}", n), vec![frame.clone(); 2]);
        }
        Box::new(source)
    }

    #[test]
    fn test_reattach_forgets_pending_reload() {
        let (mut controller, _processor) = build(1, &EngineConfig::default()).unwrap();
        controller.attach_source(tables(3)).unwrap();
        assert!(controller.awaiting.is_some());

        controller.set_parameter(PARAM_WAVETABLE, 2);
        assert!(controller.reload_after_load);

        controller.attach_source(tables(3)).unwrap();
        assert!(!controller.reload_after_load);
        assert_eq!(controller.awaiting, Some(2));

        let status = controller.wait_for_load(Duration::from_secs(5));
        assert!(matches!(status, LoadStatus::Loaded(_)));
        assert!(controller.awaiting.is_none());
    }
}
