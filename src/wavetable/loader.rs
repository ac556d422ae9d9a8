use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};

use super::{WaveTableBuffer, WavetableInfo, WavetableSource};
use crate::error::LoadError;

struct LoadJob {
    index: usize,
    buffer: WaveTableBuffer,
}

/// Result of one asynchronous load. Carries the buffer back to its owner.
pub struct LoadCompletion {
    pub index: usize,
    pub buffer: WaveTableBuffer,
    pub result: Result<WavetableInfo, LoadError>,
}

impl LoadCompletion {
    pub fn success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Runs a [`WavetableSource`] on its own thread.
///
/// Jobs go in with [`request`](Self::request); completions come back on a
/// channel that the control context drains whenever it likes. Nothing here
/// is touched by the audio thread.
pub struct LoadWorker {
    jobs: Option<Sender<LoadJob>>,
    completions: Receiver<LoadCompletion>,
    handle: Option<JoinHandle<()>>,
    names: Vec<String>,
}

impl LoadWorker {
    pub fn spawn(source: Box<dyn WavetableSource>) -> std::io::Result<Self> {
        let names = (0..source.count())
            .map(|i| source.name(i).unwrap_or_default().to_string())
            .collect();

        let (job_tx, job_rx) = unbounded::<LoadJob>();
        let (done_tx, done_rx) = unbounded::<LoadCompletion>();

        let handle = thread::Builder::new()
            .name("wavetable-loader".into())
            .spawn(move || {
                for job in job_rx.iter() {
                    let LoadJob { index, mut buffer } = job;
                    let result = source.load(index, &mut buffer);
                    match &result {
                        Ok(info) => log::debug!(
                            "loaded wavetable {} ({} waves, mipmaps: {})",
                            index,
                            info.num_waves,
                            info.using_mipmaps
                        ),
                        Err(e) => log::warn!("failed to load wavetable {}: {}", index, e),
                    }
                    let completion = LoadCompletion {
                        index,
                        buffer,
                        result,
                    };
                    if done_tx.send(completion).is_err() {
                        break;
                    }
                }
            })?;

        Ok(Self {
            jobs: Some(job_tx),
            completions: done_rx,
            handle: Some(handle),
            names,
        })
    }

    /// Number of wavetables the source offered when the worker started.
    pub fn count(&self) -> usize {
        self.names.len()
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// Queues a load into `buffer`. Gives the buffer back if the worker is gone.
    pub fn request(&self, index: usize, buffer: WaveTableBuffer) -> Result<(), WaveTableBuffer> {
        match &self.jobs {
            Some(jobs) => jobs
                .send(LoadJob { index, buffer })
                .map_err(|err| err.into_inner().buffer),
            None => Err(buffer),
        }
    }

    pub fn try_complete(&self) -> Option<LoadCompletion> {
        self.completions.try_recv().ok()
    }

    pub fn wait_complete(&self, timeout: Duration) -> Option<LoadCompletion> {
        self.completions.recv_timeout(timeout).ok()
    }

    /// Stops the worker after its current job and returns that job's
    /// completion, if one was still undelivered.
    pub fn shutdown(mut self) -> Option<LoadCompletion> {
        self.jobs.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        self.completions.try_recv().ok()
    }
}

impl Drop for LoadWorker {
    fn drop(&mut self) {
        // Closing the job channel ends the worker loop.
        self.jobs.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
