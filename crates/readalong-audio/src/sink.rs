use crate::queue::SharedQueue;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use readalong_foundation::AudioError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Seam between the playback controller and the host audio device.
///
/// `start` acquires the device and begins pulling from the queue; it
/// returns the output sample rate, which is fixed for the session on the
/// first successful acquisition. Acquisition may fail or be deferred by
/// the host; that failure is recoverable and retried on the next explicit
/// play request.
pub trait OutputSink: Send {
    fn start(&mut self, queue: Arc<SharedQueue>) -> Result<u32, AudioError>;
    fn stop(&mut self);
}

/// Production sink: a dedicated thread owns the cpal output stream
/// (cpal streams are not `Send`) and the device callback pulls samples
/// from the shared queue.
pub struct CpalSink {
    worker: Option<OutputThread>,
}

struct OutputThread {
    handle: JoinHandle<()>,
    shutdown: Arc<AtomicBool>,
}

impl Default for CpalSink {
    fn default() -> Self {
        Self::new()
    }
}

impl CpalSink {
    pub fn new() -> Self {
        Self { worker: None }
    }
}

impl OutputSink for CpalSink {
    fn start(&mut self, queue: Arc<SharedQueue>) -> Result<u32, AudioError> {
        if self.worker.is_some() {
            return Ok(queue.sample_rate());
        }

        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_flag = shutdown.clone();
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<Result<u32, AudioError>>();

        let handle = thread::Builder::new()
            .name("audio-output".to_string())
            .spawn(move || {
                let stream = match build_output_stream(&queue) {
                    Ok((stream, rate)) => {
                        queue.set_sample_rate(rate);
                        let _ = ready_tx.send(Ok(rate));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                // Keep the stream alive until the controller stops us.
                while !shutdown_flag.load(Ordering::Relaxed) {
                    thread::sleep(Duration::from_millis(50));
                }
                drop(stream);
                tracing::debug!(target: "audio", "Output thread shut down");
            })
            .map_err(|e| AudioError::Fatal(format!("Failed to spawn output thread: {}", e)))?;

        match ready_rx.recv_timeout(Duration::from_secs(3)) {
            Ok(Ok(rate)) => {
                tracing::info!(target: "audio", "Output stream started at {} Hz", rate);
                self.worker = Some(OutputThread { handle, shutdown });
                Ok(rate)
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                shutdown.store(true, Ordering::Relaxed);
                let _ = handle.join();
                Err(AudioError::DeviceUnavailable {
                    reason: "device acquisition timed out".to_string(),
                })
            }
        }
    }

    fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.shutdown.store(true, Ordering::Relaxed);
            let _ = worker.handle.join();
        }
    }
}

impl Drop for CpalSink {
    fn drop(&mut self) {
        self.stop();
    }
}

fn build_output_stream(queue: &Arc<SharedQueue>) -> Result<(cpal::Stream, u32), AudioError> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| AudioError::DeviceUnavailable {
            reason: "no default output device".to_string(),
        })?;
    if let Ok(name) = device.name() {
        tracing::info!(target: "audio", "Selected output device: {}", name);
    }

    let supported = device.default_output_config()?;
    if supported.sample_format() != cpal::SampleFormat::F32 {
        return Err(AudioError::FormatNotSupported {
            format: format!("{:?}", supported.sample_format()),
        });
    }
    let sample_rate = supported.sample_rate().0;
    let channels = supported.channels() as usize;
    let config: cpal::StreamConfig = supported.into();

    let callback_queue = queue.clone();
    let err_fn = |err: cpal::StreamError| {
        tracing::error!(target: "audio", "Output stream error: {}", err);
    };

    let stream = device.build_output_stream(
        &config,
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            callback_queue.fill_output(data, channels);
        },
        err_fn,
        None,
    )?;
    stream.play()?;

    Ok((stream, sample_rate))
}

/// Test sink: no device. Cloneable so a test can keep a handle after
/// moving the sink into a controller; consumption goes through the
/// queue's `consume` path, the same one the real callback uses.
#[derive(Clone)]
pub struct ManualSink {
    shared: Arc<ManualSinkShared>,
}

struct ManualSinkShared {
    sample_rate: u32,
    queue: parking_lot::Mutex<Option<Arc<SharedQueue>>>,
    start_failures: std::sync::atomic::AtomicU32,
    starts: std::sync::atomic::AtomicU32,
    stops: std::sync::atomic::AtomicU32,
}

impl ManualSink {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            shared: Arc::new(ManualSinkShared {
                sample_rate,
                queue: parking_lot::Mutex::new(None),
                start_failures: std::sync::atomic::AtomicU32::new(0),
                starts: std::sync::atomic::AtomicU32::new(0),
                stops: std::sync::atomic::AtomicU32::new(0),
            }),
        }
    }

    /// Make the next `n` start attempts fail with a recoverable device
    /// error.
    pub fn fail_next_starts(&self, n: u32) {
        self.shared.start_failures.store(n, Ordering::Release);
    }

    /// Simulate the device consuming `samples` mono samples.
    pub fn advance(&self, samples: usize) -> usize {
        match self.shared.queue.lock().as_ref() {
            Some(queue) => queue.consume(samples),
            None => 0,
        }
    }

    pub fn starts(&self) -> u32 {
        self.shared.starts.load(Ordering::Acquire)
    }

    pub fn stops(&self) -> u32 {
        self.shared.stops.load(Ordering::Acquire)
    }
}

impl OutputSink for ManualSink {
    fn start(&mut self, queue: Arc<SharedQueue>) -> Result<u32, AudioError> {
        let failures = self.shared.start_failures.load(Ordering::Acquire);
        if failures > 0 {
            self.shared
                .start_failures
                .store(failures - 1, Ordering::Release);
            return Err(AudioError::DeviceUnavailable {
                reason: "manual sink configured to fail".to_string(),
            });
        }
        self.shared.starts.fetch_add(1, Ordering::AcqRel);
        queue.set_sample_rate(self.shared.sample_rate);
        *self.shared.queue.lock() = Some(queue);
        Ok(self.shared.sample_rate)
    }

    fn stop(&mut self) {
        self.shared.stops.fetch_add(1, Ordering::AcqRel);
        *self.shared.queue.lock() = None;
    }
}
