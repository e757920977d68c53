//! Microphone capture via `cpal`.
//!
//! [`CpalMicrophone`] opens the default input device on a worker thread when
//! access is requested; failure to open it is reported as a denial. The
//! granted [`CpalRecorder`] owns a dedicated audio thread that keeps the
//! `cpal::Stream` alive (the stream is not `Send` on every platform), and
//! start/stop are messages to that thread. Dropping the recorder ends the
//! thread and releases the device.

use super::recorder::{AudioChunk, Microphone, PermissionCallback, Recorder, RecorderNotice, RecorderNotifier};
use crate::{Result, TtsrecError};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Sample, SampleFormat};
use log::{debug, error, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};

/// Messages to the audio thread
enum Control {
    Start,
    Stop,
}

/// Default-input-device microphone
pub struct CpalMicrophone {
    device_name: String,
}

impl CpalMicrophone {
    /// Check that the default host has an input device
    ///
    /// # Errors
    ///
    /// Returns [`TtsrecError::CapabilityUnavailable`] when there is none, in
    /// which case recording is unavailable but speech still works.
    pub fn probe() -> Result<Self> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or_else(|| {
            TtsrecError::CapabilityUnavailable("Audio recording (no input device found)".to_string())
        })?;
        let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());
        info!("Input device: {}", device_name);
        Ok(Self { device_name })
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }
}

impl Microphone for CpalMicrophone {
    fn request(&self, notifier: RecorderNotifier, respond: PermissionCallback) {
        debug!("Requesting microphone access");
        thread::spawn(move || {
            let outcome = CpalRecorder::open(notifier).map(|r| Box::new(r) as Box<dyn Recorder>);
            respond(outcome);
        });
    }
}

/// A recorder bound to an open input stream
pub struct CpalRecorder {
    control: Option<mpsc::Sender<Control>>,
    thread: Option<JoinHandle<()>>,
    active: bool,
}

impl CpalRecorder {
    /// Open the default input device and build (but not start) a stream
    ///
    /// Blocks until the audio thread reports whether the stream could be
    /// built. Any failure is a [`TtsrecError::PermissionDenied`].
    pub fn open(notifier: RecorderNotifier) -> Result<Self> {
        let (control_tx, control_rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();

        let thread = thread::Builder::new()
            .name("ttsrec-capture".to_string())
            .spawn(move || {
                let capturing = Arc::new(AtomicBool::new(false));
                let stream = match build_stream(notifier.clone(), capturing.clone()) {
                    Ok(stream) => {
                        let _ = ready_tx.send(Ok(()));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                run_audio_thread(stream, capturing, notifier, control_rx);
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                control: Some(control_tx),
                thread: Some(thread),
                active: false,
            }),
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => Err(TtsrecError::PermissionDenied(
                "capture thread exited before opening the device".to_string(),
            )),
        }
    }

    fn send(&self, control: Control) -> Result<()> {
        self.control
            .as_ref()
            .ok_or_else(|| TtsrecError::Recorder("recorder already closed".to_string()))?
            .send(control)
            .map_err(|_| TtsrecError::Recorder("capture thread has exited".to_string()))
    }
}

impl Recorder for CpalRecorder {
    fn start(&mut self) -> Result<()> {
        if self.active {
            return Ok(());
        }
        self.send(Control::Start)?;
        self.active = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        self.send(Control::Stop)
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

impl Drop for CpalRecorder {
    fn drop(&mut self) {
        // Closing the channel ends the audio thread, which drops the stream
        self.control.take();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn build_stream(notifier: RecorderNotifier, capturing: Arc<AtomicBool>) -> Result<cpal::Stream> {
    let denied = |e: String| TtsrecError::PermissionDenied(e);

    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| denied("no input device found on the default audio host".to_string()))?;

    let supported = device
        .default_input_config()
        .map_err(|e| denied(format!("failed to query default input config: {}", e)))?;

    let sample_format = supported.sample_format();
    let channels = supported.channels();
    let sample_rate = supported.sample_rate().0;
    let config: cpal::StreamConfig = supported.into();
    debug!(
        "Opening input stream: {} Hz, {} channels, {:?}",
        sample_rate, channels, sample_format
    );

    let on_error = |err: cpal::StreamError| {
        error!("cpal stream error: {err}");
    };

    let stream = match sample_format {
        SampleFormat::F32 => device.build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                forward(&notifier, &capturing, data.to_vec(), sample_rate, channels)
            },
            on_error,
            None,
        ),
        SampleFormat::I16 => device.build_input_stream(
            &config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                let samples = data.iter().map(|&s| s.to_sample::<f32>()).collect();
                forward(&notifier, &capturing, samples, sample_rate, channels)
            },
            on_error,
            None,
        ),
        SampleFormat::U16 => device.build_input_stream(
            &config,
            move |data: &[u16], _: &cpal::InputCallbackInfo| {
                let samples = data.iter().map(|&s| s.to_sample::<f32>()).collect();
                forward(&notifier, &capturing, samples, sample_rate, channels)
            },
            on_error,
            None,
        ),
        other => {
            return Err(denied(format!("unsupported input sample format {:?}", other)));
        }
    }
    .map_err(|e| denied(format!("failed to build input stream: {}", e)))?;

    Ok(stream)
}

fn forward(
    notifier: &RecorderNotifier,
    capturing: &AtomicBool,
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
) {
    // Some hosts run the stream before play(); drop anything outside a session
    if !capturing.load(Ordering::SeqCst) || samples.is_empty() {
        return;
    }
    notifier(RecorderNotice::Data(AudioChunk::new(samples, sample_rate, channels)));
}

fn run_audio_thread(
    stream: cpal::Stream,
    capturing: Arc<AtomicBool>,
    notifier: RecorderNotifier,
    control: mpsc::Receiver<Control>,
) {
    for message in control {
        match message {
            Control::Start => {
                capturing.store(true, Ordering::SeqCst);
                if let Err(e) = stream.play() {
                    error!("Failed to start audio stream: {}", e);
                    capturing.store(false, Ordering::SeqCst);
                    notifier(RecorderNotice::Stopped);
                } else {
                    debug!("Audio stream started");
                }
            }
            Control::Stop => {
                capturing.store(false, Ordering::SeqCst);
                if let Err(e) = stream.pause() {
                    debug!("Failed to pause audio stream: {}", e);
                }
                debug!("Audio stream stopped");
                notifier(RecorderNotice::Stopped);
            }
        }
    }
    debug!("Capture thread exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_probe() {
        // Depends on the machine having an input device
        match CpalMicrophone::probe() {
            Ok(mic) => println!("✓ Input device available: {}", mic.device_name()),
            Err(e) => println!("⚠ No microphone (may be expected in CI): {}", e),
        }
    }

    #[test]
    fn test_forward_respects_capturing_flag() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        let notifier: RecorderNotifier = Arc::new(move |notice| {
            sink.lock().unwrap().push(notice);
        });
        let capturing = AtomicBool::new(false);

        forward(&notifier, &capturing, vec![0.1, 0.2], 48_000, 1);
        assert!(received.lock().unwrap().is_empty());

        capturing.store(true, Ordering::SeqCst);
        forward(&notifier, &capturing, Vec::new(), 48_000, 1);
        forward(&notifier, &capturing, vec![0.1, 0.2], 48_000, 1);

        let received = received.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(
            received[0],
            RecorderNotice::Data(AudioChunk::new(vec![0.1, 0.2], 48_000, 1))
        );
    }
}
