//! Recorder capability
//!
//! A [`Microphone`] hands out [`Recorder`]s once access is granted. Recorders
//! report captured audio and their own stop through a [`RecorderNotifier`],
//! which may be called from any thread.

use crate::Result;
use std::sync::Arc;

/// A single buffer of raw audio as delivered by the capture callback.
///
/// Samples are interleaved `f32` in the range `[-1.0, 1.0]`.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioChunk {
    /// Interleaved PCM samples in `[-1.0, 1.0]`.
    pub samples: Vec<f32>,
    /// Sample rate of this chunk in Hz (e.g. 44100, 48000).
    pub sample_rate: u32,
    /// Number of interleaved channels (1 = mono, 2 = stereo, …).
    pub channels: u16,
}

impl AudioChunk {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Number of sample frames (one sample per channel)
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }
}

/// Notifications a recorder sends back to its owner
#[derive(Debug, Clone, PartialEq)]
pub enum RecorderNotice {
    /// A chunk of captured audio is available
    Data(AudioChunk),
    /// The recorder has stopped; no more data follows for this session
    Stopped,
}

/// Receives [`RecorderNotice`]s, possibly from an audio thread
pub type RecorderNotifier = Arc<dyn Fn(RecorderNotice) + Send + Sync>;

/// An acquired audio recorder
pub trait Recorder: Send {
    /// Begin a recording session
    fn start(&mut self) -> Result<()>;

    /// End the session
    ///
    /// Returns immediately; [`RecorderNotice::Stopped`] follows once the
    /// device has actually stopped.
    fn stop(&mut self) -> Result<()>;

    /// True between `start` and `stop`
    fn is_active(&self) -> bool;
}

/// Delivers the outcome of a microphone request: a recorder on grant,
/// [`crate::TtsrecError::PermissionDenied`] on denial
pub type PermissionCallback = Box<dyn FnOnce(Result<Box<dyn Recorder>>) + Send>;

/// Source of recorders
pub trait Microphone {
    /// Ask for microphone access without blocking
    ///
    /// `respond` is called exactly once, usually from another thread. The
    /// granted recorder sends its notices to `notifier`.
    fn request(&self, notifier: RecorderNotifier, respond: PermissionCallback);
}
