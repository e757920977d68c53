//! Speech engine abstraction
//!
//! Provides a unified interface for text-to-speech across platforms.
//! The playback coordinator drives an engine through this trait and learns
//! about finished utterances through the end-of-utterance callback.

use super::utterance::{Utterance, Voice};
use crate::platform::is_wsl;
use crate::{Result, TtsrecError};
use log::info;
use std::fmt;
use std::str::FromStr;

/// Called by a backend when an utterance finishes on its own
///
/// Not called for utterances ended through [`SpeechEngine::cancel`].
pub type EndCallback = Box<dyn FnMut() + Send>;

/// What a backend is able to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineFeatures {
    pub pause: bool,
    pub pitch: bool,
    pub rate: bool,
    pub voices: bool,
}

/// Snapshot of the engine's status flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineStatus {
    /// An utterance is in progress (also true while paused)
    pub speaking: bool,
    pub paused: bool,
    /// The backend supports pause/resume
    pub can_pause: bool,
}

/// Speech engine trait
///
/// All backends implement this to provide text-to-speech.
pub trait SpeechEngine: Send {
    /// Short backend name for logs and status output
    fn name(&self) -> &str;

    fn features(&self) -> EngineFeatures;

    /// Voices currently offered by the backend
    fn list_voices(&self) -> Result<Vec<Voice>>;

    /// Start speaking an utterance
    fn speak(&mut self, utterance: &Utterance) -> Result<()>;

    fn pause(&mut self) -> Result<()>;

    fn resume(&mut self) -> Result<()>;

    /// Cancel/silence current speech
    fn cancel(&mut self) -> Result<()>;

    fn is_speaking(&self) -> bool;

    fn is_paused(&self) -> bool;

    /// Set output volume (0-100)
    fn set_volume(&mut self, volume: u8) -> Result<()>;

    /// Register the end-of-utterance notification, replacing any previous one
    fn on_end(&mut self, callback: EndCallback) -> Result<()>;

    fn status(&self) -> EngineStatus {
        EngineStatus {
            speaking: self.is_speaking(),
            paused: self.is_paused(),
            can_pause: self.features().pause,
        }
    }
}

/// Which backend to create
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// Pick the best backend for this platform
    #[default]
    Auto,
    /// `tts` crate (Speech Dispatcher, AVFoundation, WinRT, ...)
    Native,
    /// `espeak-ng` subprocess
    Espeak,
}

impl FromStr for Backend {
    type Err = TtsrecError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Ok(Backend::Auto),
            "native" | "tts" => Ok(Backend::Native),
            "espeak" | "espeak-ng" => Ok(Backend::Espeak),
            other => Err(TtsrecError::Config(format!("Unknown speech backend '{}'", other))),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Backend::Auto => "auto",
            Backend::Native => "native",
            Backend::Espeak => "espeak",
        };
        f.write_str(name)
    }
}

type Factory = fn() -> Result<Box<dyn SpeechEngine>>;

fn create_native() -> Result<Box<dyn SpeechEngine>> {
    use super::backends::native::NativeEngine;
    Ok(Box::new(NativeEngine::new()?))
}

fn create_espeak() -> Result<Box<dyn SpeechEngine>> {
    use super::backends::espeak::EspeakEngine;
    Ok(Box::new(EspeakEngine::new()?))
}

/// Create a speech engine
///
/// With [`Backend::Auto`] the environment decides the order:
///
/// **WSL:** espeak-ng through the WSLg PulseAudio server first (the native
/// Speech Dispatcher route is rarely configured there), then native.
///
/// **Everything else:** native first (respects system preferences), then
/// espeak-ng.
///
/// When nothing works the error is [`TtsrecError::CapabilityUnavailable`].
pub fn create_engine(backend: Backend) -> Result<Box<dyn SpeechEngine>> {
    let platform = std::env::consts::OS;

    let native = (Backend::Native, create_native as Factory);
    let espeak = (Backend::Espeak, create_espeak as Factory);

    let order = match backend {
        Backend::Native => vec![native],
        Backend::Espeak => vec![espeak],
        Backend::Auto if platform == "linux" && is_wsl() => {
            info!("Detected WSL environment");
            vec![espeak, native]
        }
        Backend::Auto => vec![native, espeak],
    };

    let mut failures = Vec::new();
    for (candidate, create) in order {
        info!("Trying {} speech backend...", candidate);
        match create() {
            Ok(engine) => {
                info!("Initialized {} speech backend", engine.name());
                return Ok(engine);
            }
            Err(e) => {
                info!("{} speech backend unavailable: {}", candidate, e);
                failures.push(format!("{}: {}", candidate, e));
            }
        }
    }

    Err(TtsrecError::CapabilityUnavailable(format!(
        "Speech synthesis (platform '{}'; tried {})",
        platform,
        failures.join("; ")
    )))
}
