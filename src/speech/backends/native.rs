//! Native Rust TTS backend using the tts crate
//!
//! This backend uses the `tts` crate which provides a unified interface to:
//! - Speech Dispatcher on Linux (via native bindings)
//! - AVFoundation on macOS/iOS (via native bindings)
//! - WinRT / SAPI on Windows
//!
//! None of these expose pause/resume through the crate, so this backend
//! reports `pause: false` and the coordinator leaves the Pause control inert.

use crate::speech::utterance::{scale_to_range, Utterance, Voice, MAX_PITCH, MAX_RATE};
use crate::speech::{EndCallback, EngineFeatures, SpeechEngine};
use crate::{Result, TtsrecError};
use log::{debug, error, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tts::Tts as TtsCrate;

/// How often the fallback watcher checks whether speech has finished
const END_POLL_INTERVAL: Duration = Duration::from_millis(100);

type SharedCallback = Arc<Mutex<Option<EndCallback>>>;

/// Native TTS backend using the tts crate
pub struct NativeEngine {
    /// The tts crate's TTS instance
    tts: TtsCrate,

    /// Set on speak, cleared by the end notification or cancel
    speaking: Arc<AtomicBool>,

    /// Coordinator's end-of-utterance notification
    on_end: SharedCallback,

    /// Voice active when the backend was created, restored for utterances
    /// without an explicit voice
    default_voice: Option<tts::Voice>,

    /// Id of the voice last applied through `set_voice`
    current_voice: Option<String>,

    features: tts::Features,
}

impl NativeEngine {
    /// Create a new native TTS engine
    ///
    /// Initializes the platform-appropriate TTS backend and hooks its
    /// utterance callbacks up to the end-of-utterance notification.
    pub fn new() -> Result<Self> {
        debug!("Creating native TTS backend");

        let tts = TtsCrate::default()
            .map_err(|e| TtsrecError::Speech(format!("Failed to initialize TTS: {}", e)))?;

        let features = tts.supported_features();
        let has_callbacks = features.utterance_callbacks;
        let has_status = features.is_speaking;
        let default_voice = if features.get_voice {
            tts.voice().ok().flatten()
        } else {
            None
        };

        let engine = Self {
            tts,
            speaking: Arc::new(AtomicBool::new(false)),
            on_end: Arc::new(Mutex::new(None)),
            current_voice: default_voice.as_ref().map(|v| v.id()),
            default_voice,
            features,
        };

        if has_callbacks {
            let speaking = engine.speaking.clone();
            let on_end = engine.on_end.clone();
            engine
                .tts
                .on_utterance_end(Some(Box::new(move |_id| {
                    finish_utterance(&speaking, &on_end);
                })))
                .map_err(|e| TtsrecError::Speech(format!("Failed to register callback: {}", e)))?;
        } else if !has_status {
            warn!("Backend reports neither utterance callbacks nor speaking status; end of speech will not be detected");
        }

        debug!("Native TTS backend created successfully");
        Ok(engine)
    }

    /// Convert a rate multiplier (1.0 = normal) to the backend's range
    fn convert_rate(&self, rate: f32) -> f32 {
        scale_to_range(
            rate,
            MAX_RATE,
            self.tts.min_rate(),
            self.tts.normal_rate(),
            self.tts.max_rate(),
        )
    }

    /// Convert a pitch multiplier (1.0 = normal) to the backend's range
    fn convert_pitch(&self, pitch: f32) -> f32 {
        scale_to_range(
            pitch,
            MAX_PITCH,
            self.tts.min_pitch(),
            self.tts.normal_pitch(),
            self.tts.max_pitch(),
        )
    }

    fn apply_voice(&mut self, voice: Option<&Voice>) -> Result<()> {
        if !self.features.voice {
            if voice.is_some() {
                warn!("Voice selection not supported on this platform");
            }
            return Ok(());
        }

        let target = match voice {
            Some(wanted) => self
                .tts
                .voices()
                .map_err(|e| TtsrecError::Speech(format!("Failed to get voices: {}", e)))?
                .into_iter()
                .find(|v| v.id() == wanted.id),
            None => self.default_voice.clone(),
        };

        let Some(target) = target else {
            return Ok(());
        };
        let id = target.id();
        if self.current_voice.as_deref() == Some(id.as_str()) {
            return Ok(());
        }

        debug!("Selecting voice: {}", target.name());
        self.tts
            .set_voice(&target)
            .map_err(|e| TtsrecError::Speech(format!("Failed to set voice: {}", e)))?;
        self.current_voice = Some(id);
        Ok(())
    }

    fn apply_prosody(&mut self, utterance: &Utterance) -> Result<()> {
        if self.features.rate {
            let rate = self.convert_rate(utterance.rate());
            self.tts
                .set_rate(rate)
                .map_err(|e| TtsrecError::Speech(format!("Failed to set rate: {}", e)))?;
        } else if utterance.rate() != 1.0 {
            warn!("Rate control not supported on this platform");
        }

        if self.features.pitch {
            let pitch = self.convert_pitch(utterance.pitch());
            self.tts
                .set_pitch(pitch)
                .map_err(|e| TtsrecError::Speech(format!("Failed to set pitch: {}", e)))?;
        } else if utterance.pitch() != 1.0 {
            warn!("Pitch control not supported on this platform");
        }

        Ok(())
    }

    /// Poll the backend until it stops speaking when it has no callbacks
    fn spawn_end_watcher(&self) {
        let tts = self.tts.clone();
        let speaking = self.speaking.clone();
        let on_end = self.on_end.clone();

        thread::spawn(move || {
            // Give the backend a moment to report that it started
            thread::sleep(END_POLL_INTERVAL);
            while speaking.load(Ordering::SeqCst) {
                match tts.is_speaking() {
                    Ok(true) => thread::sleep(END_POLL_INTERVAL),
                    Ok(false) => {
                        finish_utterance(&speaking, &on_end);
                        break;
                    }
                    Err(e) => {
                        warn!("Speaking status unavailable: {}", e);
                        break;
                    }
                }
            }
        });
    }
}

/// Clear the speaking flag and notify, unless the utterance was cancelled
fn finish_utterance(speaking: &AtomicBool, on_end: &Mutex<Option<EndCallback>>) {
    if !speaking.swap(false, Ordering::SeqCst) {
        return;
    }
    debug!("Utterance finished");
    if let Ok(mut guard) = on_end.lock() {
        if let Some(callback) = guard.as_mut() {
            callback();
        }
    }
}

impl SpeechEngine for NativeEngine {
    fn name(&self) -> &str {
        "native"
    }

    fn features(&self) -> EngineFeatures {
        EngineFeatures {
            pause: false,
            pitch: self.features.pitch,
            rate: self.features.rate,
            voices: self.features.voice,
        }
    }

    fn list_voices(&self) -> Result<Vec<Voice>> {
        if !self.features.voice {
            return Ok(Vec::new());
        }
        let voices = self
            .tts
            .voices()
            .map_err(|e| TtsrecError::Speech(format!("Failed to get voices: {}", e)))?;

        Ok(voices
            .into_iter()
            .map(|v| Voice::new(v.id(), v.name(), v.language().to_string()))
            .collect())
    }

    fn speak(&mut self, utterance: &Utterance) -> Result<()> {
        if utterance.text().trim().is_empty() {
            return Ok(());
        }

        self.apply_voice(utterance.voice())?;
        self.apply_prosody(utterance)?;

        debug!("Speaking: {}", utterance.text());
        self.speaking.store(true, Ordering::SeqCst);
        if let Err(e) = self.tts.speak(utterance.text(), false) {
            self.speaking.store(false, Ordering::SeqCst);
            error!("Failed to speak: {}", e);
            return Err(TtsrecError::Speech(format!("Speak failed: {}", e)));
        }

        if !self.features.utterance_callbacks && self.features.is_speaking {
            self.spawn_end_watcher();
        }

        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        Err(TtsrecError::Speech(
            "Pause is not supported by the native backend".to_string(),
        ))
    }

    fn resume(&mut self) -> Result<()> {
        Err(TtsrecError::Speech(
            "Resume is not supported by the native backend".to_string(),
        ))
    }

    fn cancel(&mut self) -> Result<()> {
        debug!("Canceling speech");
        // Cleared first so the stop does not surface as a natural end
        self.speaking.store(false, Ordering::SeqCst);
        self.tts.stop().map_err(|e| {
            error!("Failed to cancel speech: {}", e);
            TtsrecError::Speech(format!("Cancel failed: {}", e))
        })?;

        Ok(())
    }

    fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::SeqCst)
    }

    fn is_paused(&self) -> bool {
        false
    }

    fn set_volume(&mut self, volume: u8) -> Result<()> {
        debug!("Setting volume to {}", volume);
        if !self.features.volume {
            warn!("Volume control not supported on this platform");
            return Ok(());
        }

        let volume = scale_to_range(
            volume.min(100) as f32 / 100.0,
            1.0,
            self.tts.min_volume(),
            self.tts.max_volume(),
            self.tts.max_volume(),
        );
        self.tts
            .set_volume(volume)
            .map_err(|e| TtsrecError::Speech(format!("Failed to set volume: {}", e)))?;

        Ok(())
    }

    fn on_end(&mut self, callback: EndCallback) -> Result<()> {
        let mut guard = self
            .on_end
            .lock()
            .map_err(|_| TtsrecError::Speech("End callback lock poisoned".to_string()))?;
        *guard = Some(callback);
        Ok(())
    }
}
