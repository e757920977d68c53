//! Utterances and the voices they are spoken with

use log::debug;
use serde::Serialize;

/// Lowest accepted pitch multiplier
pub const MIN_PITCH: f32 = 0.0;
/// Highest accepted pitch multiplier
pub const MAX_PITCH: f32 = 2.0;
/// Lowest accepted rate multiplier
pub const MIN_RATE: f32 = 0.1;
/// Highest accepted rate multiplier
pub const MAX_RATE: f32 = 10.0;

/// A voice offered by a speech engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Voice {
    /// Backend-specific identifier used to select the voice
    pub id: String,
    /// Human readable name, matched exactly when resolving a voice
    pub name: String,
    /// Language tag (e.g. "en-US")
    pub language: String,
}

impl Voice {
    pub fn new(id: impl Into<String>, name: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            language: language.into(),
        }
    }
}

/// What the user asked to have spoken
///
/// Pitch and rate are multipliers where 1.0 is the engine's normal value.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechRequest {
    pub text: String,
    /// Voice name, or `None` for the engine default
    pub voice: Option<String>,
    pub pitch: f32,
    pub rate: f32,
}

impl SpeechRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice: None,
            pitch: 1.0,
            rate: 1.0,
        }
    }

    pub fn with_voice(mut self, voice: Option<String>) -> Self {
        self.voice = voice;
        self
    }

    pub fn with_pitch(mut self, pitch: f32) -> Self {
        self.pitch = pitch;
        self
    }

    pub fn with_rate(mut self, rate: f32) -> Self {
        self.rate = rate;
        self
    }

    /// Whitespace-only text is never spoken
    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

/// A single submission to a speech engine
///
/// Built fresh for every play action from a [`SpeechRequest`] with the voice
/// already resolved against the engine's voice list.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    text: String,
    voice: Option<Voice>,
    pitch: f32,
    rate: f32,
}

impl Utterance {
    /// Build an utterance, resolving the requested voice name against `voices`
    pub fn from_request(request: &SpeechRequest, voices: &[Voice]) -> Self {
        let voice = request
            .voice
            .as_deref()
            .and_then(|name| resolve_voice(voices, name))
            .cloned();

        Self {
            text: request.text.clone(),
            voice,
            pitch: clamp_pitch(request.pitch),
            rate: clamp_rate(request.rate),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Resolved voice; `None` means the engine default
    pub fn voice(&self) -> Option<&Voice> {
        self.voice.as_ref()
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }
}

/// Find a voice by exact name
pub fn resolve_voice<'a>(voices: &'a [Voice], name: &str) -> Option<&'a Voice> {
    let found = voices.iter().find(|v| v.name == name);
    if found.is_none() {
        debug!("Voice {:?} not found, using engine default", name);
    }
    found
}

pub fn clamp_pitch(pitch: f32) -> f32 {
    if pitch.is_nan() {
        return 1.0;
    }
    pitch.clamp(MIN_PITCH, MAX_PITCH)
}

pub fn clamp_rate(rate: f32) -> f32 {
    if rate.is_nan() {
        return 1.0;
    }
    rate.clamp(MIN_RATE, MAX_RATE)
}

/// Scale a multiplier onto a backend range around its normal value
///
/// Values below 1.0 interpolate between `min` and `normal`, values above
/// between `normal` and `max`, so 0.0 maps to `min` and `max_multiplier`
/// maps to `max`.
pub fn scale_to_range(multiplier: f32, max_multiplier: f32, min: f32, normal: f32, max: f32) -> f32 {
    let value = if multiplier <= 1.0 {
        min + (normal - min) * multiplier.max(0.0)
    } else {
        let span = (max_multiplier - 1.0).max(f32::EPSILON);
        normal + (max - normal) * ((multiplier - 1.0) / span).min(1.0)
    };
    value.clamp(min.min(max), max.max(min))
}
