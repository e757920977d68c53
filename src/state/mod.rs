//! Application state management
//!
//! [`FormState`] holds what the user has entered so far: the text, the
//! chosen voice, pitch and rate. Every play or record command snapshots it
//! into a [`SpeechRequest`].

pub mod config;

use crate::speech::{utterance, SpeechRequest};
use config::Config;
use log::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct FormState {
    text: String,
    voice: Option<String>,
    pitch: f32,
    rate: f32,
}

impl Default for FormState {
    fn default() -> Self {
        Self {
            text: String::new(),
            voice: None,
            pitch: 1.0,
            rate: 1.0,
        }
    }
}

impl FormState {
    /// Start from the configured defaults
    pub fn from_config(config: &Config) -> Self {
        Self {
            text: String::new(),
            voice: config.voice(),
            pitch: config.pitch(),
            rate: config.rate(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        debug!("Text set ({} chars)", self.text.chars().count());
    }

    pub fn voice(&self) -> Option<&str> {
        self.voice.as_deref()
    }

    pub fn set_voice(&mut self, voice: Option<String>) {
        self.voice = voice.filter(|v| !v.trim().is_empty());
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Returns the value actually stored
    pub fn set_pitch(&mut self, pitch: f32) -> f32 {
        self.pitch = utterance::clamp_pitch(pitch);
        self.pitch
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    /// Returns the value actually stored
    pub fn set_rate(&mut self, rate: f32) -> f32 {
        self.rate = utterance::clamp_rate(rate);
        self.rate
    }

    /// Snapshot of the current fields
    pub fn to_request(&self) -> SpeechRequest {
        SpeechRequest::new(self.text.clone())
            .with_voice(self.voice.clone())
            .with_pitch(self.pitch)
            .with_rate(self.rate)
    }

    /// Short description for `:status`
    pub fn summary(&self) -> String {
        format!(
            "Text: {:?} | voice: {} | pitch {:.2} | rate {:.2}",
            self.text,
            self.voice.as_deref().unwrap_or("default"),
            self.pitch,
            self.rate
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_snapshot() {
        let mut form = FormState::default();
        form.set_text("Hello world");
        form.set_voice(Some("English".into()));
        assert_eq!(form.set_pitch(5.0), 2.0);
        assert_eq!(form.set_rate(0.0), 0.1);

        let request = form.to_request();
        assert_eq!(request.text, "Hello world");
        assert_eq!(request.voice.as_deref(), Some("English"));
        assert_eq!(request.pitch, 2.0);
        assert_eq!(request.rate, 0.1);

        // Later edits do not touch an earlier snapshot
        form.set_text("changed");
        assert_eq!(request.text, "Hello world");
    }

    #[test]
    fn test_blank_voice_means_default() {
        let mut form = FormState::default();
        form.set_voice(Some("  ".into()));
        assert_eq!(form.voice(), None);
    }
}
