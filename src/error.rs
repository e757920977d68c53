//! Error types for ttsrec

use std::io;
use thiserror::Error;

/// Main error type for ttsrec
#[derive(Error, Debug)]
pub enum TtsrecError {
    /// A host capability (speech engine, microphone) is missing entirely
    #[error("{0} is not available on this system")]
    CapabilityUnavailable(String),

    /// Microphone access was refused or the device could not be opened
    #[error("Unable to access the microphone: {0}")]
    PermissionDenied(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An utterance is already being spoken
    #[error("Speech synthesis is already speaking")]
    AlreadyActive,

    #[error("Speech synthesis error: {0}")]
    Speech(String),

    #[error("Recorder error: {0}")]
    Recorder(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("INI parse error: {0}")]
    IniParse(String),

    #[error("WAV encoding error: {0}")]
    Wav(#[from] hound::Error),

    #[error("{0}")]
    Other(String),
}

impl TtsrecError {
    /// Errors the user should be told about, as opposed to ones that are
    /// only logged and absorbed.
    pub fn is_user_facing(&self) -> bool {
        !matches!(
            self,
            TtsrecError::InvalidInput(_) | TtsrecError::AlreadyActive
        )
    }
}

/// Result type alias for ttsrec operations
pub type Result<T> = std::result::Result<T, TtsrecError>;

impl From<String> for TtsrecError {
    fn from(s: String) -> Self {
        TtsrecError::Other(s)
    }
}

impl From<&str> for TtsrecError {
    fn from(s: &str) -> Self {
        TtsrecError::Other(s.to_string())
    }
}

impl From<serde_json::Error> for TtsrecError {
    fn from(e: serde_json::Error) -> Self {
        TtsrecError::Other(format!("JSON error: {}", e))
    }
}
