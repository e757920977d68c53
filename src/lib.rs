//! ttsrec - terminal text-to-speech player and recorder
//!
//! Speaks text through the platform speech engine with play, pause, resume
//! and stop controls, and can capture the microphone while speaking to
//! produce a downloadable WAV recording.

pub mod app;
pub mod clipboard;
pub mod coordinator;
pub mod error;
pub mod input;
pub mod platform;
pub mod recording;
pub mod speech;
pub mod state;
pub mod ui;

pub use error::{Result, TtsrecError};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_NAME: &str = "ttsrec";
