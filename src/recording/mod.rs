//! Audio recording
//!
//! ```text
//! Microphone::request → Recorder (start/stop)
//!   → RecorderNotice::Data(AudioChunk) → RecordingSession
//!   → RecorderNotice::Stopped → RecordingSession::finish → Recording (WAV)
//! ```

pub mod capture;
pub mod recorder;
pub mod session;

pub use capture::{CpalMicrophone, CpalRecorder};
pub use recorder::{AudioChunk, Microphone, PermissionCallback, Recorder, RecorderNotice, RecorderNotifier};
pub use session::{Recording, RecordingSession, RECORDING_FILE_NAME, RECORDING_MIME};
