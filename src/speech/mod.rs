//! Speech synthesis system

pub mod backends;
pub mod engine;
pub mod utterance;

pub use engine::{create_engine, Backend, EndCallback, EngineFeatures, EngineStatus, SpeechEngine};
pub use utterance::{resolve_voice, SpeechRequest, Utterance, Voice};
