//! Notifications handled by the coordinator

use super::machine::RequestId;
use crate::recording::{Recorder, RecorderNotice};
use crate::speech::SpeechRequest;
use crate::Result;
use std::fmt;
use std::sync::Arc;

/// Everything the coordinator reacts to, in the order it happened
pub enum Event {
    Play(SpeechRequest),
    Pause,
    Resume,
    Stop,
    Record(SpeechRequest),
    /// The speech engine finished an utterance on its own
    UtteranceEnded,
    /// Data or stop notification from the active recorder
    Recorder(RecorderNotice),
    /// Answer to a microphone request
    MicrophoneResolved {
        request: RequestId,
        outcome: Result<Box<dyn Recorder>>,
    },
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Play(request) => f.debug_tuple("Play").field(request).finish(),
            Event::Pause => f.write_str("Pause"),
            Event::Resume => f.write_str("Resume"),
            Event::Stop => f.write_str("Stop"),
            Event::Record(request) => f.debug_tuple("Record").field(request).finish(),
            Event::UtteranceEnded => f.write_str("UtteranceEnded"),
            Event::Recorder(RecorderNotice::Data(chunk)) => {
                write!(f, "Recorder(Data({} samples))", chunk.samples.len())
            }
            Event::Recorder(RecorderNotice::Stopped) => f.write_str("Recorder(Stopped)"),
            Event::MicrophoneResolved { request, outcome } => f
                .debug_struct("MicrophoneResolved")
                .field("request", request)
                .field("granted", &outcome.is_ok())
                .finish(),
        }
    }
}

/// Where backends post their notifications; safe to call from any thread
pub type EventSink = Arc<dyn Fn(Event) + Send + Sync>;
