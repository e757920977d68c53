//! Playback state machine
//!
//! A pure transition function: given the current [`MachineState`], an
//! [`Input`] and a snapshot of the speech engine's status flags, it returns
//! the next state and the [`Effect`]s the coordinator must carry out.
//!
//! ```text
//! Idle ──play──▶ Speaking ──pause──▶ Paused ──resume──▶ Speaking
//! Speaking / Paused ──stop / utterance end──▶ Idle
//! Idle ──record──▶ Idle (requesting) ──granted──▶ Idle (starting)
//!                                    ──denied───▶ Idle
//! Idle (starting) ──recorder started──▶ Speaking + recording
//!                 ──recorder failed───▶ Idle
//! ```
//!
//! Speech for a recording only begins once the recorder has started, so a
//! recorder that fails to start never leaves speech running on its own.
//!
//! Recording is tracked separately from playback; whenever playback returns
//! to `Idle` an active recording is stopped.

use crate::speech::{EngineStatus, SpeechRequest};
use serde::Serialize;
use std::fmt;

/// Identifies one microphone request so late answers can be recognised
pub type RequestId = u64;

/// Observable control state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ControlState {
    Idle,
    Speaking,
    Paused,
    RecordingAndSpeaking,
}

impl ControlState {
    /// A short human-readable label for the status line
    pub fn label(&self) -> &'static str {
        match self {
            ControlState::Idle => "Idle",
            ControlState::Speaking => "Speaking",
            ControlState::Paused => "Paused",
            ControlState::RecordingAndSpeaking => "Recording",
        }
    }
}

impl fmt::Display for ControlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What the speech side is doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Playback {
    Idle,
    Speaking,
    Paused,
}

/// What the recording side is doing
#[derive(Debug, Clone, PartialEq)]
pub enum RecordingPhase {
    Inactive,
    /// Waiting for microphone access; `request` is spoken once granted
    Requesting { id: RequestId, request: SpeechRequest },
    /// Recorder granted and told to start; `request` is spoken once it has
    Starting { request: SpeechRequest },
    Active,
    /// Stop was sent, waiting for the recorder's stop notification
    Stopping,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MachineState {
    pub playback: Playback,
    pub recording: RecordingPhase,
    next_request: RequestId,
}

impl MachineState {
    pub fn new() -> Self {
        Self {
            playback: Playback::Idle,
            recording: RecordingPhase::Inactive,
            next_request: 1,
        }
    }

    pub fn with_playback(mut self, playback: Playback) -> Self {
        self.playback = playback;
        self
    }

    pub fn with_recording(mut self, recording: RecordingPhase) -> Self {
        self.recording = recording;
        self
    }

    pub fn control_state(&self) -> ControlState {
        match (self.playback, &self.recording) {
            (Playback::Idle, _) => ControlState::Idle,
            (Playback::Paused, _) => ControlState::Paused,
            (Playback::Speaking, RecordingPhase::Active) => ControlState::RecordingAndSpeaking,
            (Playback::Speaking, _) => ControlState::Speaking,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.recording == RecordingPhase::Active
    }

    /// Waiting for microphone access or for the recorder to start
    pub fn is_requesting(&self) -> bool {
        matches!(
            self.recording,
            RecordingPhase::Requesting { .. } | RecordingPhase::Starting { .. }
        )
    }

    /// Recorder data is still expected
    pub fn accepts_audio(&self) -> bool {
        matches!(self.recording, RecordingPhase::Active | RecordingPhase::Stopping)
    }
}

impl Default for MachineState {
    fn default() -> Self {
        Self::new()
    }
}

/// Something that happened
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Play(SpeechRequest),
    Pause,
    Resume,
    Stop,
    UtteranceEnded,
    Record(SpeechRequest),
    MicrophoneGranted(RequestId),
    MicrophoneDenied(RequestId),
    /// The recorder accepted the start command
    RecorderStarted,
    /// The recorder reported its stop
    RecorderStopped,
    /// The recorder could not be started or stopped
    RecorderFailed,
    /// The engine refused an utterance
    SpeakFailed,
}

/// Why an input caused no transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    EmptyText,
    AlreadySpeaking,
    NotSpeaking,
    NotPaused,
    PauseUnsupported,
    /// A microphone request or recording is already in progress
    RecorderBusy,
    /// Answer to a cancelled or superseded microphone request
    StaleRequest,
    NotRecording,
    /// End notice for an utterance the engine has already moved past
    StaleUtteranceEnd,
}

/// Work for the coordinator
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Speak(SpeechRequest),
    PauseEngine,
    ResumeEngine,
    CancelEngine,
    RequestMicrophone(RequestId),
    /// Keep the recorder that arrived with the grant
    AcceptRecorder,
    /// Drop the recorder that arrived with a stale grant
    DiscardRecorder,
    StartRecorder,
    StopRecorder,
    /// Turn the session's chunks into a recording and present it
    AssembleRecording,
    ReleaseRecorder,
    ReportPermissionDenied,
    Reject(Rejection),
}

/// Compute the next state and the effects of `input`
pub fn transition(
    mut state: MachineState,
    input: Input,
    engine: EngineStatus,
) -> (MachineState, Vec<Effect>) {
    let mut effects = Vec::new();

    match input {
        Input::Play(request) => {
            if state.is_requesting() {
                effects.push(Effect::Reject(Rejection::RecorderBusy));
            } else {
                play(&mut state, request, engine, &mut effects);
            }
        }

        Input::Pause => {
            if !engine.speaking || engine.paused {
                effects.push(Effect::Reject(Rejection::NotSpeaking));
            } else if !engine.can_pause {
                effects.push(Effect::Reject(Rejection::PauseUnsupported));
            } else {
                effects.push(Effect::PauseEngine);
                state.playback = Playback::Paused;
            }
        }

        Input::Resume => {
            if engine.paused {
                effects.push(Effect::ResumeEngine);
                state.playback = Playback::Speaking;
            } else {
                effects.push(Effect::Reject(Rejection::NotPaused));
            }
        }

        Input::Stop => {
            effects.push(Effect::CancelEngine);
            state.playback = Playback::Idle;
            match state.recording {
                RecordingPhase::Active => {
                    effects.push(Effect::StopRecorder);
                    state.recording = RecordingPhase::Stopping;
                }
                // Forgetting the request makes its answer stale
                RecordingPhase::Requesting { .. } => {
                    state.recording = RecordingPhase::Inactive;
                }
                RecordingPhase::Starting { .. } => {
                    effects.push(Effect::ReleaseRecorder);
                    state.recording = RecordingPhase::Inactive;
                }
                RecordingPhase::Inactive | RecordingPhase::Stopping => {}
            }
        }

        // Queued behind a newer utterance; the engine is still speaking that one
        Input::UtteranceEnded if engine.speaking => {
            effects.push(Effect::Reject(Rejection::StaleUtteranceEnd));
        }

        Input::UtteranceEnded | Input::SpeakFailed => {
            state.playback = Playback::Idle;
            stop_active_recording(&mut state, &mut effects);
        }

        Input::Record(request) => {
            if state.recording != RecordingPhase::Inactive {
                effects.push(Effect::Reject(Rejection::RecorderBusy));
            } else if engine.speaking || state.playback != Playback::Idle {
                effects.push(Effect::Reject(Rejection::AlreadySpeaking));
            } else if !request.has_text() {
                effects.push(Effect::Reject(Rejection::EmptyText));
            } else {
                let id = state.next_request;
                state.next_request += 1;
                state.recording = RecordingPhase::Requesting { id, request };
                effects.push(Effect::RequestMicrophone(id));
            }
        }

        Input::MicrophoneGranted(id) => match std::mem::replace(&mut state.recording, RecordingPhase::Inactive) {
            RecordingPhase::Requesting { id: pending, request } if pending == id => {
                effects.push(Effect::AcceptRecorder);
                effects.push(Effect::StartRecorder);
                state.recording = RecordingPhase::Starting { request };
            }
            other => {
                state.recording = other;
                effects.push(Effect::DiscardRecorder);
                effects.push(Effect::Reject(Rejection::StaleRequest));
            }
        },

        Input::MicrophoneDenied(id) => match &state.recording {
            RecordingPhase::Requesting { id: pending, .. } if *pending == id => {
                state.recording = RecordingPhase::Inactive;
                effects.push(Effect::ReportPermissionDenied);
            }
            _ => effects.push(Effect::Reject(Rejection::StaleRequest)),
        },

        Input::RecorderStarted => match std::mem::replace(&mut state.recording, RecordingPhase::Inactive) {
            RecordingPhase::Starting { request } => {
                state.recording = RecordingPhase::Active;
                if !play(&mut state, request, engine, &mut effects) {
                    // Nothing to record without speech
                    stop_active_recording(&mut state, &mut effects);
                }
            }
            other => {
                state.recording = other;
                effects.push(Effect::Reject(Rejection::NotRecording));
            }
        },

        Input::RecorderStopped => {
            if state.accepts_audio() {
                state.recording = RecordingPhase::Inactive;
                effects.push(Effect::AssembleRecording);
                effects.push(Effect::ReleaseRecorder);
            } else {
                effects.push(Effect::Reject(Rejection::NotRecording));
            }
        }

        Input::RecorderFailed => {
            if state.accepts_audio() || matches!(state.recording, RecordingPhase::Starting { .. }) {
                state.recording = RecordingPhase::Inactive;
                effects.push(Effect::ReleaseRecorder);
            } else {
                effects.push(Effect::Reject(Rejection::NotRecording));
            }
        }
    }

    (state, effects)
}

/// Shared by Play and a granted Record; returns whether speech was started
fn play(
    state: &mut MachineState,
    request: SpeechRequest,
    engine: EngineStatus,
    effects: &mut Vec<Effect>,
) -> bool {
    if engine.speaking {
        effects.push(Effect::Reject(Rejection::AlreadySpeaking));
        return false;
    }
    if !request.has_text() {
        effects.push(Effect::Reject(Rejection::EmptyText));
        return false;
    }

    effects.push(Effect::Speak(request));
    state.playback = Playback::Speaking;
    true
}

fn stop_active_recording(state: &mut MachineState, effects: &mut Vec<Effect>) {
    if state.recording == RecordingPhase::Active {
        effects.push(Effect::StopRecorder);
        state.recording = RecordingPhase::Stopping;
    }
}
