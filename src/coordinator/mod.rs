//! Playback coordinator
//!
//! Keeps the speech engine, the recorder and the control surface in step.
//! Every notification runs to completion on the caller's thread: the
//! coordinator feeds it through the pure [`machine::transition`] function and
//! carries out the resulting effects against the injected services.

pub mod controls;
pub mod event;
pub mod machine;

pub use controls::{Affordance, Capabilities, Controls};
pub use event::{Event, EventSink};
pub use machine::{transition, ControlState, Effect, Input, MachineState, Playback, RecordingPhase, Rejection, RequestId};

use crate::recording::{
    AudioChunk, Microphone, Recorder, RecorderNotice, RecorderNotifier, Recording, RecordingSession,
};
use crate::speech::{SpeechEngine, SpeechRequest, Utterance, Voice};
use crate::ui::Surface;
use crate::{Result, TtsrecError};
use log::{debug, error, info, warn};
use std::sync::Arc;

pub struct Coordinator {
    engine: Box<dyn SpeechEngine>,
    microphone: Option<Box<dyn Microphone>>,
    surface: Box<dyn Surface>,
    sink: EventSink,

    state: MachineState,
    caps: Capabilities,

    /// Recorder of the current (or stopping) session
    recorder: Option<Box<dyn Recorder>>,
    /// Recorder delivered with a grant, until the machine accepts or discards it
    incoming: Option<Box<dyn Recorder>>,
    /// Reason delivered with a denial, until it is reported
    denial: Option<TtsrecError>,

    session: RecordingSession,
    last_recording: Option<Recording>,
    recordings_made: usize,

    /// What the surface currently shows
    rendered: Option<(ControlState, Controls)>,
}

impl Coordinator {
    /// Wire the services together
    ///
    /// Registers the engine's end-of-utterance notification with `sink` and
    /// renders the initial controls. Pass `None` for `microphone` when
    /// recording is unavailable; speech keeps working.
    pub fn new(
        mut engine: Box<dyn SpeechEngine>,
        microphone: Option<Box<dyn Microphone>>,
        surface: Box<dyn Surface>,
        sink: EventSink,
    ) -> Result<Self> {
        let end_sink = sink.clone();
        engine.on_end(Box::new(move || end_sink(Event::UtteranceEnded)))?;

        let caps = Capabilities {
            can_pause: engine.features().pause,
            can_record: microphone.is_some(),
        };
        info!(
            "Coordinator ready: engine {}, pause {}, recording {}",
            engine.name(),
            caps.can_pause,
            caps.can_record
        );

        let mut coordinator = Self {
            engine,
            microphone,
            surface,
            sink,
            state: MachineState::new(),
            caps,
            recorder: None,
            incoming: None,
            denial: None,
            session: RecordingSession::new(),
            last_recording: None,
            recordings_made: 0,
            rendered: None,
        };
        coordinator.render();
        Ok(coordinator)
    }

    /// Handle one notification
    pub fn handle(&mut self, event: Event) {
        debug!("Handling {:?}", event);
        match event {
            Event::Play(request) => self.play(request),
            Event::Pause => self.pause(),
            Event::Resume => self.resume(),
            Event::Stop => self.stop(),
            Event::Record(request) => self.start_recording(request),
            Event::UtteranceEnded => self.on_utterance_end(),
            Event::Recorder(RecorderNotice::Data(chunk)) => self.on_recording_data(chunk),
            Event::Recorder(RecorderNotice::Stopped) => self.on_recording_stop(),
            Event::MicrophoneResolved { request, outcome } => {
                self.on_microphone_resolved(request, outcome)
            }
        }
    }

    /// Speak `request` unless the engine is busy or the text is blank
    pub fn play(&mut self, request: SpeechRequest) {
        self.dispatch(Input::Play(request));
    }

    pub fn pause(&mut self) {
        self.dispatch(Input::Pause);
    }

    pub fn resume(&mut self) {
        self.dispatch(Input::Resume);
    }

    /// Cancel speech and any recording or pending microphone request
    pub fn stop(&mut self) {
        self.dispatch(Input::Stop);
    }

    pub fn on_utterance_end(&mut self) {
        self.dispatch(Input::UtteranceEnded);
    }

    /// Ask for the microphone; once granted, record while speaking `request`
    pub fn start_recording(&mut self, request: SpeechRequest) {
        if self.microphone.is_none() {
            self.report(&TtsrecError::CapabilityUnavailable(
                "Audio recording".to_string(),
            ));
            return;
        }
        self.dispatch(Input::Record(request));
    }

    pub fn on_recording_data(&mut self, chunk: AudioChunk) {
        if self.state.accepts_audio() {
            self.session.push(chunk);
        } else {
            debug!("Dropping {} samples outside a recording", chunk.samples.len());
        }
    }

    pub fn on_recording_stop(&mut self) {
        self.dispatch(Input::RecorderStopped);
    }

    pub fn on_microphone_resolved(&mut self, request: RequestId, outcome: Result<Box<dyn Recorder>>) {
        match outcome {
            Ok(recorder) => {
                info!("Microphone access granted (request {})", request);
                self.incoming = Some(recorder);
                self.dispatch(Input::MicrophoneGranted(request));
                self.incoming = None;
            }
            Err(e) => {
                warn!("Microphone access denied (request {}): {}", request, e);
                self.denial = Some(e);
                self.dispatch(Input::MicrophoneDenied(request));
                self.denial = None;
            }
        }
    }

    pub fn state(&self) -> ControlState {
        self.state.control_state()
    }

    pub fn machine(&self) -> &MachineState {
        &self.state
    }

    pub fn controls(&self) -> Controls {
        Controls::for_state(&self.state, self.caps)
    }

    /// Chunks collected by the current session
    pub fn session(&self) -> &RecordingSession {
        &self.session
    }

    pub fn last_recording(&self) -> Option<&Recording> {
        self.last_recording.as_ref()
    }

    /// Number of recordings assembled so far
    pub fn recordings_made(&self) -> usize {
        self.recordings_made
    }

    pub fn engine(&self) -> &dyn SpeechEngine {
        self.engine.as_ref()
    }

    pub fn surface_mut(&mut self) -> &mut dyn Surface {
        self.surface.as_mut()
    }

    pub fn list_voices(&self) -> Result<Vec<Voice>> {
        self.engine.list_voices()
    }

    fn dispatch(&mut self, input: Input) {
        let status = self.engine.status();
        let (next, effects) = transition(self.state.clone(), input, status);
        self.state = next;
        for effect in effects {
            self.apply(effect);
        }
        self.render();
    }

    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::Speak(request) => self.speak(&request),

            Effect::PauseEngine => {
                if let Err(e) = self.engine.pause() {
                    self.report(&e);
                    self.state.playback = Playback::Speaking;
                }
            }

            Effect::ResumeEngine => {
                if let Err(e) = self.engine.resume() {
                    self.report(&e);
                    self.state.playback = Playback::Paused;
                }
            }

            Effect::CancelEngine => {
                if let Err(e) = self.engine.cancel() {
                    warn!("Cancel failed: {}", e);
                }
            }

            Effect::RequestMicrophone(id) => self.request_microphone(id),

            Effect::AcceptRecorder => {
                self.recorder = self.incoming.take();
                self.session = RecordingSession::new();
            }

            Effect::DiscardRecorder => {
                if self.incoming.take().is_some() {
                    debug!("Discarding recorder from a cancelled request");
                }
            }

            Effect::StartRecorder => {
                let result = match self.recorder.as_mut() {
                    Some(recorder) => recorder.start(),
                    None => Err(TtsrecError::Recorder("no recorder to start".to_string())),
                };
                match result {
                    Ok(()) => {
                        info!("Recording started");
                        self.dispatch(Input::RecorderStarted);
                    }
                    Err(e) => {
                        self.report(&e);
                        self.dispatch(Input::RecorderFailed);
                    }
                }
            }

            Effect::StopRecorder => {
                let result = match self.recorder.as_mut() {
                    Some(recorder) => recorder.stop(),
                    None => Err(TtsrecError::Recorder("no recorder to stop".to_string())),
                };
                if let Err(e) = result {
                    // No stop notification will come; assemble what we have
                    warn!("Recorder stop failed: {}", e);
                    self.dispatch(Input::RecorderStopped);
                }
            }

            Effect::AssembleRecording => self.assemble_recording(),

            Effect::ReleaseRecorder => {
                self.recorder = None;
            }

            Effect::ReportPermissionDenied => {
                let err = match self.denial.take() {
                    Some(TtsrecError::PermissionDenied(reason)) => TtsrecError::PermissionDenied(reason),
                    Some(other) => TtsrecError::PermissionDenied(other.to_string()),
                    None => TtsrecError::PermissionDenied("access refused".to_string()),
                };
                self.report(&err);
            }

            Effect::Reject(rejection) => self.reject(rejection),
        }
    }

    fn speak(&mut self, request: &SpeechRequest) {
        let voices = if request.voice.is_some() {
            self.engine.list_voices().unwrap_or_else(|e| {
                warn!("Voice list unavailable: {}", e);
                Vec::new()
            })
        } else {
            Vec::new()
        };

        let utterance = Utterance::from_request(request, &voices);
        if let Err(e) = self.engine.speak(&utterance) {
            error!("Speech failed: {}", e);
            self.report(&e);
            self.dispatch(Input::SpeakFailed);
        }
    }

    fn request_microphone(&mut self, id: RequestId) {
        let Some(microphone) = self.microphone.as_ref() else {
            self.denial = Some(TtsrecError::CapabilityUnavailable("Audio recording".to_string()));
            self.dispatch(Input::MicrophoneDenied(id));
            return;
        };

        let data_sink = self.sink.clone();
        let notifier: RecorderNotifier = Arc::new(move |notice| data_sink(Event::Recorder(notice)));

        let answer_sink = self.sink.clone();
        microphone.request(
            notifier,
            Box::new(move |outcome| {
                answer_sink(Event::MicrophoneResolved {
                    request: id,
                    outcome,
                })
            }),
        );
    }

    fn assemble_recording(&mut self) {
        match self.session.finish() {
            Ok(recording) => {
                self.recordings_made += 1;
                info!(
                    "Recording assembled: {:.1}s, {} bytes",
                    recording.duration().as_secs_f32(),
                    recording.bytes().len()
                );
                if let Err(e) = self.surface.present_recording(&recording) {
                    self.report(&e);
                }
                self.last_recording = Some(recording);
            }
            Err(e) => self.report(&e),
        }
    }

    fn reject(&mut self, rejection: Rejection) {
        match rejection {
            Rejection::AlreadySpeaking => self.report(&TtsrecError::AlreadyActive),
            Rejection::EmptyText => self.report(&TtsrecError::InvalidInput("nothing to speak".to_string())),
            Rejection::PauseUnsupported => warn!("The speech backend cannot pause"),
            Rejection::NotSpeaking => debug!("Nothing to pause"),
            Rejection::NotPaused => debug!("Nothing to resume"),
            Rejection::RecorderBusy => debug!("A recording is already in progress"),
            Rejection::StaleRequest => debug!("Ignoring answer to a cancelled microphone request"),
            Rejection::NotRecording => debug!("Ignoring recorder notification outside a recording"),
            Rejection::StaleUtteranceEnd => debug!("Ignoring end of an earlier utterance"),
        }
    }

    /// Show `err` on the surface, or only log it when it is not for the user
    fn report(&mut self, err: &TtsrecError) {
        if err.is_user_facing() {
            self.surface.report(err);
        } else {
            warn!("Ignored: {}", err);
        }
    }

    fn render(&mut self) {
        let current = (self.state(), self.controls());
        if self.rendered.as_ref() == Some(&current) {
            return;
        }
        self.surface.render(current.0, &current.1);
        self.rendered = Some(current);
    }
}
