//! Playback coordinator tests
//!
//! Drive the coordinator with in-memory engine, microphone and surface
//! doubles. Notifications posted through the event sink are queued and
//! handled by `pump`, the way the event loop would.

use std::sync::{Arc, Mutex};
use ttsrec::coordinator::{Affordance, ControlState, Controls, Coordinator, Event, EventSink, RecordingPhase};
use ttsrec::recording::{
    AudioChunk, Microphone, PermissionCallback, Recorder, RecorderNotice, RecorderNotifier, Recording,
};
use ttsrec::speech::{EndCallback, EngineFeatures, SpeechEngine, SpeechRequest, Utterance, Voice};
use ttsrec::ui::Surface;
use ttsrec::{Result, TtsrecError};

// Speech engine double

#[derive(Default)]
struct EngineLog {
    /// (text, resolved voice name, pitch, rate)
    spoken: Vec<(String, Option<String>, f32, f32)>,
    speaking: bool,
    paused: bool,
    cancels: usize,
    on_end: Option<EndCallback>,
}

#[derive(Clone)]
struct MockEngine {
    log: Arc<Mutex<EngineLog>>,
    can_pause: bool,
}

impl MockEngine {
    fn new(can_pause: bool) -> Self {
        Self {
            log: Arc::new(Mutex::new(EngineLog::default())),
            can_pause,
        }
    }

    /// The utterance ends on its own
    fn finish(&self) {
        let callback = {
            let mut log = self.log.lock().unwrap();
            log.speaking = false;
            log.paused = false;
            log.on_end.take()
        };
        if let Some(mut callback) = callback {
            callback();
            self.log.lock().unwrap().on_end = Some(callback);
        }
    }

    fn spoken(&self) -> Vec<(String, Option<String>, f32, f32)> {
        self.log.lock().unwrap().spoken.clone()
    }

    fn cancels(&self) -> usize {
        self.log.lock().unwrap().cancels
    }
}

impl SpeechEngine for MockEngine {
    fn name(&self) -> &str {
        "mock"
    }

    fn features(&self) -> EngineFeatures {
        EngineFeatures {
            pause: self.can_pause,
            pitch: true,
            rate: true,
            voices: true,
        }
    }

    fn list_voices(&self) -> Result<Vec<Voice>> {
        Ok(vec![
            Voice::new("en-gb", "Google UK English Female", "en-GB"),
            Voice::new("en-us", "English (America)", "en-US"),
        ])
    }

    fn speak(&mut self, utterance: &Utterance) -> Result<()> {
        let mut log = self.log.lock().unwrap();
        log.spoken.push((
            utterance.text().to_string(),
            utterance.voice().map(|v| v.name.clone()),
            utterance.pitch(),
            utterance.rate(),
        ));
        log.speaking = true;
        log.paused = false;
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        if !self.can_pause {
            return Err(TtsrecError::Speech("pause unsupported".into()));
        }
        self.log.lock().unwrap().paused = true;
        Ok(())
    }

    fn resume(&mut self) -> Result<()> {
        self.log.lock().unwrap().paused = false;
        Ok(())
    }

    fn cancel(&mut self) -> Result<()> {
        let mut log = self.log.lock().unwrap();
        log.speaking = false;
        log.paused = false;
        log.cancels += 1;
        Ok(())
    }

    fn is_speaking(&self) -> bool {
        self.log.lock().unwrap().speaking
    }

    fn is_paused(&self) -> bool {
        self.log.lock().unwrap().paused
    }

    fn set_volume(&mut self, _volume: u8) -> Result<()> {
        Ok(())
    }

    fn on_end(&mut self, callback: EndCallback) -> Result<()> {
        self.log.lock().unwrap().on_end = Some(callback);
        Ok(())
    }
}

// Microphone and recorder doubles

#[derive(Default)]
struct RecorderLog {
    starts: usize,
    stops: usize,
    active: bool,
    /// Make `start` fail, like a device unplugged after the grant
    fail_start: bool,
    notifier: Option<RecorderNotifier>,
}

struct MockRecorder {
    log: Arc<Mutex<RecorderLog>>,
    notifier: RecorderNotifier,
}

impl Recorder for MockRecorder {
    fn start(&mut self) -> Result<()> {
        let mut log = self.log.lock().unwrap();
        log.starts += 1;
        if log.fail_start {
            return Err(TtsrecError::Recorder("input device disappeared".into()));
        }
        log.active = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        {
            let mut log = self.log.lock().unwrap();
            log.stops += 1;
            log.active = false;
        }
        (self.notifier)(RecorderNotice::Stopped);
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.log.lock().unwrap().active
    }
}

type PendingRequest = (RecorderNotifier, PermissionCallback);

#[derive(Clone, Default)]
struct MockMicrophone {
    pending: Arc<Mutex<Vec<PendingRequest>>>,
    recorder: Arc<Mutex<RecorderLog>>,
}

impl MockMicrophone {
    fn pending(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    fn grant_next(&self) {
        let (notifier, respond) = self.pending.lock().unwrap().remove(0);
        self.recorder.lock().unwrap().notifier = Some(notifier.clone());
        let recorder = MockRecorder {
            log: self.recorder.clone(),
            notifier,
        };
        respond(Ok(Box::new(recorder)));
    }

    fn deny_next(&self) {
        let (_, respond) = self.pending.lock().unwrap().remove(0);
        respond(Err(TtsrecError::PermissionDenied("Permission denied by user".into())));
    }

    /// Deliver audio the way an audio thread would
    fn send_data(&self, samples: Vec<f32>) {
        let notifier = self.recorder.lock().unwrap().notifier.clone();
        if let Some(notifier) = notifier {
            notifier(RecorderNotice::Data(AudioChunk::new(samples, 8_000, 1)));
        }
    }

    fn fail_starts(&self) {
        self.recorder.lock().unwrap().fail_start = true;
    }

    fn starts(&self) -> usize {
        self.recorder.lock().unwrap().starts
    }

    fn stops(&self) -> usize {
        self.recorder.lock().unwrap().stops
    }
}

impl Microphone for MockMicrophone {
    fn request(&self, notifier: RecorderNotifier, respond: PermissionCallback) {
        self.pending.lock().unwrap().push((notifier, respond));
    }
}

// Surface double

#[derive(Default)]
struct SurfaceLog {
    renders: Vec<(ControlState, Controls)>,
    reports: Vec<String>,
    recordings: Vec<Recording>,
}

#[derive(Clone, Default)]
struct MockSurface {
    log: Arc<Mutex<SurfaceLog>>,
}

impl Surface for MockSurface {
    fn render(&mut self, state: ControlState, controls: &Controls) {
        self.log.lock().unwrap().renders.push((state, *controls));
    }

    fn report(&mut self, error: &TtsrecError) {
        self.log.lock().unwrap().reports.push(error.to_string());
    }

    fn present_recording(&mut self, recording: &Recording) -> Result<()> {
        self.log.lock().unwrap().recordings.push(recording.clone());
        Ok(())
    }

    fn show_voices(&mut self, _voices: &[Voice]) {}

    fn show_message(&mut self, _message: &str) {}
}

// Harness

struct Harness {
    coordinator: Coordinator,
    queue: Arc<Mutex<Vec<Event>>>,
    engine: MockEngine,
    microphone: MockMicrophone,
    surface: MockSurface,
}

impl Harness {
    fn new(can_pause: bool, with_microphone: bool) -> Self {
        let queue: Arc<Mutex<Vec<Event>>> = Arc::new(Mutex::new(Vec::new()));
        let sink_queue = queue.clone();
        let sink: EventSink = Arc::new(move |event| sink_queue.lock().unwrap().push(event));

        let engine = MockEngine::new(can_pause);
        let microphone = MockMicrophone::default();
        let surface = MockSurface::default();

        let mic: Option<Box<dyn Microphone>> = if with_microphone {
            Some(Box::new(microphone.clone()))
        } else {
            None
        };
        let coordinator =
            Coordinator::new(Box::new(engine.clone()), mic, Box::new(surface.clone()), sink).unwrap();

        Self {
            coordinator,
            queue,
            engine,
            microphone,
            surface,
        }
    }

    /// Handle queued notifications until none are left
    fn pump(&mut self) {
        loop {
            let events: Vec<Event> = std::mem::take(&mut *self.queue.lock().unwrap());
            if events.is_empty() {
                break;
            }
            for event in events {
                self.coordinator.handle(event);
            }
        }
    }

    fn reports(&self) -> Vec<String> {
        self.surface.log.lock().unwrap().reports.clone()
    }

    fn recordings(&self) -> Vec<Recording> {
        self.surface.log.lock().unwrap().recordings.clone()
    }

    fn last_render(&self) -> (ControlState, Controls) {
        *self.surface.log.lock().unwrap().renders.last().unwrap()
    }

    fn render_count(&self) -> usize {
        self.surface.log.lock().unwrap().renders.len()
    }
}

fn hello() -> SpeechRequest {
    SpeechRequest::new("Hello world")
}

#[test]
fn test_initial_controls() {
    let harness = Harness::new(true, true);
    let (state, controls) = harness.last_render();
    assert_eq!(state, ControlState::Idle);
    assert_eq!(controls.play, Affordance::ENABLED);
    assert!(!controls.pause.visible);
    assert!(!controls.resume.visible);
    assert!(!controls.stop.enabled);
    assert_eq!(controls.record, Affordance::ENABLED);
}

#[test]
fn test_play_until_end() {
    let mut h = Harness::new(true, true);

    h.coordinator.play(hello());
    assert_eq!(h.coordinator.state(), ControlState::Speaking);
    let (_, controls) = h.last_render();
    assert!(!controls.play.visible);
    assert_eq!(controls.pause, Affordance::ENABLED);
    assert_eq!(controls.stop, Affordance::ENABLED);
    assert!(!controls.record.enabled);

    let spoken = h.engine.spoken();
    assert_eq!(spoken.len(), 1);
    assert_eq!(spoken[0].0, "Hello world");
    assert_eq!(spoken[0].1, None);

    h.engine.finish();
    h.pump();
    assert_eq!(h.coordinator.state(), ControlState::Idle);
    assert_eq!(h.last_render().1.play, Affordance::ENABLED);
    assert!(h.reports().is_empty());
    assert!(h.recordings().is_empty());
}

#[test]
fn test_whitespace_text_is_ignored() {
    let mut h = Harness::new(true, true);
    let renders = h.render_count();

    h.coordinator.play(SpeechRequest::new("   \n\t"));
    assert_eq!(h.coordinator.state(), ControlState::Idle);
    assert!(h.engine.spoken().is_empty());
    assert!(h.reports().is_empty());
    assert_eq!(h.render_count(), renders);
}

#[test]
fn test_play_while_speaking_is_rejected() {
    let mut h = Harness::new(true, true);
    h.coordinator.play(hello());
    h.coordinator.play(SpeechRequest::new("Second"));

    assert_eq!(h.engine.spoken().len(), 1);
    assert_eq!(h.coordinator.state(), ControlState::Speaking);
    assert!(h.reports().is_empty());
}

#[test]
fn test_pause_and_resume() {
    let mut h = Harness::new(true, true);
    h.coordinator.play(hello().with_pitch(1.5).with_rate(0.8));

    h.coordinator.pause();
    assert_eq!(h.coordinator.state(), ControlState::Paused);
    let (_, controls) = h.last_render();
    assert_eq!(controls.resume, Affordance::ENABLED);
    assert!(!controls.pause.visible);

    // Pausing twice changes nothing
    h.coordinator.pause();
    assert_eq!(h.coordinator.state(), ControlState::Paused);

    h.coordinator.resume();
    assert_eq!(h.coordinator.state(), ControlState::Speaking);
    assert!(!h.last_render().1.resume.visible);

    // Resume without pause is a no-op
    h.coordinator.resume();
    assert_eq!(h.coordinator.state(), ControlState::Speaking);

    // The same utterance carries on; nothing was re-spoken or cancelled
    assert_eq!(
        h.engine.spoken(),
        vec![("Hello world".to_string(), None, 1.5, 0.8)]
    );
    assert_eq!(h.engine.cancels(), 0);
    assert!(h.reports().is_empty());
}

#[test]
fn test_late_end_does_not_stop_next_utterance() {
    let mut h = Harness::new(true, true);
    h.coordinator.play(hello());

    // The end notice is still queued when the next play arrives
    h.engine.finish();
    h.coordinator.play(SpeechRequest::new("Second"));
    h.pump();

    assert_eq!(h.coordinator.state(), ControlState::Speaking);
    assert!(!h.last_render().1.play.visible);
    assert_eq!(h.engine.spoken().len(), 2);

    // Still speaking, so a third play is rejected
    h.coordinator.play(SpeechRequest::new("Third"));
    assert_eq!(h.engine.spoken().len(), 2);

    h.engine.finish();
    h.pump();
    assert_eq!(h.coordinator.state(), ControlState::Idle);
}

#[test]
fn test_late_end_does_not_stop_recording() {
    let mut h = Harness::new(true, true);
    h.coordinator.play(hello());
    h.coordinator.stop();
    h.coordinator.start_recording(SpeechRequest::new("Second"));
    h.microphone.grant_next();
    h.pump();
    assert_eq!(h.coordinator.state(), ControlState::RecordingAndSpeaking);

    // End notice of the cancelled first utterance
    h.coordinator.on_utterance_end();
    assert_eq!(h.coordinator.state(), ControlState::RecordingAndSpeaking);
    assert_eq!(h.microphone.stops(), 0);

    h.engine.finish();
    h.pump();
    assert_eq!(h.coordinator.state(), ControlState::Idle);
    assert_eq!(h.microphone.stops(), 1);
    assert_eq!(h.recordings().len(), 1);
}

#[test]
fn test_pause_unsupported_is_noop() {
    let mut h = Harness::new(false, true);
    h.coordinator.play(hello());
    assert!(!h.last_render().1.pause.enabled);

    h.coordinator.pause();
    assert_eq!(h.coordinator.state(), ControlState::Speaking);
    assert!(h.reports().is_empty());
}

#[test]
fn test_stop_is_idempotent() {
    let mut h = Harness::new(true, true);
    h.coordinator.stop();
    h.coordinator.stop();
    assert_eq!(h.coordinator.state(), ControlState::Idle);

    h.coordinator.play(hello());
    h.coordinator.pause();
    h.coordinator.stop();
    assert_eq!(h.coordinator.state(), ControlState::Idle);
    assert!(h.engine.cancels() >= 1);
    assert_eq!(h.last_render().1.play, Affordance::ENABLED);

    // Speech can start again afterwards
    h.coordinator.play(hello());
    assert_eq!(h.coordinator.state(), ControlState::Speaking);
}

#[test]
fn test_voice_selection() {
    let mut h = Harness::new(true, true);
    h.coordinator
        .play(hello().with_voice(Some("Google UK English Female".into())).with_pitch(1.5));
    h.engine.finish();
    h.pump();

    h.coordinator.play(hello().with_voice(Some("Klingon".into())).with_rate(50.0));

    let spoken = h.engine.spoken();
    assert_eq!(spoken[0].1.as_deref(), Some("Google UK English Female"));
    assert_eq!(spoken[0].2, 1.5);
    // Unknown voice falls back to the default; rate is clamped
    assert_eq!(spoken[1].1, None);
    assert_eq!(spoken[1].3, 10.0);
}

#[test]
fn test_record_while_speaking_produces_one_recording() {
    let mut h = Harness::new(true, true);

    h.coordinator.start_recording(hello());
    assert_eq!(h.microphone.pending(), 1);
    // Waiting for the microphone: nothing spoken yet, stop can cancel
    assert!(h.engine.spoken().is_empty());
    let (_, controls) = h.last_render();
    assert!(!controls.play.enabled);
    assert_eq!(controls.stop, Affordance::ENABLED);

    h.microphone.grant_next();
    h.pump();
    assert_eq!(h.coordinator.state(), ControlState::RecordingAndSpeaking);
    assert_eq!(h.microphone.starts(), 1);
    assert_eq!(h.engine.spoken().len(), 1);

    h.microphone.send_data(vec![0.25; 400]);
    h.microphone.send_data(vec![-0.25; 400]);
    h.pump();
    assert_eq!(h.coordinator.session().len(), 2);

    h.engine.finish();
    h.pump();

    assert_eq!(h.coordinator.state(), ControlState::Idle);
    assert_eq!(h.coordinator.machine().recording, RecordingPhase::Inactive);
    assert_eq!(h.microphone.stops(), 1);
    assert_eq!(h.coordinator.recordings_made(), 1);
    assert!(h.coordinator.session().is_empty());

    let recordings = h.recordings();
    assert_eq!(recordings.len(), 1);
    assert_eq!(recordings[0].frames(), 800);
    assert_eq!(recordings[0].mime_type(), "audio/wav");
    assert_eq!(h.last_render().1.record, Affordance::ENABLED);
}

#[test]
fn test_stop_during_recording() {
    let mut h = Harness::new(true, true);
    h.coordinator.start_recording(hello());
    h.microphone.grant_next();
    h.pump();
    h.microphone.send_data(vec![0.5; 100]);
    h.pump();

    h.coordinator.stop();
    h.pump();
    assert_eq!(h.coordinator.state(), ControlState::Idle);
    assert_eq!(h.engine.cancels(), 1);
    assert_eq!(h.recordings().len(), 1);

    // Audio after the stop is not part of any recording
    h.microphone.send_data(vec![0.5; 100]);
    h.pump();
    assert!(h.coordinator.session().is_empty());
    assert_eq!(h.recordings().len(), 1);
}

#[test]
fn test_record_denied() {
    let mut h = Harness::new(true, true);
    h.coordinator.start_recording(hello());
    h.microphone.deny_next();
    h.pump();

    assert_eq!(h.coordinator.state(), ControlState::Idle);
    assert_eq!(h.coordinator.machine().recording, RecordingPhase::Inactive);
    assert!(h.engine.spoken().is_empty());
    let reports = h.reports();
    assert_eq!(reports.len(), 1);
    assert!(reports[0].starts_with("Unable to access the microphone"));
    assert_eq!(h.last_render().1.play, Affordance::ENABLED);
}

#[test]
fn test_stop_cancels_pending_request() {
    let mut h = Harness::new(true, true);
    h.coordinator.start_recording(hello());
    h.coordinator.stop();
    assert_eq!(h.coordinator.machine().recording, RecordingPhase::Inactive);

    // The late grant is discarded
    h.microphone.grant_next();
    h.pump();
    assert_eq!(h.microphone.starts(), 0);
    assert!(h.engine.spoken().is_empty());
    assert!(h.recordings().is_empty());
    assert_eq!(h.coordinator.state(), ControlState::Idle);
}

#[test]
fn test_record_requires_text() {
    let mut h = Harness::new(true, true);
    h.coordinator.start_recording(SpeechRequest::new("  "));
    assert_eq!(h.microphone.pending(), 0);
    assert_eq!(h.coordinator.machine().recording, RecordingPhase::Inactive);
    // Logged, not shown
    assert!(h.reports().is_empty());
}

#[test]
fn test_recorder_start_failure_speaks_nothing() {
    let mut h = Harness::new(true, true);
    h.microphone.fail_starts();
    h.coordinator.start_recording(hello());
    h.microphone.grant_next();
    h.pump();

    assert_eq!(h.microphone.starts(), 1);
    assert!(h.engine.spoken().is_empty());
    assert_eq!(h.coordinator.state(), ControlState::Idle);
    assert_eq!(h.coordinator.machine().recording, RecordingPhase::Inactive);
    assert!(h.recordings().is_empty());

    let reports = h.reports();
    assert_eq!(reports.len(), 1);
    assert!(reports[0].starts_with("Recorder error"));

    let (_, controls) = h.last_render();
    assert_eq!(controls.record, Affordance::ENABLED);
    assert_eq!(controls.play, Affordance::ENABLED);
}

#[test]
fn test_record_while_speaking_is_rejected() {
    let mut h = Harness::new(true, true);
    h.coordinator.play(hello());
    h.coordinator.start_recording(hello());
    assert_eq!(h.microphone.pending(), 0);
}

#[test]
fn test_record_without_microphone() {
    let mut h = Harness::new(true, false);
    assert!(!h.last_render().1.record.visible);

    h.coordinator.start_recording(hello());
    let reports = h.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0], "Audio recording is not available on this system");

    // Speech still works
    h.coordinator.play(hello());
    assert_eq!(h.coordinator.state(), ControlState::Speaking);
}

#[test]
fn test_consecutive_recordings_are_separate() {
    let mut h = Harness::new(true, true);
    for samples in [300usize, 500] {
        h.coordinator.start_recording(hello());
        h.microphone.grant_next();
        h.pump();
        h.microphone.send_data(vec![0.1; samples]);
        h.pump();
        h.engine.finish();
        h.pump();
    }

    let recordings = h.recordings();
    assert_eq!(recordings.len(), 2);
    assert_eq!(recordings[0].frames(), 300);
    assert_eq!(recordings[1].frames(), 500);
}
