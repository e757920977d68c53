//! Input system tests
//!
//! Tests the command table, line parsing and how the app applies parsed
//! lines to the form and the coordinator.

use std::sync::{Arc, Mutex};
use ttsrec::app::{App, Flow, Message};
use ttsrec::coordinator::{ControlState, Controls};
use ttsrec::input::{create_default_commands, parse_line, CommandAction, UserInput};
use ttsrec::recording::Recording;
use ttsrec::speech::{EndCallback, EngineFeatures, SpeechEngine, Utterance, Voice};
use ttsrec::state::FormState;
use ttsrec::ui::Surface;
use ttsrec::{Result, TtsrecError};

#[test]
fn test_command_table() {
    let commands = create_default_commands();

    assert_eq!(commands.get("play"), Some(&CommandAction::Play));
    assert_eq!(commands.get("p"), Some(&CommandAction::Play));
    assert_eq!(commands.get("pause"), Some(&CommandAction::Pause));
    assert_eq!(commands.get("resume"), Some(&CommandAction::Resume));
    assert_eq!(commands.get("stop"), Some(&CommandAction::Stop));
    assert_eq!(commands.get("rec"), Some(&CommandAction::Record));
    assert_eq!(commands.get("voices"), Some(&CommandAction::Voices));
    assert_eq!(commands.get("q"), Some(&CommandAction::Quit));
    assert_eq!(commands.get("dance"), None);
}

#[test]
fn test_parse_lines() {
    assert_eq!(parse_line("Hello world"), UserInput::SetText("Hello world".into()));
    assert_eq!(parse_line(":say Hello"), UserInput::Say("Hello".into()));
    assert_eq!(parse_line(":STOP"), UserInput::Control(CommandAction::Stop));
    assert_eq!(parse_line(":quit"), UserInput::Quit);
    assert_eq!(parse_line(""), UserInput::Nothing);
}

// A silent engine that stays "speaking" until cancelled

#[derive(Default)]
struct Silent {
    spoken: Vec<String>,
    speaking: bool,
}

#[derive(Clone, Default)]
struct SilentEngine(Arc<Mutex<Silent>>);

impl SpeechEngine for SilentEngine {
    fn name(&self) -> &str {
        "silent"
    }

    fn features(&self) -> EngineFeatures {
        EngineFeatures {
            pause: false,
            pitch: true,
            rate: true,
            voices: true,
        }
    }

    fn list_voices(&self) -> Result<Vec<Voice>> {
        Ok(vec![Voice::new("en", "English", "en")])
    }

    fn speak(&mut self, utterance: &Utterance) -> Result<()> {
        let mut state = self.0.lock().unwrap();
        state.spoken.push(utterance.text().to_string());
        state.speaking = true;
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        Err(TtsrecError::Speech("pause unsupported".into()))
    }

    fn resume(&mut self) -> Result<()> {
        Err(TtsrecError::Speech("resume unsupported".into()))
    }

    fn cancel(&mut self) -> Result<()> {
        self.0.lock().unwrap().speaking = false;
        Ok(())
    }

    fn is_speaking(&self) -> bool {
        self.0.lock().unwrap().speaking
    }

    fn is_paused(&self) -> bool {
        false
    }

    fn set_volume(&mut self, _volume: u8) -> Result<()> {
        Ok(())
    }

    fn on_end(&mut self, _callback: EndCallback) -> Result<()> {
        Ok(())
    }
}

#[derive(Clone, Default)]
struct MessageLog(Arc<Mutex<Vec<String>>>);

impl Surface for MessageLog {
    fn render(&mut self, state: ControlState, _controls: &Controls) {
        self.0.lock().unwrap().push(format!("state {}", state));
    }

    fn report(&mut self, error: &TtsrecError) {
        self.0.lock().unwrap().push(format!("error {}", error));
    }

    fn present_recording(&mut self, _recording: &Recording) -> Result<()> {
        Ok(())
    }

    fn show_voices(&mut self, voices: &[Voice]) {
        for voice in voices {
            self.0.lock().unwrap().push(format!("voice {}", voice.name));
        }
    }

    fn show_message(&mut self, message: &str) {
        self.0.lock().unwrap().push(message.to_string());
    }
}

fn app() -> (App, SilentEngine, MessageLog) {
    let engine = SilentEngine::default();
    let surface = MessageLog::default();
    let app = App::new(
        Box::new(engine.clone()),
        None,
        Box::new(surface.clone()),
        FormState::default(),
    )
    .unwrap();
    (app, engine, surface)
}

fn line(app: &mut App, text: &str) -> Flow {
    app.handle_message(Message::Line(text.to_string()))
}

#[test]
fn test_text_then_play() {
    let (mut app, engine, _) = app();

    assert_eq!(line(&mut app, "Hello world"), Flow::Continue);
    assert_eq!(app.form().text(), "Hello world");
    assert!(engine.0.lock().unwrap().spoken.is_empty());

    line(&mut app, ":play");
    assert_eq!(app.coordinator().state(), ControlState::Speaking);
    assert_eq!(engine.0.lock().unwrap().spoken, vec!["Hello world"]);

    line(&mut app, ":stop");
    assert_eq!(app.coordinator().state(), ControlState::Idle);
    assert!(app.settled());
}

#[test]
fn test_settings_commands() {
    let (mut app, _, surface) = app();

    line(&mut app, ":pitch 9");
    line(&mut app, ":rate 0.5");
    line(&mut app, ":voice Nobody");
    assert_eq!(app.form().pitch(), 2.0);
    assert_eq!(app.form().rate(), 0.5);
    assert_eq!(app.form().voice(), Some("Nobody"));

    line(&mut app, ":voice");
    assert_eq!(app.form().voice(), None);

    let messages = surface.0.lock().unwrap().clone();
    assert!(messages.contains(&"Pitch 2.00".to_string()));
    assert!(messages.iter().any(|m| m.contains("\"Nobody\" not found")));
    assert!(messages.contains(&"Voice: default".to_string()));
}

#[test]
fn test_voices_help_and_unknown() {
    let (mut app, _, surface) = app();

    line(&mut app, ":voices");
    line(&mut app, ":help");
    line(&mut app, ":dance");

    let messages = surface.0.lock().unwrap().clone();
    assert!(messages.contains(&"voice English".to_string()));
    assert!(messages.iter().any(|m| m.contains(":record")));
    assert!(messages.iter().any(|m| m.starts_with("Unknown command :dance")));
}

#[test]
fn test_record_without_microphone_reports() {
    let (mut app, engine, surface) = app();
    line(&mut app, ":say Testing");
    line(&mut app, ":stop");
    line(&mut app, ":record");

    assert_eq!(engine.0.lock().unwrap().spoken, vec!["Testing"]);
    let messages = surface.0.lock().unwrap().clone();
    assert!(messages
        .iter()
        .any(|m| m == "error Audio recording is not available on this system"));
}

#[test]
fn test_quit_stops_speech() {
    let (mut app, engine, _) = app();
    line(&mut app, ":say Long text");
    assert_eq!(line(&mut app, ":q"), Flow::Quit);
    assert!(!engine.0.lock().unwrap().speaking);
    assert!(app.settled());
}
