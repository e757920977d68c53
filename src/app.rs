//! Event loop
//!
//! One channel carries everything the program reacts to: lines from the
//! stdin reader thread and the coordinator's backend notifications. The loop
//! handles each message to completion before taking the next, so the
//! coordinator never sees two notifications at once.

use crate::clipboard;
use crate::coordinator::{ControlState, Coordinator, Event, EventSink, RecordingPhase};
use crate::input::{help_text, parse_line, CommandAction, UserInput};
use crate::recording::Microphone;
use crate::speech::{resolve_voice, SpeechEngine};
use crate::state::FormState;
use crate::ui::{terminal::status_line, Surface};
use crate::Result;
use log::{debug, info, warn};
use std::io::{self, BufRead};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// How long to wait for the recorder to wind down after `:quit`
const SHUTDOWN_GRACE: Duration = Duration::from_secs(3);

/// Why the loop is on its way out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shutdown {
    /// stdin closed; let the current utterance finish
    Drain,
    /// The user quit; speech is already cancelled
    Quit,
}

/// Everything the event loop reacts to
#[derive(Debug)]
pub enum Message {
    /// A line typed by the user
    Line(String),
    /// stdin reached end of file
    InputClosed,
    Coordinator(Event),
}

/// What the loop does after handling input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct App {
    coordinator: Coordinator,
    form: FormState,
    sender: Sender<Message>,
    receiver: Receiver<Message>,
    /// Set once the user quit or stdin closed; exit when the coordinator settles
    shutdown: Option<Shutdown>,
}

impl App {
    pub fn new(
        engine: Box<dyn SpeechEngine>,
        microphone: Option<Box<dyn Microphone>>,
        surface: Box<dyn Surface>,
        form: FormState,
    ) -> Result<Self> {
        let (sender, receiver) = mpsc::channel();

        let event_sender = sender.clone();
        let sink: EventSink = Arc::new(move |event| {
            if event_sender.send(Message::Coordinator(event)).is_err() {
                debug!("Event loop gone; dropping notification");
            }
        });

        let coordinator = Coordinator::new(engine, microphone, surface, sink)?;

        Ok(Self {
            coordinator,
            form,
            sender,
            receiver,
            shutdown: None,
        })
    }

    /// A sender for feeding messages into the loop from other threads
    pub fn sender(&self) -> Sender<Message> {
        self.sender.clone()
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    pub fn form(&self) -> &FormState {
        &self.form
    }

    /// Read stdin line by line on a background thread
    pub fn spawn_stdin_reader(&self) -> Result<thread::JoinHandle<()>> {
        let sender = self.sender();
        let handle = thread::Builder::new()
            .name("ttsrec-stdin".to_string())
            .spawn(move || {
                let stdin = io::stdin();
                for line in stdin.lock().lines() {
                    match line {
                        Ok(line) => {
                            if sender.send(Message::Line(line)).is_err() {
                                return;
                            }
                        }
                        Err(e) => {
                            warn!("Failed to read stdin: {}", e);
                            break;
                        }
                    }
                }
                let _ = sender.send(Message::InputClosed);
            })?;
        Ok(handle)
    }

    /// Run until the user quits, or stdin closes and speech has finished
    pub fn run(&mut self) -> Result<()> {
        info!("Entering event loop");
        loop {
            if self.shutdown.is_some() && self.settled() {
                info!("Nothing left to do; exiting");
                return Ok(());
            }

            let message = if self.shutdown == Some(Shutdown::Quit) {
                match self.receiver.recv_timeout(SHUTDOWN_GRACE) {
                    Ok(message) => message,
                    Err(RecvTimeoutError::Timeout) => {
                        warn!("Gave up waiting for speech or recording to finish");
                        return Ok(());
                    }
                    Err(RecvTimeoutError::Disconnected) => return Ok(()),
                }
            } else {
                match self.receiver.recv() {
                    Ok(message) => message,
                    Err(_) => return Ok(()),
                }
            };

            self.handle_message(message);
        }
    }

    /// Handle one message; returns [`Flow::Quit`] when the user asked to quit
    pub fn handle_message(&mut self, message: Message) -> Flow {
        match message {
            Message::Line(line) => {
                let flow = self.handle_input(parse_line(&line));
                if flow == Flow::Quit {
                    self.coordinator.stop();
                    self.shutdown = Some(Shutdown::Quit);
                }
                flow
            }
            Message::InputClosed => {
                debug!("stdin closed");
                self.shutdown.get_or_insert(Shutdown::Drain);
                Flow::Continue
            }
            Message::Coordinator(event) => {
                self.coordinator.handle(event);
                Flow::Continue
            }
        }
    }

    /// Carry out one parsed input line
    pub fn handle_input(&mut self, input: UserInput) -> Flow {
        match input {
            UserInput::Nothing => {}

            UserInput::SetText(text) => self.form.set_text(text),

            UserInput::Control(action) => self.control(action),

            UserInput::Say(text) => {
                self.form.set_text(text);
                self.control(CommandAction::Play);
            }

            UserInput::SetVoice(voice) => self.set_voice(voice),

            UserInput::ListVoices => match self.coordinator.list_voices() {
                Ok(voices) => self.coordinator.surface_mut().show_voices(&voices),
                Err(e) => self.coordinator.surface_mut().report(&e),
            },

            UserInput::SetPitch(pitch) => {
                let pitch = self.form.set_pitch(pitch);
                self.message(&format!("Pitch {:.2}", pitch));
            }

            UserInput::SetRate(rate) => {
                let rate = self.form.set_rate(rate);
                self.message(&format!("Rate {:.2}", rate));
            }

            UserInput::Paste => match clipboard::get_from_clipboard() {
                Ok(text) => {
                    let count = text.chars().count();
                    self.form.set_text(text);
                    self.message(&format!("Pasted {} characters", count));
                }
                Err(e) => self.coordinator.surface_mut().report(&e),
            },

            UserInput::Status => {
                let summary = self.form.summary();
                let status = status_line(self.coordinator.state(), &self.coordinator.controls());
                self.message(&summary);
                self.message(&status);
            }

            UserInput::Help => self.message(&help_text()),

            UserInput::Quit => return Flow::Quit,

            UserInput::Invalid(message) => self.message(&message),
        }
        Flow::Continue
    }

    fn control(&mut self, action: CommandAction) {
        match action {
            CommandAction::Play => self.coordinator.play(self.form.to_request()),
            CommandAction::Pause => self.coordinator.pause(),
            CommandAction::Resume => self.coordinator.resume(),
            CommandAction::Stop => self.coordinator.stop(),
            CommandAction::Record => self.coordinator.start_recording(self.form.to_request()),
            other => debug!("{:?} is not a playback control", other),
        }
    }

    fn set_voice(&mut self, voice: Option<String>) {
        if let Some(name) = voice.as_deref() {
            match self.coordinator.list_voices() {
                Ok(voices) if resolve_voice(&voices, name).is_none() => {
                    self.message(&format!(
                        "Voice {:?} not found; the engine default will be used",
                        name
                    ));
                }
                Ok(_) => {}
                Err(e) => debug!("Could not check voice {:?}: {}", name, e),
            }
        }
        self.form.set_voice(voice);
        let current = self.form.voice().unwrap_or("default").to_string();
        self.message(&format!("Voice: {}", current));
    }

    fn message(&mut self, message: &str) {
        self.coordinator.surface_mut().show_message(message);
    }

    /// No speech, no recording and no pending microphone request
    pub fn settled(&self) -> bool {
        let machine = self.coordinator.machine();
        self.coordinator.state() == ControlState::Idle
            && machine.recording == RecordingPhase::Inactive
    }
}
