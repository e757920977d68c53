//! Line-oriented terminal surface

use super::Surface;
use crate::coordinator::{Affordance, ControlState, Controls};
use crate::recording::Recording;
use crate::speech::Voice;
use crate::{Result, TtsrecError};
use log::{debug, error};
use std::io::{self, Write};
use std::path::PathBuf;

/// Prints status lines and notices, saves recordings into `output_dir`
pub struct TerminalSurface<W: Write = io::Stdout> {
    out: W,
    output_dir: PathBuf,
    /// Path of the most recently saved recording
    last_saved: Option<PathBuf>,
}

impl TerminalSurface<io::Stdout> {
    pub fn new(output_dir: PathBuf) -> Self {
        Self::with_writer(io::stdout(), output_dir)
    }
}

impl<W: Write> TerminalSurface<W> {
    pub fn with_writer(out: W, output_dir: PathBuf) -> Self {
        Self {
            out,
            output_dir,
            last_saved: None,
        }
    }

    pub fn last_saved(&self) -> Option<&PathBuf> {
        self.last_saved.as_ref()
    }

    pub fn into_writer(self) -> W {
        self.out
    }

    fn line(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{}", text).and_then(|_| self.out.flush()) {
            debug!("Failed to write to terminal: {}", e);
        }
    }
}

/// `name` for enabled, `(name)` for disabled, nothing for hidden
fn control_label(name: &str, affordance: Affordance) -> Option<String> {
    match (affordance.visible, affordance.enabled) {
        (false, _) => None,
        (true, true) => Some(name.to_string()),
        (true, false) => Some(format!("({})", name)),
    }
}

/// One-line summary of the controls, e.g. `[Speaking] pause stop (record)`
pub fn status_line(state: ControlState, controls: &Controls) -> String {
    let labels: Vec<String> = [
        ("play", controls.play),
        ("pause", controls.pause),
        ("resume", controls.resume),
        ("stop", controls.stop),
        ("record", controls.record),
    ]
    .into_iter()
    .filter_map(|(name, affordance)| control_label(name, affordance))
    .collect();

    format!("[{}] {}", state, labels.join(" "))
}

impl<W: Write> Surface for TerminalSurface<W> {
    fn render(&mut self, state: ControlState, controls: &Controls) {
        let line = status_line(state, controls);
        self.line(&line);
    }

    fn report(&mut self, err: &TtsrecError) {
        error!("{}", err);
        let line = format!("!! {}", err);
        self.line(&line);
    }

    fn present_recording(&mut self, recording: &Recording) -> Result<()> {
        let path = recording.save_to(&self.output_dir)?;
        let line = format!(
            "Recording ready: {} ({}, {:.1}s, {} bytes)",
            path.display(),
            recording.mime_type(),
            recording.duration().as_secs_f32(),
            recording.bytes().len()
        );
        self.line(&line);
        self.last_saved = Some(path);
        Ok(())
    }

    fn show_voices(&mut self, voices: &[Voice]) {
        if voices.is_empty() {
            self.line("No voices available; the engine default is used");
            return;
        }
        for voice in voices {
            let line = format!("{} ({})", voice.name, voice.language);
            self.line(&line);
        }
    }

    fn show_message(&mut self, message: &str) {
        self.line(message);
    }
}
