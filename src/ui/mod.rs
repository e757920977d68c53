//! User-facing surface
//!
//! The coordinator pushes control affordances, error notices and finished
//! recordings to a [`Surface`]; the terminal implementation prints them.

pub mod terminal;

pub use terminal::TerminalSurface;

use crate::coordinator::{ControlState, Controls};
use crate::recording::Recording;
use crate::speech::Voice;
use crate::{Result, TtsrecError};

pub trait Surface {
    /// Show the current control state and affordances
    fn render(&mut self, state: ControlState, controls: &Controls);

    /// Tell the user about an error they need to know about
    fn report(&mut self, error: &TtsrecError);

    /// Offer a finished recording for playback and download
    fn present_recording(&mut self, recording: &Recording) -> Result<()>;

    fn show_voices(&mut self, voices: &[Voice]);

    fn show_message(&mut self, message: &str);
}
