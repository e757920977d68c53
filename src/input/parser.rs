//! Turns input lines into [`UserInput`]

use super::commands::{CommandAction, COMMANDS};
use log::trace;

/// What a line of input asks for
#[derive(Debug, Clone, PartialEq)]
pub enum UserInput {
    /// Replace the text field
    SetText(String),
    /// A bare playback control
    Control(CommandAction),
    /// Replace the text field and speak it
    Say(String),
    /// Choose a voice; `None` selects the engine default
    SetVoice(Option<String>),
    ListVoices,
    SetPitch(f32),
    SetRate(f32),
    Paste,
    Status,
    Help,
    Quit,
    /// Blank line
    Nothing,
    /// Unknown command or bad argument, with a message for the user
    Invalid(String),
}

/// Parse one line
///
/// Lines starting with `:` are commands; `::` escapes a literal leading
/// colon. Anything else is text.
pub fn parse_line(line: &str) -> UserInput {
    let line = line.trim_end_matches(['\r', '\n']);
    trace!("Parsing input line {:?}", line);

    if let Some(rest) = line.strip_prefix("::") {
        return UserInput::SetText(format!(":{}", rest));
    }

    let Some(command) = line.strip_prefix(':') else {
        if line.trim().is_empty() {
            return UserInput::Nothing;
        }
        return UserInput::SetText(line.to_string());
    };

    let command = command.trim_start();
    let (name, argument) = match command.split_once(char::is_whitespace) {
        Some((name, argument)) => (name, argument.trim()),
        None => (command, ""),
    };

    let Some(action) = COMMANDS.get(name.to_lowercase().as_str()).copied() else {
        return UserInput::Invalid(format!("Unknown command :{} (try :help)", name));
    };

    if action.takes_argument() && argument.is_empty() {
        return UserInput::Invalid(format!("Usage: {}", action.usage()));
    }

    match action {
        CommandAction::Play
        | CommandAction::Pause
        | CommandAction::Resume
        | CommandAction::Stop
        | CommandAction::Record => UserInput::Control(action),
        CommandAction::Say => UserInput::Say(argument.to_string()),
        CommandAction::Voice if argument.is_empty() => UserInput::SetVoice(None),
        CommandAction::Voice => UserInput::SetVoice(Some(argument.to_string())),
        CommandAction::Voices => UserInput::ListVoices,
        CommandAction::Pitch => parse_number(argument, action).map_or_else(UserInput::Invalid, UserInput::SetPitch),
        CommandAction::Rate => parse_number(argument, action).map_or_else(UserInput::Invalid, UserInput::SetRate),
        CommandAction::Paste => UserInput::Paste,
        CommandAction::Status => UserInput::Status,
        CommandAction::Help => UserInput::Help,
        CommandAction::Quit => UserInput::Quit,
    }
}

fn parse_number(argument: &str, action: CommandAction) -> Result<f32, String> {
    argument
        .parse::<f32>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| format!("Not a number: {} (usage: {})", argument, action.usage()))
}
