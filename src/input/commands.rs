//! Command names for the line interface

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Every command the user can type after `:`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandAction {
    // Playback controls
    Play,
    Pause,
    Resume,
    Stop,
    Record,

    // Text and voice
    Say,
    Voice,
    Voices,
    Pitch,
    Rate,
    Paste,

    // Session
    Status,
    Help,
    Quit,
}

impl CommandAction {
    /// Usage line shown by `:help`
    pub fn usage(&self) -> &'static str {
        match self {
            CommandAction::Play => ":play (:p)          speak the current text",
            CommandAction::Pause => ":pause (:pa)        pause speech",
            CommandAction::Resume => ":resume (:r)        resume paused speech",
            CommandAction::Stop => ":stop (:s)          stop speech and recording",
            CommandAction::Record => ":record (:rec)      record while speaking the current text",
            CommandAction::Say => ":say <text>         set the text and speak it",
            CommandAction::Voice => ":voice [name]       choose a voice, or the default without a name",
            CommandAction::Voices => ":voices             list the available voices",
            CommandAction::Pitch => ":pitch <0..2>       set the pitch",
            CommandAction::Rate => ":rate <0.1..10>     set the rate",
            CommandAction::Paste => ":paste              take the text from the clipboard",
            CommandAction::Status => ":status             show text, voice and controls",
            CommandAction::Help => ":help (:h, :?)      show this list",
            CommandAction::Quit => ":quit (:q)          exit",
        }
    }

    /// Whether the command needs an argument
    pub fn takes_argument(&self) -> bool {
        matches!(
            self,
            CommandAction::Say | CommandAction::Pitch | CommandAction::Rate
        )
    }
}

/// Order used by `:help`
pub const HELP_ORDER: [CommandAction; 14] = [
    CommandAction::Play,
    CommandAction::Pause,
    CommandAction::Resume,
    CommandAction::Stop,
    CommandAction::Record,
    CommandAction::Say,
    CommandAction::Voice,
    CommandAction::Voices,
    CommandAction::Pitch,
    CommandAction::Rate,
    CommandAction::Paste,
    CommandAction::Status,
    CommandAction::Help,
    CommandAction::Quit,
];

/// Create the default command table (name or alias -> action)
pub fn create_default_commands() -> HashMap<&'static str, CommandAction> {
    let mut map = HashMap::new();

    map.insert("play", CommandAction::Play);
    map.insert("p", CommandAction::Play);
    map.insert("pause", CommandAction::Pause);
    map.insert("pa", CommandAction::Pause);
    map.insert("resume", CommandAction::Resume);
    map.insert("r", CommandAction::Resume);
    map.insert("stop", CommandAction::Stop);
    map.insert("s", CommandAction::Stop);
    map.insert("record", CommandAction::Record);
    map.insert("rec", CommandAction::Record);

    map.insert("say", CommandAction::Say);
    map.insert("voice", CommandAction::Voice);
    map.insert("voices", CommandAction::Voices);
    map.insert("pitch", CommandAction::Pitch);
    map.insert("rate", CommandAction::Rate);
    map.insert("paste", CommandAction::Paste);

    map.insert("status", CommandAction::Status);
    map.insert("help", CommandAction::Help);
    map.insert("h", CommandAction::Help);
    map.insert("?", CommandAction::Help);
    map.insert("quit", CommandAction::Quit);
    map.insert("q", CommandAction::Quit);
    map.insert("exit", CommandAction::Quit);

    map
}

pub static COMMANDS: Lazy<HashMap<&'static str, CommandAction>> = Lazy::new(create_default_commands);

/// Full help text, one command per line
pub fn help_text() -> String {
    let mut lines = vec!["Type text to set what is spoken. Commands:".to_string()];
    lines.extend(HELP_ORDER.iter().map(|action| format!("  {}", action.usage())));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_action_has_a_name() {
        let table = create_default_commands();
        for action in HELP_ORDER {
            assert!(table.values().any(|a| *a == action), "{:?} unbound", action);
        }
    }

    #[test]
    fn test_help_lists_all_commands() {
        let help = help_text();
        assert_eq!(help.lines().count(), HELP_ORDER.len() + 1);
        assert!(help.contains(":record"));
    }
}
