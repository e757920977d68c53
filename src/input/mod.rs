//! Line input
//!
//! Each line typed on stdin either replaces the text to speak or, when it
//! starts with `:`, runs a command from the command table.

pub mod commands;
pub mod parser;

pub use commands::{create_default_commands, help_text, CommandAction, COMMANDS};
pub use parser::{parse_line, UserInput};
