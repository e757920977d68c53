//! Clipboard integration

use crate::{Result, TtsrecError};
use arboard::Clipboard;
use log::debug;

/// Get text from the system clipboard for `:paste`
pub fn get_from_clipboard() -> Result<String> {
    debug!("Getting text from clipboard");

    let mut clipboard = Clipboard::new().map_err(|e| {
        TtsrecError::CapabilityUnavailable(format!("Clipboard ({})", e))
    })?;

    let text = clipboard
        .get_text()
        .map_err(|e| TtsrecError::Other(format!("Failed to read the clipboard: {}", e)))?;

    Ok(flatten_lines(&text))
}

/// Join pasted lines into one paragraph of speakable text
pub fn flatten_lines(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_lines() {
        assert_eq!(flatten_lines("  one\ntwo\r\n\tthree  "), "one two three");
        assert_eq!(flatten_lines("\n\n"), "");
    }
}
