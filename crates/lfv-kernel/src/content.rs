//! Text statistics shown next to a file preview.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextStats {
    /// Newline characters.
    pub lines: usize,
    /// Whitespace-separated runs.
    pub words: usize,
    /// Non-whitespace characters.
    pub chars: usize,
}

impl TextStats {
    pub fn from_text(text: &str) -> Self {
        Self {
            lines: text.bytes().filter(|&b| b == b'\n').count(),
            words: text.split_whitespace().count(),
            chars: text.chars().filter(|c| !c.is_whitespace()).count(),
        }
    }
}
