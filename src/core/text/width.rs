//! Visible width of styled text.

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthChar;

use super::ansi::{chunks, Chunk};

pub const TAB_WIDTH: usize = 3;

/// Terminal columns occupied by one grapheme cluster.
pub fn grapheme_width(grapheme: &str) -> usize {
    if grapheme.is_empty() {
        return 0;
    }
    if emojis::get(grapheme).is_some() {
        return 2;
    }
    grapheme
        .chars()
        .map(|ch| {
            if ch == '\t' {
                TAB_WIDTH
            } else {
                ch.width().unwrap_or(0)
            }
        })
        .sum()
}

/// Width in columns, ignoring escape sequences.
pub fn visible_width(input: &str) -> usize {
    chunks(input)
        .map(|chunk| match chunk {
            Chunk::Text(text) => text.graphemes(true).map(grapheme_width).sum(),
            Chunk::Escape(_) => 0,
        })
        .sum()
}
