//! Markdown formatting for chat output.

pub mod highlight;
pub mod markdown;
pub mod theme;

pub use markdown::MarkdownFormatter;
pub use theme::{DefaultTextStyle, MarkdownCodeHighlighterFn, MarkdownStyleFn, MarkdownTheme};
