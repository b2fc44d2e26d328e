//! Styling hooks for the markdown formatter.

use super::highlight::highlight_code;

/// Wraps a span of text in styling escapes.
pub type MarkdownStyleFn = Box<dyn Fn(&str) -> String>;

/// Turns a code block body and its language tag into display lines.
pub type MarkdownCodeHighlighterFn = Box<dyn Fn(&str, Option<&str>) -> Vec<String>>;

/// Styling applied to ordinary body text.
///
/// `bg_color` tints whole lines: every output line is padded to the full width before the tint
/// is applied.
#[derive(Default)]
pub struct DefaultTextStyle {
    pub color: Option<MarkdownStyleFn>,
    pub bg_color: Option<MarkdownStyleFn>,
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
    pub underline: bool,
}

pub struct MarkdownTheme {
    pub heading: MarkdownStyleFn,
    pub link: MarkdownStyleFn,
    pub link_url: MarkdownStyleFn,
    pub code: MarkdownStyleFn,
    pub code_block: MarkdownStyleFn,
    pub code_block_border: MarkdownStyleFn,
    pub quote: MarkdownStyleFn,
    pub quote_border: MarkdownStyleFn,
    pub hr: MarkdownStyleFn,
    pub list_bullet: MarkdownStyleFn,
    pub bold: MarkdownStyleFn,
    pub italic: MarkdownStyleFn,
    pub strikethrough: MarkdownStyleFn,
    pub underline: MarkdownStyleFn,
    /// When unset, code block lines go through `code_block` unhighlighted.
    pub highlight_code: Option<MarkdownCodeHighlighterFn>,
    /// Defaults to two spaces.
    pub code_block_indent: Option<String>,
}

fn sgr(on: &'static str, off: &'static str) -> MarkdownStyleFn {
    Box::new(move |text| format!("\x1b[{on}m{text}\x1b[{off}m"))
}

impl MarkdownTheme {
    /// A theme with no styling at all. Useful for tests and dumb terminals.
    pub fn plain() -> Self {
        fn identity() -> MarkdownStyleFn {
            Box::new(|text| text.to_string())
        }
        Self {
            heading: identity(),
            link: identity(),
            link_url: identity(),
            code: identity(),
            code_block: identity(),
            code_block_border: identity(),
            quote: identity(),
            quote_border: identity(),
            hr: identity(),
            list_bullet: identity(),
            bold: identity(),
            italic: identity(),
            strikethrough: identity(),
            underline: identity(),
            highlight_code: None,
            code_block_indent: None,
        }
    }

    /// Standard SGR styling with syntect highlighting for fenced code.
    ///
    /// Each style closes with its own off code rather than a full reset, so nesting a span
    /// inside another leaves the outer style intact.
    pub fn ansi() -> Self {
        Self {
            heading: sgr("1;36", "22;39"),
            link: sgr("34", "39"),
            link_url: sgr("90", "39"),
            code: sgr("33", "39"),
            code_block: sgr("32", "39"),
            code_block_border: sgr("90", "39"),
            quote: sgr("37", "39"),
            quote_border: sgr("90", "39"),
            hr: sgr("90", "39"),
            list_bullet: sgr("36", "39"),
            bold: sgr("1", "22"),
            italic: sgr("3", "23"),
            strikethrough: sgr("9", "29"),
            underline: sgr("4", "24"),
            highlight_code: Some(Box::new(highlight_code)),
            code_block_indent: None,
        }
    }
}

impl Default for MarkdownTheme {
    fn default() -> Self {
        Self::ansi()
    }
}
