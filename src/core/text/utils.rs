//! Line fitting helpers.

use super::ansi::SGR_RESET;
use super::slice::slice_by_column;
use super::width::visible_width;

/// Pad `line` to `width` columns and hand it to `bg_fn` for tinting.
///
/// Resets inside the line would also clear the tint, so the tint is reopened after each one.
pub fn apply_background_to_line(
    line: &str,
    width: usize,
    bg_fn: &dyn Fn(&str) -> String,
) -> String {
    let visible_len = visible_width(line);
    let padding_needed = width.saturating_sub(visible_len);
    let mut with_padding = String::with_capacity(line.len() + padding_needed);
    with_padding.push_str(line);
    with_padding.push_str(&" ".repeat(padding_needed));

    let prefix = style_prefix(bg_fn);
    if !prefix.is_empty() && with_padding.contains(SGR_RESET) {
        with_padding = with_padding.replace(SGR_RESET, &format!("{SGR_RESET}{prefix}"));
    }
    bg_fn(&with_padding)
}

pub(crate) fn style_prefix(style_fn: &dyn Fn(&str) -> String) -> String {
    const SENTINEL: &str = "\u{0}";
    let styled = style_fn(SENTINEL);
    styled
        .find(SENTINEL)
        .map(|idx| styled[..idx].to_string())
        .unwrap_or_default()
}

/// Cut `line` down to at most `width` columns.
///
/// Lines that already fit are returned unchanged. A cut line that carried escapes is closed
/// with a reset so its style does not leak.
pub fn clamp_to_width(line: &str, width: usize) -> String {
    if visible_width(line) <= width {
        return line.to_string();
    }
    let mut clamped = slice_by_column(line, 0, width);
    if clamped.contains('\x1b') {
        clamped.push_str(SGR_RESET);
    }
    clamped
}
