//! Column slicing and word wrapping for styled text.

use unicode_segmentation::UnicodeSegmentation;

use super::ansi::{chunks, AnsiCodeTracker, Chunk};
use super::width::{grapheme_width, visible_width};

/// Take `length` columns starting at `start_col`.
///
/// Escape sequences inside the range are kept, and those before it are carried over so the
/// slice renders with the style in effect at `start_col`. A wide grapheme straddling either edge
/// is dropped rather than split.
pub fn slice_by_column(line: &str, start_col: usize, length: usize) -> String {
    if length == 0 {
        return String::new();
    }
    let end_col = start_col.saturating_add(length);
    let mut out = String::new();
    let mut carried = String::new();
    let mut col = 0;

    'outer: for chunk in chunks(line) {
        match chunk {
            Chunk::Escape(escape) => {
                if col < start_col {
                    carried.push_str(escape.code);
                } else {
                    out.push_str(escape.code);
                }
            }
            Chunk::Text(text) => {
                for grapheme in text.graphemes(true) {
                    if col >= end_col {
                        break 'outer;
                    }
                    let width = grapheme_width(grapheme);
                    if col >= start_col && col + width <= end_col {
                        if !carried.is_empty() {
                            out.push_str(&carried);
                            carried.clear();
                        }
                        out.push_str(grapheme);
                    }
                    col += width;
                }
            }
        }
    }
    out
}

#[derive(Debug, PartialEq, Eq)]
enum Token {
    /// A run of spaces, possibly carrying escape sequences.
    Space(String),
    /// A run of non-space text, possibly with embedded escape sequences.
    Word(String),
}

fn tokenize(line: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut current_is_space = false;
    let mut pending_codes = String::new();

    for chunk in chunks(line) {
        match chunk {
            Chunk::Escape(escape) => pending_codes.push_str(escape.code),
            Chunk::Text(text) => {
                for ch in text.chars() {
                    let is_space = ch == ' ';
                    if !current.is_empty() && is_space != current_is_space {
                        tokens.push(make_token(std::mem::take(&mut current), current_is_space));
                    }
                    current_is_space = is_space;
                    current.push_str(&pending_codes);
                    pending_codes.clear();
                    current.push(ch);
                }
            }
        }
    }

    if !current.is_empty() {
        tokens.push(make_token(current, current_is_space));
    }
    if !pending_codes.is_empty() {
        tokens.push(Token::Space(pending_codes));
    }
    tokens
}

fn make_token(text: String, is_space: bool) -> Token {
    if is_space {
        Token::Space(text)
    } else {
        Token::Word(text)
    }
}

fn escapes_only(text: &str) -> String {
    chunks(text)
        .filter_map(|chunk| match chunk {
            Chunk::Escape(escape) => Some(escape.code),
            Chunk::Text(_) => None,
        })
        .collect()
}

struct LineWrapper<'a> {
    width: usize,
    tracker: &'a mut AnsiCodeTracker,
    lines: Vec<String>,
    current: String,
    current_width: usize,
    pending: String,
    pending_width: usize,
}

impl<'a> LineWrapper<'a> {
    fn new(width: usize, tracker: &'a mut AnsiCodeTracker) -> Self {
        let current = tracker.active_codes();
        Self {
            width,
            tracker,
            lines: Vec::new(),
            current,
            current_width: 0,
            pending: String::new(),
            pending_width: 0,
        }
    }

    fn push_space(&mut self, space: &str) {
        self.tracker.process_text(space);
        self.pending.push_str(space);
        self.pending_width += visible_width(space);
    }

    fn push_word(&mut self, word: &str) {
        let word_width = visible_width(word);

        if word_width > self.width {
            if self.current_width > 0 && self.current_width + self.pending_width >= self.width {
                self.finish_line();
            } else {
                self.commit_pending();
            }
            self.push_long_word(word);
            return;
        }

        if self.current_width + self.pending_width + word_width <= self.width {
            self.commit_pending();
        } else if self.current_width == 0 {
            self.drop_pending_spaces();
        } else {
            self.finish_line();
        }
        self.current.push_str(word);
        self.current_width += word_width;
        self.tracker.process_text(word);
    }

    fn push_long_word(&mut self, word: &str) {
        for chunk in chunks(word) {
            match chunk {
                Chunk::Escape(escape) => {
                    self.current.push_str(escape.code);
                    self.tracker.process(escape.code);
                }
                Chunk::Text(text) => {
                    for grapheme in text.graphemes(true) {
                        let width = grapheme_width(grapheme);
                        if self.current_width > 0 && self.current_width + width > self.width {
                            self.finish_line();
                        }
                        self.current.push_str(grapheme);
                        self.current_width += width;
                    }
                }
            }
        }
    }

    fn commit_pending(&mut self) {
        self.current.push_str(&self.pending);
        self.current_width += self.pending_width;
        self.pending.clear();
        self.pending_width = 0;
    }

    fn drop_pending_spaces(&mut self) {
        let codes = escapes_only(&self.pending);
        self.current.push_str(&codes);
        self.pending.clear();
        self.pending_width = 0;
    }

    fn finish_line(&mut self) {
        self.drop_pending_spaces();
        let mut line = std::mem::take(&mut self.current);
        line.push_str(self.tracker.line_end_reset());
        self.lines.push(line);
        self.current = self.tracker.active_codes();
        self.current_width = 0;
    }

    fn finish(mut self) -> Vec<String> {
        self.finish_line();
        self.lines
    }
}

/// Word-wrap `text` to `width` visible columns.
///
/// Lines are broken at spaces (which are dropped at the break) and overlong words are split
/// by grapheme. Escape sequences are never split. A line cut while a style is open ends with
/// an SGR reset, and the next line starts by re-opening that style, so every returned line
/// renders correctly on its own. Always returns at least one line.
pub fn wrap_text_with_ansi(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut tracker = AnsiCodeTracker::new();
    let mut result = Vec::new();

    for input_line in text.split('\n') {
        let mut wrapper = LineWrapper::new(width, &mut tracker);
        for token in tokenize(input_line) {
            match token {
                Token::Space(space) => wrapper.push_space(&space),
                Token::Word(word) => wrapper.push_word(&word),
            }
        }
        result.extend(wrapper.finish());
    }

    if result.is_empty() {
        result.push(String::new());
    }
    result
}

#[cfg(test)]
mod tests {
    use super::{slice_by_column, wrap_text_with_ansi};
    use crate::core::text::ansi::strip_ansi;
    use crate::core::text::width::visible_width;

    #[test]
    fn slicing_drops_boundary_wide_chars() {
        assert_eq!(slice_by_column("a😀b", 1, 1), "");
        assert_eq!(slice_by_column("a😀b", 1, 2), "😀");
    }

    #[test]
    fn slicing_carries_style_into_range() {
        assert_eq!(slice_by_column("\x1b[31mredblue", 3, 4), "\x1b[31mblue");
    }

    #[test]
    fn word_wrap_splits_on_spaces() {
        assert_eq!(wrap_text_with_ansi("word word", 4), vec!["word", "word"]);
        assert_eq!(wrap_text_with_ansi("word  word", 4), vec!["word", "word"]);
    }

    #[test]
    fn short_text_is_untouched() {
        assert_eq!(wrap_text_with_ansi("  indented", 20), vec!["  indented"]);
    }

    #[test]
    fn empty_text_yields_one_line() {
        assert_eq!(wrap_text_with_ansi("", 10), vec![""]);
        assert_eq!(wrap_text_with_ansi("a\n\nb", 10), vec!["a", "", "b"]);
    }

    #[test]
    fn styled_run_is_closed_and_reopened_at_break() {
        let wrapped = wrap_text_with_ansi("\x1b[1;31mword word\x1b[0m", 4);
        assert_eq!(
            wrapped,
            vec!["\x1b[1;31mword\x1b[0m", "\x1b[1;31mword\x1b[0m"]
        );
    }

    #[test]
    fn unstyled_break_adds_no_reset() {
        let wrapped = wrap_text_with_ansi("\x1b[1mhi\x1b[22m there", 4);
        assert_eq!(wrapped, vec!["\x1b[1mhi\x1b[22m", "there"]);
    }

    #[test]
    fn long_words_are_split_by_grapheme() {
        let wrapped = wrap_text_with_ansi("abcdefghij", 4);
        assert_eq!(wrapped, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn style_is_carried_across_input_newlines() {
        let wrapped = wrap_text_with_ansi("\x1b[3mone\ntwo\x1b[23m", 10);
        assert_eq!(wrapped, vec!["\x1b[3mone\x1b[0m", "\x1b[3mtwo\x1b[23m"]);
    }

    #[test]
    fn wrapped_lines_fit_and_preserve_text() {
        let text = "\x1b[32mthe quick\x1b[39m brown \x1b[4mfox jumps over\x1b[24m the lazy dog";
        // Start at the longest word so no word has to be split.
        for width in 5..30 {
            let wrapped = wrap_text_with_ansi(text, width);
            for line in &wrapped {
                assert!(visible_width(line) <= width, "{line:?} wider than {width}");
            }
            let plain: Vec<String> = wrapped.iter().map(|line| strip_ansi(line)).collect();
            assert_eq!(plain.join(" "), strip_ansi(text), "width {width}");
        }
    }
}
