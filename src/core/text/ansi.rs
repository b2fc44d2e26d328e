//! Escape-sequence scanning and SGR style tracking.

pub const SGR_RESET: &str = "\x1b[0m";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscapeKind {
    Csi,
    Osc,
    Apc,
    Dcs,
    Ss3,
}

/// One complete escape sequence found inside a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Escape<'a> {
    pub code: &'a str,
    pub kind: EscapeKind,
}

impl Escape<'_> {
    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn is_sgr(&self) -> bool {
        self.kind == EscapeKind::Csi && self.code.ends_with('m')
    }
}

/// Return the complete escape sequence starting at byte offset `pos`, if any.
///
/// Unterminated sequences are not escapes: callers treat their bytes as text.
pub fn escape_at(input: &str, pos: usize) -> Option<Escape<'_>> {
    let bytes = input.as_bytes();
    if bytes.get(pos) != Some(&0x1b) {
        return None;
    }
    let (kind, end) = match bytes.get(pos + 1)? {
        b'[' => (EscapeKind::Csi, csi_end(bytes, pos + 2)?),
        b']' => (EscapeKind::Osc, string_terminator_end(bytes, pos + 2)?),
        b'_' => (EscapeKind::Apc, string_terminator_end(bytes, pos + 2)?),
        b'P' => (EscapeKind::Dcs, string_terminator_end(bytes, pos + 2)?),
        b'O' => {
            let final_char = input.get(pos + 2..)?.chars().next()?;
            (EscapeKind::Ss3, pos + 2 + final_char.len_utf8())
        }
        _ => return None,
    };
    Some(Escape {
        code: &input[pos..end],
        kind,
    })
}

fn csi_end(bytes: &[u8], from: usize) -> Option<usize> {
    bytes[from.min(bytes.len())..]
        .iter()
        .position(|b| (0x40..=0x7e).contains(b))
        .map(|offset| from + offset + 1)
}

fn string_terminator_end(bytes: &[u8], from: usize) -> Option<usize> {
    let mut idx = from;
    while idx < bytes.len() {
        match bytes[idx] {
            0x07 => return Some(idx + 1),
            0x1b if bytes.get(idx + 1) == Some(&b'\\') => return Some(idx + 2),
            _ => idx += 1,
        }
    }
    None
}

/// A piece of a styled string: either an escape sequence or a run of plain text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chunk<'a> {
    Escape(Escape<'a>),
    Text(&'a str),
}

/// Iterate `input` as alternating escape sequences and text runs.
pub fn chunks(input: &str) -> Chunks<'_> {
    Chunks { input, pos: 0 }
}

pub struct Chunks<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = Chunk<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.input.len() {
            return None;
        }
        if let Some(escape) = escape_at(self.input, self.pos) {
            self.pos += escape.len();
            return Some(Chunk::Escape(escape));
        }
        let start = self.pos;
        let mut idx = start;
        while idx < self.input.len() {
            if idx > start && escape_at(self.input, idx).is_some() {
                break;
            }
            idx += self.input[idx..].chars().next().map_or(1, char::len_utf8);
        }
        self.pos = idx;
        Some(Chunk::Text(&self.input[start..idx]))
    }
}

/// Remove every escape sequence, keeping only visible text.
pub fn strip_ansi(input: &str) -> String {
    chunks(input)
        .filter_map(|chunk| match chunk {
            Chunk::Text(text) => Some(text),
            Chunk::Escape(_) => None,
        })
        .collect()
}

const ATTR_CODES: [(u8, u8); 8] = [(1, 22), (2, 22), (3, 23), (4, 24), (5, 25), (7, 27), (8, 28), (9, 29)];

/// Tracks which SGR attributes are active after a run of escape codes.
///
/// Used by wrapping to close a line with a reset and reopen the same style on the next line.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AnsiCodeTracker {
    attrs: [bool; 8],
    fg: Option<String>,
    bg: Option<String>,
}

impl AnsiCodeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one escape sequence. Non-SGR sequences are ignored.
    pub fn process(&mut self, code: &str) {
        let Some(params) = code
            .strip_prefix("\x1b[")
            .and_then(|rest| rest.strip_suffix('m'))
        else {
            return;
        };
        if params.is_empty() {
            self.reset();
            return;
        }

        let parts: Vec<&str> = params.split(';').collect();
        let mut idx = 0;
        while idx < parts.len() {
            let code = parts[idx].parse::<u16>().unwrap_or(0);
            if code == 38 || code == 48 {
                let span = match parts.get(idx + 1).copied() {
                    Some("5") => 3,
                    Some("2") => 5,
                    _ => 1,
                };
                if span > 1 && idx + span <= parts.len() {
                    let color = parts[idx..idx + span].join(";");
                    if code == 38 {
                        self.fg = Some(color);
                    } else {
                        self.bg = Some(color);
                    }
                    idx += span;
                    continue;
                }
            }
            self.apply_code(code);
            idx += 1;
        }
    }

    /// Feed every escape sequence found in `text`.
    pub fn process_text(&mut self, text: &str) {
        for chunk in chunks(text) {
            if let Chunk::Escape(escape) = chunk {
                self.process(escape.code);
            }
        }
    }

    fn apply_code(&mut self, code: u16) {
        match code {
            0 => self.reset(),
            39 => self.fg = None,
            49 => self.bg = None,
            30..=37 | 90..=97 => self.fg = Some(code.to_string()),
            40..=47 | 100..=107 => self.bg = Some(code.to_string()),
            21 => self.attrs[0] = false,
            _ => {
                for (slot, (on, off)) in ATTR_CODES.iter().enumerate() {
                    if code == u16::from(*on) {
                        self.attrs[slot] = true;
                    } else if code == u16::from(*off) {
                        self.attrs[slot] = false;
                    }
                }
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.attrs.iter().any(|on| *on) || self.fg.is_some() || self.bg.is_some()
    }

    /// A single SGR sequence re-establishing the current style, or an empty string.
    pub fn active_codes(&self) -> String {
        let mut codes: Vec<String> = ATTR_CODES
            .iter()
            .zip(self.attrs.iter())
            .filter(|(_, on)| **on)
            .map(|((code, _), _)| code.to_string())
            .collect();
        codes.extend(self.fg.iter().cloned());
        codes.extend(self.bg.iter().cloned());
        if codes.is_empty() {
            return String::new();
        }
        format!("\x1b[{}m", codes.join(";"))
    }

    /// What to append when a line is cut while a style is still open.
    pub fn line_end_reset(&self) -> &'static str {
        if self.is_active() {
            SGR_RESET
        } else {
            ""
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::{chunks, escape_at, strip_ansi, AnsiCodeTracker, Chunk, EscapeKind};

    #[test]
    fn finds_csi_osc_and_ss3() {
        let csi = escape_at("\x1b[31mred", 0).unwrap();
        assert_eq!(csi.code, "\x1b[31m");
        assert!(csi.is_sgr());

        let osc = escape_at("\x1b]8;;http://x\x07text", 0).unwrap();
        assert_eq!(osc.kind, EscapeKind::Osc);
        assert_eq!(osc.code, "\x1b]8;;http://x\x07");

        let ss3 = escape_at("\x1bOA", 0).unwrap();
        assert_eq!(ss3.kind, EscapeKind::Ss3);
    }

    #[test]
    fn unterminated_sequence_is_text() {
        assert!(escape_at("\x1b[31", 0).is_none());
        let parts: Vec<Chunk<'_>> = chunks("a\x1b[").collect();
        assert_eq!(parts, vec![Chunk::Text("a\x1b[")]);
    }

    #[test]
    fn strip_removes_all_sequences() {
        assert_eq!(strip_ansi("\x1b[1mbo\x1b[0mld \x1b]8;;u\x07link\x1b]8;;\x07"), "bold link");
    }

    #[test]
    fn tracker_accumulates_and_resets() {
        let mut tracker = AnsiCodeTracker::new();
        tracker.process("\x1b[1;31m");
        tracker.process("\x1b[48;5;236m");
        assert_eq!(tracker.active_codes(), "\x1b[1;31;48;5;236m");
        assert_eq!(tracker.line_end_reset(), "\x1b[0m");

        tracker.process("\x1b[22;39m");
        assert_eq!(tracker.active_codes(), "\x1b[48;5;236m");

        tracker.process("\x1b[0m");
        assert!(!tracker.is_active());
        assert_eq!(tracker.line_end_reset(), "");
    }

    #[test]
    fn truecolor_is_kept_whole() {
        let mut tracker = AnsiCodeTracker::new();
        tracker.process("\x1b[38;2;10;20;30m");
        assert_eq!(tracker.active_codes(), "\x1b[38;2;10;20;30m");
    }
}
