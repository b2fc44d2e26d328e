//! Splits raw stdin chunks into complete key sequences.
//!
//! A read from the terminal can end in the middle of an escape sequence or a UTF-8 character,
//! or carry several keys at once. The splitter buffers partial tails and emits one string per
//! complete sequence, so the key decoder always sees whole sequences. A lone `ESC` (or any
//! stuck partial sequence) is emitted verbatim once the escape timeout passes.

use std::time::{Duration, Instant};

use crate::core::text::ansi::escape_at;

const ESC: u8 = 0x1b;
const PASTE_START: &str = "\x1b[200~";
const PASTE_END: &str = "\x1b[201~";

pub const DEFAULT_ESCAPE_TIMEOUT: Duration = Duration::from_millis(10);

enum Status {
    Complete(usize),
    Incomplete,
}

fn sequence_status(buffer: &str, pos: usize) -> Status {
    let bytes = buffer.as_bytes();
    let Some(&next) = bytes.get(pos + 1) else {
        return Status::Incomplete;
    };
    match next {
        b'[' | b']' | b'_' | b'P' | b'O' => match escape_at(buffer, pos) {
            Some(escape) => Status::Complete(escape.len()),
            None => Status::Incomplete,
        },
        // ESC + key is how legacy terminals report alt.
        _ => {
            let width = buffer[pos + 1..]
                .chars()
                .next()
                .map_or(1, char::len_utf8);
            Status::Complete(1 + width)
        }
    }
}

#[derive(Debug)]
pub struct InputSplitter {
    buffer: String,
    undecoded: Vec<u8>,
    paste: Option<String>,
    timeout: Duration,
    deadline: Option<Instant>,
}

impl Default for InputSplitter {
    fn default() -> Self {
        Self::new(DEFAULT_ESCAPE_TIMEOUT)
    }
}

impl InputSplitter {
    pub fn new(timeout: Duration) -> Self {
        Self {
            buffer: String::new(),
            undecoded: Vec::new(),
            paste: None,
            timeout,
            deadline: None,
        }
    }

    /// Feed one read's worth of bytes; returns every sequence completed by it.
    ///
    /// A bracketed paste is returned as a single string including its markers.
    pub fn push(&mut self, data: &[u8]) -> Vec<String> {
        self.deadline = None;

        self.undecoded.extend_from_slice(data);
        let text = match std::str::from_utf8(&self.undecoded) {
            Ok(text) => {
                let text = text.to_string();
                self.undecoded.clear();
                text
            }
            Err(error) if error.error_len().is_none() => {
                let valid = error.valid_up_to();
                let tail = self.undecoded.split_off(valid);
                let text = String::from_utf8_lossy(&self.undecoded).into_owned();
                self.undecoded = tail;
                text
            }
            Err(_) => {
                let text = String::from_utf8_lossy(&self.undecoded).into_owned();
                self.undecoded.clear();
                text
            }
        };
        let sequences = self.push_str(&text);
        if !self.undecoded.is_empty() && self.deadline.is_none() {
            self.deadline = Some(Instant::now() + self.timeout);
        }
        sequences
    }

    fn push_str(&mut self, data: &str) -> Vec<String> {
        let mut out = Vec::new();
        self.buffer.push_str(data);

        loop {
            if let Some(paste) = self.paste.as_mut() {
                paste.push_str(&self.buffer);
                self.buffer.clear();
                let Some(end) = paste.find(PASTE_END) else {
                    return out;
                };
                let rest = paste.split_off(end + PASTE_END.len());
                out.push(format!("{PASTE_START}{paste}"));
                self.paste = None;
                self.buffer = rest;
                continue;
            }

            if let Some(start) = self.buffer.find(PASTE_START) {
                let before = self.buffer[..start].to_string();
                let after = self.buffer[start + PASTE_START.len()..].to_string();
                out.extend(split_complete(&before).0);
                self.paste = Some(String::new());
                self.buffer = after;
                continue;
            }
            break;
        }

        let (sequences, remainder) = split_complete(&self.buffer);
        out.extend(sequences);
        self.buffer = remainder;
        if !self.buffer.is_empty() {
            self.deadline = Some(Instant::now() + self.timeout);
        }
        out
    }

    /// Emit whatever is still buffered once the escape timeout has passed.
    pub fn flush_due(&mut self, now: Instant) -> Vec<String> {
        match self.deadline {
            Some(deadline) if now >= deadline => self.flush(),
            _ => Vec::new(),
        }
    }

    /// Emit everything buffered, complete or not. An unfinished paste stays buffered.
    pub fn flush(&mut self) -> Vec<String> {
        self.deadline = None;
        let mut pending = std::mem::take(&mut self.buffer);
        if !self.undecoded.is_empty() {
            pending.push_str(&String::from_utf8_lossy(&self.undecoded));
            self.undecoded.clear();
        }
        if pending.is_empty() {
            Vec::new()
        } else {
            vec![pending]
        }
    }

    /// How long the input thread may block before [`InputSplitter::flush_due`] has work.
    pub fn poll_timeout(&self, now: Instant, idle: Duration) -> Duration {
        match self.deadline {
            Some(deadline) => deadline.saturating_duration_since(now).min(idle),
            None => idle,
        }
    }

    pub fn pending(&self) -> &str {
        &self.buffer
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.undecoded.clear();
        self.paste = None;
        self.deadline = None;
    }
}

/// Complete sequences at the front of `buffer`, plus the incomplete escape tail.
fn split_complete(buffer: &str) -> (Vec<String>, String) {
    let mut sequences = Vec::new();
    let mut pos = 0;
    while pos < buffer.len() {
        if buffer.as_bytes()[pos] == ESC {
            match sequence_status(buffer, pos) {
                Status::Complete(len) => {
                    let end = (pos + len).min(buffer.len());
                    sequences.push(buffer[pos..end].to_string());
                    pos = end;
                }
                Status::Incomplete => return (sequences, buffer[pos..].to_string()),
            }
        } else {
            let len = buffer[pos..].chars().next().map_or(1, char::len_utf8);
            sequences.push(buffer[pos..pos + len].to_string());
            pos += len;
        }
    }
    (sequences, String::new())
}
