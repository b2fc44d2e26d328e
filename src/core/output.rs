//! Typed terminal output commands and a single output gate.
//!
//! Invariant: all terminal writes must flow through `OutputGate::flush(..)`.

use std::fmt::Write as _;

use crate::core::terminal::Terminal;
use crate::logging;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalCmd {
    /// Raw text, including any embedded escapes, written as-is.
    Bytes(String),

    /// Cursor visibility.
    HideCursor,
    ShowCursor,

    /// Relative cursor movement by whole rows. Zero emits nothing.
    MoveUp(usize),
    MoveDown(usize),

    /// `ESC[2K`
    ClearLine,
    /// `ESC[0J`
    ClearToScreenEnd,
    /// `ESC[3J`
    ClearScrollback,
    /// `ESC[2J`
    ClearScreen,
    /// `ESC[H`
    Home,
}

impl TerminalCmd {
    pub fn bytes(data: impl Into<String>) -> Self {
        Self::Bytes(data.into())
    }

    /// Append the wire form of this command to `out`.
    pub fn encode(&self, out: &mut String) {
        match self {
            TerminalCmd::Bytes(data) => out.push_str(data),
            TerminalCmd::HideCursor => out.push_str("\x1b[?25l"),
            TerminalCmd::ShowCursor => out.push_str("\x1b[?25h"),
            TerminalCmd::MoveUp(0) | TerminalCmd::MoveDown(0) => {}
            TerminalCmd::MoveUp(rows) => {
                let _ = write!(out, "\x1b[{rows}A");
            }
            TerminalCmd::MoveDown(rows) => {
                let _ = write!(out, "\x1b[{rows}B");
            }
            TerminalCmd::ClearLine => out.push_str("\x1b[2K"),
            TerminalCmd::ClearToScreenEnd => out.push_str("\x1b[0J"),
            TerminalCmd::ClearScrollback => out.push_str("\x1b[3J"),
            TerminalCmd::ClearScreen => out.push_str("\x1b[2J"),
            TerminalCmd::Home => out.push_str("\x1b[H"),
        }
    }
}

/// Encode a command list into one string.
pub fn encode_all(cmds: &[TerminalCmd]) -> String {
    let mut out = String::new();
    for cmd in cmds {
        cmd.encode(&mut out);
    }
    out
}

#[derive(Debug, Default)]
pub struct OutputGate {
    cmds: Vec<TerminalCmd>,
}

impl OutputGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, cmd: TerminalCmd) {
        self.cmds.push(cmd);
    }

    pub fn extend<I>(&mut self, cmds: I)
    where
        I: IntoIterator<Item = TerminalCmd>,
    {
        self.cmds.extend(cmds);
    }

    pub fn is_empty(&self) -> bool {
        self.cmds.is_empty()
    }

    pub fn clear(&mut self) {
        self.cmds.clear();
    }

    /// Flush buffered commands to the terminal as a single write.
    ///
    /// This is the single write gate: `Terminal::write(..)` must not be called
    /// from anywhere else. A failed write is logged and the batch is dropped.
    pub fn flush<T: Terminal>(&mut self, term: &mut T) {
        if self.cmds.is_empty() {
            return;
        }
        let data = encode_all(&self.cmds);
        self.cmds.clear();
        if data.is_empty() {
            return;
        }
        if let Err(err) = term.write(&data) {
            logging::log_write_failure(&err, data.len());
        }
    }
}
