//! Terminal trait.

use std::io;

/// Raw byte I/O with the user's terminal.
///
/// Implementations deliver input and resize notifications from their own threads through the
/// callbacks passed to [`Terminal::start`]; the callbacks only enqueue work.
pub trait Terminal {
    /// Enter raw mode and begin delivering input and resize notifications.
    fn start(
        &mut self,
        on_input: Box<dyn FnMut(String) + Send>,
        on_resize: Box<dyn FnMut() + Send>,
    ) -> io::Result<()>;

    /// Stop input delivery and restore the terminal.
    fn stop(&mut self) -> io::Result<()>;

    /// Write output to the terminal.
    fn write(&mut self, data: &str) -> io::Result<()>;

    /// Terminal dimensions.
    fn columns(&self) -> u16;
    fn rows(&self) -> u16;
}
