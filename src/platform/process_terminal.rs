//! Terminal backed by the process's own stdin and stdout.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;

#[cfg(unix)]
use std::sync::atomic::{AtomicBool, Ordering};
#[cfg(unix)]
use std::sync::{Arc, Mutex, MutexGuard};
#[cfg(unix)]
use std::thread::{self, JoinHandle};
#[cfg(unix)]
use std::time::{Duration, Instant};

use crate::config::EnvConfig;
use crate::core::terminal::Terminal;
#[cfg(unix)]
use crate::platform::input_splitter::InputSplitter;

#[cfg(unix)]
use libc::{self, c_int};
#[cfg(unix)]
use signal_hook::iterator::Signals;

/// Kitty keyboard protocol, disambiguate flag.
pub const KITTY_ENABLE: &str = "\x1b[>1u";
pub const KITTY_DISABLE: &str = "\x1b[<u";
pub const BRACKETED_PASTE_ENABLE: &str = "\x1b[?2004h";
pub const BRACKETED_PASTE_DISABLE: &str = "\x1b[?2004l";

const DEFAULT_COLUMNS: u16 = 80;
const DEFAULT_ROWS: u16 = 24;

#[cfg(unix)]
const INPUT_POLL_INTERVAL: Duration = Duration::from_millis(50);

type InputHandler = Box<dyn FnMut(String) + Send>;
type ResizeHandler = Box<dyn FnMut() + Send>;
#[cfg(unix)]
type SharedHandler<T> = Arc<Mutex<Option<T>>>;

#[cfg(unix)]
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Raw copy of everything written to the terminal, for debugging render output.
///
/// The first failure is logged and disables the log; terminal output is never affected.
struct WriteLog {
    path: PathBuf,
    file: Option<File>,
    failed: bool,
}

impl WriteLog {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            file: None,
            failed: false,
        }
    }

    fn record(&mut self, data: &str) {
        if self.failed {
            return;
        }
        if self.file.is_none() {
            match OpenOptions::new().create(true).append(true).open(&self.path) {
                Ok(file) => self.file = Some(file),
                Err(error) => {
                    self.fail(&error);
                    return;
                }
            }
        }
        if let Some(file) = self.file.as_mut() {
            if let Err(error) = file.write_all(data.as_bytes()) {
                self.fail(&error);
            }
        }
    }

    fn fail(&mut self, error: &io::Error) {
        tracing::warn!(path = %self.path.display(), %error, "write log disabled");
        self.failed = true;
        self.file = None;
    }
}

#[cfg(unix)]
fn wait_writable(fd: c_int) -> io::Result<()> {
    let mut fds = libc::pollfd {
        fd,
        events: libc::POLLOUT,
        revents: 0,
    };
    loop {
        let result = unsafe { libc::poll(&mut fds, 1, -1) };
        if result < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(err);
        }
        if result == 0 {
            continue;
        }
        if (fds.revents & libc::POLLOUT) != 0 {
            return Ok(());
        }
        return Err(io::Error::other(format!(
            "poll(POLLOUT) returned revents=0x{:x}",
            fds.revents
        )));
    }
}

/// Write every byte, retrying interrupted calls and waiting out `WouldBlock`.
#[cfg(unix)]
fn write_all_fd_with<FWrite, FWait>(
    fd: c_int,
    bytes: &[u8],
    mut write_once: FWrite,
    mut wait_writable: FWait,
) -> io::Result<()>
where
    FWrite: FnMut(c_int, &[u8]) -> io::Result<usize>,
    FWait: FnMut(c_int) -> io::Result<()>,
{
    let mut written = 0;
    while written < bytes.len() {
        match write_once(fd, &bytes[written..]) {
            Ok(0) => {
                return Err(io::Error::new(io::ErrorKind::WriteZero, "write returned 0"));
            }
            Ok(count) => {
                if count > bytes.len() - written {
                    return Err(io::Error::other("write returned more bytes than requested"));
                }
                written += count;
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => wait_writable(fd)?,
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

#[cfg(unix)]
fn write_fd(fd: c_int, data: &str) -> io::Result<()> {
    if data.is_empty() {
        return Ok(());
    }
    write_all_fd_with(
        fd,
        data.as_bytes(),
        |fd, buf| {
            let result = unsafe { libc::write(fd, buf.as_ptr() as *const libc::c_void, buf.len()) };
            if result < 0 {
                Err(io::Error::last_os_error())
            } else {
                Ok(result as usize)
            }
        },
        wait_writable,
    )
}

#[cfg(unix)]
fn read_winsize(fd: c_int) -> Option<(u16, u16)> {
    let mut size = libc::winsize {
        ws_row: 0,
        ws_col: 0,
        ws_xpixel: 0,
        ws_ypixel: 0,
    };
    let result = unsafe { libc::ioctl(fd, libc::TIOCGWINSZ, &mut size) };
    if result == 0 && size.ws_col > 0 && size.ws_row > 0 {
        Some((size.ws_col, size.ws_row))
    } else {
        None
    }
}

#[cfg(unix)]
fn poll_readable(fd: c_int, timeout: Duration) -> bool {
    let mut fds = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };
    let timeout_ms = timeout.as_millis().min(i32::MAX as u128) as i32;
    let result = unsafe { libc::poll(&mut fds, 1, timeout_ms) };
    result > 0 && (fds.revents & libc::POLLIN) != 0
}

#[cfg(unix)]
fn get_termios(fd: c_int) -> io::Result<libc::termios> {
    let mut termios = unsafe { std::mem::zeroed::<libc::termios>() };
    let result = unsafe { libc::tcgetattr(fd, &mut termios) };
    if result != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(termios)
}

#[cfg(unix)]
fn set_termios(fd: c_int, termios: &libc::termios) -> io::Result<()> {
    let result = unsafe { libc::tcsetattr(fd, libc::TCSANOW, termios) };
    if result != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// The controlling terminal, in raw mode while started.
///
/// Input is read on a dedicated thread, split into whole key sequences and handed to the input
/// callback. `SIGWINCH` is watched on a second thread. On start the terminal is asked for the
/// Kitty keyboard protocol and bracketed paste; both are switched off again on stop.
#[cfg(unix)]
pub struct ProcessTerminal {
    stdin_fd: c_int,
    stdout_fd: c_int,
    original_termios: Option<libc::termios>,
    input_handler: SharedHandler<InputHandler>,
    resize_handler: SharedHandler<ResizeHandler>,
    input_thread: Option<JoinHandle<()>>,
    resize_thread: Option<JoinHandle<()>>,
    resize_signal_handle: Option<signal_hook::iterator::Handle>,
    stop_flag: Arc<AtomicBool>,
    running: bool,
    write_log: Option<WriteLog>,
}

#[cfg(unix)]
impl ProcessTerminal {
    /// Uses stdin and stdout; honours `DELTALINE_WRITE_LOG`.
    pub fn new() -> Self {
        Self {
            stdin_fd: libc::STDIN_FILENO,
            stdout_fd: libc::STDOUT_FILENO,
            original_termios: None,
            input_handler: Arc::new(Mutex::new(None)),
            resize_handler: Arc::new(Mutex::new(None)),
            input_thread: None,
            resize_thread: None,
            resize_signal_handle: None,
            stop_flag: Arc::new(AtomicBool::new(false)),
            running: false,
            write_log: None,
        }
        .with_write_log(EnvConfig::from_env().write_log)
    }

    pub fn with_write_log(mut self, path: Option<PathBuf>) -> Self {
        self.write_log = path.map(WriteLog::new);
        self
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    fn enable_raw_mode(&mut self) -> io::Result<()> {
        let original = match self.original_termios {
            Some(original) => original,
            None => {
                let original = get_termios(self.stdin_fd)?;
                self.original_termios = Some(original);
                original
            }
        };
        let mut raw = original;
        unsafe {
            libc::cfmakeraw(&mut raw);
        }
        set_termios(self.stdin_fd, &raw)
    }

    fn restore_raw_mode(&mut self) -> io::Result<()> {
        match self.original_termios.as_ref() {
            Some(original) => set_termios(self.stdin_fd, original),
            None => Ok(()),
        }
    }

    fn clear_handlers(&self) {
        *lock(&self.input_handler) = None;
        *lock(&self.resize_handler) = None;
    }

    fn start_input_thread(&mut self) {
        let stdin_fd = self.stdin_fd;
        let input_handler = Arc::clone(&self.input_handler);
        let stop_flag = Arc::clone(&self.stop_flag);

        self.input_thread = Some(thread::spawn(move || {
            let mut buffer = [0u8; 4096];
            let mut splitter = InputSplitter::default();

            while !stop_flag.load(Ordering::SeqCst) {
                let timeout = splitter.poll_timeout(Instant::now(), INPUT_POLL_INTERVAL);
                let sequences = if poll_readable(stdin_fd, timeout) {
                    let read_len =
                        unsafe { libc::read(stdin_fd, buffer.as_mut_ptr() as *mut _, buffer.len()) };
                    if read_len == 0 {
                        tracing::debug!("stdin closed, input thread exiting");
                        break;
                    }
                    if read_len < 0 {
                        let error = io::Error::last_os_error();
                        if matches!(
                            error.kind(),
                            io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
                        ) {
                            continue;
                        }
                        tracing::warn!(%error, "stdin read failed, input thread exiting");
                        break;
                    }
                    splitter.push(&buffer[..read_len as usize])
                } else {
                    splitter.flush_due(Instant::now())
                };

                if sequences.is_empty() {
                    continue;
                }
                let mut handler = lock(&input_handler);
                if let Some(handler) = handler.as_mut() {
                    for sequence in sequences {
                        handler(sequence);
                    }
                }
            }
        }));
    }

    fn stop_input_thread(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);
        if let Some(handle) = self.input_thread.take() {
            let _ = handle.join();
        }
    }

    fn start_resize_thread(&mut self) -> io::Result<()> {
        let mut signals = Signals::new([libc::SIGWINCH])?;
        let handle = signals.handle();
        let resize_handler = Arc::clone(&self.resize_handler);

        let thread = thread::spawn(move || {
            for _ in signals.forever() {
                if let Some(handler) = lock(&resize_handler).as_mut() {
                    handler();
                }
            }
        });

        self.resize_signal_handle = Some(handle);
        self.resize_thread = Some(thread);
        Ok(())
    }

    fn stop_resize_thread(&mut self) {
        if let Some(handle) = self.resize_signal_handle.take() {
            handle.close();
        }
        if let Some(thread) = self.resize_thread.take() {
            let _ = thread.join();
        }
    }
}

#[cfg(unix)]
impl Default for ProcessTerminal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
impl Terminal for ProcessTerminal {
    fn start(&mut self, on_input: InputHandler, on_resize: ResizeHandler) -> io::Result<()> {
        *lock(&self.input_handler) = Some(on_input);
        *lock(&self.resize_handler) = Some(on_resize);
        if self.running {
            return Ok(());
        }

        if let Err(err) = self.enable_raw_mode() {
            self.clear_handlers();
            return Err(err);
        }
        if let Err(err) = self.start_resize_thread() {
            self.clear_handlers();
            let _ = self.restore_raw_mode();
            return Err(err);
        }

        self.stop_flag.store(false, Ordering::SeqCst);
        self.start_input_thread();
        self.running = true;

        self.write(&format!("{BRACKETED_PASTE_ENABLE}{KITTY_ENABLE}"))
    }

    fn stop(&mut self) -> io::Result<()> {
        if !self.running {
            return Ok(());
        }
        self.running = false;

        if let Err(error) = self.write(&format!("{KITTY_DISABLE}{BRACKETED_PASTE_DISABLE}")) {
            tracing::warn!(%error, "failed to switch off terminal protocols");
        }

        self.stop_input_thread();
        self.stop_resize_thread();
        self.clear_handlers();

        // Drop unread input so it does not leak into the shell once raw mode is gone.
        let _ = unsafe { libc::tcflush(self.stdin_fd, libc::TCIFLUSH) };
        self.restore_raw_mode()
    }

    fn write(&mut self, data: &str) -> io::Result<()> {
        write_fd(self.stdout_fd, data)?;
        if let Some(log) = self.write_log.as_mut() {
            log.record(data);
        }
        Ok(())
    }

    fn columns(&self) -> u16 {
        read_winsize(self.stdout_fd)
            .map(|(cols, _)| cols)
            .unwrap_or(DEFAULT_COLUMNS)
    }

    fn rows(&self) -> u16 {
        read_winsize(self.stdout_fd)
            .map(|(_, rows)| rows)
            .unwrap_or(DEFAULT_ROWS)
    }
}

#[cfg(unix)]
impl Drop for ProcessTerminal {
    fn drop(&mut self) {
        if let Err(error) = self.stop() {
            tracing::warn!(%error, "failed to restore terminal on drop");
        }
    }
}

/// Output-only fallback for platforms without termios.
#[cfg(not(unix))]
pub struct ProcessTerminal {
    write_log: Option<WriteLog>,
}

#[cfg(not(unix))]
impl ProcessTerminal {
    pub fn new() -> Self {
        Self { write_log: None }.with_write_log(EnvConfig::from_env().write_log)
    }

    pub fn with_write_log(mut self, path: Option<PathBuf>) -> Self {
        self.write_log = path.map(WriteLog::new);
        self
    }
}

#[cfg(not(unix))]
impl Default for ProcessTerminal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(not(unix))]
impl Terminal for ProcessTerminal {
    fn start(&mut self, _on_input: InputHandler, _on_resize: ResizeHandler) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "raw terminal input is only supported on unix",
        ))
    }

    fn stop(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn write(&mut self, data: &str) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        stdout.write_all(data.as_bytes())?;
        stdout.flush()?;
        if let Some(log) = self.write_log.as_mut() {
            log.record(data);
        }
        Ok(())
    }

    fn columns(&self) -> u16 {
        DEFAULT_COLUMNS
    }

    fn rows(&self) -> u16 {
        DEFAULT_ROWS
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::io;
    use std::sync::mpsc;
    use std::time::{Duration, Instant};

    use libc::{self, c_int};

    use super::{
        get_termios, poll_readable, write_all_fd_with, ProcessTerminal, BRACKETED_PASTE_DISABLE,
        BRACKETED_PASTE_ENABLE, KITTY_DISABLE, KITTY_ENABLE,
    };
    use crate::core::terminal::Terminal;

    struct Pty {
        master: c_int,
        slave: c_int,
    }

    impl Drop for Pty {
        fn drop(&mut self) {
            unsafe {
                libc::close(self.master);
                libc::close(self.slave);
            }
        }
    }

    fn open_pty() -> Pty {
        let mut master: c_int = 0;
        let mut slave: c_int = 0;
        let result = unsafe {
            libc::openpty(
                &mut master,
                &mut slave,
                std::ptr::null_mut(),
                std::ptr::null_mut(),
                std::ptr::null_mut(),
            )
        };
        assert_eq!(result, 0, "openpty failed");
        Pty { master, slave }
    }

    fn terminal_on(pty: &Pty) -> ProcessTerminal {
        let mut terminal = ProcessTerminal::new().with_write_log(None);
        terminal.stdin_fd = pty.slave;
        terminal.stdout_fd = pty.slave;
        terminal
    }

    fn read_available(fd: c_int, timeout: Duration) -> Vec<u8> {
        let end = Instant::now() + timeout;
        let mut out = Vec::new();
        while Instant::now() < end {
            let remaining = end.saturating_duration_since(Instant::now());
            if remaining.is_zero() || !poll_readable(fd, remaining) {
                break;
            }
            let mut buf = [0u8; 1024];
            let read_len = unsafe { libc::read(fd, buf.as_mut_ptr() as *mut _, buf.len()) };
            if read_len <= 0 {
                break;
            }
            out.extend_from_slice(&buf[..read_len as usize]);
        }
        out
    }

    fn write_master(pty: &Pty, bytes: &[u8]) {
        let written =
            unsafe { libc::write(pty.master, bytes.as_ptr() as *const libc::c_void, bytes.len()) };
        assert_eq!(written, bytes.len() as isize);
    }

    #[test]
    fn start_and_stop_negotiate_protocols_and_restore_termios() {
        let pty = open_pty();
        let original = get_termios(pty.slave).expect("get termios");
        let mut terminal = terminal_on(&pty);

        terminal
            .start(Box::new(|_| {}), Box::new(|| {}))
            .expect("terminal start");
        let raw = get_termios(pty.slave).expect("get termios");
        assert_eq!(raw.c_lflag & libc::ICANON, 0, "raw mode not enabled");
        let output = read_available(pty.master, Duration::from_millis(200));
        assert_eq!(
            String::from_utf8_lossy(&output),
            format!("{BRACKETED_PASTE_ENABLE}{KITTY_ENABLE}")
        );

        terminal.stop().expect("terminal stop");
        let output = read_available(pty.master, Duration::from_millis(200));
        assert_eq!(
            String::from_utf8_lossy(&output),
            format!("{KITTY_DISABLE}{BRACKETED_PASTE_DISABLE}")
        );
        let restored = get_termios(pty.slave).expect("get termios");
        assert_eq!(
            restored.c_lflag & libc::ICANON,
            original.c_lflag & libc::ICANON
        );
        assert!(!terminal.is_running());
    }

    #[test]
    fn input_arrives_as_whole_sequences() {
        let pty = open_pty();
        let (tx, rx) = mpsc::channel();
        let mut terminal = terminal_on(&pty);
        terminal
            .start(
                Box::new(move |data| {
                    let _ = tx.send(data);
                }),
                Box::new(|| {}),
            )
            .expect("terminal start");

        write_master(&pty, b"a\x1b[A\x1b[97;5u");
        let mut received = Vec::new();
        while received.len() < 3 {
            received.push(
                rx.recv_timeout(Duration::from_millis(500))
                    .expect("missing input"),
            );
        }
        assert_eq!(received, vec!["a", "\x1b[A", "\x1b[97;5u"]);

        write_master(&pty, b"\x1b[200~hello\x1b[201~");
        let paste = rx
            .recv_timeout(Duration::from_millis(500))
            .expect("missing paste");
        assert_eq!(paste, "\x1b[200~hello\x1b[201~");

        terminal.stop().expect("terminal stop");
    }

    #[test]
    fn start_fails_cleanly_on_a_bad_descriptor() {
        let mut terminal = ProcessTerminal::new().with_write_log(None);
        terminal.stdin_fd = -1;
        terminal.stdout_fd = -1;

        let err = terminal
            .start(Box::new(|_| {}), Box::new(|| {}))
            .expect_err("expected start to fail");
        assert_eq!(err.raw_os_error(), Some(libc::EBADF));
        assert!(!terminal.is_running());
    }

    #[test]
    fn write_log_receives_a_copy_of_every_write() {
        let pty = open_pty();
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("writes.log");
        let mut terminal = terminal_on(&pty).with_write_log(Some(path.clone()));

        terminal.write("\x1b[?25lhello").expect("write");
        terminal.write("\r\n").expect("write");

        let logged = std::fs::read_to_string(&path).expect("read log");
        assert_eq!(logged, "\x1b[?25lhello\r\n");
        let echoed = read_available(pty.master, Duration::from_millis(200));
        assert!(String::from_utf8_lossy(&echoed).starts_with("\x1b[?25lhello"));
    }

    #[test]
    fn write_all_fd_with_retries_on_eintr_and_writes_all_bytes() {
        let data = b"hello";
        let mut out = Vec::new();
        let mut calls = 0;
        write_all_fd_with(
            1,
            data,
            |_, buf| {
                calls += 1;
                match calls {
                    1 => Err(io::Error::from(io::ErrorKind::Interrupted)),
                    2 => {
                        out.extend_from_slice(&buf[..2]);
                        Ok(2)
                    }
                    _ => {
                        out.extend_from_slice(buf);
                        Ok(buf.len())
                    }
                }
            },
            |_| unreachable!("wait_writable should not be called for EINTR"),
        )
        .expect("write_all_fd_with failed");

        assert_eq!(out, data);
    }

    #[test]
    fn write_all_fd_with_waits_for_writable_on_would_block() {
        let data = b"xyz";
        let mut out = Vec::new();
        let mut calls = 0;
        let events = std::cell::RefCell::new(Vec::new());
        write_all_fd_with(
            1,
            data,
            |_, buf| {
                events.borrow_mut().push("write");
                calls += 1;
                if calls == 1 {
                    return Err(io::Error::from(io::ErrorKind::WouldBlock));
                }
                out.extend_from_slice(buf);
                Ok(buf.len())
            },
            |_| {
                events.borrow_mut().push("wait");
                Ok(())
            },
        )
        .expect("write_all_fd_with failed");

        assert_eq!(out, data);
        assert_eq!(events.into_inner(), vec!["write", "wait", "write"]);
    }

    #[test]
    fn zero_length_write_is_an_error() {
        let err = write_all_fd_with(1, b"x", |_, _| Ok(0), |_| Ok(())).expect_err("write zero");
        assert_eq!(err.kind(), io::ErrorKind::WriteZero);
    }
}
