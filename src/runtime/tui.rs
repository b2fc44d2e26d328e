//! TUI runtime.
//!
//! Owns the terminal, the root container, the renderer and focus. Everything runs on the
//! caller's thread; the terminal's threads only enqueue into the shared [`RuntimeWake`].

use std::sync::Arc;

use crate::config::{EnvConfig, RendererConfig};
use crate::core::component::{Component, ComponentId};
use crate::core::input::{is_key_release, parse_key};
use crate::core::output::{OutputGate, TerminalCmd};
use crate::core::terminal::Terminal;
use crate::error::{Result, TuiError};
use crate::render::renderer::{DiffRenderer, RenderMetrics};
use crate::render::Frame;
use crate::runtime::focus::FocusState;
use crate::runtime::wake::{RenderHandle, RuntimeWake};
use crate::widgets::Container;

/// What an input interceptor decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputDisposition {
    /// The interceptor handled the input; the focused component never sees it.
    Consume,
    /// Pass the input on to the focused component.
    Forward,
}

/// Runs before focus dispatch, e.g. for global shortcuts.
pub type InputInterceptor = Box<dyn FnMut(&str) -> InputDisposition>;

pub struct TuiRuntime<T: Terminal> {
    terminal: T,
    output: OutputGate,
    root: Container,
    renderer: DiffRenderer,
    focus: FocusState,
    interceptor: Option<InputInterceptor>,
    wake: Arc<RuntimeWake>,
    stopped: bool,
}

impl<T: Terminal> TuiRuntime<T> {
    /// Runtime with renderer settings from the environment (`DELTALINE_BULK_THRESHOLD`).
    pub fn new(terminal: T) -> Self {
        Self::with_config(terminal, EnvConfig::from_env().renderer)
    }

    pub fn with_config(terminal: T, config: RendererConfig) -> Self {
        let wake = Arc::new(RuntimeWake::default());
        let mut root = Container::new();
        root.attach(Some(RenderHandle::new(Arc::clone(&wake))));
        Self {
            terminal,
            output: OutputGate::new(),
            root,
            renderer: DiffRenderer::with_config(config),
            focus: FocusState::new(),
            interceptor: None,
            wake,
            stopped: true,
        }
    }

    pub fn render_handle(&self) -> RenderHandle {
        RenderHandle::new(Arc::clone(&self.wake))
    }

    pub fn root_mut(&mut self) -> &mut Container {
        &mut self.root
    }

    pub fn add_child(&mut self, component: Box<dyn Component>) -> Option<ComponentId> {
        self.root.add_child(component)
    }

    pub fn set_focus(&mut self, id: ComponentId) {
        self.focus.set_focus(&mut self.root, Some(id));
        self.request_render();
    }

    pub fn clear_focus(&mut self) {
        self.focus.clear(&mut self.root);
        self.request_render();
    }

    pub fn focused(&self) -> Option<ComponentId> {
        self.focus.focused()
    }

    pub fn set_input_interceptor(&mut self, interceptor: InputInterceptor) {
        self.interceptor = Some(interceptor);
    }

    pub fn clear_input_interceptor(&mut self) {
        self.interceptor = None;
    }

    pub fn terminal(&self) -> &T {
        &self.terminal
    }

    pub fn terminal_mut(&mut self) -> &mut T {
        &mut self.terminal
    }

    pub fn renderer(&self) -> &DiffRenderer {
        &self.renderer
    }

    pub fn metrics(&self) -> RenderMetrics {
        self.renderer.metrics()
    }

    pub fn is_running(&self) -> bool {
        !self.stopped
    }

    /// Start the terminal and paint the current tree.
    ///
    /// A restart after [`Self::stop`] paints from scratch below whatever the previous session
    /// left on screen.
    pub fn start(&mut self) -> Result<()> {
        self.output.clear();
        self.wake.reset_for_start();
        self.renderer.reset();

        let wake_input = Arc::clone(&self.wake);
        let wake_resize = Arc::clone(&self.wake);
        self.terminal
            .start(
                Box::new(move |data| {
                    wake_input.enqueue_input(data);
                }),
                Box::new(move || {
                    wake_resize.signal_resize();
                }),
            )
            .map_err(TuiError::TerminalStart)?;

        self.stopped = false;
        tracing::debug!(
            columns = self.terminal.columns(),
            rows = self.terminal.rows(),
            "runtime started"
        );
        self.render_now();
        Ok(())
    }

    /// Show the cursor and hand the terminal back. Calling it twice is harmless.
    pub fn stop(&mut self) -> Result<()> {
        if self.stopped {
            return Ok(());
        }
        self.stopped = true;
        self.wake.request_stop();
        self.output.push(TerminalCmd::ShowCursor);
        self.flush_output();
        self.terminal.stop().map_err(TuiError::TerminalStop)?;
        tracing::debug!(metrics = ?self.renderer.metrics(), "runtime stopped");
        Ok(())
    }

    /// Block until something happens, then process it.
    ///
    /// This does not loop; callers usually call it in a loop until [`Self::stop`].
    pub fn run_blocking_once(&mut self) {
        if self.stopped {
            return;
        }
        if !self.wake.wait_for_event() {
            return;
        }
        self.run_once();
    }

    /// Process queued resize and input, then render at most once.
    pub fn run_once(&mut self) {
        if self.stopped {
            return;
        }

        if self.wake.take_pending_resize() {
            self.renderer.force_full_repaint();
            self.request_render();
        }

        for data in self.wake.drain_inputs() {
            self.handle_input(&data);
        }

        self.render_if_needed();
    }

    /// Dispatch one input chunk: interceptor first, then the focused component.
    pub fn handle_input(&mut self, data: &str) {
        if is_key_release(data) {
            return;
        }
        tracing::trace!(
            target: "deltaline::input",
            key = parse_key(data).as_deref().unwrap_or("unknown"),
            bytes = data.len(),
            "input"
        );

        if let Some(interceptor) = self.interceptor.as_mut() {
            if interceptor(data) == InputDisposition::Consume {
                self.request_render();
                return;
            }
        }

        let Some(component) = self.focus.focused_mut(&mut self.root) else {
            return;
        };
        component.handle_input(data);
        self.request_render();
    }

    pub fn request_render(&mut self) {
        self.wake.request_render();
    }

    pub fn render_if_needed(&mut self) {
        let requested = self.wake.take_render_requested();
        if requested || self.root.structure_changed() {
            self.do_render();
        }
        self.flush_output();
    }

    pub fn render_now(&mut self) {
        self.wake.take_render_requested();
        self.do_render();
        self.flush_output();
    }

    fn do_render(&mut self) {
        let width = self.terminal.columns() as usize;
        let height = self.terminal.rows() as usize;
        let lines = self.root.render(width);
        let cmds = self.renderer.render(Frame::from(lines), width, height);
        self.output.extend(cmds);
    }

    fn flush_output(&mut self) {
        if self.output.is_empty() {
            return;
        }
        self.output.flush(&mut self.terminal);
    }
}

impl<T: Terminal> Drop for TuiRuntime<T> {
    fn drop(&mut self) {
        if self.stopped {
            return;
        }

        // Best-effort cleanup: never panic in Drop (especially during unwind).
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = self.stop();
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::{InputDisposition, TuiRuntime};
    use crate::config::test_env::{env_lock, set_env_guard};
    use crate::config::{RendererConfig, DEFAULT_BULK_REWRITE_THRESHOLD};
    use crate::widgets::Container;
    use crate::core::component::{Component, ComponentId, Focusable};
    use crate::core::terminal::Terminal;
    use crate::render::RenderOutcome;
    use std::cell::RefCell;
    use std::io;
    use std::rc::Rc;

    #[derive(Default)]
    struct TestTerminal {
        output: String,
        columns: u16,
        rows: u16,
        on_input: Option<Box<dyn FnMut(String) + Send>>,
        on_resize: Option<Box<dyn FnMut() + Send>>,
        stopped: bool,
    }

    impl TestTerminal {
        fn new(columns: u16, rows: u16) -> Self {
            Self {
                columns,
                rows,
                ..Self::default()
            }
        }

        fn take_output(&mut self) -> String {
            std::mem::take(&mut self.output)
        }

        fn send_input(&mut self, data: &str) {
            if let Some(on_input) = self.on_input.as_mut() {
                on_input(data.to_string());
            }
        }

        fn resize(&mut self, columns: u16, rows: u16) {
            self.columns = columns;
            self.rows = rows;
            if let Some(on_resize) = self.on_resize.as_mut() {
                on_resize();
            }
        }
    }

    impl Terminal for TestTerminal {
        fn start(
            &mut self,
            on_input: Box<dyn FnMut(String) + Send>,
            on_resize: Box<dyn FnMut() + Send>,
        ) -> io::Result<()> {
            self.on_input = Some(on_input);
            self.on_resize = Some(on_resize);
            Ok(())
        }

        fn stop(&mut self) -> io::Result<()> {
            self.stopped = true;
            Ok(())
        }

        fn write(&mut self, data: &str) -> io::Result<()> {
            self.output.push_str(data);
            Ok(())
        }

        fn columns(&self) -> u16 {
            self.columns
        }

        fn rows(&self) -> u16 {
            self.rows
        }
    }

    struct Recorder {
        id: ComponentId,
        label: &'static str,
        received: Rc<RefCell<Vec<String>>>,
        focused: bool,
    }

    impl Recorder {
        fn new(label: &'static str) -> (Self, Rc<RefCell<Vec<String>>>) {
            let received = Rc::new(RefCell::new(Vec::new()));
            let recorder = Self {
                id: ComponentId::next(),
                label,
                received: Rc::clone(&received),
                focused: false,
            };
            (recorder, received)
        }
    }

    impl Component for Recorder {
        fn render(&mut self, _width: usize) -> Vec<String> {
            vec![format!("{}:{}", self.label, self.received.borrow().len())]
        }

        fn handle_input(&mut self, data: &str) {
            self.received.borrow_mut().push(data.to_string());
        }

        fn id(&self) -> Option<ComponentId> {
            Some(self.id)
        }

        fn as_focusable(&mut self) -> Option<&mut dyn Focusable> {
            Some(self)
        }
    }

    impl Focusable for Recorder {
        fn set_focused(&mut self, focused: bool) {
            self.focused = focused;
        }

        fn is_focused(&self) -> bool {
            self.focused
        }
    }

    fn runtime(columns: u16, rows: u16) -> TuiRuntime<TestTerminal> {
        TuiRuntime::with_config(TestTerminal::new(columns, rows), RendererConfig::default())
    }

    fn started(columns: u16, rows: u16) -> TuiRuntime<TestTerminal> {
        let mut tui = runtime(columns, rows);
        tui.start().expect("start");
        tui
    }

    #[test]
    fn new_reads_the_bulk_threshold_from_the_environment() {
        let _lock = env_lock();
        let _threshold = set_env_guard("DELTALINE_BULK_THRESHOLD", Some("0"));
        let tui = TuiRuntime::new(TestTerminal::new(20, 10));
        assert_eq!(tui.renderer().config().bulk_rewrite_threshold, 0);

        let _threshold = set_env_guard("DELTALINE_BULK_THRESHOLD", None);
        let tui = TuiRuntime::new(TestTerminal::new(20, 10));
        assert_eq!(
            tui.renderer().config().bulk_rewrite_threshold,
            DEFAULT_BULK_REWRITE_THRESHOLD
        );
    }

    #[test]
    fn start_paints_the_tree() {
        let mut tui = runtime(20, 10);
        let (recorder, _) = Recorder::new("a");
        tui.add_child(Box::new(recorder));
        tui.start().expect("start");
        assert_eq!(tui.terminal_mut().take_output(), "\x1b[?25la:0\r\n");
        assert_eq!(tui.renderer().last_outcome(), RenderOutcome::FirstPaint);
    }

    #[test]
    fn children_added_after_start_are_appended() {
        let mut tui = started(20, 10);
        assert_eq!(tui.terminal_mut().take_output(), "\x1b[?25l");
        let (recorder, _) = Recorder::new("a");
        tui.add_child(Box::new(recorder));
        tui.run_once();
        assert_eq!(tui.terminal_mut().take_output(), "\ra:0\r\n");
    }

    #[test]
    fn render_requests_coalesce_into_one_pass() {
        let mut tui = started(20, 10);
        let handle = tui.render_handle();
        assert_eq!(tui.metrics().passes, 1);
        for _ in 0..5 {
            handle.request_render();
        }
        tui.run_once();
        assert_eq!(tui.metrics().passes, 2);
        tui.run_once();
        assert_eq!(tui.metrics().passes, 2);
    }

    #[test]
    fn input_goes_to_focused_component_only() {
        let mut tui = started(20, 10);
        let (first, first_inputs) = Recorder::new("a");
        let (second, second_inputs) = Recorder::new("b");
        tui.add_child(Box::new(first));
        let second_id = tui.add_child(Box::new(second)).expect("id");
        tui.set_focus(second_id);
        tui.run_once();
        tui.terminal_mut().take_output();

        tui.terminal_mut().send_input("x");
        tui.run_once();

        assert!(first_inputs.borrow().is_empty());
        assert_eq!(*second_inputs.borrow(), vec!["x".to_string()]);
        assert_eq!(tui.terminal_mut().take_output(), "\x1b[1A\r\x1b[2Kb:1\x1b[1B\r");
    }

    #[test]
    fn unfocused_input_is_dropped() {
        let mut tui = started(20, 10);
        let (recorder, inputs) = Recorder::new("a");
        tui.add_child(Box::new(recorder));
        tui.handle_input("x");
        assert!(inputs.borrow().is_empty());
    }

    #[test]
    fn interceptor_runs_first() {
        let mut tui = started(20, 10);
        let (recorder, inputs) = Recorder::new("a");
        let id = tui.add_child(Box::new(recorder)).expect("id");
        tui.set_focus(id);

        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_by_interceptor = Rc::clone(&seen);
        tui.set_input_interceptor(Box::new(move |data: &str| {
            seen_by_interceptor.borrow_mut().push(data.to_string());
            if data == "\x03" {
                InputDisposition::Consume
            } else {
                InputDisposition::Forward
            }
        }));

        tui.handle_input("\x03");
        tui.handle_input("a");
        assert_eq!(*seen.borrow(), vec!["\x03".to_string(), "a".to_string()]);
        assert_eq!(*inputs.borrow(), vec!["a".to_string()]);
    }

    #[test]
    fn key_releases_are_not_dispatched() {
        let mut tui = started(20, 10);
        let (recorder, inputs) = Recorder::new("a");
        let id = tui.add_child(Box::new(recorder)).expect("id");
        tui.set_focus(id);
        tui.handle_input("\x1b[97;1:3u");
        assert!(inputs.borrow().is_empty());
        tui.handle_input("\x1b[97;1:1u");
        assert_eq!(inputs.borrow().len(), 1);
    }

    #[test]
    fn resize_forces_full_repaint() {
        let mut tui = started(20, 10);
        let (recorder, _) = Recorder::new("a");
        tui.add_child(Box::new(recorder));
        tui.run_once();
        tui.terminal_mut().take_output();

        tui.terminal_mut().resize(20, 10);
        tui.run_once();
        assert_eq!(tui.terminal_mut().take_output(), "\x1b[2J\x1b[H\x1b[?25la:0\r\n");
        assert_eq!(tui.renderer().last_outcome(), RenderOutcome::ResizeRepaint);
    }

    #[test]
    fn stop_shows_cursor_and_halts() {
        let mut tui = started(20, 10);
        tui.run_once();
        tui.terminal_mut().take_output();

        tui.stop().expect("stop");
        assert_eq!(tui.terminal_mut().take_output(), "\x1b[?25h");
        assert!(tui.terminal().stopped);
        assert!(!tui.is_running());

        tui.request_render();
        tui.run_once();
        assert_eq!(tui.terminal_mut().take_output(), "");
        tui.stop().expect("second stop");
    }

    #[test]
    fn restart_paints_from_scratch() {
        let mut tui = runtime(20, 10);
        let (recorder, _) = Recorder::new("a");
        tui.add_child(Box::new(recorder));
        tui.start().expect("start");
        tui.stop().expect("stop");
        tui.terminal_mut().take_output();

        tui.start().expect("restart");
        assert_eq!(tui.terminal_mut().take_output(), "\x1b[?25la:0\r\n");
        assert_eq!(tui.renderer().last_outcome(), RenderOutcome::FirstPaint);
    }

    #[test]
    fn structure_changes_render_without_a_request() {
        let mut tui = started(20, 10);
        tui.terminal_mut().take_output();

        let mut nested = Container::new();
        let (recorder, _) = Recorder::new("n");
        nested.add_child(Box::new(recorder));
        tui.add_child(Box::new(nested));
        // Lose the request the add made; the child count alone must trigger the pass.
        assert!(tui.wake.take_render_requested());

        tui.run_once();
        assert_eq!(tui.terminal_mut().take_output(), "\rn:0\r\n");
        tui.run_once();
        assert_eq!(tui.terminal_mut().take_output(), "");
    }
}
