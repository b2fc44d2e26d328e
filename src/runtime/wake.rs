//! Cross-thread wakeups for the runtime loop.
//!
//! Terminal input and resize callbacks run on the terminal's own threads. They only push
//! into [`RuntimeWake`]; the component tree and renderer stay on the runtime thread.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};

#[derive(Default)]
struct RuntimeWakeState {
    pending_inputs: Vec<String>,
    pending_resize: bool,
    render_requested: bool,
    stop_requested: bool,
}

#[derive(Default)]
pub(crate) struct RuntimeWake {
    state: Mutex<RuntimeWakeState>,
    cvar: Condvar,
}

impl RuntimeWake {
    fn lock(&self) -> MutexGuard<'_, RuntimeWakeState> {
        match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Block until there is work or a stop request. Returns `false` on stop.
    pub(crate) fn wait_for_event(&self) -> bool {
        let mut state = self.lock();
        while !state.stop_requested
            && state.pending_inputs.is_empty()
            && !state.pending_resize
            && !state.render_requested
        {
            state = self
                .cvar
                .wait(state)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
        !state.stop_requested
    }

    pub(crate) fn enqueue_input(&self, data: String) {
        let mut state = self.lock();
        state.pending_inputs.push(data);
        self.cvar.notify_one();
    }

    pub(crate) fn signal_resize(&self) {
        let mut state = self.lock();
        state.pending_resize = true;
        self.cvar.notify_one();
    }

    pub(crate) fn request_render(&self) {
        let mut state = self.lock();
        state.render_requested = true;
        self.cvar.notify_one();
    }

    pub(crate) fn take_pending_resize(&self) -> bool {
        std::mem::take(&mut self.lock().pending_resize)
    }

    pub(crate) fn drain_inputs(&self) -> Vec<String> {
        std::mem::take(&mut self.lock().pending_inputs)
    }

    pub(crate) fn take_render_requested(&self) -> bool {
        std::mem::take(&mut self.lock().render_requested)
    }

    pub(crate) fn reset_for_start(&self) {
        let mut state = self.lock();
        *state = RuntimeWakeState::default();
    }

    pub(crate) fn request_stop(&self) {
        let mut state = self.lock();
        state.stop_requested = true;
        self.cvar.notify_all();
    }
}

/// Cloneable, thread-safe handle that asks the owning runtime for a render.
///
/// Requests coalesce: any number of calls before the next pass produce one render.
#[derive(Clone)]
pub struct RenderHandle {
    wake: Arc<RuntimeWake>,
}

impl RenderHandle {
    pub(crate) fn new(wake: Arc<RuntimeWake>) -> Self {
        Self { wake }
    }

    pub fn request_render(&self) {
        self.wake.request_render();
    }
}

impl std::fmt::Debug for RenderHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderHandle").finish_non_exhaustive()
    }
}
