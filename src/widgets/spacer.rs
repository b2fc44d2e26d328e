//! Spacer widget.

use crate::core::component::{Component, ComponentId};
use crate::runtime::wake::RenderHandle;

/// A fixed number of empty lines.
pub struct Spacer {
    id: ComponentId,
    lines: usize,
    handle: Option<RenderHandle>,
}

impl Spacer {
    pub fn new() -> Self {
        Self::with_lines(1)
    }

    pub fn with_lines(lines: usize) -> Self {
        Self {
            id: ComponentId::next(),
            lines,
            handle: None,
        }
    }

    pub fn set_lines(&mut self, lines: usize) {
        if self.lines == lines {
            return;
        }
        self.lines = lines;
        if let Some(handle) = &self.handle {
            handle.request_render();
        }
    }
}

impl Default for Spacer {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for Spacer {
    fn render(&mut self, _width: usize) -> Vec<String> {
        vec![String::new(); self.lines]
    }

    fn id(&self) -> Option<ComponentId> {
        Some(self.id)
    }

    fn attach(&mut self, handle: Option<RenderHandle>) {
        self.handle = handle;
    }
}
