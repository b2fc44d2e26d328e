//! Text widget.

use crate::core::component::{Component, ComponentId};
use crate::core::text::slice::wrap_text_with_ansi;
use crate::core::text::utils::apply_background_to_line;
use crate::runtime::wake::RenderHandle;

pub type TextBgFn = Box<dyn Fn(&str) -> String>;

struct TextCache {
    width: usize,
    lines: Vec<String>,
}

/// Wrapped plain or pre-styled text with padding and an optional full-width tint.
pub struct Text {
    id: ComponentId,
    text: String,
    padding_x: usize,
    padding_y: usize,
    bg_fn: Option<TextBgFn>,
    handle: Option<RenderHandle>,
    cache: Option<TextCache>,
}

impl Text {
    pub fn new(text: impl Into<String>) -> Self {
        Self::with_padding(text, 1, 1)
    }

    pub fn with_padding(text: impl Into<String>, padding_x: usize, padding_y: usize) -> Self {
        Self {
            id: ComponentId::next(),
            text: text.into(),
            padding_x,
            padding_y,
            bg_fn: None,
            handle: None,
            cache: None,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.changed();
    }

    pub fn set_padding(&mut self, padding_x: usize, padding_y: usize) {
        self.padding_x = padding_x;
        self.padding_y = padding_y;
        self.changed();
    }

    pub fn set_bg_fn(&mut self, bg_fn: Option<TextBgFn>) {
        self.bg_fn = bg_fn;
        self.changed();
    }

    fn changed(&mut self) {
        self.invalidate();
        if let Some(handle) = &self.handle {
            handle.request_render();
        }
    }

    fn render_uncached(&self, width: usize) -> Vec<String> {
        let normalized = self.text.replace('\t', "   ");
        let content_width = width.saturating_sub(self.padding_x * 2).max(1);
        let margin = " ".repeat(self.padding_x);
        let finish = |line: &str| match self.bg_fn.as_deref() {
            Some(bg_fn) => {
                apply_background_to_line(&format!("{margin}{line}{margin}"), width, bg_fn)
            }
            None if line.is_empty() => String::new(),
            None => format!("{margin}{line}"),
        };

        let blank = finish("");
        if self.text.trim().is_empty() {
            return vec![blank];
        }

        let mut lines = vec![blank.clone(); self.padding_y];
        for line in wrap_text_with_ansi(&normalized, content_width) {
            lines.push(finish(&line));
        }
        lines.extend(std::iter::repeat(blank).take(self.padding_y));
        lines
    }
}

impl Component for Text {
    fn render(&mut self, width: usize) -> Vec<String> {
        if let Some(cache) = self.cache.as_ref() {
            if cache.width == width {
                return cache.lines.clone();
            }
        }
        let lines = self.render_uncached(width);
        self.cache = Some(TextCache {
            width,
            lines: lines.clone(),
        });
        lines
    }

    fn invalidate(&mut self) {
        self.cache = None;
    }

    fn id(&self) -> Option<ComponentId> {
        Some(self.id)
    }

    fn attach(&mut self, handle: Option<RenderHandle>) {
        self.handle = handle;
    }
}
