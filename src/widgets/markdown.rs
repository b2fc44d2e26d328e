//! Markdown widget.

use crate::core::component::{Component, ComponentId};
use crate::format::{DefaultTextStyle, MarkdownFormatter, MarkdownTheme};
use crate::runtime::wake::RenderHandle;

/// Component wrapper around [`MarkdownFormatter`].
///
/// Typical use is a streamed assistant reply: call [`Markdown::set_text`] with the growing text
/// and let the runtime re-render.
pub struct Markdown {
    id: ComponentId,
    text: String,
    formatter: MarkdownFormatter,
    handle: Option<RenderHandle>,
}

impl Markdown {
    pub fn new(
        text: impl Into<String>,
        padding_x: usize,
        padding_y: usize,
        theme: MarkdownTheme,
        default_text_style: Option<DefaultTextStyle>,
    ) -> Self {
        Self {
            id: ComponentId::next(),
            text: text.into(),
            formatter: MarkdownFormatter::new(theme, default_text_style)
                .with_padding(padding_x, padding_y),
            handle: None,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.changed();
    }

    /// Append a streamed fragment.
    pub fn push_str(&mut self, fragment: &str) {
        if fragment.is_empty() {
            return;
        }
        self.text.push_str(fragment);
        self.changed();
    }

    pub fn set_padding(&mut self, padding_x: usize, padding_y: usize) {
        self.formatter.set_padding(padding_x, padding_y);
        self.changed();
    }

    pub fn set_theme(&mut self, theme: MarkdownTheme) {
        self.formatter.set_theme(theme);
        self.changed();
    }

    pub fn set_default_text_style(&mut self, style: Option<DefaultTextStyle>) {
        self.formatter.set_default_text_style(style);
        self.changed();
    }

    fn changed(&mut self) {
        self.formatter.invalidate();
        if let Some(handle) = &self.handle {
            handle.request_render();
        }
    }
}

impl Component for Markdown {
    fn render(&mut self, width: usize) -> Vec<String> {
        self.formatter.format(&self.text, width)
    }

    fn invalidate(&mut self) {
        self.formatter.invalidate();
    }

    fn id(&self) -> Option<ComponentId> {
        Some(self.id)
    }

    fn attach(&mut self, handle: Option<RenderHandle>) {
        self.handle = handle;
    }
}
