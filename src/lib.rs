//! Inline terminal UI building blocks for chat-style command line agents.
//!
//! Invariant: single output gate. Only `core::output::OutputGate::flush(..)` writes to the
//! terminal, once per render pass.
//!
//! # Public API Overview
//! - Compose [`Component`]s in a [`Container`] and hand it to a runtime via [`TUI`].
//! - [`DiffRenderer`] turns successive frames into minimal escape programs.
//! - Decode raw input with [`matches_key`] / [`parse_key`] (legacy and Kitty encodings).
//! - Format markdown with [`MarkdownFormatter`] or the [`Markdown`] widget.
//! - ANSI-aware width, slicing and wrapping helpers for custom widgets.
//!
//! # Runtime Alias
//! [`TUI`] is a type alias for `runtime::tui::TuiRuntime<T>`.

#![allow(
    clippy::derivable_impls,
    clippy::needless_range_loop,
    clippy::too_many_arguments,
    clippy::type_complexity
)]

pub mod config;
pub mod error;
pub mod logging;

pub mod core;
pub mod format;
pub mod platform;
pub mod render;
pub mod runtime;
pub mod widgets;

/// Configuration and errors.
pub use crate::config::{EnvConfig, RendererConfig, DEFAULT_BULK_REWRITE_THRESHOLD};
pub use crate::error::{Result, TuiError};

/// Built-in UI components.
pub use crate::widgets::{Container, Markdown, Spacer, Text};

/// Markdown formatting.
pub use crate::format::{DefaultTextStyle, MarkdownFormatter, MarkdownTheme};

/// Keyboard input parsing and matching helpers.
pub use crate::core::input::{
    decode, is_key_release, is_key_repeat, key_event_type, matches_key, parse_key, Key,
    KeyEventType, KeyId, Modifiers,
};

/// Terminal interfaces and process-backed implementation.
pub use crate::core::terminal::Terminal;
pub use crate::platform::process_terminal::ProcessTerminal;

/// Component protocol.
pub use crate::core::component::{Component, ComponentId, Focusable};

/// Render layer.
pub use crate::render::{DiffRenderer, Frame, RenderMetrics, RenderOutcome};

/// Runtime types.
pub use crate::runtime::{InputDisposition, InputInterceptor, RenderHandle, TuiRuntime};

/// Alias for the main runtime type.
pub type TUI<T> = crate::runtime::tui::TuiRuntime<T>;

/// Returns whether a component exposes focus behavior via [`Focusable`].
pub fn is_focusable(component: &mut dyn Component) -> bool {
    component.as_focusable().is_some()
}

/// ANSI-aware wrapping helper.
pub use crate::core::text::slice::{slice_by_column, wrap_text_with_ansi};
/// Width clamping and tint helpers.
pub use crate::core::text::utils::{apply_background_to_line, clamp_to_width};
/// Visible width helper that ignores ANSI control sequences.
pub use crate::core::text::width::visible_width;
