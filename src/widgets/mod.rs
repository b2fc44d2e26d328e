//! Built-in components.

pub mod container;
pub mod markdown;
pub mod spacer;
pub mod text;

pub use container::Container;
pub use markdown::Markdown;
pub use spacer::Spacer;
pub use text::{Text, TextBgFn};
