//! Runtime orchestration.

pub mod focus;
pub mod tui;
pub mod wake;

pub use tui::{InputDisposition, InputInterceptor, TuiRuntime};
pub use wake::RenderHandle;
