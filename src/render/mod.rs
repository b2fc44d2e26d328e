//! Rendering pipeline.

pub mod frame;
pub mod renderer;

pub use frame::Frame;
pub use renderer::{DiffRenderer, RenderMetrics, RenderOutcome};
