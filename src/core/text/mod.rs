//! Text helpers: escape scanning, width, slicing and wrapping.
//!
//! Everything here is string in, string out, so widgets can use it without touching the
//! render layer.

pub mod ansi;
pub mod slice;
pub mod utils;
pub mod width;
