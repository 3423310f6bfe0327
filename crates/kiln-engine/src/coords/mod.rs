//! Integer pixel geometry and colour types shared by the scene graph and
//! the render thread.
//!
//! Canonical space:
//! - Screen pixels
//! - Origin top-left
//! - +X right, +Y down
//!
//! Viewport regions nest: a child region is expressed relative to the
//! origin of the region that contains it.

mod color;
mod rect;
mod vec2;

pub use color::{ColorRgba, Tone};
pub use rect::Rect;
pub use vec2::Vec2i;
