//! Kiln engine crate.
//!
//! Runtime core of a 2D engine split across two threads: the logic thread
//! owns the scene graph and drives frames, the render thread owns the GPU
//! and every agent. They talk only through posted tasks.
//!
//! Module map:
//! - `worker`: task dispatch onto a dedicated thread (or inline)
//! - `agent`: render-side resources named from the logic thread
//! - `scene`: ordered drawable hierarchy and stage broadcast
//! - `render`: render-thread context, GPU device, clip stack
//! - `screen`: frame driver, viewports, flash
//! - `coords`, `time`, `logging`: shared utilities

pub mod agent;
pub mod coords;
pub mod logging;
pub mod render;
pub mod scene;
pub mod screen;
pub mod time;
pub mod worker;
