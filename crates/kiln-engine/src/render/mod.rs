//! Render-thread state.
//!
//! Everything here is owned by the render worker and only touched from
//! tasks posted to it. The logic thread reaches it through `RenderRunner`.
//!
//! Convention:
//! - geometry is in target pixels (top-left origin, +Y down)
//! - frames render into an off-screen screen buffer, no swapchain
//! - fills are positioned in the bound world and land in the active target

mod context;
mod fill;
mod gpu;
mod scissor;
mod target;
mod world;

pub use context::{FrameStats, RenderContext};
pub use fill::BlendMode;
pub use gpu::{GpuDevice, GpuInit, Pixels, ScreenBuffer, SCREEN_FORMAT};
pub use scissor::ScissorStack;
pub use target::{TargetBuffer, TargetRef, WorldRef};
pub use world::{WorldBinding, WorldMatrix};

use crate::worker::TaskRunner;

/// Dispatcher bound to the render thread's context.
pub type RenderRunner = TaskRunner<RenderContext>;
