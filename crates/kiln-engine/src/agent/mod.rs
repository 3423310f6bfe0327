//! GPU agent lifetime.
//!
//! An agent is the render-thread half of a logical drawable: buffers,
//! textures and bindings that only the render thread may touch. The logic
//! thread keeps an [`AgentHandle`], which names the agent but can never reach
//! its contents.
//!
//! Lifecycle, all through the owning object's [`TaskRunner`]:
//! 1. `AgentHandle::create` reserves an [`AgentId`] on the logic thread and
//!    posts the task that builds the agent into the render thread's
//!    [`AgentStore`].
//! 2. Per-frame work is posted with `AgentHandle::update`.
//! 3. On disposal the owner detaches its scene node first, then calls
//!    `AgentHandle::destroy`. Nothing can broadcast to a detached node, so
//!    the destroy task is always the last task to touch the agent.
//!
//! [`TaskRunner`]: crate::worker::TaskRunner

mod handle;
mod store;

pub use handle::{AgentHandle, AgentRef};
pub use store::{AgentHost, AgentId, AgentStore};
