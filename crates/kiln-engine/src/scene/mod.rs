//! Scene graph.
//!
//! Responsibilities:
//! - own drawable nodes and the controllers that order them
//! - keep each controller's children sorted by `SortKey` (ties in insertion order)
//! - broadcast render stages to children, honouring per-node visibility
//! - stay consistent when handlers dispose nodes mid-broadcast
//!
//! The graph is single-threaded and lives with the logic thread. GPU work
//! is never done here; handlers post it through `RenderParams::runner`.

mod graph;
mod key;
mod node;
mod params;

pub use graph::{NotificationHandler, SceneGraph};
pub use key::SortKey;
pub use node::{ControllerId, DrawableKind, NodeId, NodeTag, NodeVisibility, RenderStage};
pub use params::RenderParams;
pub use crate::render::{TargetRef, WorldRef};
