use generational_arena::Arena;
use super::key::SortKey;
use super::node::{ControllerId, NodeId, NodeTag, NodeVisibility, RenderStage};
use super::params::RenderParams;

/// Callback a drawable registers on its node. Receives the graph so it can
/// broadcast to a nested controller.
pub type NotificationHandler = Box<dyn FnMut(&mut SceneGraph, RenderStage, &mut RenderParams<'_>)>;

struct NodeData {
    controller: Option<ControllerId>,
    key: SortKey,
    visibility: NodeVisibility,
    tag: NodeTag,
    handler: Option<NotificationHandler>,
}

#[derive(Default)]
struct ControllerData {
    /// Ascending by key; equal keys in insertion order.
    nodes: Vec<NodeId>,
}

/// Ordered drawable hierarchy living on the logic thread.
///
/// Nodes and controllers are named by generational ids, so a stale id held
/// by a disposed drawable resolves to nothing instead of a reused slot.
#[derive(Default)]
pub struct SceneGraph {
    nodes: Arena<NodeData>,
    controllers: Arena<ControllerData>,
    /// Reused snapshot buffers, one per nested broadcast level.
    scratch: Vec<Vec<NodeId>>,
    broadcast_depth: u32,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    // ── controllers ─────────────────────────────────────────────────────────

    pub fn create_controller(&mut self) -> ControllerId {
        ControllerId(self.controllers.insert(ControllerData::default()))
    }

    /// Drops the controller. Nodes still attached become detached.
    pub fn destroy_controller(&mut self, id: ControllerId) {
        let Some(ctrl) = self.controllers.remove(id.0) else {
            debug_assert!(false, "controller {id:?} destroyed twice");
            return;
        };

        if !ctrl.nodes.is_empty() {
            log::debug!(
                "controller {id:?} destroyed with {} attached node(s)",
                ctrl.nodes.len()
            );
        }
        for node in ctrl.nodes {
            if let Some(data) = self.nodes.get_mut(node.0) {
                data.controller = None;
            }
        }
    }

    #[inline]
    pub fn controller_exists(&self, id: ControllerId) -> bool {
        self.controllers.contains(id.0)
    }

    /// Children of `id` in paint order.
    pub fn nodes(&self, id: ControllerId) -> &[NodeId] {
        self.controllers
            .get(id.0)
            .map(|c| c.nodes.as_slice())
            .unwrap_or(&[])
    }

    // ── nodes ───────────────────────────────────────────────────────────────

    /// Creates a node and attaches it to `controller` when given.
    pub fn create_node(
        &mut self,
        controller: Option<ControllerId>,
        key: SortKey,
        tag: NodeTag,
    ) -> NodeId {
        let id = NodeId(self.nodes.insert(NodeData {
            controller: None,
            key,
            visibility: NodeVisibility::Visible,
            tag,
            handler: None,
        }));

        if let Some(controller) = controller {
            self.attach(id, controller);
        }
        id
    }

    /// Detaches and frees the node. Its handler is dropped.
    pub fn dispose_node(&mut self, id: NodeId) {
        if !self.nodes.contains(id.0) {
            debug_assert!(false, "node {id:?} disposed twice");
            return;
        }
        self.detach(id);
        self.nodes.remove(id.0);
    }

    #[inline]
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.nodes.contains(id.0)
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn register_handler(&mut self, id: NodeId, handler: NotificationHandler) {
        let Some(node) = self.nodes.get_mut(id.0) else {
            debug_assert!(false, "handler registered on dead node {id:?}");
            return;
        };
        debug_assert!(node.handler.is_none(), "node {id:?} already has a handler");
        node.handler = Some(handler);
    }

    /// Moves the node to `controller` (or detaches it for `None`), keeping
    /// its sort key. Must not be called while a broadcast is in flight.
    pub fn rebind_controller(&mut self, id: NodeId, controller: Option<ControllerId>) {
        debug_assert_eq!(
            self.broadcast_depth, 0,
            "controller rebinding during a broadcast"
        );

        let current = self.nodes.get(id.0).and_then(|n| n.controller);
        if current == controller {
            return;
        }

        self.detach(id);
        if let Some(controller) = controller {
            self.attach(id, controller);
        }
    }

    pub fn controller_of(&self, id: NodeId) -> Option<ControllerId> {
        self.nodes.get(id.0).and_then(|n| n.controller)
    }

    pub fn sort_key(&self, id: NodeId) -> Option<SortKey> {
        self.nodes.get(id.0).map(|n| n.key)
    }

    /// Replaces the leading 1 to 3 weights and moves the node to its new
    /// position. Detached nodes just record the new key.
    pub fn set_sort_weights(&mut self, id: NodeId, weights: &[i64]) {
        let Some(node) = self.nodes.get_mut(id.0) else { return };
        let mut key = node.key;
        key.set_weights(weights);
        if key == node.key {
            return;
        }

        let controller = node.controller;
        self.detach(id);
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.key = key;
        }
        if let Some(controller) = controller {
            self.attach(id, controller);
        }
    }

    pub fn visibility(&self, id: NodeId) -> Option<NodeVisibility> {
        self.nodes.get(id.0).map(|n| n.visibility)
    }

    pub fn set_visibility(&mut self, id: NodeId, visibility: impl Into<NodeVisibility>) {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.visibility = visibility.into();
        }
    }

    pub fn tag(&self, id: NodeId) -> Option<NodeTag> {
        self.nodes.get(id.0).map(|n| n.tag)
    }

    pub fn set_batch_tag(&mut self, id: NodeId, batch: u64) {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.tag.batch = batch;
        }
    }

    /// Previous sibling in paint order, if attached and not first.
    pub fn previous_node(&self, id: NodeId) -> Option<NodeId> {
        let (siblings, at) = self.position(id)?;
        at.checked_sub(1).map(|i| siblings[i])
    }

    /// Next sibling in paint order, if attached and not last.
    pub fn next_node(&self, id: NodeId) -> Option<NodeId> {
        let (siblings, at) = self.position(id)?;
        siblings.get(at + 1).copied()
    }

    // ── broadcast ───────────────────────────────────────────────────────────

    /// Invokes every eligible child handler of `controller` in paint order.
    ///
    /// The child order is snapshotted first. A node disposed or detached by
    /// an earlier handler in the same pass is skipped.
    pub fn broadcast(
        &mut self,
        controller: ControllerId,
        stage: RenderStage,
        params: &mut RenderParams<'_>,
    ) {
        let Some(ctrl) = self.controllers.get(controller.0) else {
            debug_assert!(false, "broadcast to destroyed controller {controller:?}");
            return;
        };

        let mut order = self.scratch.pop().unwrap_or_default();
        order.extend_from_slice(&ctrl.nodes);
        self.broadcast_depth += 1;

        for &id in &order {
            let Some(node) = self.nodes.get_mut(id.0) else { continue };
            if node.controller != Some(controller) || !node.visibility.receives(stage) {
                continue;
            }
            let Some(mut handler) = node.handler.take() else { continue };

            handler(self, stage, params);

            if let Some(node) = self.nodes.get_mut(id.0) {
                if node.handler.is_none() {
                    node.handler = Some(handler);
                }
            }
        }

        self.broadcast_depth -= 1;
        order.clear();
        self.scratch.push(order);
    }

    #[inline]
    pub fn is_broadcasting(&self) -> bool {
        self.broadcast_depth > 0
    }

    // ── internals ───────────────────────────────────────────────────────────

    /// Inserts after every sibling whose key is `<=` the node's.
    fn attach(&mut self, id: NodeId, controller: ControllerId) {
        let Some(key) = self.nodes.get(id.0).map(|n| n.key) else { return };
        let Some(ctrl) = self.controllers.get_mut(controller.0) else {
            debug_assert!(false, "attach to destroyed controller {controller:?}");
            return;
        };

        let nodes = &self.nodes;
        let at = ctrl
            .nodes
            .partition_point(|n| nodes.get(n.0).is_some_and(|d| d.key <= key));
        ctrl.nodes.insert(at, id);

        if let Some(node) = self.nodes.get_mut(id.0) {
            node.controller = Some(controller);
        }
    }

    pub fn detach(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(id.0) else { return };
        let Some(controller) = node.controller.take() else { return };

        if let Some(ctrl) = self.controllers.get_mut(controller.0) {
            if let Some(at) = ctrl.nodes.iter().position(|&n| n == id) {
                ctrl.nodes.remove(at);
            }
        }
    }

    fn position(&self, id: NodeId) -> Option<(&[NodeId], usize)> {
        let controller = self.nodes.get(id.0)?.controller?;
        let siblings = self.controllers.get(controller.0)?.nodes.as_slice();
        let at = siblings.iter().position(|&n| n == id)?;
        Some((siblings, at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Vec2i;
    use crate::render::RenderContext;
    use crate::scene::{DrawableKind, TargetRef};
    use crate::worker::TaskRunner;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<(&'static str, RenderStage)>>>;

    fn sprite() -> NodeTag {
        NodeTag::new(DrawableKind::Sprite)
    }

    fn recording(graph: &mut SceneGraph, id: NodeId, name: &'static str, log: &Log) {
        let log = Rc::clone(log);
        graph.register_handler(
            id,
            Box::new(move |_, stage, _| log.borrow_mut().push((name, stage))),
        );
    }

    fn run(graph: &mut SceneGraph, controller: ControllerId, stage: RenderStage) {
        let runner = TaskRunner::current_thread(RenderContext::without_gpu(Vec2i::new(64, 64)));
        let mut params = RenderParams::root(&runner, TargetRef::Screen, Vec2i::new(64, 64));
        graph.broadcast(controller, stage, &mut params);
    }

    fn names(log: &Log) -> Vec<&'static str> {
        log.borrow().iter().map(|(n, _)| *n).collect()
    }

    fn keys_ascending(graph: &SceneGraph, controller: ControllerId) -> bool {
        graph
            .nodes(controller)
            .windows(2)
            .all(|w| graph.sort_key(w[0]) <= graph.sort_key(w[1]))
    }

    // ── ordering ────────────────────────────────────────────────────────────

    #[test]
    fn broadcast_follows_weights() {
        let mut graph = SceneGraph::new();
        let root = graph.create_controller();
        let log = Log::default();

        let a = graph.create_node(Some(root), SortKey::from_weights([5, 0, 0]), sprite());
        let b = graph.create_node(Some(root), SortKey::from_weights([1, 0, 0]), sprite());
        let c = graph.create_node(Some(root), SortKey::from_weights([3, 0, 0]), sprite());
        recording(&mut graph, a, "a", &log);
        recording(&mut graph, b, "b", &log);
        recording(&mut graph, c, "c", &log);

        run(&mut graph, root, RenderStage::OnRendering);
        assert_eq!(names(&log), ["b", "c", "a"]);
        assert!(keys_ascending(&graph, root));
    }

    #[test]
    fn equal_keys_keep_insertion_order() {
        let mut graph = SceneGraph::new();
        let root = graph.create_controller();
        let log = Log::default();

        for name in ["first", "second", "third"] {
            let id = graph.create_node(Some(root), SortKey::from_weights([0, 0, 0]), sprite());
            recording(&mut graph, id, name, &log);
        }

        run(&mut graph, root, RenderStage::Notification);
        assert_eq!(names(&log), ["first", "second", "third"]);
    }

    #[test]
    fn same_z_defaults_paint_in_creation_order() {
        let mut graph = SceneGraph::new();
        let root = graph.create_controller();
        let early = SortKey::with_z(2);
        let late = SortKey::with_z(2);

        let l = graph.create_node(Some(root), late, sprite());
        let e = graph.create_node(Some(root), early, sprite());
        assert_eq!(graph.nodes(root), [e, l]);
    }

    #[test]
    fn reweight_moves_node_and_keeps_order_valid() {
        let mut graph = SceneGraph::new();
        let root = graph.create_controller();

        let ids: Vec<_> = (0..5)
            .map(|z| graph.create_node(Some(root), SortKey::with_z(z), sprite()))
            .collect();

        graph.set_sort_weights(ids[0], &[10]);
        assert_eq!(graph.nodes(root).last(), Some(&ids[0]));

        graph.set_sort_weights(ids[4], &[-1, 0]);
        assert_eq!(graph.nodes(root).first(), Some(&ids[4]));
        assert!(keys_ascending(&graph, root));
    }

    #[test]
    fn detached_reweight_is_kept_on_attach() {
        let mut graph = SceneGraph::new();
        let root = graph.create_controller();
        let other = graph.create_node(Some(root), SortKey::from_weights([5, 0, 0]), sprite());
        let node = graph.create_node(None, SortKey::from_weights([0, 0, 0]), sprite());

        graph.set_sort_weights(node, &[9]);
        graph.rebind_controller(node, Some(root));
        assert_eq!(graph.nodes(root), [other, node]);
    }

    // ── rebinding ───────────────────────────────────────────────────────────

    #[test]
    fn rebind_keeps_key_and_reinserts() {
        let mut graph = SceneGraph::new();
        let a = graph.create_controller();
        let b = graph.create_controller();

        let low = graph.create_node(Some(b), SortKey::from_weights([0, 0, 0]), sprite());
        let high = graph.create_node(Some(b), SortKey::from_weights([9, 0, 0]), sprite());
        let moving = graph.create_node(Some(a), SortKey::from_weights([4, 0, 0]), sprite());
        let key = graph.sort_key(moving);

        graph.rebind_controller(moving, Some(b));
        assert!(graph.nodes(a).is_empty());
        assert_eq!(graph.nodes(b), [low, moving, high]);
        assert_eq!(graph.sort_key(moving), key);
        assert_eq!(graph.controller_of(moving), Some(b));
    }

    #[test]
    fn neighbours_follow_paint_order() {
        let mut graph = SceneGraph::new();
        let root = graph.create_controller();
        let a = graph.create_node(Some(root), SortKey::with_z(0), sprite());
        let b = graph.create_node(Some(root), SortKey::with_z(1), sprite());
        let c = graph.create_node(Some(root), SortKey::with_z(2), sprite());

        assert_eq!(graph.previous_node(a), None);
        assert_eq!(graph.next_node(a), Some(b));
        assert_eq!(graph.previous_node(c), Some(b));
        assert_eq!(graph.next_node(c), None);

        graph.rebind_controller(b, None);
        assert_eq!(graph.next_node(a), Some(c));
        assert_eq!(graph.next_node(b), None);
    }

    #[test]
    fn destroying_controller_detaches_children() {
        let mut graph = SceneGraph::new();
        let root = graph.create_controller();
        let node = graph.create_node(Some(root), SortKey::new(), sprite());

        graph.destroy_controller(root);
        assert!(graph.is_alive(node));
        assert_eq!(graph.controller_of(node), None);
        assert!(!graph.controller_exists(root));
    }

    // ── visibility ──────────────────────────────────────────────────────────

    #[test]
    fn visibility_filters_stages() {
        let mut graph = SceneGraph::new();
        let root = graph.create_controller();
        let log = Log::default();

        let shown = graph.create_node(Some(root), SortKey::with_z(0), sprite());
        let hidden = graph.create_node(Some(root), SortKey::with_z(1), sprite());
        let quiet = graph.create_node(Some(root), SortKey::with_z(2), sprite());
        recording(&mut graph, shown, "shown", &log);
        recording(&mut graph, hidden, "hidden", &log);
        recording(&mut graph, quiet, "quiet", &log);
        graph.set_visibility(hidden, false);
        graph.set_visibility(quiet, NodeVisibility::NotificationOnly);

        run(&mut graph, root, RenderStage::OnRendering);
        assert_eq!(names(&log), ["shown"]);

        log.borrow_mut().clear();
        run(&mut graph, root, RenderStage::Notification);
        assert_eq!(names(&log), ["shown", "quiet"]);
    }

    // ── disposal ────────────────────────────────────────────────────────────

    #[test]
    fn node_disposed_mid_broadcast_is_skipped() {
        let mut graph = SceneGraph::new();
        let root = graph.create_controller();
        let log = Log::default();

        let killer = graph.create_node(Some(root), SortKey::with_z(0), sprite());
        let victim = graph.create_node(Some(root), SortKey::with_z(1), sprite());
        recording(&mut graph, victim, "victim", &log);

        let sink = Rc::clone(&log);
        graph.register_handler(
            killer,
            Box::new(move |graph, stage, _| {
                sink.borrow_mut().push(("killer", stage));
                if graph.is_alive(victim) {
                    graph.dispose_node(victim);
                }
            }),
        );

        run(&mut graph, root, RenderStage::BeforeRender);
        assert_eq!(names(&log), ["killer"]);
        assert!(!graph.is_alive(victim));
        assert_eq!(graph.nodes(root), [killer]);
    }

    #[test]
    fn self_disposal_drops_handler() {
        let mut graph = SceneGraph::new();
        let root = graph.create_controller();
        let node = graph.create_node(Some(root), SortKey::new(), sprite());
        let token = Rc::new(());
        let held = Rc::clone(&token);

        graph.register_handler(
            node,
            Box::new(move |graph, _, _| {
                let _ = &held;
                graph.dispose_node(node);
            }),
        );

        run(&mut graph, root, RenderStage::Notification);
        assert!(!graph.is_alive(node));
        assert_eq!(Rc::strong_count(&token), 1);
    }

    #[test]
    fn stale_ids_do_not_resolve_after_slot_reuse() {
        let mut graph = SceneGraph::new();
        let root = graph.create_controller();

        let old = graph.create_node(Some(root), SortKey::with_z(0), sprite());
        graph.dispose_node(old);
        let fresh = graph.create_node(Some(root), SortKey::with_z(0), sprite());

        assert!(!graph.is_alive(old));
        assert!(graph.is_alive(fresh));
        assert_eq!(graph.sort_key(old), None);
        graph.set_visibility(old, false);
        assert_eq!(graph.visibility(fresh), Some(NodeVisibility::Visible));
        assert_eq!(graph.nodes(root), [fresh]);

        assert!(!graph.is_alive(NodeId::dangling()));
        assert!(!graph.controller_exists(ControllerId::dangling()));
        assert!(graph.nodes(ControllerId::dangling()).is_empty());
    }

    #[test]
    fn nested_broadcast_reaches_grandchildren() {
        let mut graph = SceneGraph::new();
        let root = graph.create_controller();
        let inner = graph.create_controller();
        let log = Log::default();

        let host = graph.create_node(Some(root), SortKey::with_z(0), NodeTag::new(DrawableKind::Viewport));
        let leaf = graph.create_node(Some(inner), SortKey::with_z(0), sprite());
        recording(&mut graph, leaf, "leaf", &log);

        let sink = Rc::clone(&log);
        graph.register_handler(
            host,
            Box::new(move |graph, stage, params| {
                sink.borrow_mut().push(("host", stage));
                assert!(graph.is_broadcasting());
                graph.broadcast(inner, stage, params);
            }),
        );

        run(&mut graph, root, RenderStage::OnRendering);
        assert_eq!(names(&log), ["host", "leaf"]);
        assert!(!graph.is_broadcasting());
    }
}
