use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use crate::coords::Vec2i;
use crate::render::RenderRunner;
use crate::scene::{ControllerId, RenderParams, RenderStage, SceneGraph};

type GraphEdit = Box<dyn FnOnce(&mut SceneGraph, &RenderRunner)>;

struct ScreenShared {
    graph: RefCell<SceneGraph>,
    runner: RenderRunner,
    root: ControllerId,
    resolution: Cell<Vec2i>,
    deferred: RefCell<VecDeque<GraphEdit>>,
}

/// Shared, logic-thread view of a screen: its scene graph, root controller
/// and render runner. Drawables keep a clone.
///
/// While a broadcast is running the graph is lent to node handlers, so edits
/// made through the handle from inside a handler are queued and applied as
/// soon as the broadcast returns.
#[derive(Clone)]
pub struct ScreenHandle {
    shared: Rc<ScreenShared>,
}

impl ScreenHandle {
    pub(crate) fn new(runner: RenderRunner, resolution: Vec2i) -> Self {
        let mut graph = SceneGraph::new();
        let root = graph.create_controller();

        Self {
            shared: Rc::new(ScreenShared {
                graph: RefCell::new(graph),
                runner,
                root,
                resolution: Cell::new(resolution),
                deferred: RefCell::new(VecDeque::new()),
            }),
        }
    }

    #[inline]
    pub fn runner(&self) -> &RenderRunner {
        &self.shared.runner
    }

    /// Controller holding top-level drawables.
    #[inline]
    pub fn root(&self) -> ControllerId {
        self.shared.root
    }

    #[inline]
    pub fn resolution(&self) -> Vec2i {
        self.shared.resolution.get()
    }

    pub(crate) fn set_resolution(&self, resolution: Vec2i) {
        self.shared.resolution.set(resolution);
    }

    /// Applies `edit` now, or after the running broadcast.
    pub fn edit_graph<F>(&self, edit: F)
    where
        F: FnOnce(&mut SceneGraph, &RenderRunner) + 'static,
    {
        match self.shared.graph.try_borrow_mut() {
            Ok(mut graph) => edit(&mut graph, &self.shared.runner),
            Err(_) => self.shared.deferred.borrow_mut().push_back(Box::new(edit)),
        }
    }

    /// Applies `edit` now and returns its result. `None` (edit dropped)
    /// while a broadcast holds the graph.
    pub fn try_edit_graph<R>(
        &self,
        edit: impl FnOnce(&mut SceneGraph, &RenderRunner) -> R,
    ) -> Option<R> {
        let mut graph = self.shared.graph.try_borrow_mut().ok()?;
        Some(edit(&mut graph, &self.shared.runner))
    }

    /// Reads the graph. `None` while a broadcast holds it.
    pub fn read_graph<R>(&self, read: impl FnOnce(&SceneGraph) -> R) -> Option<R> {
        self.shared.graph.try_borrow().ok().map(|graph| read(&graph))
    }

    /// Broadcasts `stage` from the root, then applies queued edits.
    pub(crate) fn broadcast_root(
        &self,
        stage: RenderStage,
        params: &mut RenderParams<'_>,
    ) {
        match self.shared.graph.try_borrow_mut() {
            Ok(mut graph) => {
                if graph.controller_exists(self.shared.root) {
                    graph.broadcast(self.shared.root, stage, params);
                }
            }
            Err(_) => {
                log::error!("screen broadcast re-entered from a node handler");
                return;
            }
        }
        self.flush_deferred();
    }

    pub(crate) fn flush_deferred(&self) {
        loop {
            let Some(edit) = self.shared.deferred.borrow_mut().pop_front() else { break };
            let Ok(mut graph) = self.shared.graph.try_borrow_mut() else {
                self.shared.deferred.borrow_mut().push_front(edit);
                break;
            };
            edit(&mut graph, &self.shared.runner);
        }
    }

    pub(crate) fn pending_edits(&self) -> usize {
        self.shared.deferred.borrow().len()
    }
}
