use std::cell::RefCell;
use std::rc::Rc;

use kiln_engine::agent::{AgentHandle, AgentRef};
use kiln_engine::coords::{ColorRgba, Rect};
use kiln_engine::render::RenderContext;
use kiln_engine::scene::{
    ControllerId, DrawableKind, NodeId, NodeTag, RenderParams, RenderStage, SceneGraph, SortKey,
};
use kiln_engine::screen::ScreenHandle;

/// Render-thread half of a block: where to fill this frame.
struct BlockAgent {
    rect: Rect,
    color: ColorRgba,
}

struct BlockState {
    rect: Rect,
    color: ColorRgba,
}

/// Solid rectangle drawable.
///
/// Positions are in the controller's world; the render thread adds the
/// enclosing viewport's offset. Blocks sharing a non-zero batch tag are
/// reported when they end up adjacent in draw order.
pub struct Block {
    screen: ScreenHandle,
    node: NodeId,
    agent: AgentHandle<BlockAgent>,
    state: Rc<RefCell<BlockState>>,
    disposed: bool,
}

impl Block {
    pub fn new(
        screen: &ScreenHandle,
        controller: ControllerId,
        z: i64,
        rect: Rect,
        color: ColorRgba,
        batch: u64,
    ) -> Option<Self> {
        let state = Rc::new(RefCell::new(BlockState { rect, color }));
        let handler_state = Rc::clone(&state);

        let (node, agent) = screen.try_edit_graph(move |graph, runner| {
            let agent = AgentHandle::create(runner, move |_: &mut RenderContext| BlockAgent {
                rect,
                color,
            });
            let node = graph.create_node(
                Some(controller),
                SortKey::with_z(z),
                NodeTag::new(DrawableKind::Plane),
            );
            graph.set_batch_tag(node, batch);
            if let Some(agent) = agent.agent_ref() {
                graph.register_handler(
                    node,
                    Box::new(move |graph, stage, params| {
                        render_block(&handler_state, node, agent, graph, stage, params)
                    }),
                );
            }
            (node, agent)
        })?;

        Some(Self {
            screen: screen.clone(),
            node,
            agent,
            state,
            disposed: false,
        })
    }

    pub fn set_rect(&self, rect: Rect) {
        self.state.borrow_mut().rect = rect;
    }

    pub fn rect(&self) -> Rect {
        self.state.borrow().rect
    }

    pub fn set_color(&self, color: ColorRgba) {
        self.state.borrow_mut().color = color;
    }

    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;

        let node = self.node;
        let mut agent = std::mem::replace(&mut self.agent, AgentHandle::detached());
        self.screen.edit_graph(move |graph, runner| {
            graph.dispose_node(node);
            agent.destroy(runner, |_, _| {});
        });
    }
}

impl Drop for Block {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn render_block(
    state: &RefCell<BlockState>,
    node: NodeId,
    agent: AgentRef<BlockAgent>,
    graph: &mut SceneGraph,
    stage: RenderStage,
    params: &mut RenderParams<'_>,
) {
    match stage {
        RenderStage::BeforeRender => {
            let st = state.borrow();
            let (rect, color) = (st.rect, st.color);
            agent.update(params.runner, move |block, _: &mut RenderContext| {
                block.rect = rect;
                block.color = color;
            });
        }
        RenderStage::OnRendering => {
            let batched = match (graph.previous_node(node), graph.tag(node)) {
                (Some(prev), Some(tag)) => graph.tag(prev).is_some_and(|t| t.batches_with(tag)),
                _ => false,
            };
            if batched {
                log::trace!("block {node:?} batches with its predecessor");
            }
            agent.update(params.runner, |block, cx: &mut RenderContext| {
                cx.fill(block.rect, block.color);
            });
        }
        RenderStage::Notification => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_engine::coords::Vec2i;
    use kiln_engine::screen::{RenderScreen, ScreenConfig, Viewport};
    use kiln_engine::worker::TaskRunner;

    fn screen() -> RenderScreen {
        let runner = TaskRunner::current_thread(RenderContext::without_gpu(Vec2i::new(640, 480)));
        RenderScreen::new(runner, ScreenConfig::default()).unwrap()
    }

    #[test]
    fn block_fills_once_per_frame() {
        let mut screen = screen();
        let handle = screen.handle().clone();
        let _block = Block::new(
            &handle,
            handle.root(),
            0,
            Rect::new(0, 0, 10, 10),
            ColorRgba::white(),
            0,
        )
        .unwrap();

        screen.update();
        screen.update();
        assert_eq!(screen.render_stats().map(|s| s.fills), Some(2));
    }

    #[test]
    fn block_outside_viewport_is_not_drawn() {
        let mut screen = screen();
        let viewport = Viewport::new(&screen, Rect::new(0, 0, 100, 100));
        let handle = screen.handle().clone();
        let _inside = Block::new(
            &handle,
            viewport.controller(),
            0,
            Rect::new(10, 10, 10, 10),
            ColorRgba::white(),
            1,
        )
        .unwrap();
        let _outside = Block::new(
            &handle,
            viewport.controller(),
            1,
            Rect::new(200, 200, 10, 10),
            ColorRgba::white(),
            1,
        )
        .unwrap();

        screen.update();
        // Both post a fill; the one outside the clip lands on an empty rect.
        assert_eq!(screen.render_stats().map(|s| s.fills), Some(1));
    }

    #[test]
    fn block_is_offset_by_scrolled_viewport() {
        let mut screen = screen();
        let viewport = Viewport::new(&screen, Rect::new(50, 50, 100, 100));
        viewport.set_ox(45);
        let handle = screen.handle().clone();
        let _block = Block::new(
            &handle,
            viewport.controller(),
            0,
            Rect::new(0, 0, 10, 10),
            ColorRgba::white(),
            0,
        )
        .unwrap();

        // Lands at x = 5, left of the viewport's clip.
        screen.update();
        assert_eq!(screen.render_stats().map(|s| s.fills), Some(0));

        viewport.set_ox(0);
        screen.update();
        assert_eq!(screen.render_stats().map(|s| s.fills), Some(1));
    }

    #[test]
    fn disposed_block_stops_drawing() {
        let mut screen = screen();
        let handle = screen.handle().clone();
        let mut block = Block::new(
            &handle,
            handle.root(),
            0,
            Rect::new(0, 0, 10, 10),
            ColorRgba::white(),
            0,
        )
        .unwrap();

        screen.update();
        block.dispose();
        screen.update();
        assert_eq!(screen.render_stats().map(|s| s.fills), Some(1));
        assert_eq!(handle.read_graph(|g| g.node_count()), Some(0));
    }
}
