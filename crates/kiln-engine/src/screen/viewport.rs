use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{Context, Result};

use crate::agent::{AgentHandle, AgentId, AgentRef};
use crate::coords::{ColorRgba, Rect, Tone, Vec2i};
use crate::render::{RenderContext, WorldBinding};
use crate::scene::{
    ControllerId, DrawableKind, NodeId, NodeTag, RenderParams, RenderStage, SceneGraph, SortKey,
    TargetRef, WorldRef,
};

use super::{FlashController, RenderScreen, RenderTarget, ScreenHandle};

struct ViewportState {
    rect: Rect,
    origin: Vec2i,
    color: ColorRgba,
    tone: Tone,
    flash: FlashController,
    /// Offset and target size of the last world upload.
    world_cache: Option<(Vec2i, Vec2i)>,
}

/// A clipped, offset sub-region of its parent.
///
/// A viewport is a node in its parent's controller and owns a nested
/// controller for its own children. During rendering it narrows the clip
/// to its region, redirects its children to its world transform, then
/// composites its colour, tone and flash over the region.
///
/// Dropping a viewport disposes it.
pub struct Viewport {
    screen: ScreenHandle,
    node: NodeId,
    controller: ControllerId,
    agent: AgentHandle<WorldBinding>,
    state: Rc<RefCell<ViewportState>>,
    z: i32,
    visible: bool,
    disposed: bool,
}

impl Viewport {
    /// Top-level viewport covering `rect` of the screen.
    pub fn new(screen: &RenderScreen, rect: Rect) -> Self {
        let handle = screen.handle();
        Self::build(handle, handle.root(), rect)
    }

    /// Viewport covering the whole screen.
    pub fn fullscreen(screen: &RenderScreen) -> Self {
        Self::new(screen, Rect::from_size(screen.resolution()))
    }

    /// Viewport nested in `parent`; `rect` is relative to the parent region.
    pub fn new_child(parent: &Viewport, rect: Rect) -> Self {
        Self::build(&parent.screen, parent.controller, rect)
    }

    fn build(screen: &ScreenHandle, parent: ControllerId, rect: Rect) -> Self {
        let state = Rc::new(RefCell::new(ViewportState {
            rect,
            origin: Vec2i::zero(),
            color: ColorRgba::transparent(),
            tone: Tone::default(),
            flash: FlashController::default(),
            world_cache: None,
        }));

        let handler_state = Rc::clone(&state);
        let created = screen.try_edit_graph(move |graph, runner| {
            let agent = AgentHandle::create(runner, |_: &mut RenderContext| WorldBinding::new());

            let controller = graph.create_controller();
            let node = graph.create_node(
                Some(parent),
                SortKey::new(),
                NodeTag::new(DrawableKind::Viewport),
            );
            if let Some(agent) = agent.agent_ref() {
                graph.register_handler(
                    node,
                    Box::new(move |graph, stage, params| {
                        render_viewport(&handler_state, controller, agent, graph, stage, params)
                    }),
                );
            }
            (node, controller, agent)
        });

        let Some((node, controller, agent)) = created else {
            log::error!("viewport created from a node handler; it starts disposed");
            return Self {
                screen: screen.clone(),
                node: NodeId::dangling(),
                controller: ControllerId::dangling(),
                agent: AgentHandle::detached(),
                state,
                z: 0,
                visible: false,
                disposed: true,
            };
        };

        Self {
            screen: screen.clone(),
            node,
            controller,
            agent,
            state,
            z: 0,
            visible: true,
            disposed: false,
        }
    }

    fn check_live(&self, op: &str) -> bool {
        if self.disposed {
            log::warn!("viewport {op} after dispose");
        }
        !self.disposed
    }

    // ── geometry ────────────────────────────────────────────────────────────

    pub fn rect(&self) -> Rect {
        self.state.borrow().rect
    }

    pub fn set_rect(&self, rect: Rect) {
        if self.check_live("set_rect") {
            self.state.borrow_mut().rect = rect;
        }
    }

    pub fn ox(&self) -> i32 {
        self.state.borrow().origin.x
    }

    pub fn set_ox(&self, ox: i32) {
        if self.check_live("set_ox") {
            self.state.borrow_mut().origin.x = ox;
        }
    }

    pub fn oy(&self) -> i32 {
        self.state.borrow().origin.y
    }

    pub fn set_oy(&self, oy: i32) {
        if self.check_live("set_oy") {
            self.state.borrow_mut().origin.y = oy;
        }
    }

    #[inline]
    pub fn z(&self) -> i32 {
        self.z
    }

    pub fn set_z(&mut self, z: i32) {
        if !self.check_live("set_z") || self.z == z {
            return;
        }
        self.z = z;
        let node = self.node;
        self.screen
            .edit_graph(move |graph, _| graph.set_sort_weights(node, &[z as i64]));
    }

    // ── appearance ──────────────────────────────────────────────────────────

    #[inline]
    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        if !self.check_live("set_visible") {
            return;
        }
        self.visible = visible;
        let node = self.node;
        self.screen
            .edit_graph(move |graph, _| graph.set_visibility(node, visible));
    }

    pub fn color(&self) -> ColorRgba {
        self.state.borrow().color
    }

    pub fn set_color(&self, color: ColorRgba) {
        if self.check_live("set_color") {
            self.state.borrow_mut().color = color;
        }
    }

    pub fn tone(&self) -> Tone {
        self.state.borrow().tone
    }

    pub fn set_tone(&self, tone: Tone) {
        if self.check_live("set_tone") {
            self.state.borrow_mut().tone = tone;
        }
    }

    /// Starts a flash. `None` hides the viewport for `frames` updates.
    pub fn flash(&self, color: Option<ColorRgba>, frames: u32) {
        if self.check_live("flash") {
            self.state.borrow_mut().flash.setup(color, frames);
        }
    }

    /// Advances the flash by one frame.
    pub fn update(&self) {
        if self.check_live("update") {
            self.state.borrow_mut().flash.update();
        }
    }

    /// Renders this viewport's children into `target` now, outside the
    /// frame loop.
    ///
    /// The target stands in for the screen: children are offset by the
    /// viewport's `rect` origin less `ox`/`oy` and clipped to the target.
    /// The viewport's colour, tone and flash are composited over the whole
    /// target.
    pub fn render(&self, target: &RenderTarget) -> Result<()> {
        anyhow::ensure!(!self.disposed, "viewport rendered after dispose");
        let target_agent = target.agent_ref().context("render target is disposed")?;

        let (offset, effect, tone) = {
            let st = self.state.borrow();
            (st.rect.origin - st.origin, st.flash.composite(st.color), st.tone)
        };
        let size = target.size();
        let controller = self.controller;
        let target_ref = TargetRef::Offscreen(target_agent.id());

        let rendered = self.screen.try_edit_graph(move |graph, runner| {
            let full = Rect::from_size(size);
            let mut params = RenderParams {
                runner,
                target: target_ref,
                target_size: size,
                clip: full,
                region: Rect::from_origin_size(offset, size),
                origin: offset,
                world: WorldRef::Target,
            };

            graph.broadcast(controller, RenderStage::BeforeRender, &mut params);
            target_agent.update(runner, move |buffer, cx: &mut RenderContext| {
                cx.update_world(buffer.world_mut(), size, offset);
            });

            runner.post(move |cx| cx.begin_target(target_ref));
            graph.broadcast(controller, RenderStage::OnRendering, &mut params);
            runner.post(move |cx| {
                if effect.a > 0.0 || tone.has_color_shift() {
                    cx.apply_effect(effect, tone);
                }
                cx.end_target();
            });
        });
        self.screen.flush_deferred();

        rendered.context("viewport rendered from a node handler")
    }

    // ── hierarchy ───────────────────────────────────────────────────────────

    /// Moves this viewport into `parent`, or back to the screen for `None`.
    /// Keeps its z. From inside a node handler the move lands after the
    /// running broadcast.
    pub fn set_parent(&self, parent: Option<&Viewport>) {
        if !self.check_live("set_parent") {
            return;
        }

        let target = match parent {
            Some(p) if p.disposed => {
                log::warn!("viewport parented to a disposed viewport");
                return;
            }
            Some(p) if p.node == self.node => {
                log::warn!("viewport parented to itself");
                return;
            }
            Some(p) => p.controller,
            None => self.screen.root(),
        };

        let node = self.node;
        self.screen.edit_graph(move |graph, _| {
            let target = graph.controller_exists(target).then_some(target);
            graph.rebind_controller(node, target);
        });
    }

    /// Detaches the node, destroys the nested controller, then posts the
    /// agent destroy. Children left inside become detached.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;

        let node = self.node;
        let controller = self.controller;
        let mut agent = std::mem::replace(&mut self.agent, AgentHandle::detached());

        self.screen.edit_graph(move |graph, runner| {
            graph.dispose_node(node);
            graph.destroy_controller(controller);
            agent.destroy(runner, |_, _| {});
        });
    }

    #[inline]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Controller that children of this viewport attach to.
    #[inline]
    pub fn controller(&self) -> ControllerId {
        self.controller
    }

    #[inline]
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn agent_id(&self) -> Option<AgentId> {
        self.agent.id()
    }

    pub fn screen(&self) -> &ScreenHandle {
        &self.screen
    }
}

impl Drop for Viewport {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Node handler shared by every viewport.
fn render_viewport(
    state: &RefCell<ViewportState>,
    controller: ControllerId,
    agent: AgentRef<WorldBinding>,
    graph: &mut SceneGraph,
    stage: RenderStage,
    params: &mut RenderParams<'_>,
) {
    let (region, offset, effect, tone, hidden) = {
        let mut st = state.borrow_mut();
        let region = st.rect.translated(params.region.origin);
        let offset = region.origin - st.origin;
        let target_size = params.target_size;

        if stage == RenderStage::BeforeRender && st.world_cache != Some((offset, target_size)) {
            st.world_cache = Some((offset, target_size));
            agent.update(params.runner, move |world, cx: &mut RenderContext| {
                cx.update_world(world, target_size, offset);
            });
        }

        (
            region,
            offset,
            st.flash.composite(st.color),
            st.tone,
            st.flash.is_invalid(),
        )
    };

    let world = WorldRef::Viewport(agent.id());
    let mut inner = *params;
    inner.region = region;
    inner.origin = offset;
    inner.world = world;

    if !stage.carries_render() {
        graph.broadcast(controller, stage, &mut inner);
        return;
    }

    let clip = region.clip_to(params.clip);
    if clip.is_empty() || hidden {
        log::trace!("viewport {:?} skipped: nothing visible", agent.id());
        return;
    }
    inner.clip = clip;

    params.runner.post(move |cx| {
        cx.push_scissor(clip);
        cx.bind_world(world);
    });

    graph.broadcast(controller, stage, &mut inner);

    let outer_world = params.world;
    let composite = effect.a > 0.0 || tone.has_color_shift();
    params.runner.post(move |cx| {
        cx.bind_world(outer_world);
        if composite {
            cx.apply_effect(effect, tone);
        }
        cx.pop_scissor();
    });
}
