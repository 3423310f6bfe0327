use anyhow::{Context, Result};

use crate::agent::{AgentHost, AgentStore};
use crate::coords::{ColorRgba, Rect, Tone, Vec2i};

use super::fill::{BlendMode, FillDraw, FillPipeline, FillShape};
use super::gpu::{GpuDevice, Pixels, ScreenBuffer};
use super::scissor::ScissorStack;
use super::target::{TargetBuffer, TargetRef, WorldRef};
use super::world::{WorldBinding, WorldMatrix};

/// Counters kept by the render thread, read back with a round trip.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub frames_begun: u64,
    pub frames_presented: u64,
    pub scissor_applies: u64,
    pub effects_applied: u64,
    pub world_updates: u64,
    pub fills: u64,
    pub offscreen_passes: u64,
    /// Frames presented below full brightness.
    pub dimmed_frames: u64,
    pub readbacks: u64,
}

struct GpuState {
    device: GpuDevice,
    screen: ScreenBuffer,
    /// Projection used for `WorldRef::Target` while drawing to the screen.
    screen_world: wgpu::Buffer,
    fill: FillPipeline,
    encoder: Option<wgpu::CommandEncoder>,
}

/// Drawing state saved by `begin_target`.
struct SavedTarget {
    target: TargetRef,
    target_size: Vec2i,
    scissor: ScissorStack,
    world: WorldRef,
    world_offset: Vec2i,
    /// An encoder was opened for this pass outside a frame.
    owns_encoder: bool,
}

/// State owned by the render thread. Every task posted to the render
/// runner receives it.
///
/// Fills land in the active target, shifted by the active world's offset
/// and clipped to the scissor stack. Without a GPU the context still tracks
/// all of that plus agents and counters, so scenes can be driven in tests
/// and on machines with no adapter.
pub struct RenderContext {
    agents: AgentStore,
    scissor: ScissorStack,
    screen_size: Vec2i,
    clear_color: ColorRgba,
    brightness: u8,
    stats: FrameStats,
    in_frame: bool,
    target: TargetRef,
    target_size: Vec2i,
    world: WorldRef,
    world_offset: Vec2i,
    saved: Vec<SavedTarget>,
    gpu: Option<GpuState>,
}

impl RenderContext {
    pub fn without_gpu(screen_size: Vec2i) -> Self {
        Self {
            agents: AgentStore::new(),
            scissor: ScissorStack::new(Rect::from_size(screen_size)),
            screen_size,
            clear_color: ColorRgba::new(0.0, 0.0, 0.0, 1.0),
            brightness: u8::MAX,
            stats: FrameStats::default(),
            in_frame: false,
            target: TargetRef::Screen,
            target_size: screen_size,
            world: WorldRef::Target,
            world_offset: Vec2i::zero(),
            saved: Vec::new(),
            gpu: None,
        }
    }

    pub fn with_gpu(device: GpuDevice, screen_size: Vec2i) -> Result<Self> {
        let screen = device
            .create_screen_buffer(screen_size)
            .context("failed to create screen buffer")?;
        let screen_world = device.create_uniform("kiln screen world ubo", &WorldMatrix::screen(screen_size));
        let fill = FillPipeline::new(&device);

        let mut cx = Self::without_gpu(screen_size);
        cx.gpu = Some(GpuState {
            device,
            screen,
            screen_world,
            fill,
            encoder: None,
        });
        Ok(cx)
    }

    #[inline]
    pub fn has_gpu(&self) -> bool {
        self.gpu.is_some()
    }

    pub fn gpu(&self) -> Option<&GpuDevice> {
        self.gpu.as_ref().map(|g| &g.device)
    }

    #[inline]
    pub fn screen_size(&self) -> Vec2i {
        self.screen_size
    }

    #[inline]
    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    pub fn set_clear_color(&mut self, color: ColorRgba) {
        self.clear_color = color;
    }

    #[inline]
    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    /// Screen brightness applied at present; 255 leaves frames untouched.
    pub fn set_brightness(&mut self, brightness: u8) {
        self.brightness = brightness;
    }

    // ── frame ───────────────────────────────────────────────────────────────

    /// Resets the clip to the full screen and opens the frame encoder.
    pub fn begin_frame(&mut self) {
        if self.in_frame {
            log::warn!("frame begun twice; previous frame discarded");
        }
        self.unwind_targets();

        self.in_frame = true;
        self.stats.frames_begun += 1;
        self.scissor.reset(Rect::from_size(self.screen_size));
        self.bind_world(WorldRef::Target);

        if let Some(gpu) = self.gpu.as_mut() {
            gpu.encoder = Some(gpu.device.begin_frame(&gpu.screen, self.clear_color));
        }
    }

    /// Dims the frame to the current brightness and submits it.
    pub fn present(&mut self) {
        if !self.in_frame {
            log::warn!("present without a begun frame");
            return;
        }
        self.unwind_targets();
        if self.scissor.depth() != 0 {
            log::warn!("frame presented with {} unbalanced scissor push(es)", self.scissor.depth());
        }
        self.scissor.reset(Rect::from_size(self.screen_size));

        if self.brightness < u8::MAX {
            self.stats.dimmed_frames += 1;
            let a = 1.0 - f32::from(self.brightness) / 255.0;
            self.record(FillDraw {
                shape: FillShape::Cover,
                rect: Rect::empty(),
                scissor: Rect::from_size(self.screen_size),
                color: [0.0, 0.0, 0.0, a],
                mode: BlendMode::Alpha,
            });
        }

        self.in_frame = false;
        self.stats.frames_presented += 1;

        if let Some(gpu) = self.gpu.as_mut() {
            if let Some(encoder) = gpu.encoder.take() {
                gpu.device.submit(encoder);
            }
        }
    }

    /// Recreates the screen buffer at `size`. Any open frame is dropped.
    pub fn resize(&mut self, size: Vec2i) -> Result<()> {
        anyhow::ensure!(size.is_positive(), "screen resized to zero ({size:?})");

        if let Some(gpu) = self.gpu.as_mut() {
            gpu.encoder = None;
            gpu.screen = gpu
                .device
                .create_screen_buffer(size)
                .context("failed to recreate screen buffer")?;
            gpu.device.write_uniform(&gpu.screen_world, &WorldMatrix::screen(size));
        }

        self.in_frame = false;
        self.saved.clear();
        self.screen_size = size;
        self.target = TargetRef::Screen;
        self.target_size = size;
        self.scissor.reset(Rect::from_size(size));
        self.bind_world(WorldRef::Target);
        log::debug!("screen buffer resized to {}x{}", size.x, size.y);
        Ok(())
    }

    // ── targets ─────────────────────────────────────────────────────────────

    /// Builds an off-screen target agent of `size`. Without a GPU it has no
    /// texture, only a size and a world binding.
    pub fn create_target(&mut self, size: Vec2i) -> TargetBuffer {
        let buffer = match self.gpu.as_ref() {
            Some(gpu) => match gpu.device.create_screen_buffer(size) {
                Ok(buffer) => Some(buffer),
                Err(e) => {
                    log::error!("failed to create render target: {e:#}");
                    None
                }
            },
            None => None,
        };

        let mut world = WorldBinding::new();
        self.update_world(&mut world, size, Vec2i::zero());
        TargetBuffer::new(size, buffer, world)
    }

    #[inline]
    pub fn target(&self) -> TargetRef {
        self.target
    }

    #[inline]
    pub fn target_size(&self) -> Vec2i {
        self.target_size
    }

    /// Redirects fills to `target` until the matching `end_target`.
    ///
    /// The clip starts over at the full target and the world binds to the
    /// target's own projection. Outside a frame an encoder is opened for the
    /// pass and submitted by `end_target`. An unknown target gets an empty
    /// clip, so nothing draws until the pass ends.
    pub fn begin_target(&mut self, target: TargetRef) {
        let size = match target {
            TargetRef::Screen => self.screen_size,
            TargetRef::Offscreen(id) => match self.agents.get::<TargetBuffer>(id) {
                Some(buffer) => buffer.size(),
                None => {
                    log::warn!("render target {id:?} not found; pass draws nothing");
                    Vec2i::zero()
                }
            },
        };

        let owns_encoder = match self.gpu.as_mut() {
            Some(gpu) if gpu.encoder.is_none() => {
                gpu.encoder = Some(gpu.device.create_encoder("kiln target encoder"));
                true
            }
            _ => false,
        };

        let scissor = std::mem::replace(&mut self.scissor, ScissorStack::new(Rect::from_size(size)));
        self.saved.push(SavedTarget {
            target: self.target,
            target_size: self.target_size,
            scissor,
            world: self.world,
            world_offset: self.world_offset,
            owns_encoder,
        });

        if matches!(target, TargetRef::Offscreen(_)) {
            self.stats.offscreen_passes += 1;
        }
        self.target = target;
        self.target_size = size;
        self.bind_world(WorldRef::Target);
    }

    /// Restores the target, clip and world saved by `begin_target`.
    pub fn end_target(&mut self) {
        let Some(saved) = self.saved.pop() else {
            log::warn!("end_target without a matching begin_target");
            return;
        };
        if self.scissor.depth() != 0 {
            log::warn!("target pass ended with {} unbalanced scissor push(es)", self.scissor.depth());
        }

        self.target = saved.target;
        self.target_size = saved.target_size;
        self.scissor = saved.scissor;
        self.world = saved.world;
        self.world_offset = saved.world_offset;

        if saved.owns_encoder {
            if let Some(gpu) = self.gpu.as_mut() {
                if let Some(encoder) = gpu.encoder.take() {
                    gpu.device.submit(encoder);
                }
            }
        }
    }

    fn unwind_targets(&mut self) {
        if self.saved.is_empty() {
            return;
        }
        log::warn!("{} target pass(es) left open; ending them", self.saved.len());
        while !self.saved.is_empty() {
            self.end_target();
        }
    }

    // ── world ───────────────────────────────────────────────────────────────

    /// Sets the world later fills are projected with.
    pub fn bind_world(&mut self, world: WorldRef) {
        self.world_offset = match world {
            WorldRef::Target => self.target_origin(),
            WorldRef::Viewport(id) => match self.agents.get::<WorldBinding>(id) {
                Some(binding) => binding.offset(),
                None => {
                    log::warn!("world binding {id:?} not found; using the target's");
                    self.target_origin()
                }
            },
        };
        self.world = world;
    }

    #[inline]
    pub fn world(&self) -> WorldRef {
        self.world
    }

    /// Pixel offset the bound world adds to fills.
    #[inline]
    pub fn world_offset(&self) -> Vec2i {
        self.world_offset
    }

    /// Points `binding` at `offset` within a `target_size` target and
    /// uploads its uniform, creating it on first use. Without a GPU only
    /// the binding and the counter move.
    pub fn update_world(&mut self, binding: &mut WorldBinding, target_size: Vec2i, offset: Vec2i) {
        binding.set(target_size, offset);
        self.stats.world_updates += 1;

        let Some(gpu) = self.gpu.as_ref() else { return };
        let matrix = *binding.matrix();
        let slot = binding.uniform_slot();
        match slot {
            Some(existing) => gpu.device.write_uniform(existing, &matrix),
            None => *slot = Some(gpu.device.create_uniform("kiln world ubo", &matrix)),
        }
    }

    fn target_origin(&self) -> Vec2i {
        match self.target {
            TargetRef::Screen => Vec2i::zero(),
            TargetRef::Offscreen(id) => self
                .agents
                .get::<TargetBuffer>(id)
                .map_or(Vec2i::zero(), |t| t.world().offset()),
        }
    }

    // ── clip ────────────────────────────────────────────────────────────────

    /// Narrows the clip to `rect`; returns the effective clip.
    pub fn push_scissor(&mut self, rect: Rect) -> Rect {
        self.stats.scissor_applies += 1;
        self.scissor.push(rect)
    }

    pub fn pop_scissor(&mut self) -> Rect {
        self.scissor.pop()
    }

    #[inline]
    pub fn scissor(&self) -> Rect {
        self.scissor.current()
    }

    // ── drawing ─────────────────────────────────────────────────────────────

    /// Fills `rect`, in the bound world's space, with `color`. The rect is
    /// shifted by the world offset and clipped to the current scissor;
    /// returns the target pixels actually covered.
    pub fn fill(&mut self, rect: Rect, color: ColorRgba) -> Rect {
        let covered = rect
            .translated(self.world_offset)
            .clip_to(self.scissor.current());
        if covered.is_empty() || color.a <= 0.0 {
            return Rect::empty();
        }

        self.stats.fills += 1;
        self.record(FillDraw {
            shape: FillShape::Quad,
            rect,
            scissor: covered,
            color: premultiplied(color),
            mode: BlendMode::Alpha,
        });
        covered
    }

    /// Composites a blend colour and tone over the current clip.
    ///
    /// `Tone::gray` needs a luminance pass and is not composited by fills.
    pub fn apply_effect(&mut self, color: ColorRgba, tone: Tone) {
        self.stats.effects_applied += 1;

        let region = self.scissor.current();
        if region.is_empty() {
            return;
        }
        let cover = |color: [f32; 4], mode: BlendMode| FillDraw {
            shape: FillShape::Cover,
            rect: Rect::empty(),
            scissor: region,
            color,
            mode,
        };

        if color.a > 0.0 {
            self.record(cover(premultiplied(color), BlendMode::Alpha));
        }

        let [r, g, b, _] = tone.to_array();
        let lift = [r.max(0.0), g.max(0.0), b.max(0.0), 0.0];
        let drop = [(-r).max(0.0), (-g).max(0.0), (-b).max(0.0), 0.0];
        if lift[..3].iter().any(|c| *c > 0.0) {
            self.record(cover(lift, BlendMode::Add));
        }
        if drop[..3].iter().any(|c| *c > 0.0) {
            self.record(cover(drop, BlendMode::Subtract));
        }
    }

    /// Copies `target` back to the CPU. `None` without a GPU or for an
    /// unknown target.
    pub fn read_pixels(&mut self, target: TargetRef) -> Option<Pixels> {
        let gpu = self.gpu.as_ref()?;
        if gpu.encoder.is_some() {
            log::warn!("readback while commands are still recorded; they are not included");
        }

        let source = match target {
            TargetRef::Screen => &gpu.screen,
            TargetRef::Offscreen(id) => {
                match self.agents.get::<TargetBuffer>(id).and_then(|t| t.buffer()) {
                    Some(buffer) => buffer,
                    None => {
                        log::warn!("readback of missing render target {id:?}");
                        return None;
                    }
                }
            }
        };

        match gpu.device.read_pixels(source) {
            Ok(pixels) => {
                self.stats.readbacks += 1;
                Some(pixels)
            }
            Err(e) => {
                log::error!("readback failed: {e:#}");
                None
            }
        }
    }

    fn record(&mut self, draw: FillDraw) {
        let Some(gpu) = self.gpu.as_mut() else { return };
        let Some(encoder) = gpu.encoder.as_mut() else { return };

        let view = match self.target {
            TargetRef::Screen => Some(gpu.screen.view()),
            TargetRef::Offscreen(id) => self
                .agents
                .get::<TargetBuffer>(id)
                .and_then(|t| t.buffer())
                .map(|b| b.view()),
        };
        let world = match (self.world, self.target) {
            (WorldRef::Viewport(id), _) => self
                .agents
                .get::<WorldBinding>(id)
                .and_then(|b| b.uniform()),
            (WorldRef::Target, TargetRef::Screen) => Some(&gpu.screen_world),
            (WorldRef::Target, TargetRef::Offscreen(id)) => self
                .agents
                .get::<TargetBuffer>(id)
                .and_then(|t| t.world().uniform()),
        };

        let (Some(view), Some(world)) = (view, world) else {
            log::trace!("fill dropped: target or world has no gpu resources");
            return;
        };
        gpu.fill.draw(&gpu.device, encoder, view, world, draw);
    }
}

fn premultiplied(color: ColorRgba) -> [f32; 4] {
    let a = color.a;
    [color.r * a, color.g * a, color.b * a, a]
}

impl AgentHost for RenderContext {
    fn agents(&mut self) -> &mut AgentStore {
        &mut self.agents
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentId;

    fn cx() -> RenderContext {
        RenderContext::without_gpu(Vec2i::new(320, 240))
    }

    fn insert_world(cx: &mut RenderContext, offset: Vec2i) -> AgentId {
        let id = AgentId::allocate();
        let mut binding = WorldBinding::new();
        let size = cx.screen_size();
        cx.update_world(&mut binding, size, offset);
        cx.agents().insert(id, binding);
        id
    }

    fn insert_target(cx: &mut RenderContext, size: Vec2i) -> AgentId {
        let id = AgentId::allocate();
        let target = cx.create_target(size);
        cx.agents().insert(id, target);
        id
    }

    // ── frame ───────────────────────────────────────────────────────────────

    #[test]
    fn frame_counters_track_begin_and_present() {
        let mut cx = cx();
        cx.begin_frame();
        cx.present();
        cx.present();
        assert_eq!(cx.stats().frames_begun, 1);
        assert_eq!(cx.stats().frames_presented, 1);
    }

    #[test]
    fn unbalanced_scissor_is_reset_at_present() {
        let mut cx = cx();
        cx.begin_frame();
        cx.push_scissor(Rect::new(0, 0, 1, 1));
        cx.present();
        assert_eq!(cx.scissor(), Rect::new(0, 0, 320, 240));
    }

    #[test]
    fn resize_resets_clip_and_rejects_zero() {
        let mut cx = cx();
        cx.resize(Vec2i::new(800, 600)).unwrap();
        assert_eq!(cx.screen_size(), Vec2i::new(800, 600));
        assert_eq!(cx.target_size(), Vec2i::new(800, 600));
        assert_eq!(cx.scissor(), Rect::new(0, 0, 800, 600));
        assert!(cx.resize(Vec2i::new(0, 600)).is_err());
    }

    #[test]
    fn brightness_below_full_dims_presented_frames() {
        let mut cx = cx();
        assert_eq!(cx.brightness(), 255);

        cx.set_brightness(128);
        cx.begin_frame();
        cx.present();
        cx.set_brightness(255);
        cx.begin_frame();
        cx.present();

        assert_eq!(cx.stats().dimmed_frames, 1);
    }

    #[test]
    fn readback_needs_a_gpu() {
        let mut cx = cx();
        let id = insert_target(&mut cx, Vec2i::new(8, 8));
        assert_eq!(cx.read_pixels(TargetRef::Screen), None);
        assert_eq!(cx.read_pixels(TargetRef::Offscreen(id)), None);
        assert_eq!(cx.stats().readbacks, 0);
    }

    // ── drawing ─────────────────────────────────────────────────────────────

    #[test]
    fn fill_is_clipped_to_scissor() {
        let mut cx = cx();
        cx.begin_frame();
        cx.push_scissor(Rect::new(10, 10, 50, 50));

        assert_eq!(cx.fill(Rect::new(0, 0, 20, 20), ColorRgba::white()), Rect::new(10, 10, 10, 10));
        assert!(cx.fill(Rect::new(100, 100, 5, 5), ColorRgba::white()).is_empty());
        assert!(cx.fill(Rect::new(10, 10, 5, 5), ColorRgba::transparent()).is_empty());

        cx.pop_scissor();
        cx.present();
        assert_eq!(cx.stats().fills, 1);
        assert_eq!(cx.stats().scissor_applies, 1);
    }

    #[test]
    fn bound_world_offsets_fills() {
        let mut cx = cx();
        let world = insert_world(&mut cx, Vec2i::new(30, 40));

        cx.begin_frame();
        cx.bind_world(WorldRef::Viewport(world));
        assert_eq!(cx.world_offset(), Vec2i::new(30, 40));
        assert_eq!(cx.fill(Rect::new(0, 0, 10, 10), ColorRgba::white()), Rect::new(30, 40, 10, 10));

        cx.bind_world(WorldRef::Target);
        assert_eq!(cx.fill(Rect::new(0, 0, 10, 10), ColorRgba::white()), Rect::new(0, 0, 10, 10));
        cx.present();
    }

    #[test]
    fn unknown_world_falls_back_to_target() {
        let mut cx = cx();
        let stale = insert_world(&mut cx, Vec2i::new(5, 5));
        cx.agents().remove::<WorldBinding>(stale);

        cx.bind_world(WorldRef::Viewport(stale));
        assert_eq!(cx.world_offset(), Vec2i::zero());
    }

    #[test]
    fn world_update_without_gpu_moves_binding_only() {
        let mut cx = cx();
        let mut binding = WorldBinding::new();
        cx.update_world(&mut binding, Vec2i::new(320, 240), Vec2i::new(4, 2));
        assert!(binding.uniform().is_none());
        assert_eq!(binding.offset(), Vec2i::new(4, 2));
        assert_eq!(*binding.matrix(), WorldMatrix::with_offset(Vec2i::new(320, 240), Vec2i::new(4, 2)));
        assert_eq!(cx.stats().world_updates, 1);
    }

    // ── targets ─────────────────────────────────────────────────────────────

    #[test]
    fn offscreen_pass_swaps_clip_and_restores_it() {
        let mut cx = cx();
        let target = insert_target(&mut cx, Vec2i::new(64, 32));
        let world = insert_world(&mut cx, Vec2i::new(100, 100));

        cx.begin_frame();
        cx.push_scissor(Rect::new(0, 0, 10, 10));
        cx.bind_world(WorldRef::Viewport(world));

        cx.begin_target(TargetRef::Offscreen(target));
        assert_eq!(cx.target(), TargetRef::Offscreen(target));
        assert_eq!(cx.scissor(), Rect::new(0, 0, 64, 32));
        assert_eq!(cx.world(), WorldRef::Target);
        assert_eq!(cx.fill(Rect::new(50, 0, 40, 40), ColorRgba::white()), Rect::new(50, 0, 14, 32));
        cx.end_target();

        assert_eq!(cx.target(), TargetRef::Screen);
        assert_eq!(cx.scissor(), Rect::new(0, 0, 10, 10));
        assert_eq!(cx.world(), WorldRef::Viewport(world));
        assert_eq!(cx.world_offset(), Vec2i::new(100, 100));

        cx.pop_scissor();
        cx.present();
        assert_eq!(cx.stats().offscreen_passes, 1);
    }

    #[test]
    fn target_world_offset_applies_inside_pass() {
        let mut cx = cx();
        let id = AgentId::allocate();
        let mut target = cx.create_target(Vec2i::new(50, 50));
        cx.update_world(target.world_mut(), Vec2i::new(50, 50), Vec2i::new(-10, 5));
        cx.agents().insert(id, target);

        cx.begin_target(TargetRef::Offscreen(id));
        assert_eq!(cx.fill(Rect::new(10, 0, 5, 5), ColorRgba::white()), Rect::new(0, 5, 5, 5));
        cx.end_target();
    }

    #[test]
    fn missing_target_draws_nothing() {
        let mut cx = cx();
        let gone = insert_target(&mut cx, Vec2i::new(8, 8));
        cx.agents().remove::<TargetBuffer>(gone);

        cx.begin_target(TargetRef::Offscreen(gone));
        assert!(cx.fill(Rect::new(0, 0, 4, 4), ColorRgba::white()).is_empty());
        cx.end_target();

        assert_eq!(cx.target(), TargetRef::Screen);
        assert_eq!(cx.scissor(), Rect::new(0, 0, 320, 240));
        assert_eq!(cx.stats().fills, 0);
    }

    #[test]
    fn present_closes_open_target_passes() {
        let mut cx = cx();
        let target = insert_target(&mut cx, Vec2i::new(8, 8));

        cx.begin_frame();
        cx.begin_target(TargetRef::Offscreen(target));
        cx.present();

        assert_eq!(cx.target(), TargetRef::Screen);
        assert_eq!(cx.scissor(), Rect::new(0, 0, 320, 240));
    }
}
