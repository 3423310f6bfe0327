use anyhow::Result;

use crate::coords::Vec2i;
use crate::render::{FrameStats, Pixels, RenderRunner};
use crate::scene::{RenderParams, RenderStage, TargetRef};
use crate::time::FramePacer;

use super::{ScreenConfig, ScreenHandle};

/// Logic-thread driver of the frame loop.
///
/// Owns the root controller of the scene graph and the render runner.
/// Each `update` runs the three broadcast stages and posts frame begin and
/// present tasks between them.
pub struct RenderScreen {
    handle: ScreenHandle,
    config: ScreenConfig,
    pacer: FramePacer,
    frame_count: u64,
    brightness: u8,
    frozen: bool,
    skip_render: bool,
}

impl RenderScreen {
    /// Takes ownership of the render runner and sizes the render context's
    /// screen buffer to `config.resolution`.
    pub fn new(runner: RenderRunner, config: ScreenConfig) -> Result<Self> {
        anyhow::ensure!(
            config.resolution.is_positive(),
            "screen resolution must be non-zero ({:?})",
            config.resolution
        );

        let resolution = config.resolution;
        let resized = runner.round_trip(move |cx| {
            if cx.screen_size() == resolution {
                Ok(())
            } else {
                cx.resize(resolution)
            }
        });
        match resized {
            Some(result) => result?,
            None => anyhow::bail!("render worker stopped before the screen was created"),
        }

        log::debug!(
            "render screen {}x{} @ {} fps",
            resolution.x,
            resolution.y,
            config.frame_rate
        );

        Ok(Self {
            handle: ScreenHandle::new(runner, resolution),
            pacer: FramePacer::new(config.frame_rate),
            config,
            frame_count: 0,
            brightness: u8::MAX,
            frozen: false,
            skip_render: false,
        })
    }

    /// Shared handle for creating drawables on this screen.
    pub fn handle(&self) -> &ScreenHandle {
        &self.handle
    }

    #[inline]
    pub fn runner(&self) -> &RenderRunner {
        self.handle.runner()
    }

    #[inline]
    pub fn resolution(&self) -> Vec2i {
        self.handle.resolution()
    }

    // ── frame ───────────────────────────────────────────────────────────────

    /// Renders one frame (unless frozen or skipping) and advances the frame
    /// counter.
    pub fn update(&mut self) {
        if !self.frozen && !self.skip_render {
            self.render_frame();
        }
        self.frame_process();
    }

    fn render_frame(&mut self) {
        let handle = &self.handle;
        let runner = handle.runner();
        let mut params = RenderParams::root(runner, TargetRef::Screen, handle.resolution());

        handle.broadcast_root(RenderStage::BeforeRender, &mut params);
        runner.post(|cx| cx.begin_frame());

        handle.broadcast_root(RenderStage::OnRendering, &mut params);
        runner.post(|cx| cx.present());

        handle.broadcast_root(RenderStage::Notification, &mut params);
    }

    fn frame_process(&mut self) {
        self.frame_count += 1;
        if self.config.synchronize_each_frame {
            self.handle.runner().wait_synchronize();
        }
    }

    /// Runs `frames` frame updates without rendering.
    pub fn wait(&mut self, frames: u32) {
        for _ in 0..frames {
            self.frame_process();
        }
    }

    /// Stops rendering; `update` only advances the counter until thawed.
    pub fn freeze(&mut self) {
        if !self.frozen {
            log::debug!("screen frozen at frame {}", self.frame_count);
            self.frozen = true;
        }
    }

    /// Lets `frames` frames pass, then resumes rendering at full
    /// brightness.
    pub fn transition(&mut self, frames: u32) {
        if !self.frozen {
            return;
        }
        self.set_brightness(u8::MAX);
        self.wait(frames);
        self.frozen = false;
    }

    #[inline]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    // ── brightness ──────────────────────────────────────────────────────────

    #[inline]
    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    /// Presented frames are dimmed towards black below 255.
    pub fn set_brightness(&mut self, brightness: u8) {
        if self.brightness == brightness {
            return;
        }
        self.brightness = brightness;
        self.handle
            .runner()
            .post(move |cx| cx.set_brightness(brightness));
    }

    /// Ramps brightness down to 0 over `frames` updates.
    pub fn fade_out(&mut self, frames: u32) {
        self.fade_to(0, frames);
    }

    /// Ramps brightness up to 255 over `frames` updates.
    pub fn fade_in(&mut self, frames: u32) {
        self.fade_to(u8::MAX, frames);
    }

    fn fade_to(&mut self, level: u8, frames: u32) {
        let start = i64::from(self.brightness);
        let end = i64::from(level);
        let frames = i64::from(frames);

        for i in 1..=frames {
            let step = start + (end - start) * i / frames;
            self.set_brightness(step.clamp(0, 255) as u8);
            self.update();
        }
        self.set_brightness(level);
    }

    /// Copies the last presented frame. `None` without a GPU or if the
    /// render worker has stopped.
    pub fn snap_to_pixels(&self) -> Option<Pixels> {
        self.handle
            .runner()
            .round_trip(|cx| cx.read_pixels(TargetRef::Screen))
            .flatten()
    }

    /// When set, `update` skips rendering. Used for catch-up updates after
    /// the first one in a paced tick.
    pub fn set_skip_render(&mut self, skip: bool) {
        self.skip_render = skip;
    }

    #[inline]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn set_frame_count(&mut self, count: u64) {
        self.frame_count = count;
    }

    #[inline]
    pub fn frame_rate(&self) -> u32 {
        self.pacer.frame_rate()
    }

    pub fn set_frame_rate(&mut self, frame_rate: u32) {
        self.config.frame_rate = frame_rate;
        self.pacer.set_frame_rate(frame_rate);
    }

    /// Restarts pacing, so the next tick does not try to catch up.
    pub fn frame_reset(&mut self) {
        self.pacer.reset();
    }

    /// Logic updates to run for this host tick, measured against the clock.
    pub fn tick(&mut self) -> u32 {
        self.pacer.tick()
    }

    /// Logic updates to run for a tick that took `elapsed`.
    pub fn pace(&mut self, elapsed: std::time::Duration) -> u32 {
        self.pacer.pace(elapsed)
    }

    /// Resizes the screen buffer and waits for the render thread.
    pub fn resize(&mut self, width: i32, height: i32) -> Result<()> {
        let size = Vec2i::new(width, height);
        anyhow::ensure!(size.is_positive(), "screen resized to zero ({size:?})");

        self.config.resolution = size;
        self.handle.set_resolution(size);
        self.handle.runner().post(move |cx| {
            if let Err(e) = cx.resize(size) {
                log::error!("screen resize failed: {e:#}");
            }
        });
        self.handle.runner().wait_synchronize();
        Ok(())
    }

    /// Render-thread counters. `None` if the render worker has stopped.
    pub fn render_stats(&self) -> Option<FrameStats> {
        self.handle.runner().round_trip(|cx| cx.stats())
    }
}

impl Drop for RenderScreen {
    fn drop(&mut self) {
        let root = self.handle.root();
        self.handle.edit_graph(move |graph, _| {
            if graph.controller_exists(root) {
                graph.destroy_controller(root);
            }
        });
        self.handle.runner().wait_synchronize();
    }
}
