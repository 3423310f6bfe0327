//! Headless demo player.
//!
//! Drives a paced frame loop over a small nested-viewport scene on a
//! dedicated render thread, renders the inner viewport off-screen, fades
//! out, then prints the render-thread counters.

mod block;
mod config;

use std::time::Duration;

use anyhow::{Context, Result};
use kiln_engine::coords::{ColorRgba, Rect, Tone};
use kiln_engine::logging::{init_logging, LoggingConfig};
use kiln_engine::render::{GpuDevice, GpuInit, RenderContext, RenderRunner};
use kiln_engine::screen::{RenderScreen, RenderTarget, ScreenConfig, Viewport};
use kiln_engine::worker::TaskRunner;

use block::Block;
use config::PlayerConfig;

const BLOCK_BATCH: u64 = 1;
const FADE_FRAMES: u32 = 16;

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let config = PlayerConfig::from_env()?;
    log::info!(
        "kiln player: {} frames at {}x{}, {} fps{}",
        config.frames,
        config.resolution.x,
        config.resolution.y,
        config.frame_rate,
        if config.headless { ", no gpu" } else { "" }
    );

    let runner = spawn_render_thread(&config)?;
    let mut screen = RenderScreen::new(
        runner,
        ScreenConfig {
            resolution: config.resolution,
            frame_rate: config.frame_rate,
            ..Default::default()
        },
    )?;

    run(&mut screen, &config)?;

    match screen.render_stats() {
        Some(stats) => println!("{stats:#?}"),
        None => log::error!("render thread stopped before reporting stats"),
    }
    Ok(())
}

fn spawn_render_thread(config: &PlayerConfig) -> Result<RenderRunner> {
    let headless = config.headless;
    let size = config.resolution;

    TaskRunner::dedicated("kiln-render", move || {
        if headless {
            return Ok(RenderContext::without_gpu(size));
        }
        match GpuDevice::headless(GpuInit::default()) {
            Ok(device) => RenderContext::with_gpu(device, size),
            Err(e) => {
                log::warn!("no gpu available, rendering without one: {e:#}");
                Ok(RenderContext::without_gpu(size))
            }
        }
    })
    .context("failed to start the render thread")
}

fn run(screen: &mut RenderScreen, config: &PlayerConfig) -> Result<()> {
    let handle = screen.handle().clone();

    let mut outer = Viewport::new(screen, Rect::new(32, 32, 320, 240));
    outer.set_z(1);
    outer.set_tone(Tone::new(0.1, 0.0, -0.1, 0.0));

    let inner = Viewport::new_child(&outer, Rect::new(40, 40, 160, 120));
    inner.set_color(ColorRgba::new(0.0, 0.0, 1.0, 0.25));

    let mut spare = Viewport::new(screen, Rect::new(400, 32, 200, 200));
    spare.set_z(2);

    let mut blocks = Vec::new();
    for i in 0..4 {
        let rect = Rect::new(i * 24, i * 16, 64, 48);
        let color = ColorRgba::from_rgba8(200, 60 + 40 * i as u8, 40, 255);
        let block = Block::new(&handle, inner.controller(), 0, rect, color, BLOCK_BATCH)
            .context("scene built while the graph was busy")?;
        blocks.push(block);
    }
    blocks.extend(Block::new(
        &handle,
        spare.controller(),
        0,
        Rect::new(0, 0, 100, 100),
        ColorRgba::white(),
        0,
    ));

    while screen.frame_count() < config.frames {
        let updates = screen.tick();
        if updates == 0 {
            std::thread::sleep(Duration::from_millis(1));
            continue;
        }

        for i in 0..updates {
            screen.set_skip_render(i != 0);
            step(screen.frame_count(), &outer, &inner, &mut spare, &blocks);
            screen.update();
            if screen.frame_count() >= config.frames {
                break;
            }
        }
    }
    screen.set_skip_render(false);

    let target = RenderTarget::new(screen, inner.rect().size)?;
    inner.render(&target)?;
    match target.read_pixels() {
        Some(pixels) => log::info!(
            "inner viewport snapshot {}x{}, top-left {:?}",
            pixels.size.x,
            pixels.size.y,
            pixels.get(0, 0)
        ),
        None => log::info!("no gpu; inner viewport snapshot skipped"),
    }

    screen.fade_out(FADE_FRAMES);
    if let Some(frame) = screen.snap_to_pixels() {
        let lit = frame.rgba.chunks_exact(4).filter(|px| px[..3] != [0, 0, 0]).count();
        log::info!("faded frame has {lit} lit pixel(s)");
    }

    Ok(())
}

/// Per-frame scene animation.
fn step(frame: u64, outer: &Viewport, inner: &Viewport, spare: &mut Viewport, blocks: &[Block]) {
    let t = frame as i32;

    outer.set_ox((t % 64) - 32);
    inner.update();
    if frame % 40 == 0 {
        inner.flash(Some(ColorRgba::white()), 12);
    }

    if let Some(first) = blocks.first() {
        let r = first.rect();
        first.set_rect(Rect::new((t * 2) % 160, r.origin.y, r.size.x, r.size.y));
    }
    if let Some(last) = blocks.last() {
        let pulse = (frame % 60) as f32 / 60.0;
        last.set_color(ColorRgba::new(1.0, pulse, pulse, 1.0));
    }

    if frame == 30 && !spare.is_disposed() {
        log::info!("disposing spare viewport at frame {frame}");
        spare.dispose();
    }
}
