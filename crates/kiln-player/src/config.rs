use anyhow::{Context, Result};
use kiln_engine::coords::Vec2i;

/// Player settings, read from the environment.
///
/// - `KILN_FRAMES`: logic updates to run before exiting (default 120)
/// - `KILN_HEADLESS`: any value other than `0` skips GPU setup
/// - `KILN_RESOLUTION`: `WIDTHxHEIGHT` (default `640x480`)
/// - `KILN_FPS`: target logic rate (default 60)
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    pub frames: u64,
    pub headless: bool,
    pub resolution: Vec2i,
    pub frame_rate: u32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            frames: 120,
            headless: false,
            resolution: Vec2i::new(640, 480),
            frame_rate: 60,
        }
    }
}

impl PlayerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(frames) = lookup("KILN_FRAMES") {
            config.frames = frames
                .trim()
                .parse()
                .with_context(|| format!("KILN_FRAMES is not a frame count: {frames:?}"))?;
        }
        if let Some(headless) = lookup("KILN_HEADLESS") {
            config.headless = headless.trim() != "0";
        }
        if let Some(resolution) = lookup("KILN_RESOLUTION") {
            config.resolution = parse_resolution(&resolution)?;
        }
        if let Some(fps) = lookup("KILN_FPS") {
            config.frame_rate = fps
                .trim()
                .parse()
                .with_context(|| format!("KILN_FPS is not a frame rate: {fps:?}"))?;
            anyhow::ensure!(config.frame_rate > 0, "KILN_FPS must be positive");
        }

        Ok(config)
    }
}

fn parse_resolution(text: &str) -> Result<Vec2i> {
    let (w, h) = text
        .trim()
        .split_once(['x', 'X'])
        .with_context(|| format!("KILN_RESOLUTION must look like 640x480, got {text:?}"))?;
    let size = Vec2i::new(
        w.trim().parse().context("bad resolution width")?,
        h.trim().parse().context("bad resolution height")?,
    );
    anyhow::ensure!(size.is_positive(), "resolution must be non-zero ({size:?})");
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = PlayerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.frames, 120);
        assert!(!config.headless);
        assert_eq!(config.resolution, Vec2i::new(640, 480));
        assert_eq!(config.frame_rate, 60);
    }

    #[test]
    fn reads_overrides() {
        let config = PlayerConfig::from_lookup(lookup(&[
            ("KILN_FRAMES", "30"),
            ("KILN_HEADLESS", "1"),
            ("KILN_RESOLUTION", "320x240"),
            ("KILN_FPS", "40"),
        ]))
        .unwrap();
        assert_eq!(config.frames, 30);
        assert!(config.headless);
        assert_eq!(config.resolution, Vec2i::new(320, 240));
        assert_eq!(config.frame_rate, 40);
    }

    #[test]
    fn headless_zero_keeps_gpu() {
        let config = PlayerConfig::from_lookup(lookup(&[("KILN_HEADLESS", "0")])).unwrap();
        assert!(!config.headless);
    }

    #[test]
    fn rejects_malformed_values() {
        assert!(PlayerConfig::from_lookup(lookup(&[("KILN_FRAMES", "many")])).is_err());
        assert!(PlayerConfig::from_lookup(lookup(&[("KILN_RESOLUTION", "640")])).is_err());
        assert!(PlayerConfig::from_lookup(lookup(&[("KILN_RESOLUTION", "0x480")])).is_err());
        assert!(PlayerConfig::from_lookup(lookup(&[("KILN_FPS", "0")])).is_err());
    }
}
