use crate::coords::ColorRgba;

/// Timed colour flash.
///
/// `setup(Some(color), frames)` overlays `color` with its alpha fading
/// linearly to zero over `frames` updates. `setup(None, frames)` is an
/// invalid flash: the owner hides itself until the flash runs out.
#[derive(Debug, Clone, Default)]
pub struct FlashController {
    color: Option<ColorRgba>,
    duration: u32,
    remaining: u32,
}

impl FlashController {
    pub fn setup(&mut self, color: Option<ColorRgba>, frames: u32) {
        self.color = color;
        self.duration = frames;
        self.remaining = frames;
    }

    /// Advances one frame.
    pub fn update(&mut self) {
        if self.remaining == 0 {
            return;
        }
        self.remaining -= 1;
        if self.remaining == 0 {
            self.color = None;
        }
    }

    #[inline]
    pub fn is_flashing(&self) -> bool {
        self.remaining > 0
    }

    /// Flashing with no colour.
    #[inline]
    pub fn is_invalid(&self) -> bool {
        self.is_flashing() && self.color.is_none()
    }

    /// Current flash colour; transparent when idle or invalid.
    pub fn color(&self) -> ColorRgba {
        match self.color {
            Some(c) if self.remaining > 0 => {
                let t = self.remaining as f32 / self.duration.max(1) as f32;
                c.with_alpha(c.a * t)
            }
            _ => ColorRgba::transparent(),
        }
    }

    /// Picks the stronger of `base` and the flash colour.
    pub fn composite(&self, base: ColorRgba) -> ColorRgba {
        if !self.is_flashing() {
            return base;
        }
        let flash = self.color();
        if flash.a > base.a { flash } else { base }
    }
}
