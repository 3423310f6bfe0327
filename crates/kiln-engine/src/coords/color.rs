/// Normalised RGBA colour, each channel in `0.0..=1.0`.
///
/// Used for blend/flash colours that the render thread composites over a
/// region. An alpha of zero means "no colour effect".
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct ColorRgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl ColorRgba {
    #[inline]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Builds a colour from 8-bit channels.
    #[inline]
    pub fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::new(
            r as f32 / 255.0,
            g as f32 / 255.0,
            b as f32 / 255.0,
            a as f32 / 255.0,
        )
    }

    #[inline]
    pub const fn transparent() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }

    #[inline]
    pub const fn white() -> Self {
        Self::new(1.0, 1.0, 1.0, 1.0)
    }

    #[inline]
    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    #[inline]
    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Signed colour shift applied after blending, channels in `-1.0..=1.0`.
/// `gray` desaturates towards luminance.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Tone {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
    pub gray: f32,
}

impl Tone {
    #[inline]
    pub const fn new(red: f32, green: f32, blue: f32, gray: f32) -> Self {
        Self { red, green, blue, gray }
    }

    #[inline]
    pub fn is_neutral(self) -> bool {
        self.red == 0.0 && self.green == 0.0 && self.blue == 0.0 && self.gray == 0.0
    }

    /// True when a red, green or blue shift is set. `gray` alone does not
    /// count: fills cannot composite it.
    #[inline]
    pub fn has_color_shift(self) -> bool {
        self.red != 0.0 || self.green != 0.0 || self.blue != 0.0
    }

    #[inline]
    pub fn to_array(self) -> [f32; 4] {
        [self.red, self.green, self.blue, self.gray]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgba8_maps_to_unit_range() {
        let c = ColorRgba::from_rgba8(255, 0, 51, 255);
        assert_eq!(c.r, 1.0);
        assert_eq!(c.g, 0.0);
        assert!((c.b - 0.2).abs() < 1e-6);
        assert_eq!(c.a, 1.0);
    }

    #[test]
    fn default_tone_is_neutral() {
        assert!(Tone::default().is_neutral());
        assert!(!Tone::new(0.0, 0.0, 0.0, 0.5).is_neutral());
    }

    #[test]
    fn gray_alone_is_not_a_color_shift() {
        assert!(!Tone::new(0.0, 0.0, 0.0, 0.5).has_color_shift());
        assert!(Tone::new(0.0, -0.1, 0.0, 0.5).has_color_shift());
    }
}
