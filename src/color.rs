// Color types for sampling, smoothing and publishing

use ambilight_shm::Rgb;

/// Four-channel color. `Color<u8>` is a captured pixel, `Color<f32>` is the
/// working type for averaging and smoothing.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Color<T> {
    pub r: T,
    pub g: T,
    pub b: T,
    pub a: T,
}

impl<T> Color<T> {
    pub const fn new(r: T, g: T, b: T, a: T) -> Self {
        Self { r, g, b, a }
    }
}

impl Color<u8> {
    /// Unpack a `0xAARRGGBB` pixel
    pub fn from_packed(p: u32) -> Self {
        Self {
            a: (p >> 24) as u8,
            r: (p >> 16) as u8,
            g: (p >> 8) as u8,
            b: p as u8,
        }
    }

    pub fn to_packed(self) -> u32 {
        (u32::from(self.a) << 24)
            | (u32::from(self.r) << 16)
            | (u32::from(self.g) << 8)
            | u32::from(self.b)
    }
}

impl From<Color<u8>> for Color<f32> {
    fn from(c: Color<u8>) -> Self {
        Self::new(
            f32::from(c.r),
            f32::from(c.g),
            f32::from(c.b),
            f32::from(c.a),
        )
    }
}

impl Color<f32> {
    pub const TRANSPARENT: Color<f32> = Color::new(0.0, 0.0, 0.0, 0.0);

    /// Clamp every channel into [0, 255]; NaN becomes 0
    pub fn clamped(self) -> Self {
        let c = |v: f32| if v.is_nan() { 0.0 } else { v.clamp(0.0, 255.0) };
        Self::new(c(self.r), c(self.g), c(self.b), c(self.a))
    }

    /// `self * (1 - w) + other * w`, clamped
    pub fn blend(self, other: Self, w: f32) -> Self {
        let mix = |a: f32, b: f32| a * (1.0 - w) + b * w;
        Self::new(
            mix(self.r, other.r),
            mix(self.g, other.g),
            mix(self.b, other.b),
            mix(self.a, other.a),
        )
        .clamped()
    }

    /// Round to an LED triple. Channels below `noise_floor` are dropped to 0.
    pub fn quantize(self, noise_floor: u8) -> Rgb {
        let q = |v: f32| {
            let v = v.round().clamp(0.0, 255.0) as u8;
            if v < noise_floor {
                0
            } else {
                v
            }
        };
        let c = self.clamped();
        Rgb::new(q(c.r), q(c.g), q(c.b))
    }
}

/// Parse `RRGGBB` or `#RRGGBB`
pub fn parse_hex_rgb(s: &str) -> Option<Rgb> {
    let hex = s.strip_prefix('#').unwrap_or(s);
    if hex.len() != 6 {
        return None;
    }
    let v = u32::from_str_radix(hex, 16).ok()?;
    Some(Rgb::new((v >> 16) as u8, (v >> 8) as u8, v as u8))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_packed() {
        let c = Color::from_packed(0x80FF4010);
        assert_eq!(c, Color::new(0xFF, 0x40, 0x10, 0x80));
        assert_eq!(c.to_packed(), 0x80FF4010);
    }

    #[test]
    fn test_blend_clamps() {
        let hot = Color::new(300.0, -20.0, 128.0, 255.0);
        assert_eq!(hot.clamped(), Color::new(255.0, 0.0, 128.0, 255.0));

        let a = Color::new(0.0, 0.0, 0.0, 0.0);
        let b = Color::new(255.0, 255.0, 255.0, 255.0);
        assert_eq!(a.blend(b, 0.0), a);
        assert_eq!(a.blend(b, 1.0), b);
        // Out-of-range weights never wrap
        assert_eq!(a.blend(b, 2.0), b);
    }

    #[test]
    fn test_quantize_rounds() {
        let c = Color::new(161.19, 0.4, 254.6, 255.0);
        assert_eq!(c.quantize(0), Rgb::new(161, 0, 255));
    }

    #[test]
    fn test_quantize_noise_floor() {
        let c = Color::new(9.0, 10.0, 200.0, 255.0);
        assert_eq!(c.quantize(10), Rgb::new(0, 10, 200));
        assert_eq!(c.quantize(0), Rgb::new(9, 10, 200));
    }

    #[test]
    fn test_parse_hex_rgb() {
        assert_eq!(parse_hex_rgb("ff0000"), Some(Rgb::new(255, 0, 0)));
        assert_eq!(parse_hex_rgb("#00FF80"), Some(Rgb::new(0, 255, 128)));
        assert_eq!(parse_hex_rgb("fff"), None);
        assert_eq!(parse_hex_rgb("zzzzzz"), None);
    }
}
