//! Byte layout of the shared payload.
//!
//! ```text
//! [0 .. 3N)        RGB triples in LED-ring order
//! [3N .. 3N + 2)   u16 intensity, little-endian (optional)
//! ```
//!
//! All offset arithmetic for the region lives here; the channel only hands
//! slices of the mapping to these accessors.

use crate::error::ChannelError;

/// Lowest intensity the control path may store
pub const INTENSITY_MIN: u16 = 0;
/// Highest intensity the control path may store
pub const INTENSITY_MAX: u16 = 100;
/// Intensity written when the producer creates the channel
pub const DEFAULT_INTENSITY: u16 = 100;

const BYTES_PER_LED: usize = 3;
const INTENSITY_BYTES: usize = 2;

/// One published LED color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Clamp `current + delta` into the intensity range
pub fn clamp_intensity(current: u16, delta: i32) -> u16 {
    let next = i64::from(current) + i64::from(delta);
    next.clamp(i64::from(INTENSITY_MIN), i64::from(INTENSITY_MAX)) as u16
}

/// Typed accessor over the payload bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadLayout {
    led_count: usize,
    has_intensity: bool,
}

impl PayloadLayout {
    pub const fn new(led_count: usize, has_intensity: bool) -> Self {
        Self {
            led_count,
            has_intensity,
        }
    }

    pub fn led_count(&self) -> usize {
        self.led_count
    }

    pub fn has_intensity(&self) -> bool {
        self.has_intensity
    }

    /// Size of the LED byte range
    pub fn leds_len(&self) -> usize {
        self.led_count * BYTES_PER_LED
    }

    /// Total region size in bytes
    pub fn size(&self) -> usize {
        if self.has_intensity {
            self.leds_len() + INTENSITY_BYTES
        } else {
            self.leds_len()
        }
    }

    /// Copy `leds` into the LED byte range of `buf`
    pub fn write_leds(&self, buf: &mut [u8], leds: &[Rgb]) -> Result<(), ChannelError> {
        self.check_len(leds.len())?;
        for (dst, led) in buf[..self.leds_len()]
            .chunks_exact_mut(BYTES_PER_LED)
            .zip(leds)
        {
            dst[0] = led.r;
            dst[1] = led.g;
            dst[2] = led.b;
        }
        Ok(())
    }

    /// Decode the LED byte range of `buf` into `out` (resized to the LED count)
    pub fn read_leds_into(&self, buf: &[u8], out: &mut Vec<Rgb>) {
        out.clear();
        out.extend(
            buf[..self.leds_len()]
                .chunks_exact(BYTES_PER_LED)
                .map(|c| Rgb::new(c[0], c[1], c[2])),
        );
    }

    pub fn read_leds(&self, buf: &[u8]) -> Vec<Rgb> {
        let mut out = Vec::with_capacity(self.led_count);
        self.read_leds_into(buf, &mut out);
        out
    }

    pub fn read_intensity(&self, buf: &[u8]) -> Result<u16, ChannelError> {
        let range = self.intensity_range()?;
        Ok(u16::from_le_bytes([buf[range.start], buf[range.start + 1]]))
    }

    pub fn write_intensity(&self, buf: &mut [u8], value: u16) -> Result<(), ChannelError> {
        let range = self.intensity_range()?;
        buf[range].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    fn intensity_range(&self) -> Result<std::ops::Range<usize>, ChannelError> {
        if !self.has_intensity {
            return Err(ChannelError::NoIntensityField);
        }
        let start = self.leds_len();
        Ok(start..start + INTENSITY_BYTES)
    }

    fn check_len(&self, actual: usize) -> Result<(), ChannelError> {
        if actual != self.led_count {
            return Err(ChannelError::LengthMismatch {
                expected: self.led_count,
                actual,
            });
        }
        Ok(())
    }
}
