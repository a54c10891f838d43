//! Frame sources: where the pipeline reads screen pixels from.
//!
//! A [`ScreenGrabber`] is the capture transport (PipeWire, or a synthetic
//! scene). A [`FrameSource`] sits on top of a grabber and keeps the pixels
//! the pipeline samples: either the whole screen ([`FullFrame`]) or only the
//! four border strips the LEDs look at ([`EdgeFrame`]).
//!
//! Pixels are packed `0xAARRGGBB`. Every refresh forces alpha to `0xFF`.

mod edge;
mod full;
mod synthetic;

pub use edge::EdgeFrame;
pub use full::FullFrame;
pub use synthetic::SyntheticGrabber;

pub use crate::error::CaptureError;

/// Alpha channel of a packed pixel
pub const ALPHA_MASK: u32 = 0xFF00_0000;

/// Axis-aligned rectangle in screen coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// True if the rectangle lies inside a `width × height` area
    pub fn fits(&self, width: u32, height: u32) -> bool {
        u64::from(self.x) + u64::from(self.width) <= u64::from(width)
            && u64::from(self.y) + u64::from(self.height) <= u64::from(height)
    }
}

/// Row-major packed pixels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
}

impl PixelBuffer {
    /// Zeroed (transparent black) buffer
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize],
        }
    }

    pub fn from_pixels(width: u32, height: u32, pixels: Vec<u32>) -> Result<Self, CaptureError> {
        if pixels.len() != width as usize * height as usize {
            return Err(CaptureError::RegionMismatch(format!(
                "{} pixels for a {}x{} buffer",
                pixels.len(),
                width,
                height
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[y as usize * self.width as usize + x as usize])
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u32] {
        &mut self.pixels
    }

    /// Set alpha to 0xFF on every pixel
    pub fn force_opaque(&mut self) {
        for p in &mut self.pixels {
            *p |= ALPHA_MASK;
        }
    }
}

/// Capture transport: produces whole-screen frames and copies regions out
/// of the most recent one.
pub trait ScreenGrabber {
    /// Screen dimensions
    fn size(&self) -> (u32, u32);

    /// Block until a frame newer than the previously latched one is ready,
    /// then latch it.
    fn next_frame(&mut self) -> Result<(), CaptureError>;

    /// Copy `rect` of the latched frame into `dest`, which must be exactly
    /// `rect.width × rect.height`.
    fn copy_region(&self, rect: Rect, dest: &mut PixelBuffer) -> Result<(), CaptureError>;
}

impl<G: ScreenGrabber + ?Sized> ScreenGrabber for Box<G> {
    fn size(&self) -> (u32, u32) {
        (**self).size()
    }

    fn next_frame(&mut self) -> Result<(), CaptureError> {
        (**self).next_frame()
    }

    fn copy_region(&self, rect: Rect, dest: &mut PixelBuffer) -> Result<(), CaptureError> {
        (**self).copy_region(rect, dest)
    }
}

/// Pixel access for the sampler
pub trait FrameSource {
    /// Replace the held pixels with the most recent frame. The only pipeline
    /// step allowed to block on the transport.
    fn refresh(&mut self) -> Result<(), CaptureError>;

    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Packed color at `(x, y)`
    fn pixel(&self, x: u32, y: u32) -> Result<u32, CaptureError>;
}

/// Fail if the grabber's screen is no longer `width × height`. Frame
/// sources and the mapper are sized once; a resized screen is reported
/// instead of sampling the wrong pixels.
pub(crate) fn check_size<G: ScreenGrabber + ?Sized>(
    grabber: &G,
    width: u32,
    height: u32,
) -> Result<(), CaptureError> {
    let (w, h) = grabber.size();
    if (w, h) != (width, height) {
        return Err(CaptureError::RegionMismatch(format!(
            "screen is now {}x{}, frame source was built for {}x{}",
            w, h, width, height
        )));
    }
    Ok(())
}

/// Copy `rect` out of a row-major `src` frame into `dest`
pub(crate) fn copy_rect(
    src: &[u32],
    src_width: u32,
    src_height: u32,
    rect: Rect,
    dest: &mut PixelBuffer,
) -> Result<(), CaptureError> {
    if !rect.fits(src_width, src_height) {
        return Err(CaptureError::RegionMismatch(format!(
            "{:?} outside {}x{} frame",
            rect, src_width, src_height
        )));
    }
    if dest.width() != rect.width || dest.height() != rect.height {
        return Err(CaptureError::RegionMismatch(format!(
            "{:?} into {}x{} buffer",
            rect,
            dest.width(),
            dest.height()
        )));
    }

    let stride = src_width as usize;
    let w = rect.width as usize;
    for (row, dst) in dest.pixels_mut().chunks_exact_mut(w.max(1)).enumerate() {
        let start = (rect.y as usize + row) * stride + rect.x as usize;
        dst.copy_from_slice(&src[start..start + w]);
    }
    Ok(())
}
