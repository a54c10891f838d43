//! In-memory scenes: solid colors, image files, or explicit pixels

use std::path::Path;

use ambilight_shm::Rgb;
use tracing::info;

use super::{copy_rect, CaptureError, PixelBuffer, Rect, ScreenGrabber};
use crate::color::Color;

/// A static scene served as a never-ending stream of identical frames
pub struct SyntheticGrabber {
    scene: PixelBuffer,
    frames: u64,
}

impl SyntheticGrabber {
    pub fn solid(width: u32, height: u32, color: Rgb) -> Self {
        let packed = Color::new(color.r, color.g, color.b, 0xFF).to_packed();
        let mut scene = PixelBuffer::new(width, height);
        scene.pixels_mut().fill(packed);
        Self { scene, frames: 0 }
    }

    pub fn from_pixels(width: u32, height: u32, pixels: Vec<u32>) -> Result<Self, CaptureError> {
        Ok(Self {
            scene: PixelBuffer::from_pixels(width, height, pixels)?,
            frames: 0,
        })
    }

    /// Decode an image file (PNG or JPEG) into a scene at its native size
    pub fn from_image(path: &Path) -> Result<Self, CaptureError> {
        let img = image::open(path)?.to_rgba8();
        let (width, height) = img.dimensions();
        let pixels = img
            .pixels()
            .map(|p| Color::new(p[0], p[1], p[2], p[3]).to_packed())
            .collect();
        info!("Loaded {}x{} scene from {}", width, height, path.display());
        Self::from_pixels(width, height, pixels)
    }

    /// Mutable scene pixels; changes show up from the next frame on
    pub fn scene_mut(&mut self) -> &mut PixelBuffer {
        &mut self.scene
    }

    /// Frames handed out so far
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl ScreenGrabber for SyntheticGrabber {
    fn size(&self) -> (u32, u32) {
        (self.scene.width(), self.scene.height())
    }

    fn next_frame(&mut self) -> Result<(), CaptureError> {
        self.frames += 1;
        Ok(())
    }

    fn copy_region(&self, rect: Rect, dest: &mut PixelBuffer) -> Result<(), CaptureError> {
        copy_rect(
            self.scene.pixels(),
            self.scene.width(),
            self.scene.height(),
            rect,
            dest,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solid_scene() {
        let mut grabber = SyntheticGrabber::solid(4, 2, Rgb::new(255, 0, 0));
        assert_eq!(grabber.size(), (4, 2));
        grabber.next_frame().unwrap();
        let mut dest = PixelBuffer::new(4, 2);
        grabber
            .copy_region(Rect::new(0, 0, 4, 2), &mut dest)
            .unwrap();
        assert!(dest.pixels().iter().all(|&p| p == 0xFFFF_0000));
        assert_eq!(grabber.frames(), 1);
    }

    #[test]
    fn test_missing_image_fails() {
        assert!(matches!(
            SyntheticGrabber::from_image(Path::new("/nonexistent/scene.png")),
            Err(CaptureError::Image(_))
        ));
    }
}
