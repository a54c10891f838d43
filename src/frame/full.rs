//! Whole-screen frame source

use super::{check_size, CaptureError, FrameSource, PixelBuffer, Rect, ScreenGrabber};

/// Keeps a copy of the entire screen
pub struct FullFrame<G> {
    grabber: G,
    buffer: PixelBuffer,
}

impl<G: ScreenGrabber> FullFrame<G> {
    /// Buffer is sized once from the grabber's screen size
    pub fn new(grabber: G) -> Self {
        let (width, height) = grabber.size();
        Self {
            grabber,
            buffer: PixelBuffer::new(width, height),
        }
    }

    pub fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }

    pub fn grabber_mut(&mut self) -> &mut G {
        &mut self.grabber
    }
}

impl<G: ScreenGrabber> FrameSource for FullFrame<G> {
    fn refresh(&mut self) -> Result<(), CaptureError> {
        self.grabber.next_frame()?;
        check_size(&self.grabber, self.buffer.width(), self.buffer.height())?;
        let rect = Rect::new(0, 0, self.buffer.width(), self.buffer.height());
        self.grabber.copy_region(rect, &mut self.buffer)?;
        self.buffer.force_opaque();
        Ok(())
    }

    fn width(&self) -> u32 {
        self.buffer.width()
    }

    fn height(&self) -> u32 {
        self.buffer.height()
    }

    fn pixel(&self, x: u32, y: u32) -> Result<u32, CaptureError> {
        self.buffer.get(x, y).ok_or(CaptureError::OutOfBounds {
            x,
            y,
            width: self.buffer.width(),
            height: self.buffer.height(),
        })
    }
}
