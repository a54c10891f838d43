//! Edge-only frame source: copies just the border strips the LEDs sample.
//!
//! ```text
//! +--------------------------------+
//! |              top               |  footprint_y rows, full width
//! +------+------------------+------+
//! | left |    (not held)    | right|  footprint_x columns
//! +------+------------------+------+
//! |             bottom             |  footprint_y rows, full width
//! +--------------------------------+
//! ```

use super::{check_size, CaptureError, FrameSource, PixelBuffer, Rect, ScreenGrabber};

struct Strip {
    rect: Rect,
    pixels: PixelBuffer,
}

impl Strip {
    fn new(rect: Rect) -> Self {
        Self {
            rect,
            pixels: PixelBuffer::new(rect.width, rect.height),
        }
    }

    fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.rect.x
            && y >= self.rect.y
            && x - self.rect.x < self.rect.width
            && y - self.rect.y < self.rect.height
    }

    fn get(&self, x: u32, y: u32) -> Option<u32> {
        self.pixels.get(x - self.rect.x, y - self.rect.y)
    }
}

/// Holds the top, bottom, left and right border strips of the screen
pub struct EdgeFrame<G> {
    grabber: G,
    width: u32,
    height: u32,
    // top, bottom, left, right
    strips: [Strip; 4],
}

impl<G: ScreenGrabber> EdgeFrame<G> {
    /// Strips are `footprint_y` rows tall and `footprint_x` columns wide
    pub fn new(grabber: G, footprint_x: u32, footprint_y: u32) -> Result<Self, CaptureError> {
        let (width, height) = grabber.size();
        if footprint_x == 0
            || footprint_y == 0
            || u64::from(footprint_x) * 2 > u64::from(width)
            || u64::from(footprint_y) * 2 > u64::from(height)
        {
            return Err(CaptureError::RegionMismatch(format!(
                "{}x{} edge strips do not fit a {}x{} screen",
                footprint_x, footprint_y, width, height
            )));
        }

        let side_rows = height - 2 * footprint_y;
        let strips = [
            Strip::new(Rect::new(0, 0, width, footprint_y)),
            Strip::new(Rect::new(0, height - footprint_y, width, footprint_y)),
            Strip::new(Rect::new(0, footprint_y, footprint_x, side_rows)),
            Strip::new(Rect::new(
                width - footprint_x,
                footprint_y,
                footprint_x,
                side_rows,
            )),
        ];

        Ok(Self {
            grabber,
            width,
            height,
            strips,
        })
    }

    pub fn grabber_mut(&mut self) -> &mut G {
        &mut self.grabber
    }

    /// Number of pixels copied per refresh
    pub fn held_pixels(&self) -> usize {
        self.strips.iter().map(|s| s.pixels.pixels().len()).sum()
    }
}

impl<G: ScreenGrabber> FrameSource for EdgeFrame<G> {
    fn refresh(&mut self) -> Result<(), CaptureError> {
        self.grabber.next_frame()?;
        check_size(&self.grabber, self.width, self.height)?;
        for strip in &mut self.strips {
            self.grabber.copy_region(strip.rect, &mut strip.pixels)?;
            strip.pixels.force_opaque();
        }
        Ok(())
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn pixel(&self, x: u32, y: u32) -> Result<u32, CaptureError> {
        if x >= self.width || y >= self.height {
            return Err(CaptureError::OutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            });
        }
        self.strips
            .iter()
            .find(|s| s.contains(x, y))
            .and_then(|s| s.get(x, y))
            .ok_or(CaptureError::OutsideEdges { x, y })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{FullFrame, SyntheticGrabber};

    fn patterned(width: u32, height: u32) -> SyntheticGrabber {
        let pixels = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x * 7 + y * 131) & 0x00FF_FFFF))
            .collect();
        SyntheticGrabber::from_pixels(width, height, pixels).unwrap()
    }

    #[test]
    fn test_edges_match_full_frame() {
        let mut full = FullFrame::new(patterned(40, 30));
        let mut edge = EdgeFrame::new(patterned(40, 30), 4, 3).unwrap();
        full.refresh().unwrap();
        edge.refresh().unwrap();

        for y in 0..30 {
            for x in 0..40 {
                let in_band = y < 3 || y >= 27 || x < 4 || x >= 36;
                match edge.pixel(x, y) {
                    Ok(p) => {
                        assert!(in_band, "({x}, {y}) should be interior");
                        assert_eq!(p, full.pixel(x, y).unwrap());
                    }
                    Err(CaptureError::OutsideEdges { .. }) => assert!(!in_band),
                    Err(e) => panic!("unexpected error {e}"),
                }
            }
        }
    }

    #[test]
    fn test_held_pixels() {
        let edge = EdgeFrame::new(patterned(40, 30), 4, 3).unwrap();
        // 2 * 40*3 + 2 * 4*24
        assert_eq!(edge.held_pixels(), 240 + 192);
    }

    #[test]
    fn test_strips_must_fit() {
        assert!(EdgeFrame::new(patterned(10, 10), 6, 2).is_err());
        assert!(EdgeFrame::new(patterned(10, 10), 0, 2).is_err());
    }

    #[test]
    fn test_resized_screen_is_rejected() {
        let mut edge = EdgeFrame::new(patterned(40, 30), 4, 3).unwrap();
        edge.refresh().unwrap();
        let before = edge.pixel(0, 0).unwrap();

        // A larger screen still contains the old strip rectangles
        *edge.grabber_mut().scene_mut() = PixelBuffer::new(80, 60);
        assert!(matches!(
            edge.refresh(),
            Err(CaptureError::RegionMismatch(_))
        ));
        assert_eq!(edge.pixel(0, 0).unwrap(), before);
        assert_eq!((edge.width(), edge.height()), (40, 30));
    }

    #[test]
    fn test_out_of_bounds() {
        let mut edge = EdgeFrame::new(patterned(10, 10), 2, 2).unwrap();
        edge.refresh().unwrap();
        assert!(matches!(
            edge.pixel(10, 0),
            Err(CaptureError::OutOfBounds { .. })
        ));
    }
}
