//! Windowed average color around a screen coordinate

use crate::color::Color;
use crate::error::SampleError;
use crate::frame::FrameSource;

/// Mean color of a window and how many pixels went into it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowSample {
    pub color: Color<f32>,
    pub visited: u32,
}

/// Average the `window_w × window_h` pixels centered on `(cx, cy)`.
///
/// The window spans `[cx - window_w/2, cx - window_w/2 + window_w)` and the
/// same for y. Pixels outside the frame are skipped, not clamped; the mean
/// is over the pixels actually visited.
pub fn sample<F: FrameSource + ?Sized>(
    frame: &F,
    cx: u32,
    cy: u32,
    window_w: u32,
    window_h: u32,
) -> Result<WindowSample, SampleError> {
    let x0 = i64::from(cx) - i64::from(window_w / 2);
    let y0 = i64::from(cy) - i64::from(window_h / 2);
    let xs = clip(x0, window_w, frame.width());
    let ys = clip(y0, window_h, frame.height());

    let (mut r, mut g, mut b, mut a) = (0u64, 0u64, 0u64, 0u64);
    let mut visited = 0u32;
    for y in ys {
        for x in xs.clone() {
            let p = frame.pixel(x, y)?;
            a += u64::from(p >> 24);
            r += u64::from((p >> 16) & 0xFF);
            g += u64::from((p >> 8) & 0xFF);
            b += u64::from(p & 0xFF);
            visited += 1;
        }
    }

    if visited == 0 {
        return Err(SampleError::EmptyWindow { cx, cy });
    }

    let n = visited as f64;
    let mean = |sum: u64| (sum as f64 / n) as f32;
    Ok(WindowSample {
        color: Color::new(mean(r), mean(g), mean(b), mean(a)),
        visited,
    })
}

/// Part of `[start, start + len)` inside `[0, limit)`
fn clip(start: i64, len: u32, limit: u32) -> std::ops::Range<u32> {
    let lo = start.max(0);
    let hi = (start + i64::from(len)).min(i64::from(limit));
    if lo >= hi {
        return 0..0;
    }
    lo as u32..hi as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CaptureError;
    use crate::frame::{FullFrame, SyntheticGrabber};
    use ambilight_shm::Rgb;

    fn solid(width: u32, height: u32, rgb: Rgb) -> FullFrame<SyntheticGrabber> {
        let mut frame = FullFrame::new(SyntheticGrabber::solid(width, height, rgb));
        frame.refresh().unwrap();
        frame
    }

    #[test]
    fn test_interior_window_visits_all() {
        let frame = solid(20, 20, Rgb::new(10, 20, 30));
        let s = sample(&frame, 10, 10, 4, 3).unwrap();
        assert_eq!(s.visited, 12);
        assert_eq!(s.color, Color::new(10.0, 20.0, 30.0, 255.0));
    }

    #[test]
    fn test_straddling_window_counts_fewer() {
        let frame = solid(20, 20, Rgb::new(200, 0, 0));
        // x range [-2, 2), y range [-2, 2): only [0,2)x[0,2) is inside
        let s = sample(&frame, 0, 0, 4, 4).unwrap();
        assert_eq!(s.visited, 4);
        assert_eq!(s.color.r, 200.0);

        let s = sample(&frame, 19, 19, 4, 4).unwrap();
        assert_eq!(s.visited, 9);
    }

    #[test]
    fn test_mean_of_mixed_window() {
        // Left half black, right half white
        let pixels = (0..4)
            .flat_map(|_| [0u32, 0, 0x00FF_FFFF, 0x00FF_FFFF])
            .collect();
        let mut frame =
            FullFrame::new(SyntheticGrabber::from_pixels(4, 4, pixels).unwrap());
        frame.refresh().unwrap();
        let s = sample(&frame, 2, 2, 4, 4).unwrap();
        assert_eq!(s.visited, 16);
        assert_eq!(s.color, Color::new(127.5, 127.5, 127.5, 255.0));
    }

    #[test]
    fn test_window_outside_frame() {
        let frame = solid(8, 8, Rgb::new(1, 2, 3));
        assert!(matches!(
            sample(&frame, 100, 100, 4, 4),
            Err(SampleError::EmptyWindow { cx: 100, cy: 100 })
        ));
        assert!(matches!(
            sample(&frame, 4, 4, 0, 4),
            Err(SampleError::EmptyWindow { .. })
        ));
    }

    #[test]
    fn test_edge_frame_interior_error_propagates() {
        use crate::frame::EdgeFrame;
        let mut frame =
            EdgeFrame::new(SyntheticGrabber::solid(20, 20, Rgb::BLACK), 2, 2).unwrap();
        frame.refresh().unwrap();
        assert!(matches!(
            sample(&frame, 10, 10, 2, 2),
            Err(SampleError::Capture(CaptureError::OutsideEdges { .. }))
        ));
    }
}
