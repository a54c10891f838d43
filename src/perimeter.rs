//! LED ring ↔ screen coordinates.
//!
//! The ring has `W` LEDs along each horizontal edge and `H` along each
//! vertical edge, `N = 2 * (W + H)` in total. Each LED stands for one
//! footprint (`width / W` × `height / H` pixels) in the border band and is
//! sampled at the footprint's center.
//!
//! Horizontal edges own the corner footprints. A vertical-edge LED whose
//! center lands exactly on a horizontal-edge center is moved one pixel toward
//! the middle of the screen so no two LEDs share a coordinate.
//!
//! `index_to_pixel` is injective only for `W, H >= 2`, footprints of at
//! least 2×2 pixels and a screen at least 5 pixels wide. Anything smaller,
//! including a single LED on an edge, is rejected with `InvalidLayout`
//! because opposite edges can then land on the same center.

use std::fmt::Write as _;
use std::ops::Range;

use ambilight_shm::Rgb;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::MapError;

/// LEDs per edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedLayout {
    /// LEDs on each horizontal (top, bottom) edge
    pub leds_x: usize,
    /// LEDs on each vertical (left, right) edge
    pub leds_y: usize,
}

impl LedLayout {
    pub const fn new(leds_x: usize, leds_y: usize) -> Self {
        Self { leds_x, leds_y }
    }

    pub fn ring_len(&self) -> usize {
        2 * (self.leds_x + self.leds_y)
    }
}

/// Screen edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Top,
    Right,
    Bottom,
    Left,
}

impl Edge {
    pub fn name(&self) -> &'static str {
        match self {
            Edge::Top => "top",
            Edge::Right => "right",
            Edge::Bottom => "bottom",
            Edge::Left => "left",
        }
    }

    fn is_horizontal(&self) -> bool {
        matches!(self, Edge::Top | Edge::Bottom)
    }
}

/// Where index 0 sits and how the ring walks. Both schemes go clockwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum RingOrdering {
    /// Bottom edge right→left, left edge bottom→top, top edge left→right,
    /// right edge top→bottom
    #[default]
    BottomRight,
    /// Top edge left→right, right edge top→bottom, bottom edge right→left,
    /// left edge bottom→top
    TopLeft,
}

impl RingOrdering {
    fn edges(&self) -> [Edge; 4] {
        match self {
            RingOrdering::BottomRight => [Edge::Bottom, Edge::Left, Edge::Top, Edge::Right],
            RingOrdering::TopLeft => [Edge::Top, Edge::Right, Edge::Bottom, Edge::Left],
        }
    }
}

impl std::str::FromStr for RingOrdering {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bottom-right" => Ok(RingOrdering::BottomRight),
            "top-left" => Ok(RingOrdering::TopLeft),
            other => Err(format!(
                "unknown ordering {other:?} (expected bottom-right or top-left)"
            )),
        }
    }
}

impl std::fmt::Display for RingOrdering {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RingOrdering::BottomRight => f.write_str("bottom-right"),
            RingOrdering::TopLeft => f.write_str("top-left"),
        }
    }
}

/// Contiguous run of ring indices on one edge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub edge: Edge,
    pub indices: Range<usize>,
}

/// Deterministic `index → (x, y)` over the LED ring for one screen size
#[derive(Debug, Clone)]
pub struct PerimeterMapper {
    layout: LedLayout,
    ordering: RingOrdering,
    width: u32,
    height: u32,
    footprint_x: u32,
    footprint_y: u32,
}

impl PerimeterMapper {
    /// Fails with `InvalidLayout` when the edge bands would overlap
    pub fn new(
        layout: LedLayout,
        ordering: RingOrdering,
        width: u32,
        height: u32,
    ) -> Result<Self, MapError> {
        if layout.leds_x < 2 || layout.leds_y < 2 {
            return Err(MapError::InvalidLayout(format!(
                "need at least 2 LEDs per edge, got {}x{}",
                layout.leds_x, layout.leds_y
            )));
        }
        let footprint_x = u32::try_from(layout.leds_x)
            .map(|n| width / n)
            .unwrap_or(0);
        let footprint_y = u32::try_from(layout.leds_y)
            .map(|n| height / n)
            .unwrap_or(0);
        if footprint_x < 2 || footprint_y < 2 || width < 5 {
            return Err(MapError::InvalidLayout(format!(
                "{}x{} LEDs leave {}x{} pixel footprints on a {}x{} screen",
                layout.leds_x, layout.leds_y, footprint_x, footprint_y, width, height
            )));
        }

        Ok(Self {
            layout,
            ordering,
            width,
            height,
            footprint_x,
            footprint_y,
        })
    }

    pub fn layout(&self) -> LedLayout {
        self.layout
    }

    pub fn ordering(&self) -> RingOrdering {
        self.ordering
    }

    pub fn ring_len(&self) -> usize {
        self.layout.ring_len()
    }

    /// Pixel size of one LED's footprint
    pub fn footprint(&self) -> (u32, u32) {
        (self.footprint_x, self.footprint_y)
    }

    /// The four edges in ring order
    pub fn segments(&self) -> [Segment; 4] {
        segments(self.layout, self.ordering)
    }

    /// Sample coordinate of LED `index`
    pub fn index_to_pixel(&self, index: usize) -> Result<(u32, u32), MapError> {
        let len = self.ring_len();
        let segment = self
            .segments()
            .into_iter()
            .find(|s| s.indices.contains(&index))
            .ok_or(MapError::IndexOutOfRange { index, len })?;

        let offset = index - segment.indices.start;
        let edge_len = segment.indices.len();
        // Position counted left→right or top→bottom
        let k = match segment.edge {
            Edge::Top | Edge::Right => offset,
            Edge::Bottom | Edge::Left => edge_len - 1 - offset,
        } as u32;

        let (fx, fy) = (self.footprint_x, self.footprint_y);
        let (top_y, bottom_y) = (fy / 2, self.height - fy + fy / 2);
        let (left_x, right_x) = (fx / 2, self.width - fx + fx / 2);

        let point = match segment.edge {
            Edge::Top => (k * fx + fx / 2, top_y),
            Edge::Bottom => (k * fx + fx / 2, bottom_y),
            Edge::Left => {
                let y = k * fy + fy / 2;
                if self.is_horizontal_center(left_x, y) {
                    (left_x + 1, y)
                } else {
                    (left_x, y)
                }
            }
            Edge::Right => {
                let y = k * fy + fy / 2;
                if self.is_horizontal_center(right_x, y) {
                    (right_x - 1, y)
                } else {
                    (right_x, y)
                }
            }
        };
        Ok(point)
    }

    fn is_horizontal_center(&self, x: u32, y: u32) -> bool {
        let fx = self.footprint_x;
        let on_row = y == self.footprint_y / 2
            || y == self.height - self.footprint_y + self.footprint_y / 2;
        on_row
            && x >= fx / 2
            && (x - fx / 2) % fx == 0
            && ((x - fx / 2) / fx) < self.layout.leds_x as u32
    }

    /// Render the ring as hex triples, one line per edge in ring order
    pub fn format_ring(&self, leds: &[Rgb]) -> String {
        format_ring(self.layout, self.ordering, leds)
    }
}

/// The four edges in ring order for `layout`
pub fn segments(layout: LedLayout, ordering: RingOrdering) -> [Segment; 4] {
    let mut start = 0;
    ordering.edges().map(|edge| {
        let len = if edge.is_horizontal() {
            layout.leds_x
        } else {
            layout.leds_y
        };
        let segment = Segment {
            edge,
            indices: start..start + len,
        };
        start += len;
        segment
    })
}

/// One line per edge: `bottom  [  0.. 32) ff0000 ff0000 ...`
pub fn format_ring(layout: LedLayout, ordering: RingOrdering, leds: &[Rgb]) -> String {
    let mut out = String::new();
    for segment in segments(layout, ordering) {
        let _ = write!(
            out,
            "{:<6} [{:>4}..{:>4})",
            segment.edge.name(),
            segment.indices.start,
            segment.indices.end
        );
        for led in leds.get(segment.indices.clone()).unwrap_or_default() {
            let _ = write!(out, " {:02x}{:02x}{:02x}", led.r, led.g, led.b);
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn mapper(w: usize, h: usize, width: u32, height: u32, ordering: RingOrdering) -> PerimeterMapper {
        PerimeterMapper::new(LedLayout::new(w, h), ordering, width, height).unwrap()
    }

    #[test]
    fn test_default_ordering_corners() {
        // 64x40, 32x20 LEDs: 2x2 footprints
        let m = mapper(32, 20, 64, 40, RingOrdering::BottomRight);
        assert_eq!(m.ring_len(), 104);
        assert_eq!(m.footprint(), (2, 2));
        // Bottom-right LED first, walking left
        assert_eq!(m.index_to_pixel(0).unwrap(), (63, 39));
        assert_eq!(m.index_to_pixel(31).unwrap(), (1, 39));
        // Left edge starts at the bottom; bottom-left corner nudged inward
        assert_eq!(m.index_to_pixel(32).unwrap(), (2, 39));
        assert_eq!(m.index_to_pixel(51).unwrap(), (2, 1));
        // Top edge left→right
        assert_eq!(m.index_to_pixel(52).unwrap(), (1, 1));
        assert_eq!(m.index_to_pixel(83).unwrap(), (63, 1));
        // Right edge top→bottom, corners nudged inward
        assert_eq!(m.index_to_pixel(84).unwrap(), (62, 1));
        assert_eq!(m.index_to_pixel(85).unwrap(), (63, 3));
        assert_eq!(m.index_to_pixel(103).unwrap(), (62, 39));
    }

    #[test]
    fn test_top_left_ordering() {
        let m = mapper(32, 20, 64, 40, RingOrdering::TopLeft);
        assert_eq!(m.index_to_pixel(0).unwrap(), (1, 1));
        assert_eq!(m.index_to_pixel(31).unwrap(), (63, 1));
        assert_eq!(m.index_to_pixel(32).unwrap(), (62, 1));
        assert_eq!(m.index_to_pixel(52).unwrap(), (63, 39));
        assert_eq!(m.index_to_pixel(84).unwrap(), (2, 39));
        assert_eq!(m.index_to_pixel(103).unwrap(), (2, 1));
    }

    #[test]
    fn test_all_points_in_bounds_and_distinct() {
        let layouts = [(2, 2), (3, 2), (2, 5), (8, 4), (32, 20), (17, 9), (60, 34)];
        let screens = [(64, 40), (100, 57), (1920, 1080), (333, 201)];
        for ordering in [RingOrdering::BottomRight, RingOrdering::TopLeft] {
            for &(w, h) in &layouts {
                for &(sx, sy) in &screens {
                    let Ok(m) = PerimeterMapper::new(LedLayout::new(w, h), ordering, sx, sy) else {
                        continue;
                    };
                    let mut seen = HashSet::new();
                    for i in 0..m.ring_len() {
                        let (x, y) = m.index_to_pixel(i).unwrap();
                        assert!(x < sx && y < sy, "{w}x{h} on {sx}x{sy}: ({x}, {y})");
                        assert!(seen.insert((x, y)), "{w}x{h} on {sx}x{sy}: duplicate ({x}, {y})");
                    }
                }
            }
        }
    }

    #[test]
    fn test_smallest_valid_screen_is_injective() {
        let m = mapper(2, 2, 5, 4, RingOrdering::BottomRight);
        let points: HashSet<_> = (0..8).map(|i| m.index_to_pixel(i).unwrap()).collect();
        assert_eq!(points.len(), 8);
    }

    #[test]
    fn test_index_out_of_range() {
        let m = mapper(32, 20, 64, 40, RingOrdering::BottomRight);
        assert_eq!(
            m.index_to_pixel(104),
            Err(MapError::IndexOutOfRange {
                index: 104,
                len: 104
            })
        );
    }

    #[test]
    fn test_invalid_layouts() {
        let bad = [
            (1, 20, 64, 40),
            (32, 1, 64, 40),
            (64, 20, 64, 40),
            (32, 40, 64, 40),
            (2, 2, 4, 4),
        ];
        for (w, h, sx, sy) in bad {
            assert!(matches!(
                PerimeterMapper::new(LedLayout::new(w, h), RingOrdering::BottomRight, sx, sy),
                Err(MapError::InvalidLayout(_))
            ));
        }
    }

    #[test]
    fn test_format_ring() {
        let leds = vec![Rgb::new(0xff, 0, 0x10); 8];
        let text = format_ring(LedLayout::new(2, 2), RingOrdering::TopLeft, &leds);
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("top"));
        assert!(lines[3].starts_with("left"));
        assert!(lines[1].ends_with("ff0010 ff0010"));
    }

    #[test]
    fn test_ordering_parse() {
        assert_eq!("top-left".parse::<RingOrdering>(), Ok(RingOrdering::TopLeft));
        assert_eq!("bottom-right".parse::<RingOrdering>(), Ok(RingOrdering::BottomRight));
        assert!("clockwise".parse::<RingOrdering>().is_err());
        assert_eq!(RingOrdering::TopLeft.to_string(), "top-left");
    }
}
