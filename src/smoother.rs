//! Exponential smoothing of the LED ring over wall-clock time.
//!
//! Each tick blends the new sample into the stored color with weight
//! `w = 1 - exp(-dt / tau)`, so the result does not depend on how regular
//! the tick timer is.

use std::time::{Duration, Instant};

use crate::color::Color;

/// Per-LED smoothed colors
#[derive(Debug, Clone)]
pub struct Smoother {
    state: Vec<Color<f32>>,
    decay_secs: f32,
    previous: Instant,
    weight: f32,
}

impl Smoother {
    /// `len` LEDs starting transparent black. `decay_secs` (τ) must be finite
    /// and positive; the config layer rejects anything else.
    pub fn new(len: usize, decay_secs: f32) -> Self {
        Self::starting_at(len, decay_secs, Instant::now())
    }

    /// Like `new`, with the first tick measured from `start`
    pub fn starting_at(len: usize, decay_secs: f32, start: Instant) -> Self {
        Self {
            state: vec![Color::TRANSPARENT; len],
            decay_secs,
            previous: start,
            weight: 0.0,
        }
    }

    /// Compute this tick's blend weight from the time since the last tick
    pub fn begin_tick(&mut self, now: Instant) -> f32 {
        let elapsed = now.saturating_duration_since(self.previous);
        self.previous = now;
        self.set_weight(elapsed)
    }

    /// Compute this tick's blend weight from an explicit elapsed time
    pub fn begin_tick_elapsed(&mut self, elapsed: Duration) -> f32 {
        self.previous += elapsed;
        self.set_weight(elapsed)
    }

    fn set_weight(&mut self, elapsed: Duration) -> f32 {
        self.weight = 1.0 - (-elapsed.as_secs_f32() / self.decay_secs).exp();
        self.weight
    }

    /// Blend `raw` into LED `index` with the current tick's weight
    pub fn blend(&mut self, index: usize, raw: Color<f32>) -> Color<f32> {
        let next = self.state[index].blend(raw, self.weight);
        self.state[index] = next;
        next
    }

    pub fn weight(&self) -> f32 {
        self.weight
    }

    pub fn state(&self) -> &[Color<f32>] {
        &self.state
    }

    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Color<f32> = Color::new(255.0, 0.0, 0.0, 255.0);

    #[test]
    fn test_one_time_constant() {
        let mut s = Smoother::new(1, 0.05);
        let w = s.begin_tick_elapsed(Duration::from_millis(50));
        assert!((w - (1.0 - (-1.0f32).exp())).abs() < 1e-6);
        let c = s.blend(0, RED);
        assert!((c.r - 161.19).abs() < 0.01, "got {}", c.r);
        s.begin_tick_elapsed(Duration::from_millis(50));
        let c = s.blend(0, RED);
        assert!((c.r - 220.49).abs() < 0.01, "got {}", c.r);
    }

    #[test]
    fn test_zero_elapsed_keeps_value() {
        let mut s = Smoother::new(2, 0.05);
        s.begin_tick_elapsed(Duration::from_millis(50));
        let before = s.blend(1, RED);
        assert_eq!(s.begin_tick_elapsed(Duration::ZERO), 0.0);
        assert_eq!(s.blend(1, Color::TRANSPARENT), before);
    }

    #[test]
    fn test_converges() {
        let mut s = Smoother::new(1, 0.05);
        let mut c = Color::TRANSPARENT;
        for _ in 0..20 {
            s.begin_tick_elapsed(Duration::from_millis(50));
            c = s.blend(0, RED);
        }
        assert!((255.0 - c.r).abs() < 1.0);
        assert!(c.g.abs() < 1.0);
    }

    #[test]
    fn test_long_gap_jumps_to_sample() {
        let mut s = Smoother::new(1, 0.05);
        assert!(s.begin_tick_elapsed(Duration::from_secs(10)) > 0.999_999);
        assert!((s.blend(0, RED).r - 255.0).abs() < 1e-3);
    }

    #[test]
    fn test_begin_tick_measures_from_start() {
        let start = Instant::now();
        let mut s = Smoother::starting_at(1, 0.05, start);
        let w = s.begin_tick(start + Duration::from_millis(50));
        assert!((w - 0.632_12).abs() < 1e-4);
        // Same instant again: no time passed
        assert_eq!(s.begin_tick(start + Duration::from_millis(50)), 0.0);
    }

    #[test]
    fn test_blend_stays_in_range() {
        let mut s = Smoother::new(1, 0.05);
        s.begin_tick_elapsed(Duration::from_secs(1));
        let c = s.blend(0, Color::new(400.0, -5.0, 0.0, 255.0));
        assert_eq!(c, Color::new(255.0, 0.0, 0.0, 255.0));
    }
}
