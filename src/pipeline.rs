//! One tick of the producer: refresh → map → sample → smooth → quantize →
//! publish.

use std::time::{Duration, Instant};

use ambilight_shm::{ChannelError, Rgb, SharedChannel};
use tracing::trace;

use crate::color::Color;
use crate::error::TickError;
use crate::frame::FrameSource;
use crate::perimeter::PerimeterMapper;
use crate::sampler::sample;
use crate::scheduler::TickTask;
use crate::smoother::Smoother;

/// Destination of the per-tick LED ring
pub trait Publisher {
    fn publish(&mut self, leds: &[Rgb]) -> Result<(), ChannelError>;
}

impl Publisher for SharedChannel {
    fn publish(&mut self, leds: &[Rgb]) -> Result<(), ChannelError> {
        SharedChannel::publish(self, leds)
    }
}

/// In-process publisher keeping the last ring, for tests and dry runs
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub last: Vec<Rgb>,
    pub published: u64,
}

impl Publisher for MemorySink {
    fn publish(&mut self, leds: &[Rgb]) -> Result<(), ChannelError> {
        self.last.clear();
        self.last.extend_from_slice(leds);
        self.published += 1;
        Ok(())
    }
}

/// Pipeline tuning
#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    /// Decay time constant in seconds; `None` publishes raw samples
    pub decay_secs: Option<f32>,
    /// Channels quantized below this are published as 0
    pub noise_floor: u8,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            decay_secs: Some(0.05),
            noise_floor: 0,
        }
    }
}

/// The producer's per-tick work
pub struct Pipeline<P> {
    frame: Box<dyn FrameSource>,
    mapper: PerimeterMapper,
    smoother: Option<Smoother>,
    noise_floor: u8,
    raw: Vec<Color<f32>>,
    snapshot: Vec<Rgb>,
    publisher: P,
}

impl<P: Publisher> Pipeline<P> {
    pub fn new(
        frame: Box<dyn FrameSource>,
        mapper: PerimeterMapper,
        options: PipelineOptions,
        publisher: P,
    ) -> Self {
        let len = mapper.ring_len();
        Self {
            frame,
            smoother: options.decay_secs.map(|tau| Smoother::new(len, tau)),
            mapper,
            noise_floor: options.noise_floor,
            raw: vec![Color::TRANSPARENT; len],
            snapshot: vec![Rgb::BLACK; len],
            publisher,
        }
    }

    /// Tick with the smoother measuring time up to `now`
    pub fn tick_at(&mut self, now: Instant) -> Result<(), TickError> {
        self.frame.refresh()?;
        self.sample_ring()?;
        if let Some(smoother) = &mut self.smoother {
            smoother.begin_tick(now);
        }
        self.commit()
    }

    /// Tick with an explicit elapsed time since the previous tick
    pub fn tick_after(&mut self, elapsed: Duration) -> Result<(), TickError> {
        self.frame.refresh()?;
        self.sample_ring()?;
        if let Some(smoother) = &mut self.smoother {
            smoother.begin_tick_elapsed(elapsed);
        }
        self.commit()
    }

    /// Sample every LED into `raw`. Nothing else changes, so a failure at
    /// any index leaves the smoother and snapshot as they were.
    fn sample_ring(&mut self) -> Result<(), TickError> {
        let (fx, fy) = self.mapper.footprint();
        for (i, slot) in self.raw.iter_mut().enumerate() {
            let (x, y) = self.mapper.index_to_pixel(i)?;
            *slot = sample(self.frame.as_ref(), x, y, fx, fy)?.color;
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<(), TickError> {
        for (i, &raw) in self.raw.iter().enumerate() {
            let color: Color<f32> = match &mut self.smoother {
                Some(smoother) => smoother.blend(i, raw),
                None => raw,
            };
            self.snapshot[i] = color.quantize(self.noise_floor);
        }

        self.publisher.publish(&self.snapshot)?;
        trace!("Published ring:\n{}", self.mapper.format_ring(&self.snapshot));
        Ok(())
    }

    /// Last quantized ring (published or not)
    pub fn snapshot(&self) -> &[Rgb] {
        &self.snapshot
    }

    pub fn mapper(&self) -> &PerimeterMapper {
        &self.mapper
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    /// Hand the publisher back, e.g. to tear the channel down
    pub fn into_publisher(self) -> P {
        self.publisher
    }
}

impl<P: Publisher> TickTask for Pipeline<P> {
    fn name(&self) -> &str {
        "ambilight pipeline"
    }

    fn execute(&mut self) -> Result<(), TickError> {
        self.tick_at(Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    use crate::error::{CaptureError, SampleError};
    use crate::frame::{FullFrame, SyntheticGrabber};
    use crate::perimeter::{LedLayout, RingOrdering};

    /// Full frame whose left half stops answering while `broken` is set
    struct HalfBroken {
        inner: FullFrame<SyntheticGrabber>,
        broken: Rc<Cell<bool>>,
    }

    impl FrameSource for HalfBroken {
        fn refresh(&mut self) -> Result<(), CaptureError> {
            self.inner.refresh()
        }

        fn width(&self) -> u32 {
            self.inner.width()
        }

        fn height(&self) -> u32 {
            self.inner.height()
        }

        fn pixel(&self, x: u32, y: u32) -> Result<u32, CaptureError> {
            if self.broken.get() && x < self.inner.width() / 2 {
                return Err(CaptureError::OutsideEdges { x, y });
            }
            self.inner.pixel(x, y)
        }
    }

    fn pipeline(color: Rgb, options: PipelineOptions) -> Pipeline<MemorySink> {
        let frame = FullFrame::new(SyntheticGrabber::solid(64, 40, color));
        let mapper =
            PerimeterMapper::new(LedLayout::new(32, 20), RingOrdering::BottomRight, 64, 40)
                .unwrap();
        Pipeline::new(Box::new(frame), mapper, options, MemorySink::default())
    }

    #[test]
    fn test_raw_mode_publishes_sample() {
        let options = PipelineOptions {
            decay_secs: None,
            noise_floor: 0,
        };
        let mut p = pipeline(Rgb::new(0, 128, 255), options);
        p.tick_after(Duration::from_millis(50)).unwrap();
        assert_eq!(p.publisher().published, 1);
        assert!(p.publisher().last.iter().all(|&c| c == Rgb::new(0, 128, 255)));
    }

    #[test]
    fn test_noise_floor_applied() {
        let options = PipelineOptions {
            decay_secs: None,
            noise_floor: 16,
        };
        let mut p = pipeline(Rgb::new(8, 16, 200), options);
        p.tick_after(Duration::from_millis(50)).unwrap();
        assert!(p.snapshot().iter().all(|&c| c == Rgb::new(0, 16, 200)));
    }

    #[test]
    fn test_zero_elapsed_publishes_black() {
        let mut p = pipeline(Rgb::new(255, 255, 255), PipelineOptions::default());
        p.tick_after(Duration::ZERO).unwrap();
        assert!(p.snapshot().iter().all(|&c| c == Rgb::BLACK));
    }

    #[test]
    fn test_failed_sample_leaves_smoother_untouched() {
        let broken = Rc::new(Cell::new(false));
        let frame = HalfBroken {
            inner: FullFrame::new(SyntheticGrabber::solid(64, 40, Rgb::new(255, 0, 0))),
            broken: Rc::clone(&broken),
        };
        // Index 0 is bottom-right, so the first LEDs sample fine
        let mapper =
            PerimeterMapper::new(LedLayout::new(32, 20), RingOrdering::BottomRight, 64, 40)
                .unwrap();
        let mut p = Pipeline::new(
            Box::new(frame),
            mapper,
            PipelineOptions::default(),
            MemorySink::default(),
        );

        p.tick_after(Duration::from_millis(50)).unwrap();
        let first = p.snapshot().to_vec();
        assert!(first.iter().all(|&c| c == first[0]));

        broken.set(true);
        let err = p.tick_after(Duration::from_millis(50)).unwrap_err();
        assert!(matches!(
            err,
            TickError::Sampling(SampleError::Capture(CaptureError::OutsideEdges { .. }))
        ));
        assert_eq!(p.snapshot(), first.as_slice());
        assert_eq!(p.publisher().published, 1);

        // Every LED has been blended exactly twice
        broken.set(false);
        p.tick_after(Duration::from_millis(50)).unwrap();
        let second = p.snapshot();
        assert!(second.iter().all(|&c| c == second[0]));
        assert!(second[0].r.abs_diff(220) <= 1, "got {:?}", second[0]);
    }
}
