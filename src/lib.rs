//! Screen-perimeter ambient light producer
//!
//! Captures the screen, reduces it to a ring of LED colors around the
//! border, smooths them over time and publishes them through the
//! `ambilight-shm` shared memory channel for an LED driver to pick up.

pub mod color;
pub mod config;
pub mod error;
pub mod frame;
pub mod perimeter;
pub mod pipeline;
pub mod sampler;
pub mod scheduler;
pub mod smoother;

#[cfg(feature = "screen-capture")]
pub mod screen_capture;

pub use color::Color;
pub use config::AmbilightConfig;
pub use error::{CaptureError, ConfigError, MapError, SampleError, TickError};
pub use perimeter::{LedLayout, PerimeterMapper, RingOrdering};
pub use pipeline::{MemorySink, Pipeline, PipelineOptions, Publisher};
pub use scheduler::{Scheduler, SchedulerState, TickTask};
pub use smoother::Smoother;
