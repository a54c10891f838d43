//! Error types for the capture → reduce → smooth → publish pipeline

use ambilight_shm::ChannelError;
use thiserror::Error;

/// Errors from frame capture and pixel lookup
#[derive(Error, Debug)]
pub enum CaptureError {
    /// Capture transport could not be acquired or has gone away
    #[error("Screen capture unavailable: {0}")]
    Unavailable(String),

    /// No new frame within the grabber's bound
    #[error("No frame received within {0} ms")]
    Timeout(u64),

    #[error("Pixel ({x}, {y}) outside {width}x{height} frame")]
    OutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },

    /// Edge-only frame asked for an interior pixel
    #[error("Pixel ({x}, {y}) is not in a captured edge strip")]
    OutsideEdges { x: u32, y: u32 },

    /// Requested copy does not fit the latched frame or destination
    #[error("Region mismatch: {0}")]
    RegionMismatch(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Errors from the perimeter mapper
#[derive(Error, Debug, PartialEq, Eq)]
pub enum MapError {
    #[error("Invalid LED layout: {0}")]
    InvalidLayout(String),

    #[error("LED index {index} out of range (ring has {len} LEDs)")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Errors from the region sampler
#[derive(Error, Debug)]
pub enum SampleError {
    /// Window lies entirely outside the frame
    #[error("Sample window at ({cx}, {cy}) covers no frame pixels")]
    EmptyWindow { cx: u32, cy: u32 },

    #[error(transparent)]
    Capture(#[from] CaptureError),
}

/// A failed tick, naming the step that failed
#[derive(Error, Debug)]
pub enum TickError {
    #[error("capture failed: {0}")]
    Capture(#[from] CaptureError),

    #[error("mapping failed: {0}")]
    Mapping(#[from] MapError),

    #[error("sampling failed: {0}")]
    Sampling(#[from] SampleError),

    #[error("publish failed: {0}")]
    Publish(#[from] ChannelError),
}

/// Errors loading or validating the configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}
