//! Channel error types

use thiserror::Error;

/// Errors that can occur while creating, using or releasing a shared channel
#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("Invalid object name {0:?}: must start with '/' and contain no other '/'")]
    InvalidName(String),

    #[error("Failed to create {what} {name}: {source}")]
    Create {
        what: &'static str,
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to open {what} {name}: {source}")]
    Open {
        what: &'static str,
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to map shared memory: {0}")]
    Map(#[source] std::io::Error),

    #[error("Semaphore error: {0}")]
    Semaphore(#[source] std::io::Error),

    #[error("Timed out after {0} ms waiting for the channel lock")]
    LockTimeout(u64),

    #[error("Shared memory size mismatch: expected {expected} bytes, found {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("LED count mismatch: channel holds {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Channel layout has no intensity field")]
    NoIntensityField,

    #[error("Teardown failed at {step}: {source}")]
    Teardown {
        step: &'static str,
        #[source]
        source: std::io::Error,
    },
}
