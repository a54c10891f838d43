//! Shared memory channel for an ambient LED ring
//!
//! One producer publishes `N` RGB triples (plus an optional intensity scalar)
//! into a named POSIX shared memory object; any number of local processes
//! read them at their own pace. A named binary semaphore guards every access:
//!
//! - the producer creates both objects (`SharedChannel::create`) and unlinks
//!   them on shutdown (`SharedChannel::teardown`)
//! - LED drivers and control utilities attach with `SharedChannel::open`
//!
//! Payload layout is documented in [`layout`].

pub mod channel;
pub mod error;
pub mod layout;

mod region;
mod semaphore;

pub use channel::{
    ChannelSpec, SharedChannel, DEFAULT_LOCK_TIMEOUT, DEFAULT_MODE, DEFAULT_SEM_NAME,
    DEFAULT_SHM_NAME,
};
pub use error::ChannelError;
pub use layout::{
    clamp_intensity, PayloadLayout, Rgb, DEFAULT_INTENSITY, INTENSITY_MAX, INTENSITY_MIN,
};
