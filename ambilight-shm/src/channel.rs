//! The producer/consumer channel: one shared region plus one named semaphore.
//!
//! The producer `create`s the channel at startup and `teardown`s it on
//! shutdown. Consumers and the intensity control path `open` it and `close`
//! their handles without unlinking anything.

use std::ffi::CString;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::ChannelError;
use crate::layout::{clamp_intensity, PayloadLayout, Rgb, DEFAULT_INTENSITY, INTENSITY_MAX};
use crate::region::SharedRegion;
use crate::semaphore::NamedSemaphore;

/// Well-known shared memory name
pub const DEFAULT_SHM_NAME: &str = "/shm_leds";
/// Well-known semaphore name
pub const DEFAULT_SEM_NAME: &str = "/sem_leds";
/// World read/write so the LED driver can run as another user
pub const DEFAULT_MODE: u32 = 0o666;
/// Longest the producer waits for the lock before skipping a publish
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(20);

/// Names, size and locking policy of a channel
#[derive(Debug, Clone)]
pub struct ChannelSpec {
    pub shm_name: String,
    pub sem_name: String,
    pub layout: PayloadLayout,
    pub mode: u32,
    /// `None` waits for the lock indefinitely
    pub lock_timeout: Option<Duration>,
}

impl ChannelSpec {
    /// Spec for `led_count` LEDs with the well-known names and an intensity field
    pub fn new(led_count: usize) -> Self {
        Self {
            shm_name: DEFAULT_SHM_NAME.to_string(),
            sem_name: DEFAULT_SEM_NAME.to_string(),
            layout: PayloadLayout::new(led_count, true),
            mode: DEFAULT_MODE,
            lock_timeout: Some(DEFAULT_LOCK_TIMEOUT),
        }
    }

    pub fn with_names(mut self, shm_name: impl Into<String>, sem_name: impl Into<String>) -> Self {
        self.shm_name = shm_name.into();
        self.sem_name = sem_name.into();
        self
    }

    pub fn with_intensity(mut self, enabled: bool) -> Self {
        self.layout = PayloadLayout::new(self.layout.led_count(), enabled);
        self
    }

    pub fn with_lock_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.lock_timeout = timeout;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    /// Created the objects; responsible for unlinking them
    Owner,
    /// Opened existing objects
    Attached,
}

struct Endpoint {
    region: SharedRegion,
    sem: NamedSemaphore,
}

/// Handle to an open channel
pub struct SharedChannel {
    endpoint: Option<Endpoint>,
    layout: PayloadLayout,
    lock_timeout: Option<Duration>,
    role: Role,
    shm_name: CString,
    sem_name: CString,
}

impl SharedChannel {
    /// Create the channel as its producer.
    ///
    /// Leftovers from a crashed previous run are unlinked first so creation
    /// always starts clean. The intensity field, when present, is set to
    /// `DEFAULT_INTENSITY`.
    pub fn create(spec: &ChannelSpec) -> Result<Self, ChannelError> {
        let shm_name = object_name(&spec.shm_name)?;
        let sem_name = object_name(&spec.sem_name)?;

        if let Err(e) = SharedRegion::unlink(&shm_name) {
            warn!("Could not unlink stale shared memory {}: {}", spec.shm_name, e);
        }
        if let Err(e) = NamedSemaphore::unlink(&sem_name) {
            warn!("Could not unlink stale semaphore {}: {}", spec.sem_name, e);
        }

        let mut region = SharedRegion::create(shm_name.clone(), spec.layout.size(), spec.mode)?;
        if spec.layout.has_intensity() {
            spec.layout
                .write_intensity(region.bytes_mut(), DEFAULT_INTENSITY)?;
        }

        let sem = match NamedSemaphore::create(sem_name.clone(), spec.mode as libc::mode_t) {
            Ok(sem) => sem,
            Err(e) => {
                // Do not leave a half-created channel behind
                let _ = region.close();
                let _ = SharedRegion::unlink(&shm_name);
                return Err(e);
            }
        };

        info!(
            "Created channel {} + {} ({} LEDs, {} bytes)",
            spec.shm_name,
            spec.sem_name,
            spec.layout.led_count(),
            spec.layout.size()
        );

        Ok(Self {
            endpoint: Some(Endpoint { region, sem }),
            layout: spec.layout,
            lock_timeout: spec.lock_timeout,
            role: Role::Owner,
            shm_name,
            sem_name,
        })
    }

    /// Attach to a channel some producer already created
    pub fn open(spec: &ChannelSpec) -> Result<Self, ChannelError> {
        let shm_name = object_name(&spec.shm_name)?;
        let sem_name = object_name(&spec.sem_name)?;

        let region = SharedRegion::open(shm_name.clone(), spec.layout.size())?;
        let sem = NamedSemaphore::open(sem_name.clone())?;
        debug!("Attached to channel {} + {}", spec.shm_name, spec.sem_name);

        Ok(Self {
            endpoint: Some(Endpoint { region, sem }),
            layout: spec.layout,
            lock_timeout: spec.lock_timeout,
            role: Role::Attached,
            shm_name,
            sem_name,
        })
    }

    pub fn layout(&self) -> PayloadLayout {
        self.layout
    }

    pub fn led_count(&self) -> usize {
        self.layout.led_count()
    }

    /// Write the LED ring. Only the LED byte range is touched.
    pub fn publish(&mut self, leds: &[Rgb]) -> Result<(), ChannelError> {
        if leds.len() != self.layout.led_count() {
            return Err(ChannelError::LengthMismatch {
                expected: self.layout.led_count(),
                actual: leds.len(),
            });
        }
        let layout = self.layout;
        let timeout = self.lock_timeout;
        let Endpoint { region, sem } = self.endpoint_mut();
        let _guard = sem.lock(timeout)?;
        layout.write_leds(region.bytes_mut(), leds)
    }

    /// Snapshot of the LED ring
    pub fn read_leds(&self) -> Result<Vec<Rgb>, ChannelError> {
        let endpoint = self.endpoint();
        let _guard = endpoint.sem.lock(self.lock_timeout)?;
        Ok(self.layout.read_leds(endpoint.region.bytes()))
    }

    /// Run `f` over the raw payload while holding the lock
    pub fn with_lock<R>(&self, f: impl FnOnce(&[u8]) -> R) -> Result<R, ChannelError> {
        let endpoint = self.endpoint();
        let _guard = endpoint.sem.lock(self.lock_timeout)?;
        Ok(f(endpoint.region.bytes()))
    }

    pub fn read_intensity(&self) -> Result<u16, ChannelError> {
        let endpoint = self.endpoint();
        let _guard = endpoint.sem.lock(self.lock_timeout)?;
        self.layout.read_intensity(endpoint.region.bytes())
    }

    /// Read-modify-write the intensity by `delta`, clamped to 0..=100
    pub fn adjust_intensity(&mut self, delta: i32) -> Result<u16, ChannelError> {
        self.update_intensity(|current| clamp_intensity(current, delta))
    }

    /// Store an absolute intensity, clamped to 0..=100
    pub fn set_intensity(&mut self, value: u16) -> Result<u16, ChannelError> {
        self.update_intensity(|_| value.min(INTENSITY_MAX))
    }

    fn update_intensity(&mut self, f: impl FnOnce(u16) -> u16) -> Result<u16, ChannelError> {
        let layout = self.layout;
        let timeout = self.lock_timeout;
        let Endpoint { region, sem } = self.endpoint_mut();
        let _guard = sem.lock(timeout)?;
        let next = f(layout.read_intensity(region.bytes())?);
        layout.write_intensity(region.bytes_mut(), next)?;
        Ok(next)
    }

    /// Release and unlink both objects. Every step is attempted; the first
    /// failure is returned.
    pub fn teardown(mut self) -> Result<(), ChannelError> {
        let result = self.release(true);
        if result.is_ok() {
            info!("Channel {:?} torn down", self.shm_name);
        }
        result
    }

    /// Release this process's handles without unlinking anything
    pub fn close(mut self) -> Result<(), ChannelError> {
        self.release(false)
    }

    fn release(&mut self, unlink: bool) -> Result<(), ChannelError> {
        let Some(Endpoint { region, sem }) = self.endpoint.take() else {
            return Ok(());
        };

        let mut first_err: Option<ChannelError> = None;
        let mut record = |e: ChannelError| {
            warn!("{}", e);
            first_err.get_or_insert(e);
        };

        if let Err(e) = region.close() {
            record(e);
        }
        if unlink {
            if let Err(source) = SharedRegion::unlink(&self.shm_name) {
                record(ChannelError::Teardown {
                    step: "unlink shared memory",
                    source,
                });
            }
        }
        if let Err(source) = sem.close() {
            record(ChannelError::Teardown {
                step: "close semaphore",
                source,
            });
        }
        if unlink {
            if let Err(source) = NamedSemaphore::unlink(&self.sem_name) {
                record(ChannelError::Teardown {
                    step: "unlink semaphore",
                    source,
                });
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn endpoint(&self) -> &Endpoint {
        self.endpoint
            .as_ref()
            .expect("endpoint is present until the channel is consumed")
    }

    fn endpoint_mut(&mut self) -> &mut Endpoint {
        self.endpoint
            .as_mut()
            .expect("endpoint is present until the channel is consumed")
    }
}

impl Drop for SharedChannel {
    fn drop(&mut self) {
        if self.endpoint.is_none() {
            return;
        }
        let unlink = self.role == Role::Owner;
        if unlink {
            warn!(
                "Channel {:?} dropped without teardown; releasing it now",
                self.shm_name
            );
        }
        let _ = self.release(unlink);
    }
}

/// Validate a POSIX IPC object name (`/name`, no further slashes)
fn object_name(name: &str) -> Result<CString, ChannelError> {
    let valid = name.len() > 1 && name.starts_with('/') && !name[1..].contains('/');
    if !valid {
        return Err(ChannelError::InvalidName(name.to_string()));
    }
    CString::new(name).map_err(|_| ChannelError::InvalidName(name.to_string()))
}
