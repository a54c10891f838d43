//! Named POSIX semaphore used as the channel's binary lock

use std::ffi::CString;
use std::io;
use std::time::Duration;

use tracing::debug;

use crate::error::ChannelError;

/// A named semaphore handle (`sem_open`), closed on drop
pub struct NamedSemaphore {
    sem: *mut libc::sem_t,
    name: CString,
}

// SAFETY: POSIX semaphores may be used from any thread; the handle is only
// closed once, in `Drop`.
unsafe impl Send for NamedSemaphore {}

impl NamedSemaphore {
    /// Create a fresh semaphore with initial value 1.
    ///
    /// Fails if one with the same name already exists; callers unlink stale
    /// objects first.
    pub fn create(name: CString, mode: libc::mode_t) -> Result<Self, ChannelError> {
        // SAFETY: `name` is a valid NUL-terminated string; the variadic
        // arguments are the mode and initial value required with O_CREAT.
        let sem = unsafe {
            libc::sem_open(
                name.as_ptr(),
                libc::O_CREAT | libc::O_EXCL,
                mode as libc::c_uint,
                1 as libc::c_uint,
            )
        };
        if sem == libc::SEM_FAILED {
            return Err(ChannelError::Create {
                what: "semaphore",
                name: name.to_string_lossy().into_owned(),
                source: io::Error::last_os_error(),
            });
        }
        debug!("Created semaphore {:?}", name);
        Ok(Self { sem, name })
    }

    /// Open an existing semaphore; never creates one
    pub fn open(name: CString) -> Result<Self, ChannelError> {
        // SAFETY: `name` is a valid NUL-terminated string.
        let sem = unsafe { libc::sem_open(name.as_ptr(), 0) };
        if sem == libc::SEM_FAILED {
            return Err(ChannelError::Open {
                what: "semaphore",
                name: name.to_string_lossy().into_owned(),
                source: io::Error::last_os_error(),
            });
        }
        Ok(Self { sem, name })
    }

    /// Remove a semaphore name. A missing name is not an error.
    pub fn unlink(name: &CString) -> io::Result<()> {
        // SAFETY: `name` is a valid NUL-terminated string.
        if unsafe { libc::sem_unlink(name.as_ptr()) } != 0 {
            let err = io::Error::last_os_error();
            if err.raw_os_error() != Some(libc::ENOENT) {
                return Err(err);
            }
        }
        Ok(())
    }

    /// Acquire the semaphore.
    ///
    /// With a timeout the wait is bounded and fails with `LockTimeout`;
    /// without one it blocks until the semaphore is posted.
    pub fn lock(&self, timeout: Option<Duration>) -> Result<SemaphoreGuard<'_>, ChannelError> {
        match timeout {
            Some(timeout) => self.timed_wait(timeout)?,
            None => self.wait()?,
        }
        Ok(SemaphoreGuard { sem: self })
    }

    fn wait(&self) -> Result<(), ChannelError> {
        loop {
            // SAFETY: `self.sem` is a live handle from `sem_open`.
            if unsafe { libc::sem_wait(self.sem) } == 0 {
                return Ok(());
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(ChannelError::Semaphore(err));
            }
        }
    }

    fn timed_wait(&self, timeout: Duration) -> Result<(), ChannelError> {
        let deadline = realtime_deadline(timeout)?;
        loop {
            // SAFETY: `self.sem` is live and `deadline` is a valid timespec.
            if unsafe { libc::sem_timedwait(self.sem, &deadline) } == 0 {
                return Ok(());
            }
            let err = io::Error::last_os_error();
            match err.raw_os_error() {
                Some(libc::EINTR) => continue,
                Some(libc::ETIMEDOUT) => {
                    return Err(ChannelError::LockTimeout(timeout.as_millis() as u64))
                }
                _ => return Err(ChannelError::Semaphore(err)),
            }
        }
    }

    fn post(&self) -> io::Result<()> {
        // SAFETY: `self.sem` is a live handle from `sem_open`.
        if unsafe { libc::sem_post(self.sem) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    /// Close the handle, reporting failure (drop closes silently)
    pub fn close(mut self) -> io::Result<()> {
        let sem = std::mem::replace(&mut self.sem, std::ptr::null_mut());
        // SAFETY: the handle is live; nulling the field keeps `Drop` from
        // closing it a second time.
        if unsafe { libc::sem_close(sem) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

impl Drop for NamedSemaphore {
    fn drop(&mut self) {
        if self.sem.is_null() {
            return;
        }
        // SAFETY: a non-null handle is still open.
        unsafe {
            libc::sem_close(self.sem);
        }
    }
}

/// Held critical section; posts the semaphore when dropped
pub struct SemaphoreGuard<'a> {
    sem: &'a NamedSemaphore,
}

impl Drop for SemaphoreGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.sem.post() {
            tracing::error!("sem_post on {:?} failed: {}", self.sem.name, e);
        }
    }
}

/// Absolute CLOCK_REALTIME deadline `timeout` from now, as `sem_timedwait` wants
fn realtime_deadline(timeout: Duration) -> Result<libc::timespec, ChannelError> {
    let mut now = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    // SAFETY: `now` is a valid out-pointer.
    if unsafe { libc::clock_gettime(libc::CLOCK_REALTIME, &mut now) } != 0 {
        return Err(ChannelError::Semaphore(io::Error::last_os_error()));
    }
    let mut nsec = now.tv_nsec as i64 + i64::from(timeout.subsec_nanos());
    let mut sec = now.tv_sec as i64 + timeout.as_secs() as i64;
    if nsec >= 1_000_000_000 {
        sec += 1;
        nsec -= 1_000_000_000;
    }
    Ok(libc::timespec {
        tv_sec: sec as libc::time_t,
        tv_nsec: nsec as _,
    })
}
