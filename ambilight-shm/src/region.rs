//! Named POSIX shared memory object mapped read-write

use std::ffi::CString;
use std::fs::{File, Permissions};
use std::io;
use std::os::fd::{FromRawFd, IntoRawFd};
use std::os::unix::fs::PermissionsExt;

use memmap2::MmapMut;
use tracing::debug;

use crate::error::ChannelError;

/// A mapped `shm_open` object
pub struct SharedRegion {
    name: CString,
    file: File,
    map: MmapMut,
}

impl SharedRegion {
    /// Create a new object of exactly `size` bytes with permission `mode`.
    ///
    /// Fails if the name already exists; callers unlink stale objects first.
    pub fn create(name: CString, size: usize, mode: u32) -> Result<Self, ChannelError> {
        let create_err = |source: io::Error| ChannelError::Create {
            what: "shared memory",
            name: name.to_string_lossy().into_owned(),
            source,
        };

        let file = shm_open(&name, libc::O_RDWR | libc::O_CREAT | libc::O_EXCL, mode)
            .map_err(create_err)?;
        // umask may have narrowed the mode passed to shm_open
        file.set_permissions(Permissions::from_mode(mode))
            .map_err(create_err)?;
        file.set_len(size as u64).map_err(create_err)?;

        // SAFETY: the object was just created by us at this size; other
        // processes only ever access it through the channel semaphore.
        let map = unsafe { MmapMut::map_mut(&file) }.map_err(ChannelError::Map)?;
        debug!("Created shared memory {:?} ({} bytes)", name, size);

        Ok(Self { name, file, map })
    }

    /// Open an existing object and check it has exactly `expected_size` bytes
    pub fn open(name: CString, expected_size: usize) -> Result<Self, ChannelError> {
        let file = shm_open(&name, libc::O_RDWR, 0).map_err(|source| ChannelError::Open {
            what: "shared memory",
            name: name.to_string_lossy().into_owned(),
            source,
        })?;

        let actual = file.metadata().map_err(ChannelError::Map)?.len() as usize;
        if actual != expected_size {
            return Err(ChannelError::SizeMismatch {
                expected: expected_size,
                actual,
            });
        }

        // SAFETY: size verified above; concurrent access is coordinated by
        // the channel semaphore.
        let map = unsafe { MmapMut::map_mut(&file) }.map_err(ChannelError::Map)?;
        Ok(Self { name, file, map })
    }

    /// Remove an object name. A missing name is not an error.
    pub fn unlink(name: &CString) -> io::Result<()> {
        // SAFETY: `name` is a valid NUL-terminated string.
        if unsafe { libc::shm_unlink(name.as_ptr()) } != 0 {
            let err = io::Error::last_os_error();
            if err.raw_os_error() != Some(libc::ENOENT) {
                return Err(err);
            }
        }
        Ok(())
    }

    pub fn bytes(&self) -> &[u8] {
        &self.map
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.map
    }

    /// Unmap and close the descriptor, reporting a failed close
    pub fn close(self) -> Result<(), ChannelError> {
        let Self { name, file, map } = self;
        drop(map);
        let fd = file.into_raw_fd();
        // SAFETY: `fd` was released from the `File` above and is closed once.
        if unsafe { libc::close(fd) } != 0 {
            return Err(ChannelError::Teardown {
                step: "close shared memory",
                source: io::Error::last_os_error(),
            });
        }
        debug!("Closed shared memory {:?}", name);
        Ok(())
    }
}

fn shm_open(name: &CString, oflag: libc::c_int, mode: u32) -> io::Result<File> {
    // SAFETY: `name` is a valid NUL-terminated string.
    let fd = unsafe { libc::shm_open(name.as_ptr(), oflag, mode as libc::mode_t) };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: `fd` is a freshly opened descriptor owned by nobody else.
    Ok(unsafe { File::from_raw_fd(fd) })
}
