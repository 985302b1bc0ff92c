// ─── Shared Exit Data ───
// A small named buffer the launcher creates before spawning the runtime. The
// child writes its exit text there; the launcher reads it after the child
// exits. Unix uses POSIX shared memory, other hosts a file in the temp dir.

use std::path::PathBuf;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::core::error::{LauncherError, LauncherResult};

/// Capacity of a shared buffer, terminator included.
pub const MAX_SHARED_LENGTH: usize = 16 * 1024;

/// Named cross-process text slot.
pub trait SharedDataChannel: Send {
    /// Create an empty slot and return its id.
    fn create(&mut self) -> LauncherResult<String> {
        let id = new_channel_id();
        self.write(&id, "")?;
        debug!("Created shared exit data channel {}", id);
        Ok(id)
    }

    /// Replace the slot's contents, truncated to the capacity.
    fn write(&mut self, id: &str, text: &str) -> LauncherResult<()>;

    /// Current contents; `None` when the slot is missing or empty.
    fn read(&mut self, id: &str) -> LauncherResult<Option<String>>;

    /// Remove the slot. Missing slots are not an error.
    fn destroy(&mut self, id: &str) -> LauncherResult<()>;
}

/// Short unique id. Fits the 31 byte name limit of the strictest host.
pub fn new_channel_id() -> String {
    let uuid = Uuid::new_v4().simple().to_string();
    format!("rl{}", &uuid[..20])
}

/// Longest prefix of `text` that fits the buffer with its terminator.
pub fn truncate_to_capacity(text: &str) -> &str {
    let limit = MAX_SHARED_LENGTH - 1;
    if text.len() <= limit {
        return text;
    }
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    warn!(
        "Exit data truncated from {} to {} bytes",
        text.len(),
        end
    );
    &text[..end]
}

fn validate_id(id: &str) -> LauncherResult<&str> {
    let valid = !id.is_empty()
        && id.len() <= 30
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(id)
    } else {
        Err(LauncherError::InvalidConfiguration(format!(
            "invalid shared data id '{}'",
            id
        )))
    }
}

/// Channel for the host this binary was built for.
#[cfg(unix)]
pub fn host_channel() -> Box<dyn SharedDataChannel> {
    Box::new(ShmChannel)
}

#[cfg(not(unix))]
pub fn host_channel() -> Box<dyn SharedDataChannel> {
    Box::new(TempFileChannel::default())
}

/// One file per id below a directory.
#[derive(Debug, Clone)]
pub struct TempFileChannel {
    dir: PathBuf,
}

impl TempFileChannel {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn slot(&self, id: &str) -> LauncherResult<PathBuf> {
        Ok(self.dir.join(validate_id(id)?))
    }
}

impl Default for TempFileChannel {
    fn default() -> Self {
        Self::new(std::env::temp_dir().join("runtime-launcher"))
    }
}

impl SharedDataChannel for TempFileChannel {
    fn write(&mut self, id: &str, text: &str) -> LauncherResult<()> {
        let slot = self.slot(id)?;
        std::fs::create_dir_all(&self.dir).map_err(|e| LauncherError::io(&self.dir, e))?;
        std::fs::write(&slot, truncate_to_capacity(text)).map_err(|e| LauncherError::io(&slot, e))
    }

    fn read(&mut self, id: &str) -> LauncherResult<Option<String>> {
        let slot = self.slot(id)?;
        match std::fs::read(&slot) {
            Ok(bytes) if bytes.is_empty() => Ok(None),
            Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(LauncherError::io(&slot, e)),
        }
    }

    fn destroy(&mut self, id: &str) -> LauncherResult<()> {
        let slot = self.slot(id)?;
        match std::fs::remove_file(&slot) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(LauncherError::io(&slot, e)),
        }
    }
}

#[cfg(unix)]
pub use shm::ShmChannel;

#[cfg(unix)]
mod shm {
    use std::ffi::CString;
    use std::io;
    use std::path::PathBuf;
    use std::ptr;

    use super::{truncate_to_capacity, validate_id, SharedDataChannel, MAX_SHARED_LENGTH};
    use crate::core::error::{LauncherError, LauncherResult};

    /// POSIX shared memory segment named `/<id>`.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct ShmChannel;

    fn segment_name(id: &str) -> LauncherResult<CString> {
        let id = validate_id(id)?;
        CString::new(format!("/{}", id))
            .map_err(|e| LauncherError::InvalidConfiguration(e.to_string()))
    }

    fn os_error(id: &str) -> LauncherError {
        LauncherError::io(PathBuf::from(format!("/dev/shm/{}", id)), io::Error::last_os_error())
    }

    /// Run `f` on an open descriptor, always closing it.
    fn with_fd<T>(fd: libc::c_int, f: impl FnOnce(libc::c_int) -> T) -> T {
        let result = f(fd);
        unsafe {
            libc::close(fd);
        }
        result
    }

    fn segment_size(fd: libc::c_int) -> io::Result<usize> {
        let mut stat: libc::stat = unsafe { std::mem::zeroed() };
        if unsafe { libc::fstat(fd, &mut stat) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(stat.st_size.max(0) as usize)
    }

    impl SharedDataChannel for ShmChannel {
        fn write(&mut self, id: &str, text: &str) -> LauncherResult<()> {
            let name = segment_name(id)?;
            let fd = unsafe {
                libc::shm_open(
                    name.as_ptr(),
                    libc::O_RDWR | libc::O_CREAT,
                    0o600 as libc::c_uint,
                )
            };
            if fd < 0 {
                return Err(os_error(id));
            }

            with_fd(fd, |fd| {
                // some hosts only allow sizing a segment once
                if segment_size(fd).map_err(|e| LauncherError::io(id, e))? < MAX_SHARED_LENGTH
                    && unsafe { libc::ftruncate(fd, MAX_SHARED_LENGTH as libc::off_t) } != 0
                {
                    return Err(os_error(id));
                }

                let map = unsafe {
                    libc::mmap(
                        ptr::null_mut(),
                        MAX_SHARED_LENGTH,
                        libc::PROT_READ | libc::PROT_WRITE,
                        libc::MAP_SHARED,
                        fd,
                        0,
                    )
                };
                if map == libc::MAP_FAILED {
                    return Err(os_error(id));
                }

                let bytes = truncate_to_capacity(text).as_bytes();
                unsafe {
                    let buffer = map as *mut u8;
                    ptr::copy_nonoverlapping(bytes.as_ptr(), buffer, bytes.len());
                    *buffer.add(bytes.len()) = 0;
                    libc::munmap(map, MAX_SHARED_LENGTH);
                }
                Ok(())
            })
        }

        fn read(&mut self, id: &str) -> LauncherResult<Option<String>> {
            let name = segment_name(id)?;
            let fd = unsafe { libc::shm_open(name.as_ptr(), libc::O_RDONLY, 0 as libc::c_uint) };
            if fd < 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::NotFound {
                    return Ok(None);
                }
                return Err(LauncherError::io(id, err));
            }

            with_fd(fd, |fd| {
                let size = segment_size(fd)
                    .map_err(|e| LauncherError::io(id, e))?
                    .min(MAX_SHARED_LENGTH);
                if size == 0 {
                    return Ok(None);
                }

                let map = unsafe {
                    libc::mmap(ptr::null_mut(), size, libc::PROT_READ, libc::MAP_SHARED, fd, 0)
                };
                if map == libc::MAP_FAILED {
                    return Err(os_error(id));
                }

                let text = unsafe {
                    let bytes = std::slice::from_raw_parts(map as *const u8, size);
                    let end = bytes.iter().position(|&b| b == 0).unwrap_or(size);
                    let text = String::from_utf8_lossy(&bytes[..end]).into_owned();
                    libc::munmap(map, size);
                    text
                };
                Ok((!text.is_empty()).then_some(text))
            })
        }

        fn destroy(&mut self, id: &str) -> LauncherResult<()> {
            let name = segment_name(id)?;
            if unsafe { libc::shm_unlink(name.as_ptr()) } != 0 {
                let err = io::Error::last_os_error();
                if err.kind() != io::ErrorKind::NotFound {
                    return Err(LauncherError::io(id, err));
                }
            }
            Ok(())
        }
    }
}
