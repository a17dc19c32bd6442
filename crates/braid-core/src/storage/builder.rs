//! Builder for creating and preallocating the output file.

use std::fs::File;
use std::io;
use std::path::Path;

use super::writer::SharedFile;
#[cfg(unix)]
use std::os::unix::io::AsRawFd;

/// Builder for the destination file. Call `preallocate` (optional) then `build`
/// to get a [`SharedFile`] that supports concurrent `write_at`.
pub struct OutputFileBuilder {
    file: File,
}

impl OutputFileBuilder {
    /// Create the destination file, truncating it if it already exists.
    /// Opened read+write so the caller can inspect the result afterwards.
    pub fn create(path: &Path) -> io::Result<Self> {
        let file = File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(Self { file })
    }

    /// Preallocate `size` bytes. On Unix tries `posix_fallocate` first; falls
    /// back to `set_len` on failure or non-Unix.
    pub fn preallocate(&mut self, size: u64) -> io::Result<()> {
        if size == 0 {
            return Ok(());
        }
        #[cfg(unix)]
        {
            let fd = self.file.as_raw_fd();
            let r = unsafe { libc::posix_fallocate(fd, 0, size as libc::off_t) };
            if r == 0 {
                return Ok(());
            }
            tracing::debug!(errno = r, "posix_fallocate failed, falling back to set_len");
        }
        self.file.set_len(size)
    }

    /// Finish building and return a handle that can be shared across workers.
    pub fn build(self) -> SharedFile {
        SharedFile::from_file(self.file)
    }
}
