//! Concurrent positioned writer for the output file.

use std::fs::File;
use std::io;
use std::sync::Arc;
#[cfg(not(unix))]
use std::sync::Mutex;
#[cfg(unix)]
use std::os::unix::fs::FileExt;

/// Shared handle to the output file. Clones refer to the same file; each
/// `write_at` is independent of any file cursor.
#[derive(Debug, Clone)]
pub struct SharedFile {
    file: Arc<File>,
    /// Serializes seek+write where there is no pwrite.
    #[cfg(not(unix))]
    write_lock: Arc<Mutex<()>>,
}

impl SharedFile {
    pub(crate) fn from_file(file: File) -> Self {
        Self {
            file: Arc::new(file),
            #[cfg(not(unix))]
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Write all of `data` at `offset` in a single call. A short write is an
    /// error: the caller cannot tell which bytes landed.
    #[cfg(unix)]
    pub fn write_at(&self, offset: u64, data: &[u8]) -> io::Result<()> {
        let n = self.file.write_at(data, offset)?;
        check_full_write(n, data.len())
    }

    #[cfg(not(unix))]
    pub fn write_at(&self, offset: u64, data: &[u8]) -> io::Result<()> {
        use std::io::{Seek, SeekFrom, Write};
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut f: &File = &self.file;
        f.seek(SeekFrom::Start(offset))?;
        let n = f.write(data)?;
        check_full_write(n, data.len())
    }

    /// Recover the owned file once every worker clone has been dropped.
    /// Falls back to duplicating the descriptor if a clone is still alive.
    pub fn into_file(self) -> io::Result<File> {
        match Arc::try_unwrap(self.file) {
            Ok(file) => Ok(file),
            Err(shared) => shared.try_clone(),
        }
    }
}

fn check_full_write(written: usize, expected: usize) -> io::Result<()> {
    if written != expected {
        return Err(io::Error::new(
            io::ErrorKind::WriteZero,
            format!("short write: {} of {} bytes", written, expected),
        ));
    }
    Ok(())
}
