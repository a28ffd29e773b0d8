//! Atomic file persistence.
//!
//! Bytes go to a hidden temporary file next to the destination and are
//! renamed into place only on [`AtomicFile::commit`]. Dropping an uncommitted
//! `AtomicFile` deletes the temporary file, so the destination path never
//! holds a partial download.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use super::error::{DownloadError, DownloadResult};

const TEMP_PREFIX: &str = ".jnuexam-";
const TEMP_SUFFIX: &str = ".part";

/// Buffer size for writes to the temporary file (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// A destination file that only appears once it is complete.
#[derive(Debug)]
pub struct AtomicFile {
    dest: PathBuf,
    writer: BufWriter<NamedTempFile>,
    written: u64,
}

impl AtomicFile {
    /// Create the destination's directory if needed and open a temporary file
    /// inside it.
    pub fn create(dest: &Path) -> DownloadResult<Self> {
        let parent = match dest.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        fs::create_dir_all(&parent).map_err(|e| DownloadError::filesystem(&parent, e))?;

        let temp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(TEMP_SUFFIX)
            .tempfile_in(&parent)
            .map_err(|e| DownloadError::filesystem(&parent, e))?;

        tracing::debug!(dest = %dest.display(), temp = %temp.path().display(), "opened temporary file");

        Ok(Self {
            dest: dest.to_path_buf(),
            writer: BufWriter::with_capacity(BUFFER_SIZE, temp),
            written: 0,
        })
    }

    /// Append a chunk to the temporary file.
    pub fn write_chunk(&mut self, chunk: &[u8]) -> DownloadResult<()> {
        self.writer
            .write_all(chunk)
            .map_err(|e| DownloadError::filesystem(&self.dest, e))?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    /// Bytes written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn destination(&self) -> &Path {
        &self.dest
    }

    /// Flush, sync and rename the temporary file onto the destination.
    ///
    /// An existing file at the destination is replaced.
    pub fn commit(self) -> DownloadResult<PathBuf> {
        let Self { dest, writer, .. } = self;

        let temp = writer
            .into_inner()
            .map_err(|e| DownloadError::filesystem(&dest, e.into_error()))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| DownloadError::filesystem(&dest, e))?;
        temp.persist(&dest)
            .map_err(|e| DownloadError::filesystem(&dest, e.error))?;

        Ok(dest)
    }
}
