//! Lazily opened positional file handles.
//!
//! An archive keeps one [`ZipReader`] and one [`ZipWriter`] on its file.
//! Neither touches the filesystem until first used, and both can be closed
//! and transparently reopened, so that merely opening an archive to list it
//! never creates or locks anything.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Read-only handle opened on first read.
#[derive(Debug)]
pub struct ZipReader {
    path: PathBuf,
    file: Option<File>,
}

impl ZipReader {
    /// Creates a reader for `path` without opening it.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            file: None,
        }
    }

    fn file(&mut self) -> io::Result<&mut File> {
        if self.file.is_none() {
            self.file = Some(File::open(&self.path)?);
        }
        self.file
            .as_mut()
            .ok_or_else(|| io::Error::other("reader handle unavailable"))
    }

    /// Reads exactly `len` bytes at `offset`.
    pub fn read_exact_at(&mut self, offset: u64, len: u64) -> io::Result<Vec<u8>> {
        let len = usize::try_from(len)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "read too large"))?;
        let file = self.file()?;
        file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; len];
        file.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Returns `true` while a handle is held.
    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    /// Releases the handle. A later read reopens it.
    pub fn close(&mut self) {
        self.file = None;
    }
}

/// Write handle opened (and created if missing) on first use.
///
/// The file is never truncated on open; the archive truncates it
/// explicitly once the footer is written.
#[derive(Debug)]
pub struct ZipWriter {
    path: PathBuf,
    file: Option<File>,
}

impl ZipWriter {
    /// Creates a writer for `path` without opening it.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            file: None,
        }
    }

    fn file(&mut self) -> io::Result<&mut File> {
        if self.file.is_none() {
            let file = OpenOptions::new()
                .create(true)
                .truncate(false)
                .write(true)
                .open(&self.path)?;
            self.file = Some(file);
        }
        self.file
            .as_mut()
            .ok_or_else(|| io::Error::other("writer handle unavailable"))
    }

    /// Moves the write position.
    pub fn set_position(&mut self, position: u64) -> io::Result<()> {
        self.file()?.seek(SeekFrom::Start(position))?;
        Ok(())
    }

    /// Writes `buf` at `position`, leaving the current position unchanged.
    pub fn write_all_at(&mut self, buf: &[u8], position: u64) -> io::Result<()> {
        let file = self.file()?;
        let saved = file.stream_position()?;
        file.seek(SeekFrom::Start(position))?;
        file.write_all(buf)?;
        file.seek(SeekFrom::Start(saved))?;
        Ok(())
    }

    /// Copies `len` bytes starting at `offset` of `src` to the current
    /// position.
    pub fn transfer_from(&mut self, src: &mut File, offset: u64, len: u64) -> io::Result<()> {
        src.seek(SeekFrom::Start(offset))?;
        let copied = io::copy(&mut src.take(len), self.file()?)?;
        if copied != len {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("source ended after {} of {} bytes", copied, len),
            ));
        }
        Ok(())
    }

    /// Sets the file length.
    pub fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.file()?.set_len(len)
    }

    /// Returns `true` while a handle is held.
    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    /// Flushes and releases the handle. A later write reopens it.
    pub fn close(&mut self) -> io::Result<()> {
        match self.file.take() {
            Some(mut file) => file.flush(),
            None => Ok(()),
        }
    }
}

impl Write for ZipWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}
