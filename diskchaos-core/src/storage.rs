//! Positional file storage abstraction.
//!
//! [`StorageFile`] is the capability the chaos layer wraps: offset-addressed
//! reads and writes plus truncate, sync and size. Implementations exist for
//! real files ([`TokioStorageFile`]) and, in `diskchaos-sim`, for in-memory
//! files and for the chaos wrapper itself so wrappers stack transparently.

use async_trait::async_trait;
use std::io::{self, SeekFrom};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;

/// Options for opening a file.
///
/// Builder-style API mirroring [`std::fs::OpenOptions`].
#[derive(Debug, Clone, Default)]
pub struct OpenOptions {
    /// Open file for reading.
    pub read: bool,
    /// Open file for writing.
    pub write: bool,
    /// Create the file if it doesn't exist.
    pub create: bool,
    /// Create a new file, failing if it already exists.
    pub create_new: bool,
    /// Truncate the file to zero length.
    pub truncate: bool,
}

impl OpenOptions {
    /// Create new open options with all flags set to false.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the read flag.
    pub fn read(mut self, read: bool) -> Self {
        self.read = read;
        self
    }

    /// Set the write flag.
    pub fn write(mut self, write: bool) -> Self {
        self.write = write;
        self
    }

    /// Set the create flag.
    pub fn create(mut self, create: bool) -> Self {
        self.create = create;
        self
    }

    /// Set the create_new flag.
    pub fn create_new(mut self, create_new: bool) -> Self {
        self.create_new = create_new;
        self
    }

    /// Set the truncate flag.
    pub fn truncate(mut self, truncate: bool) -> Self {
        self.truncate = truncate;
        self
    }

    /// Read-only access to an existing file.
    pub fn read_only() -> Self {
        Self::new().read(true)
    }

    /// Read and write access, creating the file if needed.
    pub fn read_write_create() -> Self {
        Self::new().read(true).write(true).create(true)
    }

    /// Read and write access to a new file (fails if it exists).
    pub fn create_new_read_write() -> Self {
        Self::new().read(true).write(true).create_new(true)
    }
}

/// Provider trait for opening and managing files.
///
/// Single-core design - no Send bounds needed.
#[async_trait(?Send)]
pub trait StorageProvider: Clone {
    /// The file type for this provider.
    type File: StorageFile + 'static;

    /// Open a file with the given options.
    async fn open(&self, path: &str, options: OpenOptions) -> io::Result<Self::File>;

    /// Check if a file exists at the given path.
    async fn exists(&self, path: &str) -> io::Result<bool>;

    /// Delete a file at the given path.
    async fn delete(&self, path: &str) -> io::Result<()>;

    /// Rename a file from one path to another.
    async fn rename(&self, from: &str, to: &str) -> io::Result<()>;
}

/// Offset-addressed asynchronous file handle.
///
/// Errors are opaque `io::Error`s; wrappers must propagate them unchanged.
#[async_trait(?Send)]
pub trait StorageFile {
    /// Read up to `buf.len()` bytes starting at `offset`.
    ///
    /// Returns the number of bytes read, which is short only at end of file.
    async fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize>;

    /// Write all of `buf` starting at `offset`, extending the file if needed.
    async fn write_at(&self, buf: &[u8], offset: u64) -> io::Result<()>;

    /// Truncate or extend the file to exactly `size` bytes.
    async fn set_len(&self, size: u64) -> io::Result<()>;

    /// Flush data and metadata to stable storage.
    async fn sync_all(&self) -> io::Result<()>;

    /// Current size of the file in bytes.
    async fn size(&self) -> io::Result<u64>;

    /// Name the file was opened under.
    fn filename(&self) -> &str;

    /// Path the file's data is reachable at right now, or `None` once it has
    /// been unlinked.
    ///
    /// Differs from [`filename`](Self::filename) after the file is renamed or
    /// deleted while this handle stays open. Defaults to the opened name for
    /// implementations that do not track their namespace.
    fn current_path(&self) -> Option<String> {
        Some(self.filename().to_owned())
    }
}

/// Real Tokio storage implementation.
#[derive(Debug, Clone, Default)]
pub struct TokioStorageProvider;

impl TokioStorageProvider {
    /// Create a new Tokio storage provider.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait(?Send)]
impl StorageProvider for TokioStorageProvider {
    type File = TokioStorageFile;

    async fn open(&self, path: &str, options: OpenOptions) -> io::Result<Self::File> {
        let file = tokio::fs::OpenOptions::new()
            .read(options.read)
            .write(options.write)
            .create(options.create)
            .create_new(options.create_new)
            .truncate(options.truncate)
            .open(path)
            .await?;
        Ok(TokioStorageFile {
            path: path.to_string(),
            inner: Mutex::new(file),
        })
    }

    async fn exists(&self, path: &str) -> io::Result<bool> {
        match tokio::fs::metadata(path).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn delete(&self, path: &str) -> io::Result<()> {
        tokio::fs::remove_file(path).await
    }

    async fn rename(&self, from: &str, to: &str) -> io::Result<()> {
        tokio::fs::rename(from, to).await
    }
}

/// Tokio file with positional access.
///
/// The cursor is shared, so every positional operation holds the lock across
/// its seek and transfer.
#[derive(Debug)]
pub struct TokioStorageFile {
    path: String,
    inner: Mutex<tokio::fs::File>,
}

#[async_trait(?Send)]
impl StorageFile for TokioStorageFile {
    async fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        let mut file = self.inner.lock().await;
        file.seek(SeekFrom::Start(offset)).await?;

        let mut filled = 0;
        while filled < buf.len() {
            let n = file.read(&mut buf[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        Ok(filled)
    }

    async fn write_at(&self, buf: &[u8], offset: u64) -> io::Result<()> {
        let mut file = self.inner.lock().await;
        file.seek(SeekFrom::Start(offset)).await?;
        file.write_all(buf).await?;
        file.flush().await
    }

    async fn set_len(&self, size: u64) -> io::Result<()> {
        self.inner.lock().await.set_len(size).await
    }

    async fn sync_all(&self) -> io::Result<()> {
        self.inner.lock().await.sync_all().await
    }

    async fn size(&self) -> io::Result<u64> {
        let metadata = self.inner.lock().await.metadata().await?;
        Ok(metadata.len())
    }

    fn filename(&self) -> &str {
        &self.path
    }
}
