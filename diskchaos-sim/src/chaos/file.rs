//! Fault-injecting file wrapper.
//!
//! [`ChaosFile`] sits in front of any [`StorageFile`] and, when enabled,
//! delays each operation by whatever the fault config asks for and flips a
//! single bit in a configurable share of writes. Everything else is passed
//! through untouched, including errors.
//!
//! Operations return futures that own a clone of the wrapped file handle and
//! of the time provider. Dropping the `ChaosFile` while an operation is
//! waiting out its delay does not cancel that operation.

use std::io;
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::{FutureExt, LocalBoxFuture};

use diskchaos_core::{RandomProvider, StorageFile, TimeProvider};

use super::{AlignedBuffer, ChaosContext};

/// A write payload with one bit flipped, and where that bit lands in the file.
struct CorruptedWrite {
    buffer: AlignedBuffer,
    position: u64,
}

/// Fault-injecting wrapper around a shared [`StorageFile`].
pub struct ChaosFile<F, T, R>
where
    F: StorageFile,
    T: TimeProvider,
    R: RandomProvider,
{
    file: Rc<F>,
    enabled: bool,
    ctx: ChaosContext<T, R>,
}

impl<F, T, R> ChaosFile<F, T, R>
where
    F: StorageFile + 'static,
    T: TimeProvider + 'static,
    R: RandomProvider + 'static,
{
    /// Wrap `file`. With `enabled == false` every call is a plain pass-through.
    pub fn new(file: F, enabled: bool, ctx: ChaosContext<T, R>) -> Self {
        Self::from_shared(Rc::new(file), enabled, ctx)
    }

    /// Wrap a file handle that is already shared.
    pub fn from_shared(file: Rc<F>, enabled: bool, ctx: ChaosContext<T, R>) -> Self {
        Self { file, enabled, ctx }
    }

    /// Whether fault injection is active for this handle.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The wrapped file.
    pub fn inner(&self) -> &Rc<F> {
        &self.file
    }

    /// Name of the wrapped file.
    pub fn filename(&self) -> &str {
        self.file.filename()
    }

    /// Delay to apply to the next operation.
    ///
    /// Zero when chaos is disabled for this handle or no fault config is
    /// installed. A non-zero delay counts once towards `disk_delays`.
    pub fn disk_delay(&self) -> Duration {
        if !self.enabled {
            return Duration::ZERO;
        }
        let Some(faults) = &self.ctx.faults else {
            return Duration::ZERO;
        };

        let delay = faults.disk_delay();
        if !delay.is_zero() {
            self.ctx.metrics.increment_disk_delays();
            tracing::trace!(filename = self.filename(), ?delay, "disk delay injected");
        }
        delay
    }

    /// Read into `buf` from `offset`, after the injected delay.
    pub fn read<'a>(
        &self,
        buf: &'a mut [u8],
        offset: u64,
    ) -> LocalBoxFuture<'a, io::Result<usize>> {
        let file = Rc::clone(&self.file);
        let delay = self.disk_delay();
        if delay.is_zero() {
            return async move { file.read_at(buf, offset).await }.boxed_local();
        }

        let time = self.ctx.time.clone();
        async move {
            wait(&time, delay, "read", file.filename()).await;
            file.read_at(buf, offset).await
        }
        .boxed_local()
    }

    /// Write `buf` at `offset`, after the injected delay.
    ///
    /// The corruption decision is taken when this is called. A corrupted write
    /// sends a page-aligned copy with one flipped bit to the file and still
    /// reports the file's own result. It is recorded in the corruption
    /// tracker only once the file accepted it, under the path the data lives
    /// at by then. Writes through an unlinked handle are not recorded.
    pub fn write<'a>(&self, buf: &'a [u8], offset: u64) -> LocalBoxFuture<'a, io::Result<()>> {
        let file = Rc::clone(&self.file);
        let corrupted = self.corrupt(buf, offset);
        let delay = self.disk_delay();
        let time = self.ctx.time.clone();
        let tracker = self.ctx.corrupted_bytes.clone();

        async move {
            if !delay.is_zero() {
                wait(&time, delay, "write", file.filename()).await;
            }

            let Some(CorruptedWrite { buffer, position }) = corrupted else {
                return file.write_at(buf, offset).await;
            };

            file.write_at(&buffer, offset).await?;
            if let (Some(tracker), Some(path)) = (tracker, file.current_path()) {
                tracker.mark(&path, position);
            }
            Ok(())
        }
        .boxed_local()
    }

    /// Truncate or extend the file to `size`, after the injected delay.
    ///
    /// Corrupted offsets at or beyond `size` are dropped from the tracker
    /// before the file is resized.
    pub fn truncate(&self, size: u64) -> LocalBoxFuture<'static, io::Result<()>> {
        let file = Rc::clone(&self.file);
        let delay = self.disk_delay();
        let time = self.ctx.time.clone();
        let tracker = self.ctx.corrupted_bytes.clone();

        async move {
            if !delay.is_zero() {
                wait(&time, delay, "truncate", file.filename()).await;
            }
            if let (Some(tracker), Some(path)) = (tracker, file.current_path()) {
                tracker.truncate(&path, size);
            }
            file.set_len(size).await
        }
        .boxed_local()
    }

    /// Flush the file to stable storage, after the injected delay.
    pub fn sync(&self) -> LocalBoxFuture<'static, io::Result<()>> {
        let file = Rc::clone(&self.file);
        let delay = self.disk_delay();
        if delay.is_zero() {
            return async move { file.sync_all().await }.boxed_local();
        }

        let time = self.ctx.time.clone();
        async move {
            wait(&time, delay, "sync", file.filename()).await;
            file.sync_all().await
        }
        .boxed_local()
    }

    /// Current size of the file, after the injected delay.
    pub fn size(&self) -> LocalBoxFuture<'static, io::Result<u64>> {
        let file = Rc::clone(&self.file);
        let delay = self.disk_delay();
        if delay.is_zero() {
            return async move { file.size().await }.boxed_local();
        }

        let time = self.ctx.time.clone();
        async move {
            wait(&time, delay, "size", file.filename()).await;
            file.size().await
        }
        .boxed_local()
    }

    /// Decide whether this write gets a bit flipped and, if so, build the
    /// corrupted copy.
    fn corrupt(&self, buf: &[u8], offset: u64) -> Option<CorruptedWrite> {
        if !self.enabled {
            return None;
        }
        let faults = self.ctx.faults.as_ref()?;

        let percentage = faults.bit_flip_percentage();
        if percentage.is_nan() || percentage <= 0.0 || percentage > 100.0 || buf.is_empty() {
            return None;
        }
        if self.ctx.random.random_ratio() >= percentage / 100.0 {
            return None;
        }

        let mut buffer = AlignedBuffer::copy_from(buf);
        let byte_index = self.ctx.random.random_range(0..buf.len());
        let bit_index = self.ctx.random.random_range(0..8u32);
        buffer.flip_bit(byte_index, bit_index);

        let position = offset.saturating_add(byte_index as u64);
        tracing::info!(
            filename = self.filename(),
            position,
            bit = bit_index,
            "corrupted byte injected"
        );
        self.ctx.metrics.increment_bit_flips();

        Some(CorruptedWrite { buffer, position })
    }
}

/// Sleep for `delay`. A dead clock is logged and the operation goes ahead.
async fn wait<T: TimeProvider>(
    time: &T,
    delay: Duration,
    operation: &'static str,
    filename: &str,
) {
    if let Err(error) = time.sleep(delay).await {
        tracing::warn!(
            operation,
            filename,
            %error,
            "chaos delay interrupted, issuing I/O anyway"
        );
    }
}

#[async_trait(?Send)]
impl<F, T, R> StorageFile for ChaosFile<F, T, R>
where
    F: StorageFile + 'static,
    T: TimeProvider + 'static,
    R: RandomProvider + 'static,
{
    async fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        self.read(buf, offset).await
    }

    async fn write_at(&self, buf: &[u8], offset: u64) -> io::Result<()> {
        self.write(buf, offset).await
    }

    async fn set_len(&self, size: u64) -> io::Result<()> {
        self.truncate(size).await
    }

    async fn sync_all(&self) -> io::Result<()> {
        self.sync().await
    }

    async fn size(&self) -> io::Result<u64> {
        ChaosFile::size(self).await
    }

    fn filename(&self) -> &str {
        self.file.filename()
    }

    fn current_path(&self) -> Option<String> {
        self.file.current_path()
    }
}

impl<F, T, R> std::fmt::Debug for ChaosFile<F, T, R>
where
    F: StorageFile,
    T: TimeProvider,
    R: RandomProvider,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChaosFile")
            .field("filename", &self.file.filename())
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}
