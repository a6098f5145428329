//! Storage provider that hands out chaos-wrapped files.

use async_trait::async_trait;
use std::io;

use diskchaos_core::{OpenOptions, RandomProvider, StorageProvider, TimeProvider};

use crate::chaos::{ChaosContext, ChaosFile};

/// Wraps every file opened through `P` in a [`ChaosFile`].
///
/// The `enabled` flag is the chaos switch of the run: when false, files are
/// still wrapped but behave as plain pass-throughs. Deletes, renames and
/// truncating opens are mirrored into the corruption tracker so recorded
/// offsets always refer to live file contents. Handles that were already open
/// record later corruption under their file's
/// [`current_path`](diskchaos_core::StorageFile::current_path), so they
/// follow a rename and stop recording once their file is deleted.
#[derive(Debug, Clone)]
pub struct ChaosStorageProvider<P, T, R>
where
    P: StorageProvider,
    T: TimeProvider,
    R: RandomProvider,
{
    inner: P,
    ctx: ChaosContext<T, R>,
    enabled: bool,
}

impl<P, T, R> ChaosStorageProvider<P, T, R>
where
    P: StorageProvider,
    T: TimeProvider,
    R: RandomProvider,
{
    /// Create a provider wrapping `inner`.
    pub fn new(inner: P, ctx: ChaosContext<T, R>, enabled: bool) -> Self {
        Self {
            inner,
            ctx,
            enabled,
        }
    }

    /// Whether opened files get fault injection.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The wrapped provider.
    pub fn inner(&self) -> &P {
        &self.inner
    }
}

#[async_trait(?Send)]
impl<P, T, R> StorageProvider for ChaosStorageProvider<P, T, R>
where
    P: StorageProvider,
    T: TimeProvider + 'static,
    R: RandomProvider + 'static,
{
    type File = ChaosFile<P::File, T, R>;

    async fn open(&self, path: &str, options: OpenOptions) -> io::Result<Self::File> {
        let truncate = options.truncate;
        let file = self.inner.open(path, options).await?;

        if truncate {
            if let Some(tracker) = self.ctx.corrupted_bytes() {
                tracker.truncate(path, 0);
            }
        }

        tracing::debug!(path, enabled = self.enabled, "chaos file opened");
        Ok(ChaosFile::new(file, self.enabled, self.ctx.clone()))
    }

    async fn exists(&self, path: &str) -> io::Result<bool> {
        self.inner.exists(path).await
    }

    async fn delete(&self, path: &str) -> io::Result<()> {
        self.inner.delete(path).await?;
        if let Some(tracker) = self.ctx.corrupted_bytes() {
            tracker.remove_file(path);
        }
        Ok(())
    }

    async fn rename(&self, from: &str, to: &str) -> io::Result<()> {
        self.inner.rename(from, to).await?;
        if let Some(tracker) = self.ctx.corrupted_bytes() {
            tracker.rename_file(from, to);
        }
        Ok(())
    }
}
