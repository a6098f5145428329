//! Record of which file offsets hold deliberately corrupted bytes.
//!
//! Checksum-validating code under test can ask the tracker whether a
//! mismatch it detected was injected, which separates expected corruption
//! from real bugs.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

/// Per-file ordered set of corrupted byte offsets.
///
/// Uses `Arc<Mutex<..>>` for interior mutability. In single-threaded
/// simulation the lock is never contended.
#[derive(Clone, Default, Debug)]
pub struct CorruptedBytes {
    files: Arc<Mutex<HashMap<String, BTreeSet<u64>>>>,
}

impl CorruptedBytes {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a corrupted byte at `position` in `filename`.
    pub fn mark(&self, filename: &str, position: u64) {
        self.files
            .lock()
            .expect("Failed to lock corrupted bytes")
            .entry(filename.to_string())
            .or_default()
            .insert(position);
    }

    /// Forget every corrupted offset at or beyond `size`.
    pub fn truncate(&self, filename: &str, size: u64) {
        let mut files = self.files.lock().expect("Failed to lock corrupted bytes");
        if let Some(positions) = files.get_mut(filename) {
            let removed = positions.split_off(&size);
            if !removed.is_empty() {
                tracing::trace!(
                    filename,
                    size,
                    removed = removed.len(),
                    "corrupted bytes truncated"
                );
            }
            if positions.is_empty() {
                files.remove(filename);
            }
        }
    }

    /// Whether any byte in `[offset, offset + len)` of `filename` is corrupted.
    pub fn is_corrupted(&self, filename: &str, offset: u64, len: u64) -> bool {
        if len == 0 {
            return false;
        }
        let end = offset.saturating_add(len);
        self.files
            .lock()
            .expect("Failed to lock corrupted bytes")
            .get(filename)
            .is_some_and(|positions| positions.range(offset..end).next().is_some())
    }

    /// Corrupted offsets of `filename`, in ascending order.
    pub fn positions(&self, filename: &str) -> Vec<u64> {
        self.files
            .lock()
            .expect("Failed to lock corrupted bytes")
            .get(filename)
            .map(|positions| positions.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Corrupted offsets across all files.
    pub fn total(&self) -> usize {
        self.files
            .lock()
            .expect("Failed to lock corrupted bytes")
            .values()
            .map(BTreeSet::len)
            .sum()
    }

    /// Forget everything recorded for `filename` (the file was deleted).
    pub fn remove_file(&self, filename: &str) {
        self.files
            .lock()
            .expect("Failed to lock corrupted bytes")
            .remove(filename);
    }

    /// Move the record of `from` to `to`, replacing whatever `to` had.
    pub fn rename_file(&self, from: &str, to: &str) {
        let mut files = self.files.lock().expect("Failed to lock corrupted bytes");
        files.remove(to);
        if let Some(positions) = files.remove(from) {
            files.insert(to.to_string(), positions);
        }
    }

    /// Forget everything.
    pub fn clear(&self) {
        self.files
            .lock()
            .expect("Failed to lock corrupted bytes")
            .clear();
    }
}
