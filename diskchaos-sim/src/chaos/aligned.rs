//! Page-aligned scratch buffers for corrupted write payloads.

use std::alloc::{self, Layout};
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

/// Alignment of corrupted write copies, matching direct-I/O page requirements.
pub const PAGE_ALIGNMENT: usize = 4096;

/// Heap buffer aligned to [`PAGE_ALIGNMENT`], freed on drop.
///
/// Owned by the write operation that created it, so it lives exactly as long
/// as the in-flight write and is released on every exit path.
pub struct AlignedBuffer {
    ptr: NonNull<u8>,
    len: usize,
    layout: Layout,
}

impl AlignedBuffer {
    /// Allocate a page-aligned copy of `data`.
    pub fn copy_from(data: &[u8]) -> Self {
        // Zero-size allocations are not allowed; reserve at least one byte.
        let layout = match Layout::from_size_align(data.len().max(1), PAGE_ALIGNMENT) {
            Ok(layout) => layout,
            Err(_) => panic!("buffer of {} bytes exceeds the address space", data.len()),
        };

        // SAFETY: layout has a non-zero size.
        let raw = unsafe { alloc::alloc_zeroed(layout) };
        let Some(ptr) = NonNull::new(raw) else {
            alloc::handle_alloc_error(layout)
        };

        // SAFETY: the allocation holds at least data.len() bytes and cannot
        // overlap the caller's slice.
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), ptr.as_ptr(), data.len());
        }

        Self {
            ptr,
            len: data.len(),
            layout,
        }
    }

    /// Flip bit `bit` (0-7) of the byte at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds or `bit >= 8`.
    pub fn flip_bit(&mut self, index: usize, bit: u32) {
        assert!(bit < 8, "bit index {bit} out of range");
        self[index] ^= 1u8 << bit;
    }
}

impl Deref for AlignedBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        // SAFETY: ptr is valid for len initialized bytes for the lifetime of self.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl DerefMut for AlignedBuffer {
    fn deref_mut(&mut self) -> &mut [u8] {
        // SAFETY: ptr is valid for len initialized bytes and uniquely owned by self.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl Drop for AlignedBuffer {
    fn drop(&mut self) {
        // SAFETY: ptr was allocated in copy_from with exactly this layout.
        unsafe { alloc::dealloc(self.ptr.as_ptr(), self.layout) }
    }
}

impl std::fmt::Debug for AlignedBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlignedBuffer")
            .field("len", &self.len)
            .finish()
    }
}
