//! In-memory storage backing simulated files.
//!
//! Files are byte vectors shared between every handle opened on the same
//! path, so a write through one handle is visible through all of them.
//! Deleting a path detaches it: already-open handles keep working on the
//! orphaned data, like an unlinked file on a POSIX filesystem. Every handle
//! also shares the file's current path, which follows renames and is cleared
//! on delete.

use async_trait::async_trait;
use std::cell::RefCell;
use std::collections::HashMap;
use std::io;
use std::rc::Rc;

use diskchaos_core::{OpenOptions, StorageFile, StorageProvider};

type FileData = Rc<RefCell<Vec<u8>>>;
type FilePath = Rc<RefCell<Option<String>>>;

/// A file as stored in the provider's namespace.
#[derive(Debug, Clone)]
struct Entry {
    data: FileData,
    current_path: FilePath,
}

impl Entry {
    fn new(path: &str) -> Self {
        Self {
            data: FileData::default(),
            current_path: Rc::new(RefCell::new(Some(path.to_string()))),
        }
    }
}

/// Handle to an in-memory file.
#[derive(Debug, Clone)]
pub struct MemoryStorageFile {
    path: String,
    data: FileData,
    current_path: FilePath,
}

impl MemoryStorageFile {
    /// Create an empty file that is not registered with any provider.
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let entry = Entry::new(&path);
        Self {
            path,
            data: entry.data,
            current_path: entry.current_path,
        }
    }

    /// Copy of the file's current contents.
    pub fn contents(&self) -> Vec<u8> {
        self.data.borrow().clone()
    }
}

#[async_trait(?Send)]
impl StorageFile for MemoryStorageFile {
    async fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        let data = self.data.borrow();
        let Ok(start) = usize::try_from(offset) else {
            return Ok(0);
        };
        if start >= data.len() {
            return Ok(0);
        }

        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        Ok(n)
    }

    async fn write_at(&self, buf: &[u8], offset: u64) -> io::Result<()> {
        let start = usize::try_from(offset)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "offset too large"))?;
        let end = start.checked_add(buf.len()).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "write past end of address space")
        })?;

        let mut data = self.data.borrow_mut();
        if data.len() < end {
            data.resize(end, 0);
        }
        data[start..end].copy_from_slice(buf);
        Ok(())
    }

    async fn set_len(&self, size: u64) -> io::Result<()> {
        let size = usize::try_from(size)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "size too large"))?;
        self.data.borrow_mut().resize(size, 0);
        Ok(())
    }

    async fn sync_all(&self) -> io::Result<()> {
        Ok(())
    }

    async fn size(&self) -> io::Result<u64> {
        Ok(self.data.borrow().len() as u64)
    }

    fn filename(&self) -> &str {
        &self.path
    }

    fn current_path(&self) -> Option<String> {
        self.current_path.borrow().clone()
    }
}

/// In-memory storage provider.
///
/// Cloning shares the same namespace of files.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorageProvider {
    files: Rc<RefCell<HashMap<String, Entry>>>,
}

impl MemoryStorageProvider {
    /// Create an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Paths currently present, sorted.
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.files.borrow().keys().cloned().collect();
        paths.sort();
        paths
    }
}

fn not_found(path: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("file not found: {path}"))
}

#[async_trait(?Send)]
impl StorageProvider for MemoryStorageProvider {
    type File = MemoryStorageFile;

    async fn open(&self, path: &str, options: OpenOptions) -> io::Result<Self::File> {
        let mut files = self.files.borrow_mut();

        let entry = match files.get(path) {
            Some(_) if options.create_new => {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("file already exists: {path}"),
                ));
            }
            Some(entry) => entry.clone(),
            None if options.create || options.create_new => {
                let entry = Entry::new(path);
                files.insert(path.to_string(), entry.clone());
                entry
            }
            None => return Err(not_found(path)),
        };

        if options.truncate {
            entry.data.borrow_mut().clear();
        }

        tracing::trace!(path, ?options, "memory file opened");
        Ok(MemoryStorageFile {
            path: path.to_string(),
            data: entry.data,
            current_path: entry.current_path,
        })
    }

    async fn exists(&self, path: &str) -> io::Result<bool> {
        Ok(self.files.borrow().contains_key(path))
    }

    async fn delete(&self, path: &str) -> io::Result<()> {
        let entry = self
            .files
            .borrow_mut()
            .remove(path)
            .ok_or_else(|| not_found(path))?;
        entry.current_path.borrow_mut().take();
        Ok(())
    }

    async fn rename(&self, from: &str, to: &str) -> io::Result<()> {
        let mut files = self.files.borrow_mut();
        let entry = files.remove(from).ok_or_else(|| not_found(from))?;
        *entry.current_path.borrow_mut() = Some(to.to_string());
        if let Some(replaced) = files.insert(to.to_string(), entry) {
            replaced.current_path.borrow_mut().take();
        }
        Ok(())
    }
}
