//! In-memory storage.
//!
//! Readers copy the committed files of an index into a [`MemoryStorage`] so
//! classification keeps working on a stable snapshot while the directory is
//! rewritten underneath.

use std::io::{Cursor, Read, Seek, SeekFrom, Write};
use std::sync::Arc;

use ahash::{AHashMap, AHashSet};
use parking_lot::Mutex;

use crate::error::Result;
use crate::storage::{Storage, StorageError, StorageInput, StorageLock, StorageOutput};

type FileMap = Arc<Mutex<AHashMap<String, Arc<[u8]>>>>;

#[derive(Debug, Default)]
pub struct MemoryStorage {
    files: FileMap,
    locks: Arc<Mutex<AHashSet<String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy the named files of `source` into a new memory storage.
    pub fn snapshot<S, I>(source: &S, names: I) -> Result<Self>
    where
        S: Storage + ?Sized,
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let storage = MemoryStorage::new();
        {
            let mut files = storage.files.lock();
            for name in names {
                let name = name.as_ref();
                let data = source.read_all(name)?;
                files.insert(name.to_string(), Arc::from(data));
            }
        }
        Ok(storage)
    }

    pub fn total_size(&self) -> u64 {
        self.files.lock().values().map(|data| data.len() as u64).sum()
    }
}

impl Storage for MemoryStorage {
    fn open_input(&self, name: &str) -> Result<Box<dyn StorageInput>> {
        let files = self.files.lock();
        let data = files
            .get(name)
            .ok_or_else(|| StorageError::FileNotFound(name.to_string()))?;

        Ok(Box::new(MemoryInput {
            cursor: Cursor::new(Arc::clone(data)),
        }))
    }

    fn create_output(&self, name: &str) -> Result<Box<dyn StorageOutput>> {
        Ok(Box::new(MemoryOutput {
            name: name.to_string(),
            cursor: Cursor::new(Vec::new()),
            files: Arc::clone(&self.files),
        }))
    }

    fn file_exists(&self, name: &str) -> bool {
        self.files.lock().contains_key(name)
    }

    fn delete_file(&self, name: &str) -> Result<()> {
        self.files.lock().remove(name);
        Ok(())
    }

    fn list_files(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.files.lock().keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn file_size(&self, name: &str) -> Result<u64> {
        let files = self.files.lock();
        let data = files
            .get(name)
            .ok_or_else(|| StorageError::FileNotFound(name.to_string()))?;
        Ok(data.len() as u64)
    }

    fn rename_file(&self, old_name: &str, new_name: &str) -> Result<()> {
        let mut files = self.files.lock();
        let data = files
            .remove(old_name)
            .ok_or_else(|| StorageError::FileNotFound(old_name.to_string()))?;
        files.insert(new_name.to_string(), data);
        Ok(())
    }

    fn acquire_lock(&self, name: &str) -> Result<Box<dyn StorageLock>> {
        if !self.locks.lock().insert(name.to_string()) {
            return Err(StorageError::LockFailed(name.to_string()).into());
        }
        Ok(Box::new(MemoryLock {
            name: name.to_string(),
            locks: Arc::clone(&self.locks),
            released: false,
        }))
    }
}

#[derive(Debug)]
pub struct MemoryInput {
    cursor: Cursor<Arc<[u8]>>,
}

impl Read for MemoryInput {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.cursor.read(buf)
    }
}

impl Seek for MemoryInput {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.cursor.seek(pos)
    }
}

impl StorageInput for MemoryInput {
    fn size(&self) -> Result<u64> {
        Ok(self.cursor.get_ref().len() as u64)
    }
}

/// Buffers writes and publishes the file on flush.
#[derive(Debug)]
pub struct MemoryOutput {
    name: String,
    cursor: Cursor<Vec<u8>>,
    files: FileMap,
}

impl MemoryOutput {
    fn publish(&self) {
        self.files
            .lock()
            .insert(self.name.clone(), Arc::from(self.cursor.get_ref().as_slice()));
    }
}

impl Write for MemoryOutput {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.cursor.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.publish();
        Ok(())
    }
}

impl Seek for MemoryOutput {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.cursor.seek(pos)
    }
}

impl StorageOutput for MemoryOutput {
    fn flush_and_sync(&mut self) -> Result<()> {
        self.publish();
        Ok(())
    }

    fn position(&self) -> Result<u64> {
        Ok(self.cursor.position())
    }

    fn close(&mut self) -> Result<()> {
        self.publish();
        Ok(())
    }
}

#[derive(Debug)]
struct MemoryLock {
    name: String,
    locks: Arc<Mutex<AHashSet<String>>>,
    released: bool,
}

impl StorageLock for MemoryLock {
    fn name(&self) -> &str {
        &self.name
    }

    fn release(&mut self) -> Result<()> {
        if !self.released {
            self.locks.lock().remove(&self.name);
            self.released = true;
        }
        Ok(())
    }

    fn is_valid(&self) -> bool {
        !self.released
    }
}

impl Drop for MemoryLock {
    fn drop(&mut self) {
        if !self.released {
            self.locks.lock().remove(&self.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageConfig;
    use crate::storage::file::FileStorage;
    use tempfile::TempDir;

    #[test]
    fn test_memory_write_read() {
        let storage = MemoryStorage::new();

        let mut output = storage.create_output("test.bin").unwrap();
        output.write_all(b"abc").unwrap();
        assert!(!storage.file_exists("test.bin"));
        output.close().unwrap();

        assert_eq!(storage.read_all("test.bin").unwrap(), b"abc");
        assert_eq!(storage.file_size("test.bin").unwrap(), 3);
        assert_eq!(storage.list_files().unwrap(), vec!["test.bin".to_string()]);
    }

    #[test]
    fn test_snapshot_is_independent() {
        let temp_dir = TempDir::new().unwrap();
        let disk = FileStorage::new(temp_dir.path(), StorageConfig::default()).unwrap();
        let mut output = disk.create_output("segment_000001.seg").unwrap();
        output.write_all(b"v1").unwrap();
        output.close().unwrap();

        let snapshot = MemoryStorage::snapshot(&disk, ["segment_000001.seg"]).unwrap();

        let mut output = disk.create_output("segment_000001.seg").unwrap();
        output.write_all(b"v2-longer").unwrap();
        output.close().unwrap();

        assert_eq!(snapshot.read_all("segment_000001.seg").unwrap(), b"v1");
        assert_eq!(snapshot.total_size(), 2);
    }

    #[test]
    fn test_memory_lock() {
        let storage = MemoryStorage::new();
        let lock = storage.acquire_lock("write").unwrap();
        assert!(storage.acquire_lock("write").is_err());
        drop(lock);
        assert!(storage.acquire_lock("write").is_ok());
    }
}
