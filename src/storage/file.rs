//! Directory-backed storage.
//!
//! Each language index lives in its own directory. Writer exclusion uses a
//! lock file created with create-new semantics, so a second writer on the
//! same directory fails instead of waiting.
//!
//! A process killed while holding the lock leaves the file behind and every
//! later writer fails with `LockFailed`. [`FileStorage::break_lock`] (the
//! `taxis unlock` command) removes it once no writer is running.

use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use log::warn;

use crate::error::{Result, TaxisError};
use crate::storage::{Storage, StorageConfig, StorageError, StorageInput, StorageLock, StorageOutput};

#[derive(Debug)]
pub struct FileStorage {
    directory: PathBuf,
    config: StorageConfig,
}

impl FileStorage {
    /// Open `directory`, creating it if needed.
    pub fn new<P: AsRef<Path>>(directory: P, config: StorageConfig) -> Result<Self> {
        let directory = directory.as_ref().to_path_buf();

        if !directory.exists() {
            std::fs::create_dir_all(&directory)
                .map_err(|e| TaxisError::storage(format!("Failed to create directory: {e}")))?;
        }

        if !directory.is_dir() {
            return Err(TaxisError::storage(format!(
                "Path is not a directory: {}",
                directory.display()
            )));
        }

        Ok(FileStorage { directory, config })
    }

    /// Remove a lock file left behind by a writer that never released it.
    /// Returns whether a lock file was present.
    pub fn break_lock(&self, name: &str) -> Result<bool> {
        let path = self.file_path(&format!("{name}.lock"));
        match std::fs::remove_file(&path) {
            Ok(()) => {
                warn!("Removed stale lock {}", path.display());
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::IoError(format!("Failed to remove lock: {e}")).into()),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn file_path(&self, name: &str) -> PathBuf {
        self.directory.join(name)
    }

    fn map_open_error(name: &str, e: std::io::Error) -> StorageError {
        if e.kind() == std::io::ErrorKind::NotFound {
            StorageError::FileNotFound(name.to_string())
        } else {
            StorageError::IoError(e.to_string())
        }
    }
}

impl Storage for FileStorage {
    fn open_input(&self, name: &str) -> Result<Box<dyn StorageInput>> {
        let file = File::open(self.file_path(name)).map_err(|e| Self::map_open_error(name, e))?;
        Ok(Box::new(FileInput::new(file, self.config.buffer_size)?))
    }

    fn create_output(&self, name: &str) -> Result<Box<dyn StorageOutput>> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(self.file_path(name))
            .map_err(|e| StorageError::IoError(e.to_string()))?;

        Ok(Box::new(FileOutput::new(
            file,
            self.config.buffer_size,
            self.config.sync_writes,
        )))
    }

    fn file_exists(&self, name: &str) -> bool {
        self.file_path(name).exists()
    }

    fn delete_file(&self, name: &str) -> Result<()> {
        let path = self.file_path(name);
        if path.exists() {
            std::fs::remove_file(&path)
                .map_err(|e| StorageError::IoError(format!("Failed to delete file: {e}")))?;
        }
        Ok(())
    }

    fn list_files(&self) -> Result<Vec<String>> {
        let mut files = Vec::new();

        for entry in
            std::fs::read_dir(&self.directory).map_err(|e| StorageError::IoError(e.to_string()))?
        {
            let entry = entry.map_err(|e| StorageError::IoError(e.to_string()))?;
            let path = entry.path();

            if path.is_file()
                && let Some(name) = path.file_name().and_then(|n| n.to_str())
            {
                files.push(name.to_string());
            }
        }

        files.sort();
        Ok(files)
    }

    fn file_size(&self, name: &str) -> Result<u64> {
        let metadata = self
            .file_path(name)
            .metadata()
            .map_err(|e| Self::map_open_error(name, e))?;
        Ok(metadata.len())
    }

    fn rename_file(&self, old_name: &str, new_name: &str) -> Result<()> {
        std::fs::rename(self.file_path(old_name), self.file_path(new_name))
            .map_err(|e| StorageError::IoError(format!("Failed to rename file: {e}")))?;
        Ok(())
    }

    fn acquire_lock(&self, name: &str) -> Result<Box<dyn StorageLock>> {
        let path = self.file_path(&format!("{name}.lock"));
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::AlreadyExists {
                    StorageError::LockFailed(format!("{name} in {}", self.directory.display()))
                } else {
                    StorageError::IoError(e.to_string())
                }
            })?;

        Ok(Box::new(FileLock {
            name: name.to_string(),
            path,
            _file: file,
            released: false,
        }))
    }
}

#[derive(Debug)]
pub struct FileInput {
    reader: BufReader<File>,
    size: u64,
}

impl FileInput {
    fn new(file: File, buffer_size: usize) -> Result<Self> {
        let size = file
            .metadata()
            .map_err(|e| TaxisError::storage(format!("Failed to get file metadata: {e}")))?
            .len();
        let reader = BufReader::with_capacity(buffer_size, file);

        Ok(FileInput { reader, size })
    }
}

impl Read for FileInput {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.reader.read(buf)
    }
}

impl Seek for FileInput {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.reader.seek(pos)
    }
}

impl StorageInput for FileInput {
    fn size(&self) -> Result<u64> {
        Ok(self.size)
    }
}

#[derive(Debug)]
pub struct FileOutput {
    writer: BufWriter<File>,
    sync_writes: bool,
    position: u64,
}

impl FileOutput {
    fn new(file: File, buffer_size: usize, sync_writes: bool) -> Self {
        FileOutput {
            writer: BufWriter::with_capacity(buffer_size, file),
            sync_writes,
            position: 0,
        }
    }
}

impl Write for FileOutput {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let bytes_written = self.writer.write(buf)?;
        self.position += bytes_written as u64;

        if self.sync_writes {
            self.writer.flush()?;
        }

        Ok(bytes_written)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

impl Seek for FileOutput {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        let new_pos = self.writer.seek(pos)?;
        self.position = new_pos;
        Ok(new_pos)
    }
}

impl StorageOutput for FileOutput {
    fn flush_and_sync(&mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| TaxisError::storage(format!("Failed to flush: {e}")))?;
        self.writer
            .get_ref()
            .sync_all()
            .map_err(|e| TaxisError::storage(format!("Failed to sync: {e}")))?;
        Ok(())
    }

    fn position(&self) -> Result<u64> {
        Ok(self.position)
    }

    fn close(&mut self) -> Result<()> {
        self.flush_and_sync()
    }
}

/// Lock file held for the lifetime of a writer.
#[derive(Debug)]
struct FileLock {
    name: String,
    path: PathBuf,
    _file: File,
    released: bool,
}

impl StorageLock for FileLock {
    fn name(&self) -> &str {
        &self.name
    }

    fn release(&mut self) -> Result<()> {
        if !self.released {
            std::fs::remove_file(&self.path)
                .map_err(|e| TaxisError::storage(format!("Failed to release lock: {e}")))?;
            self.released = true;
        }
        Ok(())
    }

    fn is_valid(&self) -> bool {
        !self.released
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!("Lock {} was not released: {e}", self.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_storage() -> (TempDir, FileStorage) {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path(), StorageConfig::default()).unwrap();
        (temp_dir, storage)
    }

    #[test]
    fn test_write_read_and_list() {
        let (_temp_dir, storage) = create_test_storage();

        let mut output = storage.create_output("b.seg").unwrap();
        output.write_all(b"Hello, World!").unwrap();
        output.close().unwrap();
        storage.create_output("a.seg").unwrap().close().unwrap();

        assert!(storage.file_exists("b.seg"));
        assert_eq!(storage.file_size("b.seg").unwrap(), 13);
        assert_eq!(storage.read_all("b.seg").unwrap(), b"Hello, World!");
        assert_eq!(storage.list_files().unwrap(), vec!["a.seg", "b.seg"]);
    }

    #[test]
    fn test_rename_and_delete() {
        let (_temp_dir, storage) = create_test_storage();

        let mut output = storage.create_output("manifest.tmp").unwrap();
        output.write_all(b"{}").unwrap();
        output.close().unwrap();

        storage.rename_file("manifest.tmp", "manifest.json").unwrap();
        assert!(!storage.file_exists("manifest.tmp"));
        assert!(storage.file_exists("manifest.json"));

        storage.delete_file("manifest.json").unwrap();
        storage.delete_file("manifest.json").unwrap();
        assert!(!storage.file_exists("manifest.json"));
    }

    #[test]
    fn test_missing_file() {
        let (_temp_dir, storage) = create_test_storage();
        let err = storage.open_input("nope").unwrap_err();
        assert!(err.to_string().contains("File not found"));
    }

    #[test]
    fn test_lock_is_exclusive() {
        let (_temp_dir, storage) = create_test_storage();

        let mut lock = storage.acquire_lock("write").unwrap();
        assert!(storage.file_exists("write.lock"));
        assert!(storage.acquire_lock("write").is_err());

        lock.release().unwrap();
        assert!(!lock.is_valid());
        assert!(!storage.file_exists("write.lock"));

        let second = storage.acquire_lock("write").unwrap();
        drop(second);
        assert!(!storage.file_exists("write.lock"));
    }

    #[test]
    fn test_break_stale_lock() {
        let (_temp_dir, storage) = create_test_storage();
        assert!(!storage.break_lock("write").unwrap());

        // A holder that never runs its release leaves the file behind.
        std::mem::forget(storage.acquire_lock("write").unwrap());
        assert!(storage.acquire_lock("write").is_err());

        assert!(storage.break_lock("write").unwrap());
        assert!(!storage.file_exists("write.lock"));
        assert!(storage.acquire_lock("write").is_ok());
    }
}
