//! Storage abstraction for index files.
//!
//! Index writers and readers see a flat namespace of named files through the
//! [`Storage`] trait. [`file::FileStorage`] maps it onto one directory per
//! language and owns the writer lock; [`memory::MemoryStorage`] holds the
//! snapshot copies that readers classify from.

use std::io::{Read, Seek, Write};

use crate::error::{Result, TaxisError};

pub mod file;
pub mod memory;
pub mod structured;

/// Settings for storage backends.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Buffer size for buffered file I/O.
    pub buffer_size: usize,

    /// Flush after every write.
    pub sync_writes: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            buffer_size: 65536,
            sync_writes: false,
        }
    }
}

/// A flat namespace of named files.
pub trait Storage: Send + Sync + std::fmt::Debug {
    /// Open an existing file for reading.
    fn open_input(&self, name: &str) -> Result<Box<dyn StorageInput>>;

    /// Create (or truncate) a file for writing.
    fn create_output(&self, name: &str) -> Result<Box<dyn StorageOutput>>;

    fn file_exists(&self, name: &str) -> bool;

    /// Delete a file. Missing files are not an error.
    fn delete_file(&self, name: &str) -> Result<()>;

    /// File names, sorted.
    fn list_files(&self) -> Result<Vec<String>>;

    fn file_size(&self, name: &str) -> Result<u64>;

    /// Rename a file, replacing any file already named `new_name`.
    fn rename_file(&self, old_name: &str, new_name: &str) -> Result<()>;

    /// Take the exclusive lock `name`. Fails if it is already held.
    fn acquire_lock(&self, name: &str) -> Result<Box<dyn StorageLock>>;

    /// Read a whole file into memory.
    fn read_all(&self, name: &str) -> Result<Vec<u8>> {
        let mut input = self.open_input(name)?;
        let mut buffer = Vec::with_capacity(input.size()? as usize);
        input.read_to_end(&mut buffer)?;
        Ok(buffer)
    }
}

pub trait StorageInput: Read + Seek + Send + std::fmt::Debug {
    fn size(&self) -> Result<u64>;
}

pub trait StorageOutput: Write + Seek + Send + std::fmt::Debug {
    fn flush_and_sync(&mut self) -> Result<()>;

    fn position(&self) -> Result<u64>;

    fn close(&mut self) -> Result<()>;
}

impl StorageOutput for Box<dyn StorageOutput> {
    fn flush_and_sync(&mut self) -> Result<()> {
        self.as_mut().flush_and_sync()
    }

    fn position(&self) -> Result<u64> {
        self.as_ref().position()
    }

    fn close(&mut self) -> Result<()> {
        self.as_mut().close()
    }
}

impl StorageInput for Box<dyn StorageInput> {
    fn size(&self) -> Result<u64> {
        self.as_ref().size()
    }
}

/// A held exclusive lock. Released explicitly or on drop.
pub trait StorageLock: Send + std::fmt::Debug {
    fn name(&self) -> &str;

    fn release(&mut self) -> Result<()>;

    fn is_valid(&self) -> bool;
}

#[derive(Debug, Clone)]
pub enum StorageError {
    FileNotFound(String),

    IoError(String),

    LockFailed(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::FileNotFound(name) => write!(f, "File not found: {name}"),
            StorageError::IoError(msg) => write!(f, "I/O error: {msg}"),
            StorageError::LockFailed(name) => write!(f, "Failed to acquire lock: {name}"),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<StorageError> for TaxisError {
    fn from(err: StorageError) -> Self {
        TaxisError::storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_config_default() {
        let config = StorageConfig::default();
        assert_eq!(config.buffer_size, 65536);
        assert!(!config.sync_writes);
    }

    #[test]
    fn test_storage_error_conversion() {
        let err: TaxisError = StorageError::LockFailed("write".to_string()).into();
        assert_eq!(err.to_string(), "Storage error: Failed to acquire lock: write");

        let err = StorageError::FileNotFound("manifest.json".to_string());
        assert_eq!(err.to_string(), "File not found: manifest.json");
    }
}
