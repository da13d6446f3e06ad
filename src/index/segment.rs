//! Segment, deletion bitmap and manifest files.
//!
//! A commit writes new immutable segment files and new deletion bitmaps
//! first, then replaces `manifest.json` through a temporary file and a
//! rename. Files the new manifest no longer references are removed last, so
//! a failure at any point leaves the previous commit readable.

use std::io::Write;

use bit_vec::BitVec;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TaxisError};
use crate::index::document::IndexedDocument;
use crate::storage::Storage;
use crate::storage::structured::{StructReader, StructWriter};

pub const MANIFEST_FILE: &str = "manifest.json";
const MANIFEST_TEMP_FILE: &str = "manifest.json.tmp";

const SEGMENT_MAGIC: u32 = 0x5458_5347; // "TXSG"
const DELETIONS_MAGIC: u32 = 0x5458_444C; // "TXDL"
const FORMAT_VERSION: u32 = 1;

/// A committed segment as listed in the manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentInfo {
    pub number: u64,
    pub doc_count: u64,
    /// Commit generation of the current deletion bitmap, if any.
    pub deletions_generation: Option<u64>,
    pub deleted_count: u64,
}

impl SegmentInfo {
    pub fn file_name(&self) -> String {
        segment_file_name(self.number)
    }

    pub fn deletions_file_name(&self) -> Option<String> {
        self.deletions_generation
            .map(|generation| deletions_file_name(self.number, generation))
    }

    pub fn live_count(&self) -> u64 {
        self.doc_count - self.deleted_count
    }

    /// Files this segment needs.
    pub fn files(&self) -> Vec<String> {
        let mut files = vec![self.file_name()];
        files.extend(self.deletions_file_name());
        files
    }
}

pub fn segment_file_name(number: u64) -> String {
    format!("segment_{number:06}.seg")
}

pub fn deletions_file_name(number: u64, generation: u64) -> String {
    format!("segment_{number:06}_{generation:06}.del")
}

/// The commit point of an index directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub generation: u64,
    pub next_segment: u64,
    pub committed_at: DateTime<Utc>,
    pub segments: Vec<SegmentInfo>,
}

impl Default for Manifest {
    fn default() -> Self {
        Manifest {
            generation: 0,
            next_segment: 1,
            committed_at: Utc::now(),
            segments: Vec::new(),
        }
    }
}

impl Manifest {
    pub fn doc_count(&self) -> u64 {
        self.segments.iter().map(|s| s.doc_count).sum()
    }

    pub fn live_count(&self) -> u64 {
        self.segments.iter().map(SegmentInfo::live_count).sum()
    }

    /// Every file referenced by this manifest, the manifest itself included.
    pub fn files(&self) -> Vec<String> {
        let mut files = vec![MANIFEST_FILE.to_string()];
        for segment in &self.segments {
            files.extend(segment.files());
        }
        files
    }

    /// The committed manifest of `storage`, or `None` for an empty directory.
    pub fn load(storage: &dyn Storage) -> Result<Option<Manifest>> {
        if !storage.file_exists(MANIFEST_FILE) {
            return Ok(None);
        }
        let data = storage.read_all(MANIFEST_FILE)?;
        let manifest = serde_json::from_slice(&data)
            .map_err(|e| TaxisError::index(format!("Corrupt manifest: {e}")))?;
        Ok(Some(manifest))
    }

    /// Atomically replace the manifest of `storage`.
    pub fn store(&self, storage: &dyn Storage) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)?;
        let mut output = storage.create_output(MANIFEST_TEMP_FILE)?;
        output.write_all(&json)?;
        output.close()?;
        storage.rename_file(MANIFEST_TEMP_FILE, MANIFEST_FILE)
    }
}

/// Write `documents` as segment `number`.
pub fn write_segment(storage: &dyn Storage, number: u64, documents: &[IndexedDocument]) -> Result<()> {
    let output = storage.create_output(&segment_file_name(number))?;
    let mut writer = StructWriter::new(output);
    writer.write_u32(SEGMENT_MAGIC)?;
    writer.write_u32(FORMAT_VERSION)?;
    writer.write_varint(documents.len() as u64)?;
    for document in documents {
        writer.write_bytes(&bincode::serialize(document)?)?;
    }
    writer.close()
}

/// Read every document of a segment, verifying its checksum.
pub fn read_segment(storage: &dyn Storage, info: &SegmentInfo) -> Result<Vec<IndexedDocument>> {
    let name = info.file_name();
    let mut reader = StructReader::new(storage.open_input(&name)?)?;

    if reader.read_u32()? != SEGMENT_MAGIC {
        return Err(TaxisError::index(format!("{name} is not a segment file")));
    }
    let version = reader.read_u32()?;
    if version != FORMAT_VERSION {
        return Err(TaxisError::index(format!(
            "Unsupported segment version {version} in {name}"
        )));
    }

    let count = reader.read_varint()?;
    if count != info.doc_count {
        return Err(TaxisError::index(format!(
            "{name} holds {count} documents, manifest expects {}",
            info.doc_count
        )));
    }

    let mut documents = Vec::with_capacity(count as usize);
    for _ in 0..count {
        documents.push(bincode::deserialize(&reader.read_bytes()?)?);
    }

    if !reader.verify_checksum()? {
        return Err(TaxisError::index(format!("Checksum mismatch in {name}")));
    }
    Ok(documents)
}

/// Deleted documents of one segment.
#[derive(Debug, Clone, PartialEq)]
pub struct DeletionBitmap {
    bits: BitVec,
    deleted_count: u64,
}

impl DeletionBitmap {
    pub fn new(doc_count: usize) -> Self {
        DeletionBitmap {
            bits: BitVec::from_elem(doc_count, false),
            deleted_count: 0,
        }
    }

    /// Mark `doc` deleted. Returns whether it was live.
    pub fn delete(&mut self, doc: usize) -> bool {
        match self.bits.get(doc) {
            Some(false) => {
                self.bits.set(doc, true);
                self.deleted_count += 1;
                true
            }
            _ => false,
        }
    }

    pub fn is_deleted(&self, doc: usize) -> bool {
        self.bits.get(doc).unwrap_or(false)
    }

    pub fn deleted_count(&self) -> u64 {
        self.deleted_count
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn write(&self, storage: &dyn Storage, name: &str) -> Result<()> {
        let mut writer = StructWriter::new(storage.create_output(name)?);
        writer.write_u32(DELETIONS_MAGIC)?;
        writer.write_u32(FORMAT_VERSION)?;
        writer.write_varint(self.bits.len() as u64)?;
        writer.write_varint(self.deleted_count)?;
        writer.write_bytes(&self.bits.to_bytes())?;
        writer.close()
    }

    pub fn read(storage: &dyn Storage, name: &str) -> Result<Self> {
        let mut reader = StructReader::new(storage.open_input(name)?)?;
        if reader.read_u32()? != DELETIONS_MAGIC {
            return Err(TaxisError::index(format!("{name} is not a deletion bitmap")));
        }
        let version = reader.read_u32()?;
        if version != FORMAT_VERSION {
            return Err(TaxisError::index(format!(
                "Unsupported bitmap version {version} in {name}"
            )));
        }
        let len = reader.read_varint()? as usize;
        let deleted_count = reader.read_varint()?;
        let mut bits = BitVec::from_bytes(&reader.read_bytes()?);
        bits.truncate(len);
        if !reader.verify_checksum()? {
            return Err(TaxisError::index(format!("Checksum mismatch in {name}")));
        }
        Ok(DeletionBitmap { bits, deleted_count })
    }

    /// The bitmap recorded for `info`, or an empty one.
    pub fn load(storage: &dyn Storage, info: &SegmentInfo) -> Result<Self> {
        match info.deletions_file_name() {
            Some(name) => {
                let bitmap = Self::read(storage, &name)?;
                if bitmap.len() != info.doc_count as usize {
                    return Err(TaxisError::index(format!(
                        "{name} covers {} documents, segment has {}",
                        bitmap.len(),
                        info.doc_count
                    )));
                }
                Ok(bitmap)
            }
            None => Ok(Self::new(info.doc_count as usize)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::document::CategoryPath;
    use crate::storage::memory::MemoryStorage;

    fn docs() -> Vec<IndexedDocument> {
        vec![
            IndexedDocument::new("foo bar", CategoryPath::from_names(["A", "B"], None)),
            IndexedDocument::new("baz", CategoryPath::from_names(["C"], None)),
        ]
    }

    #[test]
    fn test_segment_write_read() {
        let storage = MemoryStorage::new();
        let documents = docs();
        write_segment(&storage, 3, &documents).unwrap();

        let info = SegmentInfo {
            number: 3,
            doc_count: 2,
            deletions_generation: None,
            deleted_count: 0,
        };
        assert!(storage.file_exists("segment_000003.seg"));
        assert_eq!(read_segment(&storage, &info).unwrap(), documents);

        let wrong = SegmentInfo {
            doc_count: 5,
            ..info
        };
        assert!(read_segment(&storage, &wrong).is_err());
    }

    #[test]
    fn test_deletion_bitmap() {
        let storage = MemoryStorage::new();
        let mut bitmap = DeletionBitmap::new(10);
        assert!(bitmap.delete(3));
        assert!(!bitmap.delete(3));
        assert!(!bitmap.delete(42));
        assert!(bitmap.delete(9));
        assert_eq!(bitmap.deleted_count(), 2);

        bitmap.write(&storage, "segment_000001_000002.del").unwrap();
        let read = DeletionBitmap::read(&storage, "segment_000001_000002.del").unwrap();
        assert_eq!(read, bitmap);
        assert!(read.is_deleted(3));
        assert!(!read.is_deleted(4));
    }

    #[test]
    fn test_manifest_store_load() {
        let storage = MemoryStorage::new();
        assert!(Manifest::load(&storage).unwrap().is_none());

        let manifest = Manifest {
            generation: 2,
            next_segment: 3,
            committed_at: Utc::now(),
            segments: vec![SegmentInfo {
                number: 1,
                doc_count: 4,
                deletions_generation: Some(2),
                deleted_count: 1,
            }],
        };
        manifest.store(&storage).unwrap();

        let loaded = Manifest::load(&storage).unwrap().unwrap();
        assert_eq!(loaded.generation, 2);
        assert_eq!(loaded.live_count(), 3);
        assert_eq!(
            loaded.files(),
            vec![
                "manifest.json".to_string(),
                "segment_000001.seg".to_string(),
                "segment_000001_000002.del".to_string(),
            ]
        );
        assert!(!storage.file_exists("manifest.json.tmp"));
    }
}
