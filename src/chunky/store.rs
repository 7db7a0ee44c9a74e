//! Chunk files on disk.
//!
//! Every chunk of a container is one JSON document named
//! `{label}{id}-chunk{n}.json`, numbered gap-free from 1. The highest number
//! present tells a resumed run where to pick up.

use std::path::{Path, PathBuf};

use crate::document::Document;
use crate::error::{StoreError, StoreResult};

use super::Chunk;
use super::container::Container;

/// Directory of persisted chunks for one container.
#[derive(Debug, Clone)]
pub struct ChunkStore {
    dir: PathBuf,
    prefix: String,
}

impl ChunkStore {
    /// Store for `container`'s chunks inside `dir`.
    pub fn new(dir: impl Into<PathBuf>, container: &Container) -> Self {
        Self::with_prefix(dir, container.to_string())
    }

    /// Store using an explicit file-name prefix, e.g. `group29825`.
    pub fn with_prefix(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_name(&self, number: u32) -> String {
        format!("{}-chunk{number}.json", self.prefix)
    }

    pub fn path(&self, number: u32) -> PathBuf {
        self.dir.join(self.file_name(number))
    }

    /// Persist a chunk, replacing an earlier file of the same number.
    pub fn write(&self, chunk: &Chunk) -> StoreResult<PathBuf> {
        if chunk.number == 0 {
            return Err(StoreError::InvalidNumber {
                number: chunk.number,
            });
        }
        let path = self.path(chunk.number);
        chunk.document.to_file(&path)?;
        tracing::debug!(path = %path.display(), records = chunk.document.len(), "chunk written");
        Ok(path)
    }

    pub fn read(&self, number: u32) -> StoreResult<Document> {
        let path = self.path(number);
        if !path.is_file() {
            return Err(StoreError::Missing {
                number,
                path: path.display().to_string(),
            });
        }
        Ok(Document::from_file(&path)?)
    }

    /// Numbers of all stored chunks, ascending.
    pub fn chunk_numbers(&self) -> StoreResult<Vec<u32>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }
        let entries = std::fs::read_dir(&self.dir).map_err(|e| StoreError::Io {
            path: self.dir.display().to_string(),
            source: e,
        })?;

        let mut numbers: Vec<u32> = entries
            .filter_map(|e| e.ok())
            .filter_map(|e| e.file_name().into_string().ok())
            .filter_map(|name| self.parse_number(&name))
            .collect();
        numbers.sort_unstable();
        Ok(numbers)
    }

    /// Highest stored chunk number.
    ///
    /// Logs a warning when the sequence below it has gaps.
    pub fn last_chunk(&self) -> StoreResult<Option<u32>> {
        let numbers = self.chunk_numbers()?;
        let Some(&last) = numbers.last() else {
            return Ok(None);
        };
        if numbers.len() != last as usize {
            let missing: Vec<u32> = (1..last).filter(|n| numbers.binary_search(n).is_err()).collect();
            tracing::warn!(prefix = %self.prefix, last, ?missing, "chunk sequence has gaps");
        }
        Ok(Some(last))
    }

    /// Chunk number a resumed run starts at.
    ///
    /// The last stored chunk is fetched again since it may have been cut short.
    pub fn fast_forward(&self) -> StoreResult<u32> {
        Ok(self.last_chunk()?.unwrap_or(1))
    }

    /// Delete every chunk of this container. Returns how many were removed.
    pub fn clear(&self) -> StoreResult<usize> {
        let numbers = self.chunk_numbers()?;
        for &n in &numbers {
            let path = self.path(n);
            std::fs::remove_file(&path).map_err(|e| StoreError::Io {
                path: path.display().to_string(),
                source: e,
            })?;
        }
        Ok(numbers.len())
    }

    fn parse_number(&self, name: &str) -> Option<u32> {
        let digits = name
            .strip_prefix(self.prefix.as_str())?
            .strip_prefix("-chunk")?
            .strip_suffix(".json")?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok().filter(|&n| n > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Record;

    fn chunk(number: u32) -> Chunk {
        let mut document = Document::new();
        document.insert("Object", Record::new(u64::from(number)));
        Chunk {
            number,
            offset: (number - 1) * 10,
            primary_count: 1,
            reported_total: 1,
            document,
        }
    }

    #[test]
    fn file_names_follow_container() {
        let store = ChunkStore::new("/tmp/chunks", &Container::Location("4220560".into()));
        assert_eq!(store.file_name(3), "loc4220560-chunk3.json");
    }

    #[test]
    fn parse_rejects_foreign_names() {
        let store = ChunkStore::with_prefix("/tmp", "group1");
        assert_eq!(store.parse_number("group1-chunk7.json"), Some(7));
        assert_eq!(store.parse_number("group12-chunk7.json"), None);
        assert_eq!(store.parse_number("group1-chunk+7.json"), None);
        assert_eq!(store.parse_number("group1-chunk0.json"), None);
        assert_eq!(store.parse_number("group1-chunk7.xml"), None);
    }

    #[test]
    fn write_read_and_fast_forward() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = ChunkStore::with_prefix(dir.path(), "group1");
        assert_eq!(store.fast_forward().unwrap(), 1);

        for n in 1..=3 {
            store.write(&chunk(n)).unwrap();
        }
        // Another container's chunk in the same directory is ignored.
        ChunkStore::with_prefix(dir.path(), "group2")
            .write(&chunk(9))
            .unwrap();

        assert_eq!(store.chunk_numbers().unwrap(), vec![1, 2, 3]);
        assert_eq!(store.fast_forward().unwrap(), 3);
        assert!(store.read(2).unwrap().get("Object", &2u64.into()).is_some());
        assert!(matches!(store.read(4), Err(StoreError::Missing { number: 4, .. })));
    }

    #[test]
    fn gaps_still_report_highest() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = ChunkStore::with_prefix(dir.path(), "exhibit5");
        store.write(&chunk(1)).unwrap();
        store.write(&chunk(4)).unwrap();
        assert_eq!(store.last_chunk().unwrap(), Some(4));
    }

    #[test]
    fn clear_removes_only_own_chunks() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = ChunkStore::with_prefix(dir.path(), "group1");
        let other = ChunkStore::with_prefix(dir.path(), "group2");
        store.write(&chunk(1)).unwrap();
        store.write(&chunk(2)).unwrap();
        other.write(&chunk(1)).unwrap();

        assert_eq!(store.clear().unwrap(), 2);
        assert!(store.chunk_numbers().unwrap().is_empty());
        assert_eq!(other.chunk_numbers().unwrap(), vec![1]);
    }

    #[test]
    fn chunk_zero_is_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = ChunkStore::with_prefix(dir.path(), "group1");
        let mut c = chunk(1);
        c.number = 0;
        assert!(matches!(store.write(&c), Err(StoreError::InvalidNumber { .. })));
    }
}
