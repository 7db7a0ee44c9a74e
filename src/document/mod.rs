//! Multi-type record documents.
//!
//! A [`Document`] maps record-type names ("Object", "Multimedia", "Person", …)
//! to [`RecordSet`]s. It is both what a remote search returns and what a chunk
//! is assembled into. Documents only grow through [`Document::merge`], which
//! deduplicates by record id and keeps the most recently modified version.

pub mod error;
pub mod merge;
pub mod payload;
pub mod record;

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::timestamp::{NormalizedTimestamp, TimestampResult};

pub use error::{DocumentError, DocumentResult};
pub use payload::{Payload, PayloadNode};
pub use record::{Record, RecordId};

// ---------------------------------------------------------------------------
// RecordSet
// ---------------------------------------------------------------------------

/// All records of one type, unique by id, in insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RecordSetRepr")]
pub struct RecordSet {
    name: String,
    /// Count reported by the remote side, or the local count after a merge.
    total_size: u64,
    records: Vec<Record>,
    #[serde(skip)]
    index: HashMap<RecordId, usize>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordSetRepr {
    name: String,
    #[serde(default)]
    total_size: Option<u64>,
    #[serde(default)]
    records: Vec<Record>,
}

impl TryFrom<RecordSetRepr> for RecordSet {
    type Error = String;

    fn try_from(repr: RecordSetRepr) -> Result<Self, Self::Error> {
        let mut set = RecordSet::new(repr.name);
        for record in repr.records {
            if set.contains(&record.id) {
                return Err(format!(
                    "duplicate record id {} in module {}",
                    record.id, set.name
                ));
            }
            set.upsert(record);
        }
        set.total_size = repr.total_size.unwrap_or(set.records.len() as u64);
        Ok(set)
    }
}

impl RecordSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            total_size: 0,
            records: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Total as last reported by the remote side (or recomputed by a merge).
    pub fn reported_total(&self) -> u64 {
        self.total_size
    }

    pub fn set_reported_total(&mut self, total: u64) {
        self.total_size = total;
    }

    /// Number of records actually held.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    pub fn get(&self, id: &RecordId) -> Option<&Record> {
        self.index.get(id).map(|&i| &self.records[i])
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.index.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &RecordId> {
        self.records.iter().map(|r| &r.id)
    }

    /// Insert a record, replacing any record with the same id wholesale.
    ///
    /// The replaced record keeps its position.
    pub fn upsert(&mut self, record: Record) {
        match self.index.get(&record.id) {
            Some(&i) => self.records[i] = record,
            None => {
                self.index.insert(record.id.clone(), self.records.len());
                self.records.push(record);
            }
        }
    }

    /// Keep only records matching `keep`.
    pub fn retain(&mut self, mut keep: impl FnMut(&Record) -> bool) {
        self.records.retain(|r| keep(r));
        self.reindex();
    }

    fn reindex(&mut self) {
        self.index = self
            .records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id.clone(), i))
            .collect();
    }
}

impl<'a> IntoIterator for &'a RecordSet {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// Per-type counts of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeSummary {
    pub name: String,
    pub records: usize,
    pub reported_total: u64,
}

/// Ordered collection of record sets, at most one per type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "DocumentRepr")]
pub struct Document {
    modules: Vec<RecordSet>,
}

#[derive(Deserialize)]
struct DocumentRepr {
    #[serde(default)]
    modules: Vec<RecordSet>,
}

impl TryFrom<DocumentRepr> for Document {
    type Error = String;

    fn try_from(repr: DocumentRepr) -> Result<Self, Self::Error> {
        let mut doc = Document::new();
        for set in repr.modules {
            if doc.set(set.name()).is_some() {
                return Err(format!("duplicate module {}", set.name()));
            }
            doc.modules.push(set);
        }
        Ok(doc)
    }
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Document holding a single record set.
    pub fn from_set(set: RecordSet) -> Self {
        Self { modules: vec![set] }
    }

    pub fn set(&self, type_name: &str) -> Option<&RecordSet> {
        self.modules.iter().find(|s| s.name == type_name)
    }

    pub fn set_mut(&mut self, type_name: &str) -> Option<&mut RecordSet> {
        self.modules.iter_mut().find(|s| s.name == type_name)
    }

    /// The set for `type_name`, created empty if absent.
    pub fn ensure_set(&mut self, type_name: &str) -> &mut RecordSet {
        let pos = match self.modules.iter().position(|s| s.name == type_name) {
            Some(pos) => pos,
            None => {
                self.modules.push(RecordSet::new(type_name));
                self.modules.len() - 1
            }
        };
        &mut self.modules[pos]
    }

    /// Insert a record into the set of `type_name`, replacing by id.
    pub fn insert(&mut self, type_name: &str, record: Record) {
        self.ensure_set(type_name).upsert(record);
    }

    pub fn get(&self, type_name: &str, id: &RecordId) -> Option<&Record> {
        self.set(type_name).and_then(|s| s.get(id))
    }

    /// Type names in document order.
    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.modules.iter().map(|s| s.name.as_str())
    }

    pub fn sets(&self) -> std::slice::Iter<'_, RecordSet> {
        self.modules.iter()
    }

    /// Every record paired with its type name.
    pub fn records(&self) -> impl Iterator<Item = (&str, &Record)> {
        self.modules
            .iter()
            .flat_map(|s| s.records.iter().map(move |r| (s.name.as_str(), r)))
    }

    /// Number of records of `type_name` actually held.
    pub fn count(&self, type_name: &str) -> usize {
        self.set(type_name).map_or(0, RecordSet::len)
    }

    /// Total number of records over all types.
    pub fn len(&self) -> usize {
        self.modules.iter().map(RecordSet::len).sum()
    }

    /// True when no set holds any record.
    pub fn is_empty(&self) -> bool {
        self.modules.iter().all(RecordSet::is_empty)
    }

    pub fn describe(&self) -> Vec<TypeSummary> {
        self.modules
            .iter()
            .map(|s| TypeSummary {
                name: s.name.clone(),
                records: s.len(),
                reported_total: s.total_size,
            })
            .collect()
    }

    /// Deduplicated ids referenced to `target` by any record, in first-seen order.
    pub fn references_to(&self, target: &str) -> Vec<RecordId> {
        let mut seen = std::collections::HashSet::new();
        self.records()
            .flat_map(|(_, r)| r.references_to(target))
            .filter(|id| seen.insert(id.clone()))
            .collect()
    }

    /// Drop every record not modified strictly after `since`.
    ///
    /// Records without a last-modified value are dropped too. Fails without
    /// touching the document if `since` or any record timestamp is malformed.
    pub fn retain_modified_since(&mut self, since: &str) -> DocumentResult<()> {
        let since = NormalizedTimestamp::parse(since).map_err(|source| DocumentError::Since {
            value: since.to_string(),
            source,
        })?;

        let mut keep: HashMap<(String, RecordId), bool> = HashMap::new();
        for (type_name, record) in self.records() {
            let newer = match record_timestamp(type_name, record)? {
                Some(ts) => ts.is_after(&since),
                None => false,
            };
            keep.insert((type_name.to_string(), record.id.clone()), newer);
        }

        for set in &mut self.modules {
            let name = set.name.clone();
            set.retain(|r| keep.get(&(name.clone(), r.id.clone())).copied().unwrap_or(false));
        }
        Ok(())
    }

    /// Parse a document from JSON text.
    pub fn from_json(json: &str, origin: &str) -> DocumentResult<Self> {
        serde_json::from_str(json).map_err(|e| DocumentError::Parse {
            origin: origin.to_string(),
            message: e.to_string(),
        })
    }

    pub fn to_json_pretty(&self) -> DocumentResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| DocumentError::Parse {
            origin: "in-memory document".into(),
            message: e.to_string(),
        })
    }

    /// Load a document from a JSON file.
    pub fn from_file(path: &Path) -> DocumentResult<Self> {
        let data = std::fs::read_to_string(path).map_err(|e| DocumentError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_json(&data, &path.display().to_string())
    }

    /// Write the document as pretty JSON, creating parent directories.
    pub fn to_file(&self, path: &Path) -> DocumentResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DocumentError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        let json = self.to_json_pretty()?;
        std::fs::write(path, json).map_err(|e| DocumentError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }
}

/// Normalized last-modified of a record, with document-level error context.
pub(crate) fn record_timestamp(
    type_name: &str,
    record: &Record,
) -> DocumentResult<Option<NormalizedTimestamp>> {
    let parsed: TimestampResult<_> = crate::timestamp::normalize_optional(record.last_modified.as_deref());
    parsed.map_err(|source| DocumentError::Timestamp {
        type_name: type_name.to_string(),
        id: record.id.to_string(),
        source,
    })
}
