//! Individual records and their identifiers.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use super::payload::{Payload, PayloadNode};

/// Type-scoped, opaque record identifier.
///
/// The remote side uses integers, but ids are never computed with, so both
/// numeric and string JSON forms are accepted and kept as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<u64> for RecordId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }
        Ok(match Raw::deserialize(deserializer)? {
            Raw::Number(n) => RecordId::from(n),
            Raw::Text(s) => RecordId(s),
        })
    }
}

/// One record of a typed record set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: RecordId,
    /// Raw last-modified value as reported by the remote side.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    #[serde(default)]
    pub has_attachments: bool,
    #[serde(default, skip_serializing_if = "Payload::is_empty")]
    pub payload: Payload,
}

impl Record {
    pub fn new(id: impl Into<RecordId>) -> Self {
        Self {
            id: id.into(),
            last_modified: None,
            has_attachments: false,
            payload: Payload::new(),
        }
    }

    pub fn with_last_modified(mut self, ts: impl Into<String>) -> Self {
        self.last_modified = Some(ts.into());
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.payload.push(PayloadNode::Field {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn with_reference<I, T>(mut self, name: impl Into<String>, target: impl Into<String>, ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<RecordId>,
    {
        self.payload.push(PayloadNode::Reference {
            name: name.into(),
            target: target.into(),
            ids: ids.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn with_node(mut self, node: PayloadNode) -> Self {
        self.payload.push(node);
        self
    }

    /// Ids this record references in records of `target`.
    pub fn references_to(&self, target: &str) -> Vec<RecordId> {
        self.payload.references_to(target)
    }
}
