//! Opaque nested record payload.
//!
//! The aggregation core never interprets field contents. It only needs to
//! find references to other record types, so the payload is a generic tree
//! of tagged nodes with a narrow extraction interface.

use serde::{Deserialize, Serialize};

use super::record::RecordId;

/// Path suffix addressing the ids behind a reference field.
const REFERENCE_ITEM_PATH: &str = "moduleReferenceItem.moduleItemId";

/// One node of a payload tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PayloadNode {
    /// Scalar field (data field or vocabulary reference by id).
    Field { name: String, value: String },
    /// Named group of nodes. Repeated groups appear as siblings sharing a name.
    Group {
        name: String,
        #[serde(default)]
        children: Vec<PayloadNode>,
    },
    /// Reference to records of another type.
    Reference {
        name: String,
        target: String,
        #[serde(default)]
        ids: Vec<RecordId>,
    },
}

impl PayloadNode {
    pub fn name(&self) -> &str {
        match self {
            PayloadNode::Field { name, .. }
            | PayloadNode::Group { name, .. }
            | PayloadNode::Reference { name, .. } => name,
        }
    }
}

/// Ordered top-level nodes of a record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(Vec<PayloadNode>);

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, node: PayloadNode) {
        self.0.push(node);
    }

    /// Ids referenced anywhere in the tree that point at records of `target`.
    ///
    /// Order of first appearance; duplicates are kept, callers deduplicate.
    pub fn references_to(&self, target: &str) -> Vec<RecordId> {
        let mut out = Vec::new();
        collect_references(&self.0, target, &mut out);
        out
    }

    /// Scalar values found at a dotted field path.
    ///
    /// `Group.Field` descends into groups; `Ref.moduleReferenceItem.moduleItemId`
    /// (or just `Ref`) yields the referenced ids.
    pub fn values_at(&self, path: &str) -> Vec<String> {
        let mut out = Vec::new();
        collect_values(&self.0, path, &mut out);
        out
    }
}

impl From<Vec<PayloadNode>> for Payload {
    fn from(nodes: Vec<PayloadNode>) -> Self {
        Self(nodes)
    }
}

fn collect_references(nodes: &[PayloadNode], target: &str, out: &mut Vec<RecordId>) {
    for node in nodes {
        match node {
            PayloadNode::Reference {
                target: t, ids, ..
            } if t == target => out.extend(ids.iter().cloned()),
            PayloadNode::Group { children, .. } => collect_references(children, target, out),
            _ => {}
        }
    }
}

fn collect_values(nodes: &[PayloadNode], path: &str, out: &mut Vec<String>) {
    let (head, rest) = match path.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    };

    for node in nodes.iter().filter(|n| n.name() == head) {
        match (node, rest) {
            (PayloadNode::Field { value, .. }, None) => out.push(value.clone()),
            (PayloadNode::Group { children, .. }, Some(rest)) => {
                collect_values(children, rest, out)
            }
            (PayloadNode::Reference { ids, .. }, None) => {
                out.extend(ids.iter().map(|id| id.as_str().to_string()))
            }
            (PayloadNode::Reference { ids, .. }, Some(rest)) if rest == REFERENCE_ITEM_PATH => {
                out.extend(ids.iter().map(|id| id.as_str().to_string()))
            }
            _ => {}
        }
    }
}
