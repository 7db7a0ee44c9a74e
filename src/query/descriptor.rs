//! Wire form of a query, as handed to a [`SearchPort`](crate::remote::SearchPort).
//!
//! The descriptor is deliberately stringly typed: it is what travels over the
//! network and what users write into query files. Turning it back into a
//! [`Query`](super::Query) re-validates operator and conjunction names.

use serde::{Deserialize, Serialize};

/// Serialized query against one target record type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryDescriptor {
    /// Record type searched.
    pub module: String,
    /// Maximum number of records to return. Absent: the remote decides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    /// Zero-based offset into the full result set.
    #[serde(default)]
    pub offset: u32,
    /// Field paths to return. Absent: all fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub select: Option<Vec<String>>,
    /// Expression tree. Absent: match every record of the type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expert: Option<Expr>,
}

/// A node of the expression tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "camelCase")]
pub enum Expr {
    Conjunction {
        kind: String,
        children: Vec<Expr>,
    },
    Criterion {
        field: String,
        operator: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        operand: Option<String>,
    },
}

impl Expr {
    /// All criterion leaves below (and including) this node, depth first.
    pub fn criteria(&self) -> Vec<&Expr> {
        let mut out = Vec::new();
        self.collect_criteria(&mut out);
        out
    }

    fn collect_criteria<'a>(&'a self, out: &mut Vec<&'a Expr>) {
        match self {
            Expr::Criterion { .. } => out.push(self),
            Expr::Conjunction { children, .. } => {
                for child in children {
                    child.collect_criteria(out);
                }
            }
        }
    }

    /// Conjunction kind and children, if this node is a conjunction.
    pub fn as_conjunction(&self) -> Option<(&str, &[Expr])> {
        match self {
            Expr::Conjunction { kind, children } => Some((kind, children)),
            Expr::Criterion { .. } => None,
        }
    }
}

impl QueryDescriptor {
    /// Pretty JSON, as written to query files.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Conjunction, Operator, Query};

    #[test]
    fn pretty_json_reads_back_as_the_same_query() {
        let mut q = Query::new("Multimedia").with_limit(5);
        let or = q.open_conjunction(q.root(), Conjunction::Or).unwrap();
        q.add_criterion(or, "__id", Operator::EqualsField, Some("10"))
            .unwrap();
        q.add_criterion(or, "MulOriginalFileTxt", Operator::IsNull, None)
            .unwrap();

        let json = q.serialize().to_json_pretty().unwrap();
        assert!(json.contains("\n  \"module\": \"Multimedia\""));
        let back: QueryDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, q.serialize());
        assert_eq!(Query::from_descriptor(&back).unwrap().criteria_count(), 2);
    }
}
