//! Expert-search query builder.
//!
//! A [`Query`] targets one record type and holds an append-only tree of
//! conjunction scopes whose leaves are criteria. Scopes are addressed through
//! explicit [`ScopeId`] handles returned by [`Query::open_conjunction`]:
//!
//! ```
//! use mpx_chunky::query::{Conjunction, Operator, Query};
//!
//! let mut q = Query::new("Object").with_limit(10);
//! let and = q.open_conjunction(q.root(), Conjunction::And).unwrap();
//! q.add_criterion(and, "ObjCurrentLocationVoc", Operator::EqualsField, Some("4220560"))
//!     .unwrap();
//! q.add_criterion(and, "__orgUnit", Operator::NotEqualsField, Some("EMPrimarverpackungen"))
//!     .unwrap();
//! let wire = q.serialize();
//! assert_eq!(wire.limit, Some(10));
//! ```

pub mod descriptor;
pub mod error;
pub mod operator;

use std::sync::atomic::{AtomicU64, Ordering};

pub use descriptor::{Expr, QueryDescriptor};
pub use error::{QueryError, QueryResult};
pub use operator::{Conjunction, Operator};

/// Field path of a record's identifier.
pub const ID_FIELD: &str = "__id";
/// Field path of a record's last-modified timestamp.
pub const LAST_MODIFIED_FIELD: &str = "__lastModified";

static NEXT_QUERY_TAG: AtomicU64 = AtomicU64::new(1);

/// Handle to an insertion scope of one particular [`Query`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeId {
    query: u64,
    slot: Slot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Root,
    Node(usize),
}

/// A single criterion leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Criterion {
    pub field: String,
    pub operator: Operator,
    pub operand: Option<String>,
}

#[derive(Debug, Clone)]
enum Node {
    Conjunction {
        kind: Conjunction,
        children: Vec<usize>,
    },
    Criterion(Criterion),
}

/// Query against a single record type.
///
/// Clones get a fresh tag, so scope handles of one copy are rejected by the
/// other.
#[derive(Debug)]
pub struct Query {
    tag: u64,
    target: String,
    limit: Option<u32>,
    offset: u32,
    fields: Option<Vec<String>>,
    nodes: Vec<Node>,
    root: Option<usize>,
}

impl Clone for Query {
    fn clone(&self) -> Self {
        Self {
            tag: next_tag(),
            ..self.same_tag()
        }
    }
}

fn next_tag() -> u64 {
    NEXT_QUERY_TAG.fetch_add(1, Ordering::Relaxed)
}

impl Query {
    /// Query every record of `target`, no limit, offset 0.
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            tag: next_tag(),
            target: target.into(),
            limit: None,
            offset: 0,
            fields: None,
            nodes: Vec::new(),
            root: None,
        }
    }

    /// Cap the number of returned records.
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip the first `offset` records of the full result set.
    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    /// Copy of this query with a different limit/offset window.
    ///
    /// Scope handles of `self` stay valid for the copy.
    pub fn with_window(&self, limit: Option<u32>, offset: u32) -> Self {
        Self {
            limit,
            offset,
            ..self.same_tag()
        }
    }

    fn same_tag(&self) -> Self {
        Self {
            tag: self.tag,
            target: self.target.clone(),
            limit: self.limit,
            offset: self.offset,
            fields: self.fields.clone(),
            nodes: self.nodes.clone(),
            root: self.root,
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn limit(&self) -> Option<u32> {
        self.limit
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Number of criterion leaves.
    pub fn criteria_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Criterion(_)))
            .count()
    }

    /// The implicit top-level scope.
    pub fn root(&self) -> ScopeId {
        ScopeId {
            query: self.tag,
            slot: Slot::Root,
        }
    }

    /// Open a conjunction as a child of `parent` and return its scope.
    pub fn open_conjunction(
        &mut self,
        parent: ScopeId,
        kind: Conjunction,
    ) -> QueryResult<ScopeId> {
        self.check_scope(parent)?;
        let idx = self.push_node(
            parent,
            Node::Conjunction {
                kind,
                children: Vec::new(),
            },
        )?;
        Ok(ScopeId {
            query: self.tag,
            slot: Slot::Node(idx),
        })
    }

    /// Append a criterion to `scope`.
    ///
    /// `operand` must be present unless the operator is one of the
    /// null/blank tests.
    pub fn add_criterion(
        &mut self,
        scope: ScopeId,
        field: impl Into<String>,
        operator: Operator,
        operand: Option<&str>,
    ) -> QueryResult<()> {
        self.check_scope(scope)?;
        let field = field.into();
        if operator.takes_operand() && operand.is_none() {
            return Err(QueryError::MissingOperand {
                operator: operator.to_string(),
                field,
            });
        }
        self.push_node(
            scope,
            Node::Criterion(Criterion {
                field,
                operator,
                operand: operand.map(str::to_string),
            }),
        )?;
        Ok(())
    }

    /// Only return the listed field paths. Does not affect matching.
    pub fn restrict_fields<I, S>(&mut self, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields
            .get_or_insert_with(Vec::new)
            .extend(fields.into_iter().map(Into::into));
    }

    /// Produce the wire descriptor.
    pub fn serialize(&self) -> QueryDescriptor {
        QueryDescriptor {
            module: self.target.clone(),
            limit: self.limit,
            offset: self.offset,
            select: self.fields.clone(),
            expert: self.root.map(|idx| self.expr_at(idx)),
        }
    }

    /// Rebuild a query from its wire form, validating every name.
    pub fn from_descriptor(desc: &QueryDescriptor) -> QueryResult<Self> {
        let mut q = Query::new(desc.module.clone()).with_offset(desc.offset);
        q.limit = desc.limit;
        q.fields = desc.select.clone();
        if let Some(expr) = &desc.expert {
            let root = q.root();
            q.graft(root, expr)?;
        }
        Ok(q)
    }

    /// Copy the expression of `other` below `scope` of this query.
    pub fn graft_from(&mut self, scope: ScopeId, other: &Query) -> QueryResult<()> {
        match other.root {
            Some(idx) => self.graft(scope, &other.expr_at(idx)),
            None => self.check_scope(scope),
        }
    }

    fn graft(&mut self, scope: ScopeId, expr: &Expr) -> QueryResult<()> {
        match expr {
            Expr::Criterion {
                field,
                operator,
                operand,
            } => {
                let op: Operator = operator.parse()?;
                self.add_criterion(scope, field.clone(), op, operand.as_deref())
            }
            Expr::Conjunction { kind, children } => {
                let kind: Conjunction = kind.parse()?;
                let inner = self.open_conjunction(scope, kind)?;
                for child in children {
                    self.graft(inner, child)?;
                }
                Ok(())
            }
        }
    }

    fn check_scope(&self, scope: ScopeId) -> QueryResult<()> {
        let valid = scope.query == self.tag
            && match scope.slot {
                Slot::Root => true,
                Slot::Node(idx) => matches!(self.nodes.get(idx), Some(Node::Conjunction { .. })),
            };
        if valid {
            Ok(())
        } else {
            Err(QueryError::UnknownScope {
                target: self.target.clone(),
            })
        }
    }

    fn push_node(&mut self, scope: ScopeId, node: Node) -> QueryResult<usize> {
        let idx = self.nodes.len();
        match scope.slot {
            Slot::Root => {
                if self.root.is_some() {
                    return Err(QueryError::RootOccupied {
                        target: self.target.clone(),
                    });
                }
                self.nodes.push(node);
                self.root = Some(idx);
            }
            Slot::Node(parent) => {
                self.nodes.push(node);
                if let Some(Node::Conjunction { children, .. }) = self.nodes.get_mut(parent) {
                    children.push(idx);
                }
            }
        }
        Ok(idx)
    }

    fn expr_at(&self, idx: usize) -> Expr {
        match &self.nodes[idx] {
            Node::Criterion(c) => Expr::Criterion {
                field: c.field.clone(),
                operator: c.operator.as_str().to_string(),
                operand: c.operand.clone(),
            },
            Node::Conjunction { kind, children } => Expr::Conjunction {
                kind: kind.as_str().to_string(),
                children: children.iter().map(|&c| self.expr_at(c)).collect(),
            },
        }
    }
}
