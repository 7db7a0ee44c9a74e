//! Containers that can be paginated.
//!
//! A container names a set of primary records: an object group, an
//! exhibition, a storage location, an approval, or the result of an arbitrary
//! query. Each knows how to build the page query for one chunk.

use std::fmt;
use std::str::FromStr;

use crate::query::{Conjunction, Operator, Query, QueryResult};

/// Primary record type of every built-in container.
pub const OBJECT_TYPE: &str = "Object";

/// Publication value marking an approval as granted.
pub const APPROVAL_GRANTED: &str = "1810139";

const GROUP_FIELD: &str = "ObjObjectGroupsRef.moduleReferenceItem.moduleItemId";
const EXHIBIT_FIELD: &str = "ObjRegistrarRef.RegExhibitionRef.moduleReferenceItem.moduleItemId";
const LOCATION_FIELD: &str = "ObjCurrentLocationVoc";
const APPROVAL_TYPE_FIELD: &str = "ObjPublicationGrp.TypeVoc";
const APPROVAL_PUBLICATION_FIELD: &str = "ObjPublicationGrp.PublicationVoc";

/// Kind of container, parsed from its short label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Group,
    Exhibit,
    Location,
    Approval,
    Query,
}

impl ContainerKind {
    pub const ALL: [ContainerKind; 5] = [
        ContainerKind::Group,
        ContainerKind::Exhibit,
        ContainerKind::Location,
        ContainerKind::Approval,
        ContainerKind::Query,
    ];

    /// Short label used in chunk file names.
    pub fn label(self) -> &'static str {
        match self {
            ContainerKind::Group => "group",
            ContainerKind::Exhibit => "exhibit",
            ContainerKind::Location => "loc",
            ContainerKind::Approval => "approval",
            ContainerKind::Query => "query",
        }
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ContainerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "group" => Ok(ContainerKind::Group),
            "exhibit" | "exhibition" => Ok(ContainerKind::Exhibit),
            "loc" | "location" => Ok(ContainerKind::Location),
            "approval" => Ok(ContainerKind::Approval),
            "query" => Ok(ContainerKind::Query),
            other => Err(format!(
                "unknown container kind \"{other}\", expected one of: group, exhibit, loc, approval, query"
            )),
        }
    }
}

/// A paginated set of primary records.
#[derive(Debug, Clone)]
pub enum Container {
    Group(String),
    Exhibit(String),
    Location(String),
    Approval(String),
    /// Result of a supplied query; `name` identifies it in chunk names.
    Query { name: String, query: Query },
}

impl Container {
    /// Built-in container of `kind` with the given id.
    ///
    /// Returns `None` for [`ContainerKind::Query`], which needs a query.
    pub fn new(kind: ContainerKind, id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        match kind {
            ContainerKind::Group => Some(Container::Group(id)),
            ContainerKind::Exhibit => Some(Container::Exhibit(id)),
            ContainerKind::Location => Some(Container::Location(id)),
            ContainerKind::Approval => Some(Container::Approval(id)),
            ContainerKind::Query => None,
        }
    }

    pub fn from_query(name: impl Into<String>, query: Query) -> Self {
        Container::Query {
            name: name.into(),
            query,
        }
    }

    pub fn kind(&self) -> ContainerKind {
        match self {
            Container::Group(_) => ContainerKind::Group,
            Container::Exhibit(_) => ContainerKind::Exhibit,
            Container::Location(_) => ContainerKind::Location,
            Container::Approval(_) => ContainerKind::Approval,
            Container::Query { .. } => ContainerKind::Query,
        }
    }

    pub fn label(&self) -> &'static str {
        self.kind().label()
    }

    /// Container id, or the query name.
    pub fn id(&self) -> &str {
        match self {
            Container::Group(id)
            | Container::Exhibit(id)
            | Container::Location(id)
            | Container::Approval(id) => id,
            Container::Query { name, .. } => name,
        }
    }

    /// Record type being paginated.
    pub fn primary_type(&self) -> &str {
        match self {
            Container::Query { query, .. } => query.target(),
            _ => OBJECT_TYPE,
        }
    }

    /// Query for the window `[offset, offset + limit)` of this container.
    pub fn page_query(&self, limit: u32, offset: u32) -> QueryResult<Query> {
        let single = |field: &str, id: &str| -> QueryResult<Query> {
            let mut q = Query::new(OBJECT_TYPE).with_limit(limit).with_offset(offset);
            let root = q.root();
            q.add_criterion(root, field, Operator::EqualsField, Some(id))?;
            Ok(q)
        };

        match self {
            Container::Group(id) => single(GROUP_FIELD, id.as_str()),
            Container::Exhibit(id) => single(EXHIBIT_FIELD, id.as_str()),
            Container::Location(id) => single(LOCATION_FIELD, id.as_str()),
            Container::Approval(id) => {
                let mut q = Query::new(OBJECT_TYPE).with_limit(limit).with_offset(offset);
                let and = q.open_conjunction(q.root(), Conjunction::And)?;
                q.add_criterion(and, APPROVAL_TYPE_FIELD, Operator::EqualsField, Some(id.as_str()))?;
                q.add_criterion(
                    and,
                    APPROVAL_PUBLICATION_FIELD,
                    Operator::EqualsField,
                    Some(APPROVAL_GRANTED),
                )?;
                Ok(q)
            }
            Container::Query { query, .. } => Ok(query.with_window(Some(limit), offset)),
        }
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.label(), self.id())
    }
}
