//! In-memory search port.
//!
//! Answers queries from a local [`Document`] the way the remote service would:
//! the expression tree is evaluated per record, the reported total is the full
//! match count, and offset/limit cut the returned window. Every descriptor
//! received is logged for inspection.
//!
//! Field paths resolve to `__id`, `__lastModified` or payload values (see
//! [`Payload::values_at`](crate::document::Payload::values_at)). `equals*`,
//! `contains`, `startsWith*` and `endsWith*` compare case-insensitively; the
//! ordering operators compare normalized timestamps, then numbers, then text.
//! A `not` scope with several children matches when none of them does.

use std::cmp::Ordering;
use std::path::Path;
use std::sync::Mutex;

use crate::document::{Document, DocumentResult, Record, RecordSet};
use crate::query::{Conjunction, Expr, ID_FIELD, LAST_MODIFIED_FIELD, Operator, QueryDescriptor};
use crate::timestamp::NormalizedTimestamp;

use super::SearchPort;
use super::error::{RemoteError, RemoteResult};

/// Search port serving a fixed document.
#[derive(Debug, Default)]
pub struct MemorySearchPort {
    source: Document,
    received: Mutex<Vec<QueryDescriptor>>,
}

impl MemorySearchPort {
    pub fn new(source: Document) -> Self {
        Self {
            source,
            received: Mutex::new(Vec::new()),
        }
    }

    /// Serve the document stored in a JSON file.
    pub fn from_file(path: &Path) -> DocumentResult<Self> {
        Ok(Self::new(Document::from_file(path)?))
    }

    pub fn source(&self) -> &Document {
        &self.source
    }

    /// Every descriptor searched so far, in order.
    pub fn received(&self) -> Vec<QueryDescriptor> {
        self.received
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    pub fn request_count(&self) -> usize {
        self.received.lock().map(|log| log.len()).unwrap_or(0)
    }
}

impl SearchPort for MemorySearchPort {
    fn search(&self, query: &QueryDescriptor) -> RemoteResult<Document> {
        if let Ok(mut log) = self.received.lock() {
            log.push(query.clone());
        }

        let mut matched = Vec::new();
        if let Some(set) = self.source.set(&query.module) {
            for record in set {
                let hit = match &query.expert {
                    Some(expr) => eval(expr, record)
                        .map_err(|cause| RemoteError::failed(&query.module, cause))?,
                    None => true,
                };
                if hit {
                    matched.push(record);
                }
            }
        }

        let mut out = RecordSet::new(query.module.clone());
        out.set_reported_total(matched.len() as u64);
        let window = matched
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit.map_or(usize::MAX, |l| l as usize));
        for record in window {
            out.upsert(record.clone());
        }

        tracing::debug!(
            module = %query.module,
            offset = query.offset,
            returned = out.len(),
            total = out.reported_total(),
            "in-memory search"
        );
        Ok(Document::from_set(out))
    }
}

fn eval(expr: &Expr, record: &Record) -> Result<bool, String> {
    match expr {
        Expr::Conjunction { kind, children } => {
            let kind: Conjunction = kind.parse().map_err(|e| format!("{e}"))?;
            let mut results = children.iter().map(|c| eval(c, record));
            match kind {
                Conjunction::And => results.try_fold(true, |acc, r| r.map(|b| acc && b)),
                Conjunction::Or => results.try_fold(false, |acc, r| r.map(|b| acc || b)),
                Conjunction::Not => results
                    .try_fold(false, |acc, r| r.map(|b| acc || b))
                    .map(|any| !any),
            }
        }
        Expr::Criterion {
            field,
            operator,
            operand,
        } => {
            let op: Operator = operator.parse().map_err(|e| format!("{e}"))?;
            let values = field_values(record, field);
            eval_criterion(op, &values, operand.as_deref())
        }
    }
}

fn field_values(record: &Record, field: &str) -> Vec<String> {
    match field {
        ID_FIELD => vec![record.id.to_string()],
        LAST_MODIFIED_FIELD => record.last_modified.iter().cloned().collect(),
        path => record.payload.values_at(path),
    }
}

fn eval_criterion(op: Operator, values: &[String], operand: Option<&str>) -> Result<bool, String> {
    let needle = || {
        operand
            .map(str::to_lowercase)
            .ok_or_else(|| format!("operator {op} needs an operand"))
    };
    let lowered = || values.iter().map(|v| v.to_lowercase());

    Ok(match op {
        Operator::IsNull => values.is_empty(),
        Operator::IsNotNull => !values.is_empty(),
        Operator::IsBlank => values.iter().all(|v| v.trim().is_empty()),
        Operator::IsNotBlank => values.iter().any(|v| !v.trim().is_empty()),
        Operator::EqualsField | Operator::EqualsTerm => {
            let n = needle()?;
            lowered().any(|v| v == n)
        }
        Operator::NotEqualsField | Operator::NotEqualsTerm => {
            let n = needle()?;
            !lowered().any(|v| v == n)
        }
        Operator::Contains => {
            let n = needle()?;
            lowered().any(|v| v.contains(&n))
        }
        Operator::StartsWithField | Operator::StartsWithTerm => {
            let n = needle()?;
            lowered().any(|v| v.starts_with(&n))
        }
        Operator::EndsWithField | Operator::EndsWithTerm => {
            let n = needle()?;
            lowered().any(|v| v.ends_with(&n))
        }
        Operator::Greater | Operator::GreaterEquals | Operator::Less | Operator::LessEquals => {
            let operand = operand.ok_or_else(|| format!("operator {op} needs an operand"))?;
            values.iter().any(|v| {
                let ord = compare(v, operand);
                match op {
                    Operator::Greater => ord == Ordering::Greater,
                    Operator::GreaterEquals => ord != Ordering::Less,
                    Operator::Less => ord == Ordering::Less,
                    _ => ord != Ordering::Greater,
                }
            })
        }
        Operator::BetweenIncl | Operator::BetweenExcl => {
            return Err(format!("operator {op} is not supported by the in-memory port"));
        }
    })
}

fn compare(value: &str, operand: &str) -> Ordering {
    if let (Ok(a), Ok(b)) = (
        NormalizedTimestamp::parse(value),
        NormalizedTimestamp::parse(operand),
    ) {
        return a.cmp(&b);
    }
    if let (Ok(a), Ok(b)) = (value.parse::<f64>(), operand.parse::<f64>()) {
        return a.partial_cmp(&b).unwrap_or(Ordering::Equal);
    }
    value.cmp(operand)
}
