//! Related-item resolution.
//!
//! Given a batch of primary records, fetch every record of a secondary type
//! that the batch references, in a single query: an OR of id matches,
//! optionally narrowed to records modified after `since` and, for media, to
//! files a browser can show.

use crate::document::Document;
use crate::error::ChunkyResult;
use crate::query::{Conjunction, ID_FIELD, LAST_MODIFIED_FIELD, Operator, Query};
use crate::remote::SearchPort;
use crate::timestamp::NormalizedTimestamp;

/// Record type holding media files.
pub const MEDIA_TYPE: &str = "Multimedia";

/// Field carrying the original file name of a media record.
pub const MEDIA_FILE_FIELD: &str = "MulOriginalFileTxt";

/// File suffixes excluded when only publishable media are wanted.
pub const NON_BROWSABLE_SUFFIXES: &[&str] = &[
    ".mp3", ".mp4", ".mpeg", ".pdf", ".wav", ".wma", ".tif", ".tiff", ".zip",
];

/// Resolves references of primary records into documents of related records.
pub struct RelatedItemResolver<'a, P: ?Sized> {
    port: &'a P,
    since: Option<&'a str>,
    only_published: bool,
}

impl<'a, P: SearchPort + ?Sized> RelatedItemResolver<'a, P> {
    pub fn new(port: &'a P) -> Self {
        Self {
            port,
            since: None,
            only_published: false,
        }
    }

    /// Only fetch related records modified strictly after `since`.
    pub fn since(mut self, since: Option<&'a str>) -> Self {
        self.since = since;
        self
    }

    /// Skip media a browser cannot display.
    pub fn only_published(mut self, only_published: bool) -> Self {
        self.only_published = only_published;
        self
    }

    /// Fetch all records of `target` referenced from `primary`.
    ///
    /// Returns a document with an empty `target` set, without contacting the
    /// port, when nothing is referenced.
    pub fn resolve(&self, primary: &Document, target: &str) -> ChunkyResult<Document> {
        let Some(query) = related_query(primary, target, self.since, self.only_published)? else {
            tracing::warn!(record_type = target, "no references, skipping related search");
            let mut empty = Document::new();
            empty.ensure_set(target);
            return Ok(empty);
        };

        tracing::debug!(
            record_type = target,
            criteria = query.criteria_count(),
            since = self.since.unwrap_or(""),
            "resolving related records"
        );
        let mut doc = self.port.search(&query.serialize())?;
        doc.ensure_set(target);
        Ok(doc)
    }
}

/// Convenience wrapper around [`RelatedItemResolver`].
pub fn resolve<P: SearchPort + ?Sized>(
    port: &P,
    primary: &Document,
    target: &str,
    since: Option<&str>,
    only_published: bool,
) -> ChunkyResult<Document> {
    RelatedItemResolver::new(port)
        .since(since)
        .only_published(only_published)
        .resolve(primary, target)
}

/// Build the query fetching everything of `target` referenced by `primary`.
///
/// `None` when there is nothing to fetch. A malformed `since` fails even then,
/// so a bad value never goes unnoticed.
pub fn related_query(
    primary: &Document,
    target: &str,
    since: Option<&str>,
    only_published: bool,
) -> ChunkyResult<Option<Query>> {
    if let Some(since) = since {
        NormalizedTimestamp::parse(since)?;
    }

    let ids = primary.references_to(target);
    if ids.is_empty() {
        return Ok(None);
    }

    let mut by_id = Query::new(target);
    let or = by_id.open_conjunction(by_id.root(), Conjunction::Or)?;
    for id in &ids {
        by_id.add_criterion(or, ID_FIELD, Operator::EqualsField, Some(id.as_str()))?;
    }

    let published_filter = only_published && target == MEDIA_TYPE;
    if since.is_none() && !published_filter {
        return Ok(Some(by_id));
    }

    let mut q = Query::new(target);
    let and = q.open_conjunction(q.root(), Conjunction::And)?;
    q.graft_from(and, &by_id)?;
    if let Some(since) = since {
        q.add_criterion(and, LAST_MODIFIED_FIELD, Operator::Greater, Some(since))?;
    }
    if published_filter {
        let not = q.open_conjunction(and, Conjunction::Not)?;
        for suffix in NON_BROWSABLE_SUFFIXES {
            q.add_criterion(not, MEDIA_FILE_FIELD, Operator::EndsWithTerm, Some(suffix))?;
        }
    }
    Ok(Some(q))
}
