//! Chunked pagination of containers.
//!
//! [`Chunky`] walks a container page by page. For every non-empty page it
//! resolves the configured secondary types (media and persons by default)
//! and yields the merged result as one [`Chunk`]. Pages are fetched lazily
//! and strictly one after the other, so a consumer can persist each chunk
//! before the next request goes out and stop at any point.
//!
//! ```no_run
//! use mpx_chunky::chunky::{Chunky, Container, ContainerKind};
//! use mpx_chunky::remote::MemorySearchPort;
//! use mpx_chunky::document::Document;
//!
//! let port = MemorySearchPort::new(Document::new());
//! let container = Container::new(ContainerKind::Group, "29825").unwrap();
//! let chunky = Chunky::new(port, container, 1000).unwrap();
//! for chunk in chunky.chunks() {
//!     let chunk = chunk.unwrap();
//!     println!("chunk {}: {} records", chunk.number, chunk.document.len());
//! }
//! ```

pub mod container;
pub mod store;

use std::iter::FusedIterator;

use serde::Serialize;

use crate::config::{ChunkingConfig, ConfigError};
use crate::document::{Document, RecordSet};
use crate::error::ChunkyResult;
use crate::remote::SearchPort;
use crate::resolve::RelatedItemResolver;
use crate::timestamp::NormalizedTimestamp;

pub use container::{Container, ContainerKind};
pub use store::ChunkStore;

/// One page of primary records with their related records merged in.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// 1-based position in the sequence.
    pub number: u32,
    /// Offset of the page's first primary record.
    pub offset: u32,
    /// Primary records on this page.
    pub primary_count: usize,
    /// Full size of the container as reported with this page.
    pub reported_total: u64,
    pub document: Document,
}

/// Outcome of [`Chunky::run_into`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub chunks_written: u32,
    pub primary_records: u64,
    pub first_chunk: Option<u32>,
    pub last_chunk: Option<u32>,
}

/// Pagination driver for one container.
#[derive(Debug)]
pub struct Chunky<P> {
    port: P,
    container: Container,
    chunk_size: u32,
    secondary_types: Vec<String>,
    since: Option<String>,
    only_published: bool,
    initial_offset: u32,
}

impl<P: SearchPort> Chunky<P> {
    /// Driver with the default secondary types, no `since`, starting at 0.
    pub fn new(port: P, container: Container, chunk_size: u32) -> ChunkyResult<Self> {
        if chunk_size == 0 {
            return Err(ConfigError::Invalid {
                message: "chunk size must be at least 1".to_string(),
            }
            .into());
        }
        Ok(Self {
            port,
            container,
            chunk_size,
            secondary_types: ChunkingConfig::default().secondary_types,
            since: None,
            only_published: false,
            initial_offset: 0,
        })
    }

    /// Driver configured from the `[chunking]` section.
    pub fn from_config(port: P, container: Container, config: &ChunkingConfig) -> ChunkyResult<Self> {
        config.validate()?;
        Ok(Self::new(port, container, config.chunk_size)?
            .with_secondary_types(config.secondary_types.iter().cloned())
            .only_published(config.only_published))
    }

    /// Related types resolved into each chunk, in order.
    pub fn with_secondary_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.secondary_types = types.into_iter().map(Into::into).collect();
        self
    }

    /// Only resolve related records modified strictly after `since`.
    pub fn with_since(mut self, since: impl Into<String>) -> Self {
        self.since = Some(since.into());
        self
    }

    pub fn only_published(mut self, only_published: bool) -> Self {
        self.only_published = only_published;
        self
    }

    /// Start at chunk `number` (1-based; 0 is treated as 1).
    pub fn starting_chunk(mut self, number: u32) -> Self {
        self.initial_offset = self.offset_of(number);
        self
    }

    /// Continue after `persisted` complete chunks.
    pub fn resume_after(mut self, persisted: u32) -> Self {
        self.initial_offset = persisted.saturating_mul(self.chunk_size);
        self
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn chunk_size(&self) -> u32 {
        self.chunk_size
    }

    pub fn initial_offset(&self) -> u32 {
        self.initial_offset
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    /// Lazy sequence of chunks from the initial offset.
    pub fn chunks(&self) -> Chunks<'_, P> {
        self.chunks_from(self.initial_offset)
    }

    /// Drive the sequence to the end, persisting every chunk as it arrives.
    ///
    /// With `resume` the run starts at the store's fast-forward point instead
    /// of the initial offset. Chunks written before a failure stay on disk.
    pub fn run_into(&self, store: &ChunkStore, resume: bool) -> ChunkyResult<RunSummary> {
        let start = if resume {
            let number = store.fast_forward()?;
            tracing::info!(container = %self.container, chunk = number, "resuming");
            self.offset_of(number)
        } else {
            self.initial_offset
        };

        let mut summary = RunSummary::default();
        for chunk in self.chunks_from(start) {
            let chunk = chunk?;
            store.write(&chunk)?;
            summary.chunks_written += 1;
            summary.primary_records += chunk.primary_count as u64;
            summary.first_chunk.get_or_insert(chunk.number);
            summary.last_chunk = Some(chunk.number);
        }

        tracing::info!(
            container = %self.container,
            chunks = summary.chunks_written,
            records = summary.primary_records,
            "run complete"
        );
        Ok(summary)
    }

    fn chunks_from(&self, offset: u32) -> Chunks<'_, P> {
        Chunks {
            driver: self,
            state: State::Start { offset },
        }
    }

    fn offset_of(&self, number: u32) -> u32 {
        number.saturating_sub(1).saturating_mul(self.chunk_size)
    }

    fn fetch(&self, offset: u32) -> ChunkyResult<Option<Chunk>> {
        let primary_type = self.container.primary_type();
        let query = self.container.page_query(self.chunk_size, offset)?;
        let batch = self.port.search(&query.serialize())?;

        let primary_count = batch.count(primary_type);
        if primary_count == 0 {
            tracing::debug!(container = %self.container, offset, "empty page, done");
            return Ok(None);
        }
        let reported_total = batch
            .set(primary_type)
            .map_or(0, RecordSet::reported_total);

        let resolver = RelatedItemResolver::new(&self.port)
            .since(self.since.as_deref())
            .only_published(self.only_published);
        let related = self
            .secondary_types
            .iter()
            .map(|ty| resolver.resolve(&batch, ty))
            .collect::<ChunkyResult<Vec<_>>>()?;

        let mut document = batch;
        for doc in &related {
            document.merge(doc)?;
        }

        let number = offset / self.chunk_size + 1;
        tracing::info!(
            container = %self.container,
            chunk = number,
            offset,
            primary = primary_count,
            total = reported_total,
            records = document.len(),
            "chunk ready"
        );
        Ok(Some(Chunk {
            number,
            offset,
            primary_count,
            reported_total,
            document,
        }))
    }
}

#[derive(Debug, Clone, Copy)]
enum State {
    Start { offset: u32 },
    Fetching { offset: u32 },
    Done,
}

/// Iterator over the chunks of a container.
///
/// Yields `Err` at most once; the sequence ends after it.
#[derive(Debug)]
pub struct Chunks<'a, P> {
    driver: &'a Chunky<P>,
    state: State,
}

impl<P: SearchPort> Iterator for Chunks<'_, P> {
    type Item = ChunkyResult<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        let offset = match self.state {
            State::Done => return None,
            State::Fetching { offset } => offset,
            State::Start { offset } => {
                if let Some(since) = &self.driver.since {
                    if let Err(e) = NormalizedTimestamp::parse(since) {
                        self.state = State::Done;
                        return Some(Err(e.into()));
                    }
                }
                offset
            }
        };

        match self.driver.fetch(offset) {
            Ok(Some(chunk)) => {
                let size = self.driver.chunk_size;
                self.state = if chunk.primary_count < size as usize {
                    State::Done
                } else {
                    offset
                        .checked_add(size)
                        .map_or(State::Done, |offset| State::Fetching { offset })
                };
                Some(Ok(chunk))
            }
            Ok(None) => {
                self.state = State::Done;
                None
            }
            Err(e) => {
                self.state = State::Done;
                Some(Err(e))
            }
        }
    }
}

impl<P: SearchPort> FusedIterator for Chunks<'_, P> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Record;
    use crate::error::ChunkyError;
    use crate::remote::MemorySearchPort;

    fn location(objects: u64) -> Document {
        let mut doc = Document::new();
        for i in 1..=objects {
            doc.insert(
                "Object",
                Record::new(i)
                    .with_field("ObjCurrentLocationVoc", "4220560")
                    .with_reference("ObjMultimediaRef", "Multimedia", [1000 + i])
                    .with_reference("ObjPerAssociationRef", "Person", [7u64]),
            );
            doc.insert(
                "Multimedia",
                Record::new(1000 + i).with_last_modified("2021-10-14T07:40:29Z"),
            );
        }
        doc.insert("Person", Record::new(7u64));
        doc
    }

    fn driver(objects: u64, size: u32) -> Chunky<MemorySearchPort> {
        Chunky::new(
            MemorySearchPort::new(location(objects)),
            Container::Location("4220560".into()),
            size,
        )
        .unwrap()
    }

    #[test]
    fn zero_chunk_size_rejected() {
        let err = Chunky::new(
            MemorySearchPort::default(),
            Container::Group("1".into()),
            0,
        )
        .unwrap_err();
        assert!(matches!(err, ChunkyError::Config(ConfigError::Invalid { .. })));
    }

    #[test]
    fn chunks_carry_related_records() {
        let chunky = driver(5, 2);
        let chunks: Vec<Chunk> = chunky.chunks().collect::<Result<_, _>>().unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(
            chunks.iter().map(|c| c.number).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(chunks[2].primary_count, 1);
        assert_eq!(chunks[0].reported_total, 5);

        let first = &chunks[0].document;
        assert_eq!(first.count("Object"), 2);
        assert_eq!(first.count("Multimedia"), 2);
        assert_eq!(first.count("Person"), 1);
        assert_eq!(
            first.types().collect::<Vec<_>>(),
            vec!["Object", "Multimedia", "Person"]
        );
    }

    #[test]
    fn exact_multiple_costs_one_empty_request() {
        let chunky = driver(4, 2);
        let count = chunky.chunks().filter(Result::is_ok).count();
        assert_eq!(count, 2);
        // Two pages with three searches each (primary + two related), then one empty page.
        assert_eq!(chunky.port().request_count(), 7);
    }

    #[test]
    fn starting_chunk_skips_ahead() {
        let chunky = driver(5, 2).starting_chunk(2);
        let numbers: Vec<u32> = chunky.chunks().map(|c| c.unwrap().number).collect();
        assert_eq!(numbers, vec![2, 3]);
        assert_eq!(driver(5, 2).resume_after(2).initial_offset(), 4);
    }

    #[test]
    fn since_limits_related_records_only() {
        let chunky = driver(3, 10).with_since("2021-10-14 07:40:29");
        let chunk = chunky.chunks().next().unwrap().unwrap();
        assert_eq!(chunk.document.count("Object"), 3);
        // Media carry exactly the since stamp, which is not strictly newer.
        assert_eq!(chunk.document.count("Multimedia"), 0);
        // Persons have no last-modified value and never match `greater`.
        assert_eq!(chunk.document.count("Person"), 0);
    }

    #[test]
    fn malformed_since_ends_sequence_before_any_request() {
        let chunky = driver(3, 10).with_since("2021-10-14");
        let mut chunks = chunky.chunks();
        assert!(matches!(chunks.next(), Some(Err(ChunkyError::Timestamp(_)))));
        assert!(chunks.next().is_none());
        assert_eq!(chunky.port().request_count(), 0);
    }
}
