//! End-to-end pagination tests.
//!
//! These drive `Chunky` against an in-memory collection and check the
//! chunk sequence: sizes, termination, related records, resumption and
//! failure behaviour.

use std::cell::Cell;

use mpx_chunky::chunky::{Chunk, Chunky, Container};
use mpx_chunky::document::{Document, Record};
use mpx_chunky::error::ChunkyError;
use mpx_chunky::query::{Conjunction, Operator, Query, QueryDescriptor};
use mpx_chunky::remote::{MemorySearchPort, RemoteError, RemoteResult, SearchPort};
use mpx_chunky::resolve::resolve;
use mpx_chunky::timestamp::NormalizedTimestamp;

const LOCATION: &str = "4220560";

/// Collection with `objects` objects at one location, each referencing its
/// own media record and a shared person.
fn collection(objects: u64) -> Document {
    let mut doc = Document::new();
    for i in 1..=objects {
        doc.insert(
            "Object",
            Record::new(i)
                .with_last_modified("2021-10-14T07:40:29Z")
                .with_field("ObjCurrentLocationVoc", LOCATION)
                .with_reference("ObjMultimediaRef", "Multimedia", [10_000 + i])
                .with_reference("ObjPerAssociationRef", "Person", [1u64]),
        );
        doc.insert(
            "Multimedia",
            Record::new(10_000 + i).with_last_modified(format!("2022-01-{:02}T00:00:00Z", i % 28 + 1)),
        );
    }
    doc.insert("Person", Record::new(1u64).with_last_modified("2020-05-05 05:05:05"));
    // Not at the location; must never show up.
    doc.insert(
        "Object",
        Record::new(99_999u64).with_field("ObjCurrentLocationVoc", "elsewhere"),
    );
    doc
}

fn chunky(objects: u64, size: u32) -> Chunky<MemorySearchPort> {
    Chunky::new(
        MemorySearchPort::new(collection(objects)),
        Container::Location(LOCATION.into()),
        size,
    )
    .unwrap()
}

fn collect(chunky: &Chunky<impl SearchPort>) -> Vec<Chunk> {
    chunky.chunks().collect::<Result<_, _>>().unwrap()
}

#[test]
fn multiple_of_chunk_size_gives_full_chunks_only() {
    let c = chunky(30, 10);
    let chunks = collect(&c);
    assert_eq!(chunks.len(), 3);
    assert!(chunks.iter().all(|ch| ch.primary_count == 10));
    // The fourth, empty page was requested exactly once.
    let primary_requests = c
        .port()
        .received()
        .iter()
        .filter(|d| d.module == "Object")
        .count();
    assert_eq!(primary_requests, 4);
}

#[test]
fn partial_tail_chunk() {
    let chunks = collect(&chunky(25, 10));
    let sizes: Vec<usize> = chunks.iter().map(|ch| ch.primary_count).collect();
    assert_eq!(sizes, vec![10, 10, 5]);
    let offsets: Vec<u32> = chunks.iter().map(|ch| ch.offset).collect();
    assert_eq!(offsets, vec![0, 10, 20]);
}

#[test]
fn empty_container_yields_nothing() {
    let c = Chunky::new(
        MemorySearchPort::new(collection(5)),
        Container::Group("404".into()),
        10,
    )
    .unwrap();
    assert_eq!(c.chunks().count(), 0);
    assert_eq!(c.port().request_count(), 1);
}

#[test]
fn every_chunk_is_self_contained() {
    for chunk in collect(&chunky(12, 5)) {
        let doc = &chunk.document;
        for id in doc.references_to("Multimedia") {
            assert!(doc.get("Multimedia", &id).is_some(), "missing media {id}");
        }
        assert_eq!(doc.count("Person"), 1);
        assert!(doc.get("Object", &99_999u64.into()).is_none());
    }
}

#[test]
fn primary_ids_are_unique_across_chunks() {
    let mut seen = std::collections::HashSet::new();
    for chunk in collect(&chunky(23, 4)) {
        for id in chunk.document.set("Object").unwrap().ids() {
            assert!(seen.insert(id.clone()), "{id} appears twice");
        }
    }
    assert_eq!(seen.len(), 23);
}

#[test]
fn resumed_run_yields_the_same_tail() {
    let full = collect(&chunky(25, 10));
    let resumed = collect(&chunky(25, 10).starting_chunk(2));
    assert_eq!(resumed.len(), 2);
    for (a, b) in full[1..].iter().zip(&resumed) {
        assert_eq!(a.number, b.number);
        assert_eq!(a.document.describe(), b.document.describe());
    }
    let after_one = collect(&chunky(25, 10).resume_after(1));
    assert_eq!(after_one[0].number, 2);
}

#[test]
fn since_is_validated_before_any_request() {
    let c = chunky(5, 10).with_since("14.10.2021");
    let results: Vec<_> = c.chunks().collect();
    assert_eq!(results.len(), 1);
    assert!(matches!(results[0], Err(ChunkyError::Timestamp(_))));
    assert_eq!(c.port().request_count(), 0);
}

#[test]
fn since_is_exclusive_for_related_records() {
    let c = chunky(3, 10).with_since("2022-01-03 00:00:00");
    let chunk = c.chunks().next().unwrap().unwrap();
    // Media for objects 1..=3 are stamped 2022-01-02..=2022-01-04.
    let media: Vec<String> = chunk
        .document
        .set("Multimedia")
        .unwrap()
        .ids()
        .map(|id| id.to_string())
        .collect();
    assert_eq!(media, vec!["10003"]);
}

/// Port that fails every search after the first `ok` ones.
struct FailingAfter {
    inner: MemorySearchPort,
    ok: usize,
    calls: Cell<usize>,
}

impl SearchPort for FailingAfter {
    fn search(&self, query: &QueryDescriptor) -> RemoteResult<Document> {
        let n = self.calls.get();
        self.calls.set(n + 1);
        if n >= self.ok {
            return Err(RemoteError::SearchFailed {
                target: query.module.clone(),
                cause: "connection reset".into(),
            });
        }
        self.inner.search(query)
    }
}

#[test]
fn failure_ends_sequence_without_partial_chunk() {
    // First chunk costs three searches; the fourth (next page) succeeds, the
    // media search of the second chunk fails.
    let port = FailingAfter {
        inner: MemorySearchPort::new(collection(20)),
        ok: 4,
        calls: Cell::new(0),
    };
    let c = Chunky::new(port, Container::Location(LOCATION.into()), 10).unwrap();
    let results: Vec<_> = c.chunks().collect();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].as_ref().unwrap().number, 1);
    assert!(matches!(
        &results[1],
        Err(ChunkyError::Remote(RemoteError::SearchFailed { target, .. })) if target == "Multimedia"
    ));
}

fn failing_after(ok: usize) -> Chunky<FailingAfter> {
    let port = FailingAfter {
        inner: MemorySearchPort::new(collection(20)),
        ok,
        calls: Cell::new(0),
    };
    Chunky::new(port, Container::Location(LOCATION.into()), 10).unwrap()
}

#[test]
fn failed_first_page_yields_only_the_error() {
    let c = failing_after(0);
    let mut chunks = c.chunks();
    assert!(matches!(
        chunks.next(),
        Some(Err(ChunkyError::Remote(RemoteError::SearchFailed { target, .. }))) if target == "Object"
    ));
    assert!(chunks.next().is_none());
    assert_eq!(c.port().calls.get(), 1);
}

#[test]
fn failed_later_page_keeps_earlier_chunks() {
    // Three searches for chunk 1; the primary page of chunk 2 fails.
    let c = failing_after(3);
    let results: Vec<_> = c.chunks().collect();
    assert_eq!(results.len(), 2);
    let first = results[0].as_ref().unwrap();
    assert_eq!(first.number, 1);
    assert_eq!(first.document.count("Object"), 10);
    assert!(matches!(
        &results[1],
        Err(ChunkyError::Remote(RemoteError::SearchFailed { target, .. })) if target == "Object"
    ));
    assert_eq!(c.port().calls.get(), 4);
}

#[test]
fn location_query_scenario() {
    let mut q = Query::new("Object").with_limit(10).with_offset(0);
    let and = q.open_conjunction(q.root(), Conjunction::And).unwrap();
    q.add_criterion(and, "ObjCurrentLocationVoc", Operator::EqualsField, Some(LOCATION))
        .unwrap();
    q.add_criterion(and, "__orgUnit", Operator::NotEqualsField, Some("EMPrimarverpackungen"))
        .unwrap();

    let desc = q.serialize();
    assert_eq!((desc.module.as_str(), desc.limit, desc.offset), ("Object", Some(10), 0));
    let (kind, children) = desc.expert.as_ref().unwrap().as_conjunction().unwrap();
    assert_eq!(kind, "and");
    assert_eq!(children.len(), 2);

    // Run it as an external-query container: __orgUnit is absent on every
    // record, so notEquals holds and the whole location comes back.
    let c = Chunky::new(
        MemorySearchPort::new(collection(7)),
        Container::from_query("scenario", q),
        5,
    )
    .unwrap()
    .with_secondary_types(Vec::<String>::new());
    let sizes: Vec<usize> = collect(&c).iter().map(|ch| ch.primary_count).collect();
    assert_eq!(sizes, vec![5, 2]);
}

#[test]
fn timestamp_shapes_compare_equal() {
    let a = NormalizedTimestamp::parse("2021-10-14T07:40:29Z").unwrap();
    let b = NormalizedTimestamp::parse("2021-10-14 07:40:29.74").unwrap();
    assert_eq!(a.as_str(), "20211014074029");
    assert_eq!(a, b);
}

#[test]
fn no_person_references_resolve_to_empty_document() {
    let mut primary = Document::new();
    primary.insert(
        "Object",
        Record::new(1u64).with_reference("ObjMultimediaRef", "Multimedia", [5u64]),
    );
    let port = MemorySearchPort::new(collection(1));
    let persons = resolve(&port, &primary, "Person", None, false).unwrap();
    assert!(persons.is_empty());
    assert_eq!(port.request_count(), 0);
}
