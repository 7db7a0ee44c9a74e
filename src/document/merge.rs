//! Deduplicating, newest-wins document merge.
//!
//! Merging is decided in full before the target is mutated: every timestamp
//! comparison happens first, so a malformed last-modified value aborts the
//! merge with the target unchanged.

use super::error::DocumentResult;
use super::{Document, Record, record_timestamp};

impl Document {
    /// Merge `incoming` into `self`.
    ///
    /// - types missing from `self` are created;
    /// - records with an unknown id are appended;
    /// - for a known id the record with the later normalized last-modified
    ///   value wins, ties keep the record already in `self`; a record without
    ///   a value is older than any record with one;
    /// - afterwards every set's reported total is its record count.
    pub fn merge(&mut self, incoming: &Document) -> DocumentResult<()> {
        let mut plan: Vec<(&str, &Record)> = Vec::new();

        for set in incoming.sets() {
            let existing_set = self.set(set.name());
            for record in set {
                let new = record_timestamp(set.name(), record)?;
                let take = match existing_set.and_then(|s| s.get(&record.id)) {
                    None => true,
                    Some(existing) => new > record_timestamp(set.name(), existing)?,
                };
                if take {
                    plan.push((set.name(), record));
                }
            }
        }

        for set in incoming.sets() {
            self.ensure_set(set.name());
        }
        for (type_name, record) in plan {
            self.ensure_set(type_name).upsert(record.clone());
        }
        for set in &mut self.modules {
            set.total_size = set.len() as u64;
        }
        Ok(())
    }

    /// By-value form of [`Document::merge`], for chaining.
    pub fn merged(mut self, incoming: &Document) -> DocumentResult<Self> {
        self.merge(incoming)?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DocumentError, RecordId};

    fn doc_with(type_name: &str, records: Vec<Record>) -> Document {
        let mut doc = Document::new();
        doc.ensure_set(type_name);
        for r in records {
            doc.insert(type_name, r);
        }
        doc
    }

    fn stamp(doc: &Document, type_name: &str, id: u64) -> Option<String> {
        doc.get(type_name, &RecordId::from(id))
            .and_then(|r| r.last_modified.clone())
    }

    #[test]
    fn unknown_types_and_ids_are_added() {
        let mut target = doc_with("Object", vec![Record::new(1u64)]);
        let incoming = {
            let mut d = doc_with("Object", vec![Record::new(2u64)]);
            d.insert("Person", Record::new(9u64));
            d
        };
        target.merge(&incoming).unwrap();
        assert_eq!(target.count("Object"), 2);
        assert_eq!(target.count("Person"), 1);
        assert_eq!(target.types().collect::<Vec<_>>(), vec!["Object", "Person"]);
    }

    #[test]
    fn newer_record_wins_in_both_orders() {
        let old = Record::new(1u64).with_last_modified("2021-10-14T07:40:29Z");
        let new = Record::new(1u64).with_last_modified("2021-10-14 07:40:30.01");

        let mut a = doc_with("Object", vec![old.clone()]);
        a.merge(&doc_with("Object", vec![new.clone()])).unwrap();
        assert_eq!(stamp(&a, "Object", 1).as_deref(), Some("2021-10-14 07:40:30.01"));

        let mut b = doc_with("Object", vec![new]);
        b.merge(&doc_with("Object", vec![old])).unwrap();
        assert_eq!(stamp(&b, "Object", 1).as_deref(), Some("2021-10-14 07:40:30.01"));
    }

    #[test]
    fn ties_keep_existing() {
        let existing = Record::new(1u64)
            .with_last_modified("2021-10-14T07:40:29Z")
            .with_field("ObjTitle", "existing");
        let incoming = Record::new(1u64)
            .with_last_modified("2021-10-14 07:40:29.74")
            .with_field("ObjTitle", "incoming");

        let mut target = doc_with("Object", vec![existing]);
        target.merge(&doc_with("Object", vec![incoming])).unwrap();
        let rec = target.get("Object", &RecordId::from(1u64)).unwrap();
        assert_eq!(rec.payload.values_at("ObjTitle"), vec!["existing"]);
    }

    #[test]
    fn missing_timestamp_loses() {
        let stamped = Record::new(1u64).with_last_modified("2021-10-14T07:40:29Z");
        let bare = Record::new(1u64);

        let mut target = doc_with("Object", vec![bare.clone()]);
        target.merge(&doc_with("Object", vec![stamped.clone()])).unwrap();
        assert!(stamp(&target, "Object", 1).is_some());

        let mut target = doc_with("Object", vec![stamped]);
        target.merge(&doc_with("Object", vec![bare])).unwrap();
        assert!(stamp(&target, "Object", 1).is_some());
    }

    #[test]
    fn reported_total_is_recomputed() {
        let mut target = doc_with("Object", vec![Record::new(1u64)]);
        target.set_mut("Object").unwrap().set_reported_total(500);
        let mut incoming = doc_with("Object", vec![Record::new(2u64)]);
        incoming.set_mut("Object").unwrap().set_reported_total(77);

        target.merge(&incoming).unwrap();
        assert_eq!(target.set("Object").unwrap().reported_total(), 2);
        // incoming is only read
        assert_eq!(incoming.set("Object").unwrap().reported_total(), 77);
        assert_eq!(incoming.count("Object"), 1);
    }

    #[test]
    fn malformed_timestamp_aborts_without_mutation() {
        let mut target = doc_with(
            "Object",
            vec![Record::new(1u64).with_last_modified("2021-10-14T07:40:29Z")],
        );
        let mut incoming = doc_with("Object", vec![Record::new(2u64)]);
        incoming.insert("Object", Record::new(1u64).with_last_modified("2021-10"));

        let err = target.merge(&incoming).unwrap_err();
        assert!(matches!(err, DocumentError::Timestamp { .. }));
        assert_eq!(target.count("Object"), 1);
    }

    #[test]
    fn malformed_new_record_is_rejected_too() {
        let mut target = doc_with("Object", vec![]);
        let incoming = doc_with("Object", vec![Record::new(5u64).with_last_modified("2021")]);
        assert!(target.merge(&incoming).is_err());
        assert!(target.is_empty());
    }

    #[test]
    fn merging_twice_is_idempotent() {
        let base = doc_with("Object", vec![Record::new(1u64).with_last_modified("2020-01-01T00:00:00")]);
        let x = doc_with(
            "Object",
            vec![
                Record::new(1u64).with_last_modified("2021-01-01T00:00:00"),
                Record::new(2u64).with_last_modified("2021-01-01T00:00:00"),
            ],
        );
        let once = base.clone().merged(&x).unwrap();
        let twice = once.clone().merged(&x).unwrap();
        let ids = |d: &Document| {
            d.records()
                .map(|(t, r)| (t.to_string(), r.clone()))
                .collect::<Vec<_>>()
        };
        assert_eq!(ids(&once), ids(&twice));
    }
}
