//! In-memory translation catalog.
//!
//! The catalog is an insertion-ordered, key-unique set of
//! [`TranslationRecord`]s. Every mutating operation notifies subscribed
//! observers at most once, synchronously, on the calling thread.
//!
//! The catalog itself has no internal locking; callers that share it
//! across threads serialize access (see [`crate::session::Session`]). A
//! shared catalog defers its notifications: mutations only mark them
//! pending, and the owner fires them once its lock is released, so an
//! observer may read the catalog again from inside the callback.

use crate::reconciler::{self, ImportReport};
use crate::record::{FieldStatus, RawEntry, TranslationRecord};
use log::{debug, info};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Batch entry {position} has an empty key; nothing was imported")]
    EmptyKey { position: usize },
}

/// Handle returned by [`Catalog::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub(crate) type Observer = Arc<dyn Fn() + Send + Sync>;

/// Number of records per status.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub idle: usize,
    pub new: usize,
    pub changed: usize,
    pub no_translation: usize,
}

impl StatusCounts {
    pub fn get(&self, status: FieldStatus) -> usize {
        match status {
            FieldStatus::Idle => self.idle,
            FieldStatus::New => self.new,
            FieldStatus::Changed => self.changed,
            FieldStatus::NoTranslation => self.no_translation,
        }
    }

    pub fn total(&self) -> usize {
        self.idle + self.new + self.changed + self.no_translation
    }
}

#[derive(Default)]
pub struct Catalog {
    records: Vec<TranslationRecord>,
    index: HashMap<String, usize>,
    observers: Vec<(SubscriptionId, Observer)>,
    next_subscription: u64,
    deferred: bool,
    pending: bool,
}

impl fmt::Debug for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Catalog")
            .field("records", &self.records)
            .field("observers", &self.observers.len())
            .field("deferred", &self.deferred)
            .finish()
    }
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A catalog whose notifications are collected with
    /// [`Catalog::take_pending_notification`] instead of fired in place.
    pub(crate) fn deferring() -> Self {
        Self {
            deferred: true,
            ..Self::default()
        }
    }

    /// Registers a zero-argument callback fired after each mutation.
    pub fn subscribe<F>(&mut self, observer: F) -> SubscriptionId
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push((id, Arc::new(observer)));
        id
    }

    /// Returns `false` when the id was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(existing, _)| *existing != id);
        self.observers.len() != before
    }

    fn notify(&mut self) {
        if self.deferred {
            self.pending = true;
            return;
        }
        for (_, observer) in &self.observers {
            observer();
        }
    }

    /// Observers owed a notification since the last call, at most once
    /// however many mutations happened in between.
    pub(crate) fn take_pending_notification(&mut self) -> Vec<Observer> {
        if !std::mem::take(&mut self.pending) {
            return Vec::new();
        }
        self.observers
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect()
    }

    /// Copy of the records without observers, for folding work that must
    /// not become visible until it is committed.
    pub(crate) fn staged(&self) -> Catalog {
        Catalog {
            records: self.records.clone(),
            index: self.index.clone(),
            ..Catalog::default()
        }
    }

    /// Replaces the records with those of a staged copy. Notifies once.
    pub(crate) fn commit(&mut self, staged: Catalog) {
        self.records = staged.records;
        self.index = staged.index;
        self.notify();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&TranslationRecord> {
        self.index.get(key).map(|&slot| &self.records[slot])
    }

    /// Records in display/export order.
    pub fn get_all(&self) -> &[TranslationRecord] {
        &self.records
    }

    pub fn get_status(&self, key: &str) -> Result<FieldStatus, CatalogError> {
        self.get(key)
            .map(TranslationRecord::status)
            .ok_or_else(|| CatalogError::KeyNotFound(key.to_string()))
    }

    pub fn status_counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for record in &self.records {
            match record.status() {
                FieldStatus::Idle => counts.idle += 1,
                FieldStatus::New => counts.new += 1,
                FieldStatus::Changed => counts.changed += 1,
                FieldStatus::NoTranslation => counts.no_translation += 1,
            }
        }
        counts
    }

    /// Removes every record. Notifies even when already empty so a view
    /// refreshes to the empty state.
    pub fn clear(&mut self) {
        let removed = self.records.len();
        self.records.clear();
        self.index.clear();
        debug!("catalog cleared ({removed} records removed)");
        self.notify();
    }

    /// Removes every record whose status equals `target`, preserving the
    /// order of the rest. Returns the number removed; notifies only when
    /// that number is non-zero.
    pub fn shrink(&mut self, target: FieldStatus) -> usize {
        let before = self.records.len();
        self.records.retain(|record| record.status() != target);
        let removed = before - self.records.len();
        if removed == 0 {
            return 0;
        }

        self.rebuild_index();
        info!("shrink({target}) removed {removed} records");
        self.notify();
        removed
    }

    /// Manual edit of a translation. Status is left as classified by the
    /// last import.
    pub fn edit_translation(
        &mut self,
        key: &str,
        translated_text: impl Into<String>,
    ) -> Result<(), CatalogError> {
        let slot = *self
            .index
            .get(key)
            .ok_or_else(|| CatalogError::KeyNotFound(key.to_string()))?;
        self.records[slot].translated_text = translated_text.into();
        self.notify();
        Ok(())
    }

    /// Folds a parsed batch into the catalog. A rejected batch leaves the
    /// catalog untouched and fires no notification.
    pub fn import_batch(&mut self, batch: Vec<RawEntry>) -> Result<ImportReport, CatalogError> {
        let report = reconciler::reconcile(&mut self.records, &mut self.index, batch)?;
        info!(
            "imported {} entries: {} new, {} changed, {} idle, {} without translation",
            report.processed, report.new, report.changed, report.idle, report.no_translation
        );
        self.notify();
        Ok(report)
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        for (slot, record) in self.records.iter().enumerate() {
            self.index.insert(record.key().to_string(), slot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting(catalog: &mut Catalog) -> Arc<AtomicUsize> {
        let hits = Arc::new(AtomicUsize::new(0));
        let observed = Arc::clone(&hits);
        catalog.subscribe(move || {
            observed.fetch_add(1, Ordering::SeqCst);
        });
        hits
    }

    fn seeded(entries: &[(&str, &str, &str)]) -> Catalog {
        let mut catalog = Catalog::new();
        catalog
            .import_batch(
                entries
                    .iter()
                    .map(|(k, s, t)| RawEntry::new(*k, *s, *t))
                    .collect(),
            )
            .unwrap();
        catalog
    }

    fn keys(catalog: &Catalog) -> Vec<&str> {
        catalog.get_all().iter().map(|r| r.key()).collect()
    }

    #[test]
    fn new_key_with_translation_is_new() {
        let catalog = seeded(&[("k", "src", "A")]);
        assert_eq!(catalog.get_status("k").unwrap(), FieldStatus::New);
    }

    #[test]
    fn new_key_without_translation_is_no_translation() {
        let catalog = seeded(&[("k", "src", "")]);
        assert_eq!(catalog.get_status("k").unwrap(), FieldStatus::NoTranslation);
    }

    #[test]
    fn differing_translation_is_changed() {
        let mut catalog = seeded(&[("k", "src", "A")]);
        catalog
            .import_batch(vec![RawEntry::new("k", "src", "B")])
            .unwrap();
        assert_eq!(catalog.get_status("k").unwrap(), FieldStatus::Changed);
        assert_eq!(catalog.get("k").unwrap().translated_text, "B");
    }

    #[test]
    fn equal_translation_resets_to_idle() {
        let mut catalog = seeded(&[("k", "src", "A")]);
        catalog
            .import_batch(vec![RawEntry::new("k", "src", "A")])
            .unwrap();
        assert_eq!(catalog.get_status("k").unwrap(), FieldStatus::Idle);
    }

    #[test]
    fn source_text_follows_latest_import() {
        let mut catalog = seeded(&[("k", "old source", "A")]);
        catalog
            .import_batch(vec![RawEntry::new("k", "new source", "A")])
            .unwrap();
        let record = catalog.get("k").unwrap();
        assert_eq!(record.source_text, "new source");
        assert_eq!(record.status(), FieldStatus::Idle);
    }

    #[test]
    fn get_status_reports_missing_key() {
        let catalog = Catalog::new();
        assert_eq!(
            catalog.get_status("nope"),
            Err(CatalogError::KeyNotFound("nope".into()))
        );
    }

    #[test]
    fn import_notifies_once_per_batch() {
        let mut catalog = Catalog::new();
        let hits = counting(&mut catalog);
        catalog
            .import_batch(vec![
                RawEntry::new("a", "A", "1"),
                RawEntry::new("b", "B", "2"),
                RawEntry::new("c", "C", "3"),
            ])
            .unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn clear_is_idempotent_and_always_notifies() {
        let mut catalog = seeded(&[("a", "A", "1"), ("b", "B", "")]);
        let hits = counting(&mut catalog);
        catalog.clear();
        catalog.clear();
        assert!(catalog.is_empty());
        assert_eq!(catalog.status_counts(), StatusCounts::default());
        assert!(!catalog.contains_key("a"));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn shrink_removes_only_matching_status_in_order() {
        let mut catalog = seeded(&[("a", "A", "1"), ("b", "B", "2"), ("c", "C", "3")]);
        catalog
            .import_batch(vec![RawEntry::new("b", "B", "2")])
            .unwrap();
        // statuses are now New, Idle, New
        let removed = catalog.shrink(FieldStatus::New);
        assert_eq!(removed, 2);
        assert_eq!(keys(&catalog), vec!["b"]);
        assert_eq!(catalog.get_status("b").unwrap(), FieldStatus::Idle);
    }

    #[test]
    fn shrink_new_keeps_idle_between_new_records() {
        let mut catalog = seeded(&[("a", "A", "1")]);
        catalog
            .import_batch(vec![RawEntry::new("a", "A", "1")])
            .unwrap();
        catalog
            .import_batch(vec![
                RawEntry::new("x", "X", "1"),
                RawEntry::new("a", "A", "1"),
                RawEntry::new("y", "Y", "2"),
            ])
            .unwrap();
        // order is insertion order: a (Idle), x (New), y (New)
        assert_eq!(catalog.shrink(FieldStatus::New), 2);
        assert_eq!(keys(&catalog), vec!["a"]);
        assert_eq!(catalog.get_status("a").unwrap(), FieldStatus::Idle);
        assert_eq!(catalog.get_status("x"), Err(CatalogError::KeyNotFound("x".into())));
    }

    #[test]
    fn shrink_without_matches_does_not_notify() {
        let mut catalog = seeded(&[("a", "A", "1")]);
        let hits = counting(&mut catalog);
        assert_eq!(catalog.shrink(FieldStatus::Changed), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(catalog.shrink(FieldStatus::New), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn lookups_survive_shrink() {
        let mut catalog = seeded(&[("a", "A", ""), ("b", "B", "2"), ("c", "C", "")]);
        catalog.shrink(FieldStatus::NoTranslation);
        assert_eq!(catalog.get("b").unwrap().translated_text, "2");
        catalog
            .import_batch(vec![RawEntry::new("b", "B", "3")])
            .unwrap();
        assert_eq!(catalog.get_status("b").unwrap(), FieldStatus::Changed);
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn empty_key_aborts_whole_batch() {
        let mut catalog = seeded(&[("a", "A", "1")]);
        let hits = counting(&mut catalog);
        let result = catalog.import_batch(vec![
            RawEntry::new("a", "A", "changed"),
            RawEntry::new("b", "B", "2"),
            RawEntry::new("", "orphan", "3"),
        ]);
        assert_eq!(result, Err(CatalogError::EmptyKey { position: 2 }));
        assert_eq!(keys(&catalog), vec!["a"]);
        assert_eq!(catalog.get("a").unwrap().translated_text, "1");
        assert_eq!(catalog.get_status("a").unwrap(), FieldStatus::New);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn duplicate_keys_in_batch_chain_in_order() {
        let mut catalog = Catalog::new();
        let report = catalog
            .import_batch(vec![
                RawEntry::new("k", "src", "first"),
                RawEntry::new("k", "src", "first"),
            ])
            .unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(report.duplicate_keys, 1);
        // second occurrence reconciles against the record the first inserted
        assert_eq!(catalog.get_status("k").unwrap(), FieldStatus::Idle);

        catalog
            .import_batch(vec![
                RawEntry::new("k", "src", "second"),
                RawEntry::new("k", "src", ""),
            ])
            .unwrap();
        let record = catalog.get("k").unwrap();
        assert_eq!(record.status(), FieldStatus::NoTranslation);
        assert_eq!(record.translated_text, "");
    }

    #[test]
    fn manual_edit_keeps_status() {
        let mut catalog = seeded(&[("k", "src", "")]);
        let hits = counting(&mut catalog);
        catalog.edit_translation("k", "filled in").unwrap();
        let record = catalog.get("k").unwrap();
        assert_eq!(record.translated_text, "filled in");
        assert_eq!(record.status(), FieldStatus::NoTranslation);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(catalog.edit_translation("missing", "x").is_err());
    }

    #[test]
    fn importing_twice_equals_importing_once() {
        let batch = vec![
            RawEntry::new("a", "A", "1"),
            RawEntry::new("b", "B", ""),
            RawEntry::new("c", "C", "3"),
        ];
        let once = seeded(&[("a", "A", "1"), ("b", "B", ""), ("c", "C", "3")]);
        let mut twice = Catalog::new();
        twice.import_batch(batch.clone()).unwrap();
        twice.import_batch(batch).unwrap();

        let raw = |c: &Catalog| c.get_all().iter().map(TranslationRecord::to_raw).collect::<Vec<_>>();
        assert_eq!(raw(&once), raw(&twice));
    }

    #[test]
    fn two_source_merge_classifies_by_second_file() {
        let mut catalog = seeded(&[("shared", "S", "same"), ("diff", "D", "old"), ("only_a", "A", "a")]);
        catalog
            .import_batch(vec![
                RawEntry::new("shared", "S", "same"),
                RawEntry::new("diff", "D", "new"),
                RawEntry::new("only_b", "B", "b"),
            ])
            .unwrap();

        assert_eq!(catalog.get_status("shared").unwrap(), FieldStatus::Idle);
        assert_eq!(catalog.get_status("diff").unwrap(), FieldStatus::Changed);
        assert_eq!(catalog.get_status("only_b").unwrap(), FieldStatus::New);
        // untouched by the second import, keeps its earlier classification
        assert_eq!(catalog.get_status("only_a").unwrap(), FieldStatus::New);
        assert_eq!(keys(&catalog), vec!["shared", "diff", "only_a", "only_b"]);
    }

    #[test]
    fn unsubscribed_observer_is_not_called() {
        let mut catalog = Catalog::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let observed = Arc::clone(&hits);
        let id = catalog.subscribe(move || {
            observed.fetch_add(1, Ordering::SeqCst);
        });
        assert!(catalog.unsubscribe(id));
        assert!(!catalog.unsubscribe(id));
        catalog.clear();
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn deferred_catalog_collects_one_pending_notification() {
        let mut catalog = Catalog::deferring();
        let hits = counting(&mut catalog);
        catalog.clear();
        catalog
            .import_batch(vec![RawEntry::new("a", "A", "1")])
            .unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        let pending = catalog.take_pending_notification();
        assert_eq!(pending.len(), 1);
        pending.iter().for_each(|observer| observer());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(catalog.take_pending_notification().is_empty());

        // a shrink that removes nothing owes nothing
        catalog.shrink(FieldStatus::Changed);
        assert!(catalog.take_pending_notification().is_empty());
    }

    #[test]
    fn staged_copy_is_invisible_until_committed() {
        let mut catalog = seeded(&[("a", "A", "1")]);
        let hits = counting(&mut catalog);
        let mut staged = catalog.staged();
        staged
            .import_batch(vec![RawEntry::new("a", "A", "2"), RawEntry::new("b", "B", "")])
            .unwrap();
        assert_eq!(catalog.get("a").unwrap().translated_text, "1");
        assert!(!catalog.contains_key("b"));
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        catalog.commit(staged);
        assert_eq!(keys(&catalog), vec!["a", "b"]);
        assert_eq!(catalog.get_status("a").unwrap(), FieldStatus::Changed);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn status_counts_match_records() {
        let mut catalog = seeded(&[("a", "A", "1"), ("b", "B", ""), ("c", "C", "3")]);
        catalog
            .import_batch(vec![RawEntry::new("c", "C", "4")])
            .unwrap();
        let counts = catalog.status_counts();
        assert_eq!(counts.new, 1);
        assert_eq!(counts.no_translation, 1);
        assert_eq!(counts.changed, 1);
        assert_eq!(counts.get(FieldStatus::Idle), 0);
        assert_eq!(counts.total(), catalog.len());
    }
}
