/// Folds a parsed batch of raw entries into catalog storage
use crate::catalog::CatalogError;
use crate::record::{FieldStatus, RawEntry, TranslationRecord};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Per-triple outcome counts of one reconciled batch.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub processed: usize,
    pub new: usize,
    pub changed: usize,
    pub idle: usize,
    pub no_translation: usize,
    /// Triples whose key already appeared earlier in the same batch.
    pub duplicate_keys: usize,
}

impl ImportReport {
    fn record(&mut self, status: FieldStatus) {
        self.processed += 1;
        match status {
            FieldStatus::Idle => self.idle += 1,
            FieldStatus::New => self.new += 1,
            FieldStatus::Changed => self.changed += 1,
            FieldStatus::NoTranslation => self.no_translation += 1,
        }
    }
}

/// Rejects batches the fold cannot apply in full. Runs before any mutation
/// so a rejected batch leaves the catalog untouched.
pub(crate) fn validate_batch(batch: &[RawEntry]) -> Result<(), CatalogError> {
    match batch.iter().position(|entry| entry.key.is_empty()) {
        Some(position) => Err(CatalogError::EmptyKey { position }),
        None => Ok(()),
    }
}

/// Applies one triple and returns the status it was classified with.
fn fold_entry(
    records: &mut Vec<TranslationRecord>,
    index: &mut HashMap<String, usize>,
    entry: RawEntry,
) -> FieldStatus {
    let RawEntry {
        key,
        source,
        translation,
    } = entry;

    let existing = index.get(&key).copied();
    let Some(slot) = existing else {
        let status = if translation.is_empty() {
            FieldStatus::NoTranslation
        } else {
            FieldStatus::New
        };
        let mut record = TranslationRecord::new(key.clone(), source, translation);
        record.set_status(status);
        index.insert(key, records.len());
        records.push(record);
        return status;
    };

    let record = &mut records[slot];
    let status = if translation.is_empty() {
        record.translated_text.clear();
        FieldStatus::NoTranslation
    } else if translation == record.translated_text {
        FieldStatus::Idle
    } else {
        record.translated_text = translation;
        FieldStatus::Changed
    };
    record.source_text = source;
    record.set_status(status);
    status
}

/// Validates the whole batch, then folds it strictly in order. Later
/// duplicates of a key see the effect of the earlier ones.
pub(crate) fn reconcile(
    records: &mut Vec<TranslationRecord>,
    index: &mut HashMap<String, usize>,
    batch: Vec<RawEntry>,
) -> Result<ImportReport, CatalogError> {
    validate_batch(&batch)?;

    let mut report = ImportReport::default();
    let mut seen: HashSet<String> = HashSet::with_capacity(batch.len());
    for entry in batch {
        if !seen.insert(entry.key.clone()) {
            report.duplicate_keys += 1;
        }
        let status = fold_entry(records, index, entry);
        report.record(status);
    }
    Ok(report)
}
