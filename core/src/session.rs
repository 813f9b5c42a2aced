//! Command surface over a shared catalog: open, import, export, clear,
//! shrink and the two-file merge.
//!
//! Files are parsed before the catalog lock is taken, so a parse failure
//! never touches the catalog and a long parse never blocks readers.
//! Observers are notified after the lock is released.

use crate::backup::{self, BackupError, WriteOutcome};
use crate::catalog::{Catalog, CatalogError, StatusCounts};
use crate::config::ToolConfig;
use crate::formats::{get_adapter, FileFormat, FormatError};
use crate::reconciler::{self, ImportReport};
use crate::record::{FieldStatus, RawEntry, TranslationRecord};
use log::{info, warn};
use serde::Serialize;
use std::fs;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: BackupError,
    },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Import job {0} was canceled")]
    Canceled(String),

    #[error("Import job error: {0}")]
    Job(String),

    #[error("Catalog lock poisoned")]
    LockPoisoned,
}

/// A parsed file, ready to be folded into the catalog.
#[derive(Debug, Clone)]
pub struct ParsedFile {
    pub path: PathBuf,
    pub format: FileFormat,
    pub entries: Vec<RawEntry>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportOutcome {
    pub format: FileFormat,
    pub records: usize,
    #[serde(flatten)]
    pub write: WriteOutcome,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeOutcome {
    pub first: ImportReport,
    pub second: ImportReport,
    pub export: ExportOutcome,
}

/// Locked access to a session's catalog. Notifications owed by mutations
/// made through the guard fire once it is dropped, after the lock is
/// released.
#[derive(Debug)]
pub struct CatalogGuard<'a> {
    inner: Option<MutexGuard<'a, Catalog>>,
}

impl Deref for CatalogGuard<'_> {
    type Target = Catalog;

    fn deref(&self) -> &Catalog {
        match &self.inner {
            Some(guard) => &**guard,
            None => unreachable!("catalog guard used after release"),
        }
    }
}

impl DerefMut for CatalogGuard<'_> {
    fn deref_mut(&mut self) -> &mut Catalog {
        match &mut self.inner {
            Some(guard) => &mut **guard,
            None => unreachable!("catalog guard used after release"),
        }
    }
}

impl Drop for CatalogGuard<'_> {
    fn drop(&mut self) {
        let Some(mut guard) = self.inner.take() else {
            return;
        };
        let pending = guard.take_pending_notification();
        drop(guard);
        for observer in pending {
            observer();
        }
    }
}

#[derive(Debug)]
pub struct Session {
    catalog: Mutex<Catalog>,
    config: ToolConfig,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(ToolConfig::default())
    }
}

impl Session {
    pub fn new(config: ToolConfig) -> Self {
        Self {
            catalog: Mutex::new(Catalog::deferring()),
            config,
        }
    }

    pub fn config(&self) -> &ToolConfig {
        &self.config
    }

    /// Exclusive access to the catalog, e.g. to subscribe observers or
    /// edit translations.
    pub fn catalog(&self) -> Result<CatalogGuard<'_>, SessionError> {
        let guard = self.catalog.lock().map_err(|_| SessionError::LockPoisoned)?;
        Ok(CatalogGuard { inner: Some(guard) })
    }

    /// Snapshot of the records in catalog order.
    pub fn records(&self) -> Result<Vec<TranslationRecord>, SessionError> {
        Ok(self.catalog()?.get_all().to_vec())
    }

    pub fn status_counts(&self) -> Result<StatusCounts, SessionError> {
        Ok(self.catalog()?.status_counts())
    }

    /// Reads and parses a file without touching the catalog. The format is
    /// taken from the extension unless given.
    pub fn read_file(
        &self,
        path: &Path,
        format: Option<FileFormat>,
    ) -> Result<ParsedFile, SessionError> {
        let format = match format {
            Some(format) => format,
            None => FileFormat::from_path(path)?,
        };
        let bytes = fs::read(path).map_err(|source| SessionError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let entries = get_adapter(format, &self.config).parse(&bytes)?;
        info!(
            "parsed {} entries from {} ({:?})",
            entries.len(),
            path.display(),
            format
        );
        Ok(ParsedFile {
            path: path.to_path_buf(),
            format,
            entries,
        })
    }

    /// Folds a parsed batch into the catalog. With `replace`, the catalog
    /// is cleared first under the same lock and observers see a single
    /// notification.
    pub fn apply(&self, parsed: ParsedFile, replace: bool) -> Result<ImportReport, SessionError> {
        reconciler::validate_batch(&parsed.entries)?;
        let mut catalog = self.catalog()?;
        if replace {
            catalog.clear();
        }
        let report = catalog.import_batch(parsed.entries)?;
        Ok(report)
    }

    /// Replaces the catalog with the contents of `path`. An unreadable or
    /// malformed file leaves the current catalog in place.
    pub fn open(&self, path: &Path) -> Result<ImportReport, SessionError> {
        let parsed = self.read_file(path, None)?;
        self.apply(parsed, true)
    }

    pub fn import(&self, path: &Path) -> Result<ImportReport, SessionError> {
        let parsed = self.read_file(path, None)?;
        self.apply(parsed, false)
    }

    pub fn import_as(&self, path: &Path, format: FileFormat) -> Result<ImportReport, SessionError> {
        let parsed = self.read_file(path, Some(format))?;
        self.apply(parsed, false)
    }

    pub fn export(&self, path: &Path) -> Result<ExportOutcome, SessionError> {
        let format = FileFormat::from_path(path)?;
        self.export_as(path, format)
    }

    /// Writes the catalog in its current order. Status is not written.
    pub fn export_as(&self, path: &Path, format: FileFormat) -> Result<ExportOutcome, SessionError> {
        let records = self.records()?;
        self.write_records(path, format, &records)
    }

    fn write_records(
        &self,
        path: &Path,
        format: FileFormat,
        records: &[TranslationRecord],
    ) -> Result<ExportOutcome, SessionError> {
        let bytes = get_adapter(format, &self.config).serialize(records)?;
        let write = backup::write_atomically(path, &bytes, self.config.export.create_backup)
            .map_err(|source| {
                warn!("export to {} failed: {}", path.display(), source);
                SessionError::Write {
                    path: path.to_path_buf(),
                    source,
                }
            })?;
        info!(
            "exported {} records to {} ({:?})",
            records.len(),
            path.display(),
            format
        );
        Ok(ExportOutcome {
            format,
            records: records.len(),
            write,
        })
    }

    pub fn clear(&self) -> Result<(), SessionError> {
        self.catalog()?.clear();
        Ok(())
    }

    pub fn shrink(&self, status: FieldStatus) -> Result<usize, SessionError> {
        Ok(self.catalog()?.shrink(status))
    }

    /// Imports `first` then `second` into the current catalog and exports
    /// the result to `output`. Both imports are folded into a staged copy
    /// that replaces the catalog only once the export has been written, so
    /// a bad input file or a failed write leaves the catalog untouched.
    pub fn merge_two(
        &self,
        first: &Path,
        second: &Path,
        output: &Path,
    ) -> Result<MergeOutcome, SessionError> {
        let output_format = FileFormat::from_path(output)?;
        let first_parsed = self.read_file(first, None)?;
        let second_parsed = self.read_file(second, None)?;
        reconciler::validate_batch(&first_parsed.entries)?;
        reconciler::validate_batch(&second_parsed.entries)?;

        let mut catalog = self.catalog()?;
        let mut staged = catalog.staged();
        let first_report = staged.import_batch(first_parsed.entries)?;
        let second_report = staged.import_batch(second_parsed.entries)?;
        let export = self.write_records(output, output_format, staged.get_all())?;
        catalog.commit(staged);

        Ok(MergeOutcome {
            first: first_report,
            second: second_report,
            export,
        })
    }
}
