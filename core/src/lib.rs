pub mod backup;
pub mod catalog;
pub mod config;
pub mod encoding;
pub mod formats;
pub mod jobs;
pub mod reconciler;
pub mod record;
pub mod session;

pub use catalog::{Catalog, CatalogError, StatusCounts, SubscriptionId};
pub use config::{default_config_path, ExportOptions, PoOptions, SpreadsheetOptions, ToolConfig};
pub use formats::{get_adapter, FileFormat, FormatAdapter, FormatError};
pub use jobs::{
    cancel_import_job, is_import_job_active, start_import_job, ImportJob, ImportJobStatus,
    ImportProgressEventPayload, ProgressSink, StartImportJobPayload,
};
pub use reconciler::ImportReport;
pub use record::{FieldStatus, RawEntry, TranslationRecord};
pub use session::{
    CatalogGuard, ExportOutcome, MergeOutcome, ParsedFile, Session, SessionError,
};
