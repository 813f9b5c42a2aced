use crate::formats::FileFormat;
use crate::reconciler::ImportReport;
use crate::session::{Session, SessionError};
use log::{info, warn};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use uuid::Uuid;

static ACTIVE_JOBS: Lazy<Mutex<HashMap<String, Arc<AtomicBool>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct StartImportJobPayload {
    /// Generated when absent
    #[serde(default)]
    pub job_id: Option<String>,
    pub path: PathBuf,
    /// Taken from the extension when absent
    #[serde(default)]
    pub format: Option<FileFormat>,
    /// Clear the catalog before folding (open instead of import)
    #[serde(default)]
    pub replace: bool,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ImportJobStatus {
    Started,
    Parsed,
    Completed,
    Canceled,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportProgressEventPayload {
    pub job_id: String,
    pub status: ImportJobStatus,
    pub file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<ImportReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log: Option<String>,
}

/// Receives job progress events, e.g. a progress window.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ImportProgressEventPayload);
}

impl<F> ProgressSink for F
where
    F: Fn(ImportProgressEventPayload) + Send + Sync,
{
    fn emit(&self, event: ImportProgressEventPayload) {
        self(event)
    }
}

/// Handle to a spawned import job.
#[derive(Debug)]
pub struct ImportJob {
    pub job_id: String,
    handle: JoinHandle<Result<ImportReport, SessionError>>,
}

impl ImportJob {
    pub async fn wait(self) -> Result<ImportReport, SessionError> {
        match self.handle.await {
            Ok(result) => result,
            Err(join_err) => Err(SessionError::Job(join_err.to_string())),
        }
    }
}

/// Parses the file on a blocking worker, then folds the whole batch into
/// the session's catalog. A job canceled before the fold leaves the
/// catalog untouched; once the fold starts it runs to completion.
///
/// Must be called from within a Tokio runtime.
pub fn start_import_job(
    session: Arc<Session>,
    sink: Arc<dyn ProgressSink>,
    payload: StartImportJobPayload,
) -> Result<ImportJob, SessionError> {
    let runtime = Handle::try_current().map_err(|err| SessionError::Job(err.to_string()))?;
    let job_id = payload
        .job_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let cancel_flag = Arc::new(AtomicBool::new(false));
    {
        let mut guard = ACTIVE_JOBS
            .lock()
            .map_err(|_| SessionError::Job("job registry lock poisoned".into()))?;
        if guard.contains_key(&job_id) {
            return Err(SessionError::Job(format!("job {job_id} is already running")));
        }
        guard.insert(job_id.clone(), Arc::clone(&cancel_flag));
    }

    let registration = JobRegistration(job_id.clone());
    let handle = runtime.spawn(async move {
        let task_job_id = registration.0.clone();
        let _registration = registration;
        run_import_job(session, sink, task_job_id, payload, cancel_flag).await
    });

    Ok(ImportJob { job_id, handle })
}

/// Removes a job from the registry when its task ends, including when the
/// task panics or is dropped before it runs.
struct JobRegistration(String);

impl Drop for JobRegistration {
    fn drop(&mut self) {
        if let Ok(mut guard) = ACTIVE_JOBS.lock() {
            guard.remove(&self.0);
        }
    }
}

/// Requests cancellation. Returns `false` when no such job is running.
pub fn cancel_import_job(job_id: &str) -> Result<bool, SessionError> {
    let guard = ACTIVE_JOBS
        .lock()
        .map_err(|_| SessionError::Job("job registry lock poisoned".into()))?;

    match guard.get(job_id) {
        Some(flag) => {
            flag.store(true, Ordering::SeqCst);
            info!("cancel requested for import job {job_id}");
            Ok(true)
        }
        None => Ok(false),
    }
}

pub fn is_import_job_active(job_id: &str) -> bool {
    ACTIVE_JOBS
        .lock()
        .map(|guard| guard.contains_key(job_id))
        .unwrap_or(false)
}

async fn run_import_job(
    session: Arc<Session>,
    sink: Arc<dyn ProgressSink>,
    job_id: String,
    payload: StartImportJobPayload,
    cancel_flag: Arc<AtomicBool>,
) -> Result<ImportReport, SessionError> {
    let file_name = payload.path.to_string_lossy().to_string();
    let event = |status: ImportJobStatus| ImportProgressEventPayload {
        job_id: job_id.clone(),
        status,
        file_name: file_name.clone(),
        entry_count: None,
        report: None,
        log: None,
    };

    sink.emit(event(ImportJobStatus::Started));

    let parse_session = Arc::clone(&session);
    let path = payload.path.clone();
    let format = payload.format;
    let parsed = tokio::task::spawn_blocking(move || parse_session.read_file(&path, format))
        .await
        .map_err(|join_err| SessionError::Job(join_err.to_string()))
        .and_then(|result| result);

    let parsed = match parsed {
        Ok(parsed) => parsed,
        Err(error) => {
            warn!("import job {job_id} failed to parse {file_name}: {error}");
            sink.emit(ImportProgressEventPayload {
                log: Some(error.to_string()),
                ..event(ImportJobStatus::Failed)
            });
            return Err(error);
        }
    };

    sink.emit(ImportProgressEventPayload {
        entry_count: Some(parsed.entries.len()),
        ..event(ImportJobStatus::Parsed)
    });

    if cancel_flag.load(Ordering::SeqCst) {
        info!("import job {job_id} canceled before folding {file_name}");
        sink.emit(ImportProgressEventPayload {
            log: Some("Canceled before the catalog was modified.".into()),
            ..event(ImportJobStatus::Canceled)
        });
        return Err(SessionError::Canceled(job_id));
    }

    match session.apply(parsed, payload.replace) {
        Ok(report) => {
            sink.emit(ImportProgressEventPayload {
                entry_count: Some(report.processed),
                report: Some(report),
                ..event(ImportJobStatus::Completed)
            });
            Ok(report)
        }
        Err(error) => {
            warn!("import job {job_id} failed to fold {file_name}: {error}");
            sink.emit(ImportProgressEventPayload {
                log: Some(error.to_string()),
                ..event(ImportJobStatus::Failed)
            });
            Err(error)
        }
    }
}
