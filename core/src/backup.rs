use chrono::Local;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WriteOutcome {
    pub backup_path: Option<PathBuf>,
    pub final_path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    #[error("{0}")]
    Io(#[from] io::Error),
    #[error("Could not create backup: {0}")]
    BackupCreate(String),
}

/// Writes `contents` to a sibling temp file and renames it over `target`,
/// so a failed write never leaves a truncated file behind. With
/// `keep_backup`, an existing target is first copied to
/// `<name>.<ext>.bak.<timestamp>`.
pub fn write_atomically(
    target: &Path,
    contents: &[u8],
    keep_backup: bool,
) -> Result<WriteOutcome, BackupError> {
    let parent = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        Some(_) => PathBuf::from("."),
        None => {
            return Err(BackupError::BackupCreate(
                "target path has no parent directory".into(),
            ))
        }
    };
    fs::create_dir_all(&parent)?;

    let backup_path = if keep_backup && target.exists() {
        let candidate = build_backup_path(target);
        fs::copy(target, &candidate).map_err(|err| BackupError::BackupCreate(err.to_string()))?;
        Some(candidate)
    } else {
        None
    };

    let temp_path = build_temp_path(target);
    let written = write_temp(&temp_path, contents).and_then(|()| replace(&temp_path, target));
    if let Err(err) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(BackupError::Io(err));
    }

    Ok(WriteOutcome {
        backup_path,
        final_path: target.to_path_buf(),
    })
}

fn write_temp(temp_path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(temp_path)?;
    file.write_all(contents)?;
    file.sync_all()
}

fn replace(temp_path: &Path, target: &Path) -> io::Result<()> {
    // rename does not overwrite an existing file on Windows
    if cfg!(target_os = "windows") && target.exists() {
        fs::remove_file(target)?;
    }
    fs::rename(temp_path, target)
}

fn build_backup_path(target: &Path) -> PathBuf {
    let timestamp = Local::now().format("%Y%m%d%H%M%S");
    let mut name = target
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(format!(".bak.{timestamp}"));
    target.with_file_name(name)
}

fn build_temp_path(target: &Path) -> PathBuf {
    let mut temp = target.to_path_buf();
    let pid = std::process::id();
    let suffix = format!("__tmp__pid_{}", pid);
    match temp.file_name() {
        Some(name) => {
            let mut os_string = name.to_os_string();
            os_string.push(suffix);
            temp.set_file_name(os_string);
        }
        None => {
            temp.push(format!("temp_{pid}"));
        }
    }
    temp
}
