/// Format adapters: parse a file into raw `(key, source, translation)`
/// triples and write catalog records back out.
/// Status is never written; it is derived on the next import.
pub mod csv;
pub mod json;
pub mod po;
pub mod xlsx;

use crate::config::ToolConfig;
use crate::record::{RawEntry, TranslationRecord};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Po,
    Json,
    Csv,
    Xlsx,
}

impl FileFormat {
    /// Detect format from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "po" | "pot" => Some(Self::Po),
            "json" => Some(Self::Json),
            "csv" => Some(Self::Csv),
            "xlsx" => Some(Self::Xlsx),
            _ => None,
        }
    }

    /// Detect format from path
    pub fn from_path(path: &Path) -> Result<Self, FormatError> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
            .ok_or_else(|| FormatError::UnsupportedFormat(path.display().to_string()))
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Po => "po",
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Xlsx => "xlsx",
        }
    }
}

/// Trait for format-specific adapters
pub trait FormatAdapter: Send + Sync {
    /// Decode file content into triples, in file order. Malformed input is
    /// an error; nothing is returned partially.
    fn parse(&self, content: &[u8]) -> Result<Vec<RawEntry>, FormatError>;

    /// Encode records in the given order.
    fn serialize(&self, records: &[TranslationRecord]) -> Result<Vec<u8>, FormatError>;

    /// Get the format this adapter supports
    fn format(&self) -> FileFormat;
}

/// Get the adapter for a format, configured from `config`.
pub fn get_adapter(format: FileFormat, config: &ToolConfig) -> Box<dyn FormatAdapter> {
    match format {
        FileFormat::Po => Box::new(po::PoAdapter::new(config.po.language.clone())),
        FileFormat::Json => Box::new(json::JsonAdapter::new(config.export.pretty_json)),
        FileFormat::Csv => Box::new(self::csv::CsvAdapter::new(
            u8::try_from(config.export.csv_delimiter).unwrap_or(b','),
        )),
        FileFormat::Xlsx => Box::new(xlsx::XlsxAdapter::new(
            config.spreadsheet.sheet_name.clone(),
        )),
    }
}

/// Column names shared by the tabular formats.
pub(crate) const KEY_COLUMN: &str = "key";
pub(crate) const SOURCE_COLUMN: &str = "source";
pub(crate) const TRANSLATION_COLUMN: &str = "translation";

/// Locate the key/source/translation columns in a header row.
/// Matching is case-insensitive and column order is free.
pub(crate) fn locate_columns<'a, I>(headers: I) -> Result<[usize; 3], FormatError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut found = [None; 3];
    for (position, header) in headers.into_iter().enumerate() {
        let name = header.trim().to_lowercase();
        let slot = match name.as_str() {
            KEY_COLUMN => 0,
            SOURCE_COLUMN => 1,
            TRANSLATION_COLUMN => 2,
            _ => continue,
        };
        found[slot].get_or_insert(position);
    }

    let names = [KEY_COLUMN, SOURCE_COLUMN, TRANSLATION_COLUMN];
    let mut columns = [0; 3];
    for (slot, position) in found.iter().enumerate() {
        columns[slot] = position.ok_or_else(|| {
            FormatError::ParseError(format!("missing '{}' column in header", names[slot]))
        })?;
    }
    Ok(columns)
}
