/// Translation records and their derived status
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Classification of a record relative to the most recent import.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "camelCase")]
pub enum FieldStatus {
    /// Present and unchanged since the last import baseline.
    #[default]
    Idle,
    /// Key did not exist before this import.
    New,
    /// Key existed and the incoming translation differs.
    Changed,
    /// Translation text is empty.
    NoTranslation,
}

impl FieldStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::New => "new",
            Self::Changed => "changed",
            Self::NoTranslation => "noTranslation",
        }
    }
}

impl fmt::Display for FieldStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().replace(['-', '_'], "").as_str() {
            "idle" => Ok(Self::Idle),
            "new" => Ok(Self::New),
            "changed" => Ok(Self::Changed),
            "notranslation" => Ok(Self::NoTranslation),
            other => Err(format!("unknown field status: {other}")),
        }
    }
}

/// One `(key, source, translation)` triple as produced by a format adapter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawEntry {
    pub key: String,
    pub source: String,
    #[serde(default)]
    pub translation: String,
}

impl RawEntry {
    pub fn new(
        key: impl Into<String>,
        source: impl Into<String>,
        translation: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            source: source.into(),
            translation: translation.into(),
        }
    }
}

/// A catalog entry. Identity is the key: two records with the same key are
/// equal regardless of their texts or status.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationRecord {
    key: String,
    pub source_text: String,
    pub translated_text: String,
    status: FieldStatus,
}

impl TranslationRecord {
    pub fn new(
        key: impl Into<String>,
        source_text: impl Into<String>,
        translated_text: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            source_text: source_text.into(),
            translated_text: translated_text.into(),
            status: FieldStatus::Idle,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn status(&self) -> FieldStatus {
        self.status
    }

    pub(crate) fn set_status(&mut self, status: FieldStatus) {
        self.status = status;
    }

    /// Strips the status, leaving the triple an exporter writes.
    pub fn to_raw(&self) -> RawEntry {
        RawEntry::new(&self.key, &self.source_text, &self.translated_text)
    }
}

impl PartialEq for TranslationRecord {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for TranslationRecord {}

impl Hash for TranslationRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}
