/// PO (Gettext) format adapter
///
/// Key is `msgctxt` when present, otherwise `msgid`. Source is `msgid`,
/// translation is `msgstr` (`msgstr[0]` for plural entries). The header
/// entry, obsolete `#~` entries and comments are not imported.
use super::{FileFormat, FormatAdapter, FormatError};
use crate::encoding::decode_text;
use crate::record::{RawEntry, TranslationRecord};
use polib::catalog::Catalog;
use polib::message::{Message, MessageView};
use polib::metadata::CatalogMetadata;
use polib::po_file;
use std::fs;
use std::io::Write;
use tempfile::NamedTempFile;

pub struct PoAdapter {
    language: String,
}

impl PoAdapter {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
        }
    }
}

fn entry_from_message(message: &dyn MessageView) -> Option<RawEntry> {
    let context = message.msgctxt();
    let source = message.msgid();
    if source.is_empty() && context.is_empty() {
        // header entry
        return None;
    }

    let translation = if message.is_plural() {
        message
            .msgstr_plural()
            .ok()
            .and_then(|forms| forms.first().cloned())
            .unwrap_or_default()
    } else {
        message.msgstr().map(str::to_string).unwrap_or_default()
    };
    let key = if context.is_empty() { source } else { context };
    Some(RawEntry::new(key, source, translation))
}

fn message_from_record(record: &TranslationRecord) -> Message {
    // msgctxt only when the key cannot be recovered from msgid
    if record.key() != record.source_text {
        Message::build_singular()
            .with_msgctxt(record.key().to_string())
            .with_msgid(record.source_text.clone())
            .with_msgstr(record.translated_text.clone())
            .done()
    } else {
        Message::build_singular()
            .with_msgid(record.source_text.clone())
            .with_msgstr(record.translated_text.clone())
            .done()
    }
}

impl FormatAdapter for PoAdapter {
    fn parse(&self, content: &[u8]) -> Result<Vec<RawEntry>, FormatError> {
        // polib reads UTF-8 from disk; stage the decoded text for it
        let text = decode_text(content)?;
        let mut scratch = NamedTempFile::new()?;
        scratch.write_all(text.as_bytes())?;
        scratch.flush()?;

        let catalog = po_file::parse(scratch.path())
            .map_err(|err| FormatError::ParseError(err.to_string()))?;
        Ok(catalog.messages().filter_map(entry_from_message).collect())
    }

    fn serialize(&self, records: &[TranslationRecord]) -> Result<Vec<u8>, FormatError> {
        let mut metadata = CatalogMetadata::new();
        metadata.language = self.language.clone();
        let mut catalog = Catalog::new(metadata);
        for record in records {
            catalog.append_or_update(message_from_record(record));
        }

        let scratch = NamedTempFile::new()?;
        po_file::write(&catalog, scratch.path())
            .map_err(|err| FormatError::SerializationError(err.to_string()))?;
        Ok(fs::read(scratch.path())?)
    }

    fn format(&self) -> FileFormat {
        FileFormat::Po
    }
}
