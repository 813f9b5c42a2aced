/// CSV format adapter
/// Header row names the `key`, `source` and `translation` columns.
use super::{locate_columns, FileFormat, FormatAdapter, FormatError};
use super::{KEY_COLUMN, SOURCE_COLUMN, TRANSLATION_COLUMN};
use crate::encoding::decode_text;
use crate::record::{RawEntry, TranslationRecord};

pub struct CsvAdapter {
    delimiter: u8,
}

impl CsvAdapter {
    pub fn new(delimiter: u8) -> Self {
        Self { delimiter }
    }
}

impl FormatAdapter for CsvAdapter {
    fn parse(&self, content: &[u8]) -> Result<Vec<RawEntry>, FormatError> {
        let text = decode_text(content)?;
        let mut reader = ::csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .flexible(true)
            .has_headers(true)
            .from_reader(text.as_bytes());

        let headers = reader
            .headers()
            .map_err(|e| FormatError::ParseError(format!("CSV header error: {}", e)))?
            .clone();
        let [key_col, source_col, translation_col] = locate_columns(headers.iter())?;
        let width = key_col.max(source_col).max(translation_col);

        let mut entries = Vec::new();
        for result in reader.records() {
            let record =
                result.map_err(|e| FormatError::ParseError(format!("CSV parse error: {}", e)))?;
            if record.len() <= width {
                let line = record.position().map(|p| p.line()).unwrap_or_default();
                return Err(FormatError::ParseError(format!(
                    "CSV line {} has {} fields, expected at least {}",
                    line,
                    record.len(),
                    width + 1
                )));
            }
            entries.push(RawEntry::new(
                &record[key_col],
                &record[source_col],
                &record[translation_col],
            ));
        }
        Ok(entries)
    }

    fn serialize(&self, records: &[TranslationRecord]) -> Result<Vec<u8>, FormatError> {
        let mut writer = ::csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_writer(Vec::new());
        let to_error = |e: ::csv::Error| FormatError::SerializationError(e.to_string());

        writer
            .write_record([KEY_COLUMN, SOURCE_COLUMN, TRANSLATION_COLUMN])
            .map_err(to_error)?;
        for record in records {
            writer
                .write_record([
                    record.key(),
                    record.source_text.as_str(),
                    record.translated_text.as_str(),
                ])
                .map_err(to_error)?;
        }
        writer
            .into_inner()
            .map_err(|e| FormatError::SerializationError(e.to_string()))
    }

    fn format(&self) -> FileFormat {
        FileFormat::Csv
    }
}
