/// Spreadsheet (XLSX) format adapter
/// First worksheet; row 1 names the columns, data starts at row 2.
use super::{locate_columns, FileFormat, FormatAdapter, FormatError};
use super::{KEY_COLUMN, SOURCE_COLUMN, TRANSLATION_COLUMN};
use crate::record::{RawEntry, TranslationRecord};
use std::io::Cursor;

pub struct XlsxAdapter {
    sheet_name: String,
}

impl XlsxAdapter {
    pub fn new(sheet_name: impl Into<String>) -> Self {
        Self {
            sheet_name: sheet_name.into(),
        }
    }
}

impl FormatAdapter for XlsxAdapter {
    fn parse(&self, content: &[u8]) -> Result<Vec<RawEntry>, FormatError> {
        let cursor = Cursor::new(content.to_vec());
        let book = umya_spreadsheet::reader::xlsx::read_reader(cursor, true)
            .map_err(|e| FormatError::ParseError(format!("XLSX read error: {}", e)))?;
        let sheet = book
            .get_sheet_collection()
            .first()
            .ok_or_else(|| FormatError::ParseError("workbook has no worksheet".into()))?;

        let (max_col, max_row) = sheet.get_highest_column_and_row();
        let cell_text = |col: u32, row: u32| -> String {
            sheet
                .get_cell((col, row))
                .map(|c| c.get_value().to_string())
                .unwrap_or_default()
        };

        let headers: Vec<String> = (1..=max_col).map(|col| cell_text(col, 1)).collect();
        let [key_col, source_col, translation_col] =
            locate_columns(headers.iter().map(String::as_str))?;
        // header positions are 0-based, cells 1-based
        let (key_col, source_col, translation_col) = (
            key_col as u32 + 1,
            source_col as u32 + 1,
            translation_col as u32 + 1,
        );

        let mut entries = Vec::new();
        for row in 2..=max_row {
            let key = cell_text(key_col, row);
            let source = cell_text(source_col, row);
            let translation = cell_text(translation_col, row);
            if key.is_empty() && source.is_empty() && translation.is_empty() {
                continue;
            }
            entries.push(RawEntry::new(key, source, translation));
        }
        Ok(entries)
    }

    fn serialize(&self, records: &[TranslationRecord]) -> Result<Vec<u8>, FormatError> {
        let mut book = umya_spreadsheet::new_file();
        let sheet = book
            .get_sheet_mut(&0)
            .ok_or_else(|| FormatError::SerializationError("default worksheet missing".into()))?;
        sheet.set_name(self.sheet_name.as_str());

        for (col, header) in [KEY_COLUMN, SOURCE_COLUMN, TRANSLATION_COLUMN]
            .into_iter()
            .enumerate()
        {
            let cell = sheet.get_cell_mut((col as u32 + 1, 1));
            cell.set_value_string(header);
            cell.get_style_mut().get_font_mut().set_bold(true);
        }

        for (index, record) in records.iter().enumerate() {
            let row = index as u32 + 2;
            sheet.get_cell_mut((1, row)).set_value_string(record.key());
            sheet
                .get_cell_mut((2, row))
                .set_value_string(record.source_text.as_str());
            sheet
                .get_cell_mut((3, row))
                .set_value_string(record.translated_text.as_str());
        }

        let mut buf = Cursor::new(Vec::new());
        umya_spreadsheet::writer::xlsx::write_writer(&book, &mut buf)
            .map_err(|e| FormatError::SerializationError(format!("XLSX write error: {}", e)))?;
        Ok(buf.into_inner())
    }

    fn format(&self) -> FileFormat {
        FileFormat::Xlsx
    }
}
