/// JSON format adapter
/// Layout: an array of `{"key", "source", "translation"}` objects.
use super::{FileFormat, FormatAdapter, FormatError};
use crate::encoding::decode_text;
use crate::record::{RawEntry, TranslationRecord};

pub struct JsonAdapter {
    pretty: bool,
}

impl JsonAdapter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }
}

impl FormatAdapter for JsonAdapter {
    fn parse(&self, content: &[u8]) -> Result<Vec<RawEntry>, FormatError> {
        let text = decode_text(content)?;
        serde_json::from_str(&text)
            .map_err(|e| FormatError::ParseError(format!("JSON parse error: {}", e)))
    }

    fn serialize(&self, records: &[TranslationRecord]) -> Result<Vec<u8>, FormatError> {
        let entries: Vec<RawEntry> = records.iter().map(TranslationRecord::to_raw).collect();
        let result = if self.pretty {
            serde_json::to_vec_pretty(&entries)
        } else {
            serde_json::to_vec(&entries)
        };
        result.map_err(|e| FormatError::SerializationError(format!("JSON serialize error: {}", e)))
    }

    fn format(&self) -> FileFormat {
        FileFormat::Json
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn parses_entries_in_order() {
        let json = r#"[
            {"key": "b", "source": "Bye", "translation": "Au revoir"},
            {"key": "a", "source": "Hello"}
        ]"#;
        let entries = JsonAdapter::new(true).parse(json.as_bytes()).unwrap();
        assert_eq!(
            entries,
            vec![
                RawEntry::new("b", "Bye", "Au revoir"),
                RawEntry::new("a", "Hello", ""),
            ]
        );
    }

    #[test]
    fn rejects_malformed_document() {
        let err = JsonAdapter::new(true).parse(br#"{"key": "a"}"#).unwrap_err();
        assert!(matches!(err, FormatError::ParseError(_)));
        assert!(JsonAdapter::new(true).parse(b"[{").is_err());
    }

    #[test]
    fn serialized_output_has_no_status() {
        let records = vec![TranslationRecord::new("k", "src", "tr")];
        let bytes = JsonAdapter::new(false).serialize(&records).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value[0]["key"], "k");
        assert_eq!(value[0]["translation"], "tr");
        assert!(value[0].get("status").is_none());
    }

    #[test]
    fn round_trips_records() {
        let adapter = JsonAdapter::new(true);
        let records = vec![
            TranslationRecord::new("k1", "Line\nbreak", "Saut\nde ligne"),
            TranslationRecord::new("k2", "\"quoted\"", ""),
        ];
        let parsed = adapter.parse(&adapter.serialize(&records).unwrap()).unwrap();
        let expected: Vec<RawEntry> = records.iter().map(TranslationRecord::to_raw).collect();
        assert_eq!(parsed, expected);
    }
}
