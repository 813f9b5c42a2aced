/// Text decoding for imported translation files
use crate::formats::FormatError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Utf8Bom,
    Utf16Le,
    Utf16Be,
    Latin1,
}

impl TextEncoding {
    /// Detect encoding from a byte-order mark, falling back to UTF-8
    /// validation and then Latin-1.
    pub fn detect(content: &[u8]) -> Self {
        if content.starts_with(&[0xEF, 0xBB, 0xBF]) {
            return Self::Utf8Bom;
        }

        if content.starts_with(&[0xFF, 0xFE]) {
            return Self::Utf16Le;
        }

        if content.starts_with(&[0xFE, 0xFF]) {
            return Self::Utf16Be;
        }

        if std::str::from_utf8(content).is_ok() {
            return Self::Utf8;
        }

        Self::Latin1
    }
}

/// Decode file bytes into a `String`, stripping any BOM.
pub fn decode_text(bytes: &[u8]) -> Result<String, FormatError> {
    match TextEncoding::detect(bytes) {
        TextEncoding::Utf8 => String::from_utf8(bytes.to_vec())
            .map_err(|e| FormatError::EncodingError(e.to_string())),
        TextEncoding::Utf8Bom => String::from_utf8(bytes[3..].to_vec())
            .map_err(|e| FormatError::EncodingError(e.to_string())),
        TextEncoding::Utf16Le => decode_utf16(&bytes[2..], u16::from_le_bytes),
        TextEncoding::Utf16Be => decode_utf16(&bytes[2..], u16::from_be_bytes),
        // bytes 0x80-0xFF map straight onto U+0080-U+00FF
        TextEncoding::Latin1 => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
    }
}

fn decode_utf16(content: &[u8], to_unit: fn([u8; 2]) -> u16) -> Result<String, FormatError> {
    if content.len() % 2 != 0 {
        return Err(FormatError::EncodingError(
            "UTF-16 content has an odd number of bytes".into(),
        ));
    }
    let units: Vec<u16> = content
        .chunks_exact(2)
        .map(|chunk| to_unit([chunk[0], chunk[1]]))
        .collect();
    String::from_utf16(&units).map_err(|e| FormatError::EncodingError(e.to_string()))
}
