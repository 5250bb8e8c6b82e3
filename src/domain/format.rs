//! Input format detection from magic bytes.

/// Detected document format of an input buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Xml,
    Pdf,
    Image,
    Unknown,
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DocumentFormat::Xml => "xml",
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Image => "image",
            DocumentFormat::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const PDF_MAGIC: &[u8] = b"%PDF";
const PNG_MAGIC: &[u8] = &[0x89, 0x50, 0x4E, 0x47];
const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];
const TIFF_LE_MAGIC: &[u8] = &[0x49, 0x49];
const TIFF_BE_MAGIC: &[u8] = &[0x4D, 0x4D];

/// Identify the format of a byte buffer from magic prefixes.
///
/// XML detection tolerates a UTF-8 BOM and leading whitespace.
#[must_use]
pub fn detect_format(data: &[u8]) -> DocumentFormat {
    let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);

    if data.starts_with(PDF_MAGIC) {
        return DocumentFormat::Pdf;
    }
    if data.starts_with(PNG_MAGIC)
        || data.starts_with(JPEG_MAGIC)
        || data.starts_with(TIFF_LE_MAGIC)
        || data.starts_with(TIFF_BE_MAGIC)
    {
        return DocumentFormat::Image;
    }

    let trimmed = trim_ascii_start(data);
    if trimmed.starts_with(b"<?xml") || trimmed.starts_with(b"<") {
        return DocumentFormat::Xml;
    }

    DocumentFormat::Unknown
}

/// IANA media type for the detected format
#[must_use]
pub fn detect_mime_type(data: &[u8]) -> &'static str {
    let stripped = data.strip_prefix(UTF8_BOM).unwrap_or(data);
    if stripped.starts_with(PNG_MAGIC) {
        return "image/png";
    }
    if stripped.starts_with(JPEG_MAGIC) {
        return "image/jpeg";
    }
    if stripped.starts_with(TIFF_LE_MAGIC) || stripped.starts_with(TIFF_BE_MAGIC) {
        return "image/tiff";
    }
    match detect_format(data) {
        DocumentFormat::Xml => "application/xml",
        DocumentFormat::Pdf => "application/pdf",
        DocumentFormat::Image | DocumentFormat::Unknown => "application/octet-stream",
    }
}

fn trim_ascii_start(data: &[u8]) -> &[u8] {
    let mut rest = data;
    while let Some((first, tail)) = rest.split_first() {
        if first.is_ascii_whitespace() {
            rest = tail;
        } else {
            break;
        }
    }
    rest
}
