//! PDF handling: checking that an upload is a PDF, and extracting one text
//! string per page with lopdf.

use lopdf::Document;

pub const PDF_MIME: &str = "application/pdf";

/// Check an uploaded file and return the document id (its filename).
///
/// Accepted when the MIME type is `application/pdf` or the filename ends in
/// `.pdf`, both compared case-insensitively.
pub fn validate_upload(
    filename: Option<&str>,
    content_type: Option<&str>,
    bytes: &[u8],
) -> Result<String, UploadError> {
    let filename = filename
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or(UploadError::MissingFilename)?;
    if bytes.is_empty() {
        return Err(UploadError::Empty(filename.to_string()));
    }
    let mime_ok = content_type
        .and_then(|ct| ct.split(';').next())
        .is_some_and(|ct| ct.trim().eq_ignore_ascii_case(PDF_MIME));
    let ext_ok = filename.to_ascii_lowercase().ends_with(".pdf");
    if !mime_ok && !ext_ok {
        return Err(UploadError::UnsupportedType {
            filename: filename.to_string(),
            content_type: content_type.unwrap_or("unknown").to_string(),
        });
    }
    Ok(filename.to_string())
}

/// Extract the text of every page, in page order.
pub fn extract_pages(bytes: &[u8]) -> Result<Vec<String>, ExtractError> {
    if bytes.is_empty() {
        return Err(ExtractError::Empty);
    }
    let doc = Document::load_mem(bytes).map_err(|e| ExtractError::Parse(e.to_string()))?;
    if doc.is_encrypted() {
        return Err(ExtractError::Encrypted);
    }
    // BTreeMap keyed by 1-based page number, so iteration is in page order.
    let pages = doc.get_pages();
    let mut texts = Vec::with_capacity(pages.len());
    for &page in pages.keys() {
        let text = doc.extract_text(&[page]).map_err(|e| ExtractError::Page {
            page,
            message: e.to_string(),
        })?;
        texts.push(text);
    }
    Ok(texts)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    #[error("no file uploaded")]
    MissingFile,
    #[error("uploaded file has no filename")]
    MissingFilename,
    #[error("uploaded file {0} is empty")]
    Empty(String),
    #[error("only PDF files are supported (got {filename} as {content_type})")]
    UnsupportedType {
        filename: String,
        content_type: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    #[error("document is empty")]
    Empty,
    #[error("could not parse PDF: {0}")]
    Parse(String),
    #[error("PDF is encrypted or password-protected")]
    Encrypted,
    #[error("could not extract text from page {page}: {message}")]
    Page { page: u32, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{encrypted_pdf, text_pdf};

    #[test]
    fn accepts_pdf_by_mime_or_extension() {
        assert_eq!(
            validate_upload(Some("a.pdf"), Some("application/pdf"), b"x").unwrap(),
            "a.pdf"
        );
        assert!(validate_upload(Some("a.PDF"), Some("application/octet-stream"), b"x").is_ok());
        assert!(validate_upload(Some("report"), Some("Application/PDF; charset=binary"), b"x").is_ok());
        assert!(validate_upload(Some("a.pdf"), None, b"x").is_ok());
    }

    #[test]
    fn rejects_other_types() {
        let err = validate_upload(Some("notes.txt"), Some("text/plain"), b"x").unwrap_err();
        assert!(matches!(err, UploadError::UnsupportedType { .. }));
    }

    #[test]
    fn rejects_empty_and_unnamed() {
        assert_eq!(
            validate_upload(Some("a.pdf"), Some(PDF_MIME), b""),
            Err(UploadError::Empty("a.pdf".into()))
        );
        assert_eq!(
            validate_upload(Some("  "), Some(PDF_MIME), b"x"),
            Err(UploadError::MissingFilename)
        );
        assert_eq!(validate_upload(None, Some(PDF_MIME), b"x"), Err(UploadError::MissingFilename));
    }

    #[test]
    fn extracts_pages_in_order() {
        let bytes = text_pdf(&["first page words", "second page"]);
        let pages = extract_pages(&bytes).unwrap();
        assert_eq!(pages.len(), 2);
        assert!(pages[0].contains("first page words"));
        assert!(pages[1].contains("second page"));
    }

    #[test]
    fn encrypted_pdf_is_refused() {
        let bytes = encrypted_pdf(&["locked away"]);
        assert_eq!(extract_pages(&bytes), Err(ExtractError::Encrypted));
    }

    #[test]
    fn corrupt_bytes_fail() {
        let err = extract_pages(b"definitely not a pdf").unwrap_err();
        assert!(matches!(err, ExtractError::Parse(_)));
        assert_eq!(extract_pages(b""), Err(ExtractError::Empty));
    }
}
