//! Résumé text extraction from uploaded PDF bytes.

use std::panic::catch_unwind;

use thiserror::Error;
use tracing::debug;

const PDF_MAGIC: &[u8] = b"%PDF-";

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Only PDF files are supported (got '{0}')")]
    UnsupportedFile(String),

    #[error("Uploaded file is empty")]
    EmptyFile,

    #[error("Could not extract text from PDF: {0}")]
    Pdf(String),

    #[error("No text could be extracted from the PDF")]
    NoText,
}

/// Accepts an upload when either the filename or the content type says PDF.
pub fn validate_pdf_upload(
    filename: Option<&str>,
    content_type: Option<&str>,
) -> Result<(), ExtractionError> {
    let by_name = filename.is_some_and(|f| f.to_lowercase().ends_with(".pdf"));
    let by_type = content_type.is_some_and(|c| c.eq_ignore_ascii_case("application/pdf"));
    if by_name || by_type {
        Ok(())
    } else {
        Err(ExtractionError::UnsupportedFile(
            filename.or(content_type).unwrap_or("unknown").to_string(),
        ))
    }
}

/// Extracts plain text from an in-memory PDF. Fails when the document yields no text.
pub fn extract_pdf_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    if bytes.is_empty() {
        return Err(ExtractionError::EmptyFile);
    }
    if !bytes.starts_with(PDF_MAGIC) {
        return Err(ExtractionError::Pdf("missing PDF header".to_string()));
    }

    // The parser panics on some malformed documents.
    let text = catch_unwind(|| pdf_extract::extract_text_from_mem(bytes))
        .map_err(|_| ExtractionError::Pdf("malformed document".to_string()))?
        .map_err(|e| ExtractionError::Pdf(e.to_string()))?;
    debug!(chars = text.chars().count(), "pdf text extracted");

    if text.trim().is_empty() {
        return Err(ExtractionError::NoText);
    }
    Ok(text)
}
