use bytes::Bytes;
use thiserror::Error;
use tracing::debug;

use crate::errors::AppError;

const PDF_HEADER: &[u8] = b"%PDF-";
/// Readers accept the header anywhere in the first kilobyte.
const HEADER_SEARCH_WINDOW: usize = 1024;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("upload is empty")]
    Empty,

    #[error("declared length {declared} exceeds the {actual} bytes received")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("missing %PDF- header")]
    MissingHeader,

    #[error("PDF parse error: {0}")]
    Parse(String),

    #[error("PDF parser aborted on a malformed document")]
    ParserPanic,

    #[error("document has no extractable text layer")]
    NoText,
}

impl From<DocumentError> for AppError {
    fn from(err: DocumentError) -> Self {
        AppError::InvalidDocument(err.to_string())
    }
}

/// Extracts the plain text of every page of a PDF held in memory.
///
/// Only the first `declared_length` bytes are handed to the parser. Empty or
/// whitespace-only output is an error: a PDF without a text layer (a scan)
/// must never produce an empty-but-successful result.
pub fn extract_text(bytes: &[u8], declared_length: usize) -> Result<String, DocumentError> {
    if declared_length == 0 || bytes.is_empty() {
        return Err(DocumentError::Empty);
    }
    if declared_length > bytes.len() {
        return Err(DocumentError::LengthMismatch {
            declared: declared_length,
            actual: bytes.len(),
        });
    }

    let document = &bytes[..declared_length];
    if !has_pdf_header(document) {
        return Err(DocumentError::MissingHeader);
    }

    // pdf-extract panics on some malformed inputs instead of returning an error.
    let text = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(document))
        .map_err(|_| DocumentError::ParserPanic)?
        .map_err(|e| DocumentError::Parse(e.to_string()))?;

    if text.trim().is_empty() {
        return Err(DocumentError::NoText);
    }

    debug!(
        "Extracted {} chars of text from a {}-byte PDF",
        text.len(),
        declared_length
    );
    Ok(text)
}

/// Runs [`extract_text`] on the blocking pool. The upload buffer is moved into
/// the task and dropped when it finishes, whatever the outcome.
pub async fn read_text(bytes: Bytes, declared_length: usize) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || extract_text(&bytes, declared_length))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("PDF reader task failed: {e}")))?
        .map_err(AppError::from)
}

fn has_pdf_header(document: &[u8]) -> bool {
    let window = &document[..document.len().min(HEADER_SEARCH_WINDOW)];
    window
        .windows(PDF_HEADER.len())
        .any(|candidate| candidate == PDF_HEADER)
}
