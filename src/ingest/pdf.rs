//! PDF text extraction.

use std::path::Path;

use crate::core::errors::ApiError;

/// Extract the text of every page of a PDF, trimmed. An unreadable file or
/// a document with no extractable text is an error; there is nothing to
/// index either way.
pub fn extract_text(path: &Path) -> Result<String, ApiError> {
    let text = pdf_extract::extract_text(path).map_err(|e| {
        ApiError::BadRequest(format!(
            "failed to extract text from {}: {}",
            path.display(),
            e
        ))
    })?;

    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(ApiError::BadRequest(format!(
            "no extractable text in {}",
            path.display()
        )));
    }

    Ok(text)
}
