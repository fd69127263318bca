use thiserror::Error;

#[derive(Debug, Error)]
#[error("PDF text extraction failed: {0}")]
pub struct ExtractionError(pub String);

/// Turns PDF bytes into plain text. Implementations are CPU bound; callers
/// run them off the async executor.
pub trait PdfTextExtractor: Send + Sync {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, ExtractionError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtract;

impl PdfTextExtractor for PdfExtract {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        let text = pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| ExtractionError(e.to_string()))?;
        if text.trim().is_empty() {
            return Err(ExtractionError("document contains no text".to_string()));
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::{PdfExtract, PdfTextExtractor};

    #[test]
    fn non_pdf_bytes_fail() {
        assert!(PdfExtract.extract_text(b"definitely not a pdf").is_err());
    }
}
