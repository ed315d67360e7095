use crate::domain::{ports::DocumentParser, DomainError};

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Text extraction backed by `pdf-extract`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfParser;

impl PdfParser {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentParser for PdfParser {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, DomainError> {
        if !bytes.starts_with(PDF_MAGIC) {
            return Err(DomainError::parse("file is not a PDF document"));
        }

        let text = pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| DomainError::parse(format!("PDF extraction failed: {e}")))?;

        // pdf-extract separates pages with form feeds
        Ok(text.replace('\u{c}', "\n\n"))
    }
}
