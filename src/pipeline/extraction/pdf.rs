use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use super::types::{PageExtraction, PdfExtractor};
use super::ExtractionError;

/// PDF text extractor using the pdf-extract crate.
/// Handles digital PDFs with embedded text layers; image-only pages come back empty.
pub struct PdfTextExtractor;

impl PdfExtractor for PdfTextExtractor {
    fn extract_text(&self, pdf_bytes: &[u8]) -> Result<Vec<PageExtraction>, ExtractionError> {
        number_pages(extract_pages(pdf_bytes)?)
    }

    fn page_count(&self, pdf_bytes: &[u8]) -> Result<usize, ExtractionError> {
        Ok(extract_pages(pdf_bytes)?.len())
    }
}

/// Reject anything that is not a PDF container before handing it to a reader.
pub fn ensure_pdf_header(bytes: &[u8]) -> Result<(), ExtractionError> {
    match bytes {
        [0x25, 0x50, 0x44, 0x46, ..] => Ok(()),
        _ => Err(ExtractionError::NotAPdf),
    }
}

/// Number pages from 1 in reading order. A page tree with no pages is an error.
fn number_pages(page_texts: Vec<String>) -> Result<Vec<PageExtraction>, ExtractionError> {
    if page_texts.is_empty() {
        return Err(ExtractionError::EmptyDocument);
    }

    Ok(page_texts
        .into_iter()
        .enumerate()
        .map(|(i, text)| PageExtraction {
            page_number: i + 1,
            text,
        })
        .collect())
}

/// pdf-extract panics on some malformed content streams; those panics are
/// reported as container errors instead of unwinding into the caller.
fn extract_pages(pdf_bytes: &[u8]) -> Result<Vec<String>, ExtractionError> {
    ensure_pdf_header(pdf_bytes)?;

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem_by_pages(pdf_bytes)
    }));

    match outcome {
        Ok(Ok(pages)) => Ok(pages),
        Ok(Err(e)) => Err(ExtractionError::PdfParsing(e.to_string())),
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::warn!(error = %message, "pdf-extract panicked, treating PDF as unreadable");
            Err(ExtractionError::ReaderPanic(message))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
