use serde::{Deserialize, Serialize};

use super::ExtractionError;

/// Flowed text of a single page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageExtraction {
    pub page_number: usize,
    pub text: String,
}

/// A table as a grid of cells. `None` marks a cell with nothing in it.
pub type TableGrid = Vec<Vec<Option<String>>>;

/// Tables found on a single page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageTables {
    pub page_number: usize,
    pub tables: Vec<TableGrid>,
}

/// PDF text extraction abstraction (allows mocking for tests)
pub trait PdfExtractor {
    fn extract_text(&self, pdf_bytes: &[u8]) -> Result<Vec<PageExtraction>, ExtractionError>;

    fn page_count(&self, pdf_bytes: &[u8]) -> Result<usize, ExtractionError>;
}

/// Table-aware extraction abstraction: one entry per page, in page order.
///
/// `text_pages` is the text reader's output for the same bytes; readers that
/// rebuild tables from layout text use it instead of decoding the PDF again.
pub trait TableExtractor {
    fn extract_tables(
        &self,
        pdf_bytes: &[u8],
        text_pages: &[PageExtraction],
    ) -> Result<Vec<PageTables>, ExtractionError>;
}
