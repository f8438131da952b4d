use crate::models::ParsedDocument;
use crate::pipeline::extraction::TableGrid;

use super::LabParseError;

/// One page as both readers saw it.
#[derive(Debug, Clone, Default)]
pub struct SourcePage {
    pub page_number: usize,
    /// Sanitized flowed text of the page.
    pub text: String,
    /// Grids from the table reader; empty when it found none or failed.
    pub tables: Vec<TableGrid>,
}

/// A PDF after both readers ran, ready for the extraction strategies.
#[derive(Debug, Clone, Default)]
pub struct SourceDocument {
    pub pages: Vec<SourcePage>,
    /// Sanitized flowed text of all pages, newline-joined.
    pub full_text: String,
}

impl SourceDocument {
    pub fn has_tables(&self) -> bool {
        self.pages.iter().any(|p| !p.tables.is_empty())
    }

    /// Character count of the flowed text, surrounding whitespace excluded.
    pub fn text_length(&self) -> usize {
        self.full_text.trim().chars().count()
    }
}

/// One way of turning a source document into records. Strategies are tried
/// in priority order; the first that yields a document with signal wins.
pub trait ExtractionStrategy {
    fn name(&self) -> &'static str;

    /// Reject a document this strategy cannot work with at all.
    fn preflight(&self, _source: &SourceDocument) -> Result<(), LabParseError> {
        Ok(())
    }

    fn try_extract(&self, source: &SourceDocument) -> Option<ParsedDocument>;
}
