pub mod types;
pub mod sanitize;
pub mod pdf;
pub mod table_detect;

pub use types::*;
pub use sanitize::*;
pub use pdf::*;
pub use table_detect::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Input does not start with a %PDF header")]
    NotAPdf,

    #[error("PDF parsing failed: {0}")]
    PdfParsing(String),

    #[error("PDF reader aborted on malformed input: {0}")]
    ReaderPanic(String),

    #[error("PDF contains no pages")]
    EmptyDocument,
}

impl ExtractionError {
    /// Whether the error means the PDF container itself could not be read.
    pub fn is_container_error(&self) -> bool {
        matches!(
            self,
            Self::NotAPdf | Self::PdfParsing(_) | Self::ReaderPanic(_)
        )
    }
}
