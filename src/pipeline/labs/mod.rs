pub mod patterns;
pub mod normalize;
pub mod fallbacks;
pub mod config;
pub mod metadata;
pub mod ordered_panels;
pub mod panel_inference;
pub mod types;
pub mod table_strategy;
pub mod text_strategy;
pub mod orchestrator;
pub mod catalog;

pub use patterns::*;
pub use normalize::*;
pub use fallbacks::*;
pub use config::*;
pub use metadata::*;
pub use ordered_panels::*;
pub use panel_inference::*;
pub use types::*;
pub use table_strategy::*;
pub use text_strategy::*;
pub use orchestrator::*;
pub use catalog::*;

use thiserror::Error;

use crate::pipeline::extraction::ExtractionError;

/// Document-level parse failures. Row and line problems never surface here;
/// those records are skipped.
#[derive(Error, Debug)]
pub enum LabParseError {
    #[error("Empty input: no PDF bytes to parse")]
    EmptyInput,

    #[error("Unreadable PDF container: {0}")]
    UnreadableContainer(String),

    #[error("Unreadable or empty document: {length} characters of text, at least {minimum} required")]
    UnreadableText { length: usize, minimum: usize },

    #[error("No extractable lab data: no tests and no collection date found")]
    NoExtractableData,

    #[error("Lab report parsing failed: {0}")]
    ParseFailed(String),
}

impl LabParseError {
    /// Whether the input could not be read at all, as opposed to read but
    /// not understood.
    pub fn is_unreadable(&self) -> bool {
        matches!(
            self,
            Self::EmptyInput | Self::UnreadableContainer(_) | Self::UnreadableText { .. }
        )
    }
}

impl From<ExtractionError> for LabParseError {
    fn from(err: ExtractionError) -> Self {
        if err.is_container_error() {
            Self::UnreadableContainer(err.to_string())
        } else {
            Self::ParseFailed(err.to_string())
        }
    }
}
