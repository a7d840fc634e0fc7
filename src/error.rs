use crate::model::ErrorDocument;
use thiserror::Error;

/// Failures surfaced to callers of `get_court_availability`. The display
/// text is the exact message placed in the error document.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AvailabilityError {
    #[error("Invalid date or time format: {0}")]
    InvalidInput(String),
    #[error("Crawling failed: {0}")]
    CrawlFailed(String),
    #[error("Page fetcher not available: {0}")]
    FetcherUnavailable(String),
    #[error("Error loading data: {0}")]
    Load(String),
}

impl AvailabilityError {
    pub fn to_document(&self) -> ErrorDocument {
        ErrorDocument {
            error: self.to_string(),
        }
    }
}
