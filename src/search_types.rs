use chrono::{DateTime, Utc};
use ureq::http::Uri;

/// One search request, composed fresh from the current input state for every
/// attempt and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub text: String,
    pub creative_commons_only: bool,
    pub date_filter_enabled: bool,
    pub min_date: DateTime<Utc>,
    pub max_date: DateTime<Utc>,
}

/// A successfully parsed photo entry. The display surface resolves the image
/// bytes itself; this core only carries the URI.
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoRecord {
    pub title: String,
    pub image_url: Uri,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SearchError {
    #[error("search request could not be formed")]
    MalformedRequest,
    #[error("photo service unreachable: {0}")]
    Transport(String),
    #[error("photo service response was not understood")]
    Parse,
}

pub type SearchOutcome = Result<Vec<PhotoRecord>, SearchError>;

/// Invoked exactly once with the outcome of an issued search. May be called
/// from any thread; implementations marshal onto the coordination context.
pub type OutcomeCallback = Box<dyn FnOnce(SearchOutcome) + Send>;

/// The seam between the orchestrator and whatever performs the search.
pub trait PhotoFinder {
    /// Issues one asynchronous search. Returns `Err` only for the synchronous
    /// local failure path (a query that cannot form a valid request target);
    /// every other outcome arrives through `deliver`, exactly once.
    fn find(&self, query: SearchQuery, deliver: OutcomeCallback) -> Result<(), SearchError>;
}
