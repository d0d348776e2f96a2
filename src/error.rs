// Error types for the flight search fan-out

use crate::model::LookupKey;
use thiserror::Error;

// Failure to obtain a bearer credential from the provider.
// Clone because one failed fetch is handed to every caller waiting on it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CredentialError {
    #[error("Credential request failed: {0}")]
    Network(String),

    #[error("Credential request timed out after {0}ms")]
    Timeout(u64),

    #[error("Credential request rejected: {status_code} - {message}")]
    Rejected { status_code: u16, message: String },

    #[error("Malformed credential response: {0}")]
    MalformedResponse(String),
}

// A raw offer record that cannot be mapped into the internal model
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Offer #{index} has no itinerary")]
    MissingItinerary { index: usize },

    #[error("Offer #{index} has an itinerary without segments")]
    MissingSegments { index: usize },

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Invalid price: {0}")]
    InvalidPrice(String),
}

// Failure of a single per-key flight offers fetch
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UpstreamError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("API error: {status_code} - {message}")]
    ApiResponseError { status_code: u16, message: String },

    #[error("Malformed response body: {0}")]
    MalformedBody(String),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
}

impl UpstreamError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            UpstreamError::ApiResponseError {
                status_code: 401,
                ..
            }
        )
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LookupError {
    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

/// A lookup key that failed while the search carried on without it.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyFailure {
    pub key: LookupKey,
    pub error: UpstreamError,
}

#[derive(Error, Debug)]
pub enum SearchError {
    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error("Lookup {key} failed: {source}")]
    Upstream {
        key: LookupKey,
        #[source]
        source: UpstreamError,
    },

    #[error("All {} lookups failed", .failures.len())]
    AllLookupsFailed { failures: Vec<KeyFailure> },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error("Query needs at least one origin")]
    EmptyOrigins,

    #[error("Query needs at least one destination")]
    EmptyDestinations,

    #[error("Query needs at least one departure date")]
    EmptyDates,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {name}: {value}")]
    InvalidVar { name: String, value: String },
}
