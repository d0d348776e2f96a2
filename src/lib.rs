// Flight search fan-out: one multi-airport, multi-date query in, the cheapest offers out

pub mod cache;
pub mod config;
pub mod error;
pub mod lookup;
pub mod model;
pub mod parse;
pub mod provider;
pub mod query;
pub mod reaper;
pub mod search;
pub mod token;

// Re-export key types for convenience
pub use cache::{CacheStatsReport, InMemoryOfferCache, OfferCache};
pub use config::{CacheConfig, FailurePolicy, ProviderConfig, SearchConfig};
pub use error::{
    ConfigError, CredentialError, KeyFailure, LookupError, ParseError, QueryError, SearchError,
    UpstreamError,
};
pub use lookup::LookupExecutor;
pub use model::{LookupKey, Offer, Segment};
pub use provider::{AccessToken, FlightOffersProvider, HttpOffersProvider};
pub use query::Query;
pub use reaper::CacheReaper;
pub use search::{FlightSearch, SearchResults};
pub use token::TokenManager;
