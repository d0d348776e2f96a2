// Fan-out of one query into per-key lookups, merged into a ranked, bounded list

use crate::cache::{InMemoryOfferCache, OfferCache};
use crate::config::{FailurePolicy, SearchConfig};
use crate::error::{KeyFailure, LookupError, SearchError};
use crate::lookup::LookupExecutor;
use crate::model::Offer;
use crate::provider::FlightOffersProvider;
use crate::query::Query;
use crate::token::TokenManager;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResults {
    /// Cheapest offers first, at most `max_results` of them.
    pub offers: Vec<Offer>,
    /// Keys skipped under [`FailurePolicy::SkipFailed`].
    #[serde(skip)]
    pub failures: Vec<KeyFailure>,
}

pub struct FlightSearch {
    executor: LookupExecutor,
    cache: Arc<dyn OfferCache>,
    tokens: Arc<TokenManager>,
    max_results: usize,
    max_concurrent_lookups: usize,
    failure_policy: FailurePolicy,
}

impl FlightSearch {
    /// Wires a search over an in-memory cache built from the config.
    pub fn new(config: &SearchConfig, provider: Arc<dyn FlightOffersProvider>) -> Self {
        let cache: Arc<dyn OfferCache> = Arc::new(InMemoryOfferCache::new(&config.cache));
        let tokens = Arc::new(TokenManager::new(
            Arc::clone(&provider),
            config.token_refresh_margin(),
        ));
        Self::with_parts(config, cache, tokens, provider)
    }

    pub fn with_parts(
        config: &SearchConfig,
        cache: Arc<dyn OfferCache>,
        tokens: Arc<TokenManager>,
        provider: Arc<dyn FlightOffersProvider>,
    ) -> Self {
        let executor = LookupExecutor::new(
            Arc::clone(&cache),
            Arc::clone(&tokens),
            provider,
            Duration::from_millis(config.provider.request_timeout_ms),
        );
        Self {
            executor,
            cache,
            tokens,
            max_results: config.max_results,
            max_concurrent_lookups: config.max_concurrent_lookups.max(1),
            failure_policy: config.failure_policy,
        }
    }

    pub fn cache(&self) -> &Arc<dyn OfferCache> {
        &self.cache
    }

    pub fn tokens(&self) -> &Arc<TokenManager> {
        &self.tokens
    }

    /// Resolves every key of the query and returns the cheapest offers.
    ///
    /// Offers are accumulated in expansion order whatever order the lookups
    /// finish in, then stably sorted by price, so equal prices keep that order.
    #[instrument(skip(self, query), fields(keys = query.key_count()))]
    pub async fn search(&self, query: &Query) -> Result<SearchResults, SearchError> {
        let mut lookups = stream::iter(query.expand())
            .map(|key| async move {
                let result = self.executor.resolve(&key).await;
                (key, result)
            })
            .buffered(self.max_concurrent_lookups);

        let mut offers = Vec::new();
        let mut failures = Vec::new();
        let mut resolved = 0;

        // Returning early drops the stream, abandoning the lookups still in flight
        while let Some((key, result)) = lookups.next().await {
            match result {
                Ok(found) => {
                    resolved += 1;
                    offers.extend(found.iter().cloned());
                }
                Err(LookupError::Credential(e)) => return Err(SearchError::Credential(e)),
                Err(LookupError::Upstream(error)) => match self.failure_policy {
                    FailurePolicy::FailFast => {
                        return Err(SearchError::Upstream { key, source: error });
                    }
                    FailurePolicy::SkipFailed => {
                        warn!(%key, %error, "lookup failed, continuing without it");
                        failures.push(KeyFailure { key, error });
                    }
                },
            }
        }

        if resolved == 0 && !failures.is_empty() {
            return Err(SearchError::AllLookupsFailed { failures });
        }

        let offers = rank(offers, self.max_results);
        info!(
            returned = offers.len(),
            failed = failures.len(),
            "search complete"
        );
        Ok(SearchResults { offers, failures })
    }
}

/// Stable sort by ascending price, then keep the first `limit`.
pub fn rank(mut offers: Vec<Offer>, limit: usize) -> Vec<Offer> {
    offers.sort_by(|a, b| a.price.total_cmp(&b.price));
    offers.truncate(limit);
    offers
}
