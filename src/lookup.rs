// Cache-or-fetch resolution of a single lookup key

use crate::cache::OfferCache;
use crate::error::{LookupError, UpstreamError};
use crate::model::{LookupKey, Offer};
use crate::parse::parse_offers;
use crate::provider::{FlightOffersProvider, RawOffer};
use crate::token::TokenManager;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

pub struct LookupExecutor {
    cache: Arc<dyn OfferCache>,
    tokens: Arc<TokenManager>,
    provider: Arc<dyn FlightOffersProvider>,
    request_timeout: Duration,
}

impl LookupExecutor {
    pub fn new(
        cache: Arc<dyn OfferCache>,
        tokens: Arc<TokenManager>,
        provider: Arc<dyn FlightOffersProvider>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            cache,
            tokens,
            provider,
            request_timeout,
        }
    }

    /// Resolves one key from the cache, or from the provider on a miss.
    ///
    /// A bearer token is only requested on a miss. The cache is written once the
    /// whole response has been fetched and parsed, so a cancelled or failed
    /// lookup leaves it untouched.
    #[instrument(skip(self, key), fields(key = %key))]
    pub async fn resolve(&self, key: &LookupKey) -> Result<Arc<Vec<Offer>>, LookupError> {
        if let Some(offers) = self.cache.get(key) {
            return Ok(offers);
        }

        let bearer = self.tokens.ensure_token().await?;
        let raw = match self.fetch(key, &bearer).await {
            Err(e) if e.is_unauthorized() => {
                warn!("bearer token rejected, retrying with a fresh one");
                self.tokens.invalidate_if_current(&bearer);
                let bearer = self.tokens.ensure_token().await?;
                self.fetch(key, &bearer).await?
            }
            result => result?,
        };

        let offers = parse_offers(&raw).map_err(UpstreamError::from)?;
        info!(offers = offers.len(), "fetched offers from provider");

        Ok(self.cache.set(key.clone(), offers))
    }

    async fn fetch(&self, key: &LookupKey, bearer: &str) -> Result<Vec<RawOffer>, UpstreamError> {
        tokio::time::timeout(self.request_timeout, self.provider.fetch_offers(key, bearer))
            .await
            .map_err(|_| UpstreamError::Timeout(self.request_timeout.as_millis() as u64))?
    }
}
