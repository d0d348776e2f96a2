// Shared bearer credential with single-flight refresh

use crate::error::CredentialError;
use crate::provider::{AccessToken, FlightOffersProvider};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

type TokenFetch = Shared<BoxFuture<'static, Result<AccessToken, CredentialError>>>;

#[derive(Debug, Clone)]
struct CachedToken {
    bearer: String,
    // None when the provider did not say, the token is then kept until invalidated
    refresh_at: Option<Instant>,
}

impl CachedToken {
    fn from_access_token(token: AccessToken, margin: Duration, now: Instant) -> Self {
        Self {
            refresh_at: token
                .expires_in
                // A lifetime shorter than the margin still gets half of it
                .map(|expires_in| now + expires_in - margin.min(expires_in / 2)),
            bearer: token.bearer,
        }
    }

    fn is_stale(&self, now: Instant) -> bool {
        self.refresh_at.map_or(false, |refresh_at| now >= refresh_at)
    }
}

/// Owns the one bearer credential used by every lookup in the process.
///
/// At most one credential request is in flight at a time; concurrent callers
/// wait on it and all receive its outcome, success or failure. A failed fetch
/// is not cached, the next call starts a new one.
pub struct TokenManager {
    provider: Arc<dyn FlightOffersProvider>,
    current: RwLock<Option<CachedToken>>,
    in_flight: Mutex<Option<TokenFetch>>,
    refresh_margin: Duration,
}

impl TokenManager {
    pub fn new(provider: Arc<dyn FlightOffersProvider>, refresh_margin: Duration) -> Self {
        Self {
            provider,
            current: RwLock::new(None),
            in_flight: Mutex::new(None),
            refresh_margin,
        }
    }

    /// Returns a valid bearer token, fetching one if none is held or the held one is stale.
    #[instrument(skip(self))]
    pub async fn ensure_token(&self) -> Result<String, CredentialError> {
        if let Some(bearer) = self.current_bearer() {
            return Ok(bearer);
        }

        let fetch = {
            let mut in_flight = self.in_flight.lock();

            // Another caller may have stored a token between the fast path and the lock
            if let Some(bearer) = self.current_bearer() {
                return Ok(bearer);
            }

            match in_flight.as_ref() {
                Some(fetch) => {
                    debug!("joining in-flight credential request");
                    fetch.clone()
                }
                None => {
                    let provider = Arc::clone(&self.provider);
                    let fetch = async move { provider.fetch_token().await }
                        .boxed()
                        .shared();
                    *in_flight = Some(fetch.clone());
                    fetch
                }
            }
        };

        let result = fetch.clone().await;
        self.complete(&fetch, &result);
        result.map(|token| token.bearer)
    }

    /// Drops the held token so that the next call fetches a fresh one.
    pub fn invalidate(&self) {
        if self.current.write().take().is_some() {
            info!("bearer token invalidated");
        }
    }

    // Drop a token only if it is still the one held, a concurrent refresh may have replaced it
    pub fn invalidate_if_current(&self, bearer: &str) {
        let mut current = self.current.write();
        if current.as_ref().map_or(false, |t| t.bearer == bearer) {
            *current = None;
            info!("bearer token rejected upstream, invalidated");
        }
    }

    fn current_bearer(&self) -> Option<String> {
        let now = Instant::now();
        self.current
            .read()
            .as_ref()
            .filter(|token| !token.is_stale(now))
            .map(|token| token.bearer.clone())
    }

    // The first waiter to observe the outcome publishes it and clears the flight
    fn complete(&self, fetch: &TokenFetch, result: &Result<AccessToken, CredentialError>) {
        let mut in_flight = self.in_flight.lock();
        if !in_flight.as_ref().map_or(false, |f| f.ptr_eq(fetch)) {
            return;
        }
        *in_flight = None;

        match result {
            Ok(token) => {
                info!(expires_in = ?token.expires_in, "acquired bearer token");
                *self.current.write() = Some(CachedToken::from_access_token(
                    token.clone(),
                    self.refresh_margin,
                    Instant::now(),
                ));
            }
            Err(e) => warn!(error = %e, "credential request failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mock_provider::MockProvider;
    use futures::future::join_all;
    use tokio_test::{assert_err, assert_ok};

    fn manager(provider: &Arc<MockProvider>) -> Arc<TokenManager> {
        Arc::new(TokenManager::new(
            provider.clone() as Arc<dyn FlightOffersProvider>,
            Duration::from_secs(60),
        ))
    }

    #[tokio::test]
    async fn test_token_is_fetched_once_and_reused() {
        let provider = Arc::new(MockProvider::new());
        let tokens = manager(&provider);

        assert_eq!(assert_ok!(tokens.ensure_token().await), "token-1");
        assert_eq!(assert_ok!(tokens.ensure_token().await), "token-1");
        assert_eq!(provider.token_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_share_one_fetch() {
        let provider = Arc::new(MockProvider::new());
        provider.set_token_delay(Duration::from_millis(200));
        let tokens = manager(&provider);

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let tokens = Arc::clone(&tokens);
                tokio::spawn(async move { tokens.ensure_token().await })
            })
            .collect();

        for result in join_all(handles).await {
            assert_eq!(result.unwrap().unwrap(), "token-1");
        }
        assert_eq!(provider.token_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_reaches_all_waiters_and_is_not_cached() {
        let provider = Arc::new(MockProvider::new());
        provider.set_token_delay(Duration::from_millis(100));
        provider.fail_next_tokens(1);
        let tokens = manager(&provider);

        let results = join_all((0..5).map(|_| tokens.ensure_token())).await;
        for result in results {
            assert!(matches!(result, Err(CredentialError::Rejected { status_code: 401, .. })));
        }
        assert_eq!(provider.token_calls(), 1);

        // The next call retries
        assert_eq!(assert_ok!(tokens.ensure_token().await), "token-2");
        assert_eq!(provider.token_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_token_is_refreshed() {
        let provider = Arc::new(MockProvider::new());
        provider.set_token_ttl(Some(Duration::from_secs(1799)));
        let tokens = manager(&provider);

        assert_eq!(assert_ok!(tokens.ensure_token().await), "token-1");

        // Still inside the lifetime minus the refresh margin
        tokio::time::advance(Duration::from_secs(1700)).await;
        assert_eq!(assert_ok!(tokens.ensure_token().await), "token-1");

        tokio::time::advance(Duration::from_secs(40)).await;
        assert_eq!(assert_ok!(tokens.ensure_token().await), "token-2");
        assert_eq!(provider.token_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_lived_token_is_reused() {
        let provider = Arc::new(MockProvider::new());
        provider.set_token_ttl(Some(Duration::from_secs(30)));
        let tokens = manager(&provider);

        for _ in 0..3 {
            assert_eq!(assert_ok!(tokens.ensure_token().await), "token-1");
        }
        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(assert_ok!(tokens.ensure_token().await), "token-1");
        assert_eq!(provider.token_calls(), 1);

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(assert_ok!(tokens.ensure_token().await), "token-2");
        assert_eq!(provider.token_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_token_without_expiry_is_kept() {
        let provider = Arc::new(MockProvider::new());
        let tokens = manager(&provider);

        assert_ok!(tokens.ensure_token().await);
        tokio::time::advance(Duration::from_secs(30 * 86400)).await;
        assert_eq!(assert_ok!(tokens.ensure_token().await), "token-1");
        assert_eq!(provider.token_calls(), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let provider = Arc::new(MockProvider::new());
        let tokens = manager(&provider);

        assert_ok!(tokens.ensure_token().await);
        tokens.invalidate_if_current("some-older-token");
        assert_eq!(assert_ok!(tokens.ensure_token().await), "token-1");

        tokens.invalidate_if_current("token-1");
        assert_eq!(assert_ok!(tokens.ensure_token().await), "token-2");

        tokens.invalidate();
        assert_eq!(assert_ok!(tokens.ensure_token().await), "token-3");
        assert_eq!(provider.token_calls(), 3);
    }

    #[tokio::test]
    async fn test_failure_surfaces_error() {
        let provider = Arc::new(MockProvider::new());
        provider.fail_next_tokens(1);
        let tokens = manager(&provider);

        let err = assert_err!(tokens.ensure_token().await);
        assert_eq!(
            err.to_string(),
            "Credential request rejected: 401 - invalid_client"
        );
    }
}
