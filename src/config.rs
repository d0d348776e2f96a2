// Configuration for the cache, the upstream provider and the search itself

use crate::error::ConfigError;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://test.api.amadeus.com";
pub const DEFAULT_MAX_RESULTS: usize = 6;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub ttl_seconds: u64,
    pub reaper_interval_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 86400,
            reaper_interval_seconds: 3600,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    pub fn reaper_interval(&self) -> Duration {
        Duration::from_secs(self.reaper_interval_seconds)
    }
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub request_timeout_ms: u64,
    pub token_timeout_ms: u64,
    pub adults: u32,
    pub currency: String,
    pub max_offers: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            request_timeout_ms: 30000,
            token_timeout_ms: 20000,
            adults: 1,
            currency: "USD".to_string(),
            max_offers: 50,
        }
    }
}

/// What a search does when a single lookup key fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Abort the whole search on the first failed key.
    FailFast,
    /// Drop the failed key, keep aggregating and report it alongside the offers.
    SkipFailed,
}

impl FromStr for FailurePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fail-fast" | "fail_fast" => Ok(FailurePolicy::FailFast),
            "skip-failed" | "skip_failed" => Ok(FailurePolicy::SkipFailed),
            other => Err(ConfigError::InvalidVar {
                name: "FLIGHT_SEARCH_FAILURE_POLICY".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub cache: CacheConfig,
    pub provider: ProviderConfig,
    pub max_results: usize,
    pub max_concurrent_lookups: usize,
    pub failure_policy: FailurePolicy,
    pub token_refresh_margin_seconds: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            provider: ProviderConfig::default(),
            max_results: DEFAULT_MAX_RESULTS,
            max_concurrent_lookups: 4,
            failure_policy: FailurePolicy::SkipFailed,
            token_refresh_margin_seconds: 60,
        }
    }
}

impl SearchConfig {
    pub fn token_refresh_margin(&self) -> Duration {
        Duration::from_secs(self.token_refresh_margin_seconds)
    }

    /// Loads the configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required =
            |name: &str| lookup(name).ok_or_else(|| ConfigError::MissingVar(name.to_string()));

        let mut config = Self::default();
        config.provider.client_id = required("AMADEUS_CLIENT_ID")?;
        config.provider.client_secret = required("AMADEUS_CLIENT_SECRET")?;

        if let Some(base_url) = lookup("AMADEUS_BASE_URL") {
            config.provider.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Some(ttl) = lookup("FLIGHT_CACHE_TTL_SECONDS") {
            config.cache.ttl_seconds = parse_var("FLIGHT_CACHE_TTL_SECONDS", &ttl)?;
        }
        if let Some(interval) = lookup("FLIGHT_CACHE_REAPER_INTERVAL_SECONDS") {
            config.cache.reaper_interval_seconds =
                parse_var("FLIGHT_CACHE_REAPER_INTERVAL_SECONDS", &interval)?;
        }
        if let Some(policy) = lookup("FLIGHT_SEARCH_FAILURE_POLICY") {
            config.failure_policy = policy.parse()?;
        }
        if let Some(concurrency) = lookup("FLIGHT_SEARCH_MAX_CONCURRENCY") {
            let concurrency: usize = parse_var("FLIGHT_SEARCH_MAX_CONCURRENCY", &concurrency)?;
            if concurrency == 0 {
                return Err(ConfigError::InvalidVar {
                    name: "FLIGHT_SEARCH_MAX_CONCURRENCY".to_string(),
                    value: concurrency.to_string(),
                });
            }
            config.max_concurrent_lookups = concurrency;
        }

        Ok(config)
    }
}

fn parse_var<T: FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidVar {
        name: name.to_string(),
        value: value.to_string(),
    })
}
