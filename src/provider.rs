// Upstream flight offers provider: credential issuance and per-key offer lookups

use crate::config::ProviderConfig;
use crate::error::{CredentialError, UpstreamError};
use crate::model::LookupKey;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

// Raw records as the provider sends them, lenient so that parsing can report what is missing
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct FlightOffersResponse {
    pub data: Vec<RawOffer>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawOffer {
    pub itineraries: Vec<RawItinerary>,
    pub validating_airline_codes: Option<Vec<String>>,
    pub price: RawPrice,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawItinerary {
    pub segments: Vec<RawSegment>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawSegment {
    pub departure: RawEndpoint,
    pub arrival: RawEndpoint,
    pub carrier_code: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawEndpoint {
    pub iata_code: String,
    pub at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RawPrice {
    pub total: RawAmount,
}

// Totals usually arrive as decimal strings, occasionally as bare numbers
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RawAmount {
    Number(f64),
    Text(String),
}

impl Default for RawAmount {
    fn default() -> Self {
        RawAmount::Text(String::new())
    }
}

/// A freshly issued bearer credential.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessToken {
    pub bearer: String,
    pub expires_in: Option<Duration>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<u64>,
}

#[async_trait]
pub trait FlightOffersProvider: Send + Sync + 'static {
    // Request a new bearer credential
    async fn fetch_token(&self) -> Result<AccessToken, CredentialError>;

    // Fetch the raw offers for one origin/destination/date
    async fn fetch_offers(
        &self,
        key: &LookupKey,
        bearer: &str,
    ) -> Result<Vec<RawOffer>, UpstreamError>;
}

/// Provider backed by the Amadeus self-service REST API.
pub struct HttpOffersProvider {
    client: reqwest::Client,
    config: ProviderConfig,
}

impl HttpOffersProvider {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl FlightOffersProvider for HttpOffersProvider {
    #[instrument(skip(self))]
    async fn fetch_token(&self) -> Result<AccessToken, CredentialError> {
        let timeout_ms = self.config.token_timeout_ms;
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];

        let response = self
            .client
            .post(self.url("/v1/security/oauth2/token"))
            .form(&params)
            .timeout(Duration::from_millis(timeout_ms))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CredentialError::Timeout(timeout_ms)
                } else {
                    CredentialError::Network(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status_code = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(CredentialError::Rejected {
                status_code,
                message,
            });
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| CredentialError::MalformedResponse(e.to_string()))?;

        debug!(expires_in = ?token.expires_in, "credential issued");
        Ok(AccessToken {
            bearer: token.access_token,
            expires_in: token.expires_in.map(Duration::from_secs),
        })
    }

    #[instrument(skip(self, key, bearer), fields(key = %key))]
    async fn fetch_offers(
        &self,
        key: &LookupKey,
        bearer: &str,
    ) -> Result<Vec<RawOffer>, UpstreamError> {
        let timeout_ms = self.config.request_timeout_ms;
        let date = key.date.to_string();
        let adults = self.config.adults.to_string();
        let max = self.config.max_offers.to_string();
        let params = [
            ("originLocationCode", key.origin.as_str()),
            ("destinationLocationCode", key.destination.as_str()),
            ("departureDate", date.as_str()),
            ("adults", adults.as_str()),
            ("currencyCode", self.config.currency.as_str()),
            ("max", max.as_str()),
        ];

        let response = self
            .client
            .get(self.url("/v2/shopping/flight-offers"))
            .query(&params)
            .bearer_auth(bearer)
            .timeout(Duration::from_millis(timeout_ms))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    UpstreamError::Timeout(timeout_ms)
                } else {
                    UpstreamError::Network(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status_code = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(UpstreamError::ApiResponseError {
                status_code,
                message,
            });
        }

        let body: FlightOffersResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::MalformedBody(e.to_string()))?;

        Ok(body.data)
    }
}
