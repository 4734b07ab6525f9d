//! HTTP client for the Mapbox forward-geocoding API.
//!
//! Wraps `reqwest` with token management and reshapes each feature into a
//! [`GeocodeResult`]. The access token is sent as a query parameter and is
//! never included in errors or logs.

use std::time::Duration;

use pharmdir_core::Country;
use reqwest::{Client, Url};

use crate::error::GeocodeError;
use crate::types::{FeatureCollection, GeocodeResult};

const DEFAULT_BASE_URL: &str = "https://api.mapbox.com/";

/// Client for the provider's forward-geocoding endpoint.
///
/// Use [`MapboxClient::new`] for production or [`MapboxClient::with_base_url`]
/// to point at a mock server in tests.
#[derive(Clone)]
pub struct MapboxClient {
    client: Client,
    access_token: String,
    base_url: Url,
}

impl std::fmt::Debug for MapboxClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapboxClient")
            .field("base_url", &self.base_url.as_str())
            .field("access_token", &"[redacted]")
            .finish_non_exhaustive()
    }
}

impl MapboxClient {
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(access_token: &str, timeout_secs: u64) -> Result<Self, GeocodeError> {
        Self::with_base_url(access_token, timeout_secs, DEFAULT_BASE_URL)
    }

    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the `reqwest::Client` cannot be
    /// constructed, or [`GeocodeError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        access_token: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, GeocodeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(5))
            .user_agent("pharmdir/0.1 (pharmacy-search)")
            .build()?;

        // Exactly one trailing slash so `join` appends instead of replacing
        // the last path segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised)
            .map_err(|_| GeocodeError::InvalidBaseUrl(base_url.to_string()))?;

        Ok(Self {
            client,
            access_token: access_token.to_owned(),
            base_url,
        })
    }

    /// Forward-geocode free text, restricted to `country`.
    ///
    /// Returns results in provider relevance order; an empty list means the
    /// provider found nothing.
    ///
    /// # Errors
    ///
    /// - [`GeocodeError::Http`] on network failure.
    /// - [`GeocodeError::UnexpectedStatus`] on a non-2xx response.
    /// - [`GeocodeError::Deserialize`] if the body is not a feature collection.
    pub async fn forward_geocode(
        &self,
        query: &str,
        country: Country,
        limit: u8,
    ) -> Result<Vec<GeocodeResult>, GeocodeError> {
        let url = self.build_url(query, country, limit)?;

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::UnexpectedStatus {
                status: status.as_u16(),
            });
        }

        let body: serde_json::Value = response.json().await?;
        let collection: FeatureCollection =
            serde_json::from_value(body).map_err(|e| GeocodeError::Deserialize {
                context: format!("forward_geocode(country={country})"),
                source: e,
            })?;

        Ok(collection
            .features
            .into_iter()
            .map(GeocodeResult::from)
            .collect())
    }

    fn build_url(&self, query: &str, country: Country, limit: u8) -> Result<Url, GeocodeError> {
        let mut url = self
            .base_url
            .join("geocoding/v5/mapbox.places/")
            .map_err(|_| GeocodeError::InvalidBaseUrl(self.base_url.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| GeocodeError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push(&format!("{}.json", query.trim()));
        url.query_pairs_mut()
            .append_pair("access_token", &self.access_token)
            .append_pair("country", country.code())
            .append_pair("limit", &limit.max(1).to_string());
        Ok(url)
    }
}
