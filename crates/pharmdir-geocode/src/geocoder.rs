//! Location text → coordinates, with a fallback chain that never fails.
//!
//! Strategies are tried in order: a literal `"lat, lng"` pair, the mapping
//! provider, the offline city table and finally the country centroid. Each
//! step that produces a point outside the country's sanity box is logged
//! but still used.

use std::sync::LazyLock;

use pharmdir_core::{AppConfig, Coordinates, Country};
use regex::Regex;

use crate::cities;
use crate::client::MapboxClient;
use crate::error::GeocodeError;

static COORDINATE_LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(-?\d+(?:\.\d+)?)\s*,\s*(-?\d+(?:\.\d+)?)\s*$")
        .expect("valid coordinate literal regex")
});

/// Which step of the chain resolved the location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeocodeStrategy {
    Literal,
    Provider,
    CityTable,
    CountryCentroid,
}

impl GeocodeStrategy {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Literal => "literal",
            Self::Provider => "provider",
            Self::CityTable => "city_table",
            Self::CountryCentroid => "country_centroid",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geocoded {
    pub coordinates: Coordinates,
    pub strategy: GeocodeStrategy,
}

/// Parse `"<lat>, <lng>"`. Values outside ±90 / ±180 are rejected.
#[must_use]
pub fn parse_coordinate_literal(input: &str) -> Option<Coordinates> {
    let caps = COORDINATE_LITERAL.captures(input)?;
    let lat: f64 = caps[1].parse().ok()?;
    let lng: f64 = caps[2].parse().ok()?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return None;
    }
    Some(Coordinates::new(lat, lng))
}

#[derive(Debug, Clone)]
pub struct Geocoder {
    provider: Option<MapboxClient>,
    centroid_fallback: bool,
}

impl Geocoder {
    /// A geocoder with an optional provider and centroid fallback enabled.
    #[must_use]
    pub fn new(provider: Option<MapboxClient>) -> Self {
        Self {
            provider,
            centroid_fallback: true,
        }
    }

    #[must_use]
    pub fn with_centroid_fallback(mut self, enabled: bool) -> Self {
        self.centroid_fallback = enabled;
        self
    }

    /// Build from configuration. No access token means no provider step.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the provider client cannot be constructed.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, GeocodeError> {
        let provider = config
            .mapbox_access_token
            .as_deref()
            .map(|token| {
                MapboxClient::with_base_url(
                    token,
                    config.geocoder_timeout_secs,
                    &config.geocoder_base_url,
                )
            })
            .transpose()?;
        if provider.is_none() {
            tracing::info!("no mapping provider token; geocoding uses offline fallbacks");
        }
        Ok(Self::new(provider).with_centroid_fallback(config.geocode_centroid_fallback))
    }

    /// The mapping provider client, when a token is configured.
    #[must_use]
    pub fn provider(&self) -> Option<&MapboxClient> {
        self.provider.as_ref()
    }

    /// Resolve `input` to a point within `country`.
    ///
    /// Returns `None` only for blank input, or when every step misses and
    /// the centroid fallback is disabled.
    pub async fn geocode(&self, input: &str, country: Country) -> Option<Geocoded> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }

        if let Some(coordinates) = parse_coordinate_literal(input) {
            warn_if_outside(coordinates, country, GeocodeStrategy::Literal);
            return Some(Geocoded {
                coordinates,
                strategy: GeocodeStrategy::Literal,
            });
        }

        if let Some(provider) = &self.provider {
            match provider.forward_geocode(input, country, 1).await {
                Ok(results) => {
                    if let Some(first) = results.first() {
                        let coordinates =
                            Coordinates::new(first.position.lat, first.position.lng);
                        warn_if_outside(coordinates, country, GeocodeStrategy::Provider);
                        return Some(Geocoded {
                            coordinates,
                            strategy: GeocodeStrategy::Provider,
                        });
                    }
                    tracing::debug!(%country, "provider returned no results");
                }
                Err(e) => {
                    tracing::warn!(%country, error = %e, "geocoding provider failed");
                }
            }
        }

        if let Some(coordinates) = cities::lookup(input, country) {
            return Some(Geocoded {
                coordinates,
                strategy: GeocodeStrategy::CityTable,
            });
        }

        if self.centroid_fallback {
            tracing::warn!(%country, input, "location not resolved; using country centroid");
            return Some(Geocoded {
                coordinates: country.centroid(),
                strategy: GeocodeStrategy::CountryCentroid,
            });
        }

        tracing::debug!(%country, input, "location not resolved");
        None
    }
}

fn warn_if_outside(coordinates: Coordinates, country: Country, strategy: GeocodeStrategy) {
    if !country.sanity_box().contains(coordinates) {
        tracing::warn!(
            %country,
            lat = coordinates.lat,
            lng = coordinates.lng,
            strategy = strategy.as_str(),
            "geocoded point lies outside the expected country bounds"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_literal_with_whitespace() {
        assert_eq!(
            parse_coordinate_literal(" 34.05 ,  -118.24 "),
            Some(Coordinates::new(34.05, -118.24))
        );
        assert_eq!(
            parse_coordinate_literal("45,-75"),
            Some(Coordinates::new(45.0, -75.0))
        );
    }

    #[test]
    fn rejects_non_literals_and_out_of_range() {
        assert!(parse_coordinate_literal("Los Angeles").is_none());
        assert!(parse_coordinate_literal("34.05").is_none());
        assert!(parse_coordinate_literal("34.05, -118.24, 3").is_none());
        assert!(parse_coordinate_literal("95, 10").is_none());
        assert!(parse_coordinate_literal("10, 190").is_none());
    }

    #[tokio::test]
    async fn literal_short_circuits_even_outside_country() {
        let geocoder = Geocoder::new(None);
        let got = geocoder.geocode("51.5, -0.12", Country::Us).await.unwrap();
        assert_eq!(got.strategy, GeocodeStrategy::Literal);
        assert_eq!(got.coordinates, Coordinates::new(51.5, -0.12));
    }

    #[tokio::test]
    async fn blank_input_resolves_to_nothing() {
        assert!(
            Geocoder::new(None).geocode("   ", Country::Us).await.is_none()
        );
    }

    #[tokio::test]
    async fn city_table_used_without_provider() {
        let got = Geocoder::new(None)
            .geocode("Los Angeles", Country::Us)
            .await
            .unwrap();
        assert_eq!(got.strategy, GeocodeStrategy::CityTable);
        assert_eq!(got.coordinates, Coordinates::new(34.0522, -118.2437));
    }

    #[tokio::test]
    async fn unknown_place_falls_back_to_centroid() {
        let got = Geocoder::new(None)
            .geocode("Nowhere Junction", Country::Ca)
            .await
            .unwrap();
        assert_eq!(got.strategy, GeocodeStrategy::CountryCentroid);
        assert_eq!(got.coordinates, Country::Ca.centroid());
    }

    #[tokio::test]
    async fn centroid_fallback_can_be_disabled() {
        let geocoder = Geocoder::new(None).with_centroid_fallback(false);
        assert!(
            geocoder.geocode("Nowhere Junction", Country::Us).await.is_none()
        );
    }
}
