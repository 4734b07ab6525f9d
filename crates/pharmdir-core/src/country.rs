//! Supported directory countries and their geographic constants.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::geo::Coordinates;
use crate::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Country {
    Us,
    Ca,
}

/// Coarse sanity box used to flag geocoding results that land outside the
/// country. Violations are warnings, never errors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SanityBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl SanityBox {
    #[must_use]
    pub fn contains(&self, point: Coordinates) -> bool {
        point.lat >= self.min_lat
            && point.lat <= self.max_lat
            && point.lng >= self.min_lng
            && point.lng <= self.max_lng
    }
}

impl Country {
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Country::Us => "us",
            Country::Ca => "ca",
        }
    }

    /// Geographic centroid, the geocoder's last resort.
    #[must_use]
    pub fn centroid(self) -> Coordinates {
        match self {
            Country::Us => Coordinates::new(39.8283, -98.5795),
            Country::Ca => Coordinates::new(56.1304, -106.3468),
        }
    }

    /// Includes Alaska and Hawaii for the US, and the territories for Canada.
    #[must_use]
    pub fn sanity_box(self) -> SanityBox {
        match self {
            Country::Us => SanityBox {
                min_lat: 18.0,
                max_lat: 72.0,
                min_lng: -180.0,
                max_lng: -66.0,
            },
            Country::Ca => SanityBox {
                min_lat: 41.0,
                max_lat: 84.0,
                min_lng: -142.0,
                max_lng: -52.0,
            },
        }
    }
}

impl std::fmt::Display for Country {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Country {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "us" => Ok(Country::Us),
            "ca" => Ok(Country::Ca),
            _ => Err(CoreError::UnsupportedCountry(s.to_string())),
        }
    }
}
