//! The assembled pharmacy record returned by searches.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::display::DisplayData;
use crate::geo::Coordinates;
use crate::CoreError;

/// Which data source produced a pharmacy, and therefore which display rules apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PharmacySource {
    Regular,
    Medme,
    UsBulk,
    CaBulk,
}

impl PharmacySource {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PharmacySource::Regular => "regular",
            PharmacySource::Medme => "medme",
            PharmacySource::UsBulk => "us_bulk",
            PharmacySource::CaBulk => "ca_bulk",
        }
    }
}

impl std::fmt::Display for PharmacySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PharmacySource {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "regular" => Ok(PharmacySource::Regular),
            "medme" => Ok(PharmacySource::Medme),
            "us_bulk" | "us" => Ok(PharmacySource::UsBulk),
            "ca_bulk" | "ca" => Ok(PharmacySource::CaBulk),
            _ => Err(CoreError::UnknownSource(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub line1: Option<String>,
    pub city: Option<String>,
    /// State (US) or province (CA).
    pub region: Option<String>,
    pub postal_code: Option<String>,
    /// Unparsed address as stored upstream, when the source keeps one.
    pub raw: Option<String>,
}

impl Address {
    /// Single-line rendering used for display and text matching.
    #[must_use]
    pub fn formatted(&self) -> String {
        if let Some(raw) = self.raw.as_deref().filter(|r| !r.trim().is_empty()) {
            return raw.trim().to_string();
        }
        let region_postal = [self.region.as_deref(), self.postal_code.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.trim().is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        [self.line1.as_deref(), self.city.as_deref(), Some(region_postal.as_str())]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pharmacy {
    pub id: String,
    pub name: String,
    pub address: Address,
    pub coordinates: Option<Coordinates>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub image_url: Option<String>,
    pub source: PharmacySource,
    /// `None` means no service data; such pharmacies pass every service filter.
    pub services: Option<Vec<String>>,
    /// Source-provided rating (US bulk dataset only).
    pub rating: Option<f64>,
    pub review_count: Option<i32>,
    pub hours_text: Option<String>,
    /// Attached only during a radius search.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_data: Option<DisplayData>,
}

impl Pharmacy {
    /// Minimal record; the remaining fields default to empty.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, source: PharmacySource) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            address: Address::default(),
            coordinates: None,
            phone: None,
            website: None,
            image_url: None,
            source,
            services: None,
            rating: None,
            review_count: None,
            hours_text: None,
            distance_km: None,
            display_data: None,
        }
    }

    #[must_use]
    pub fn with_coordinates(mut self, lat: f64, lng: f64) -> Self {
        self.coordinates = Some(Coordinates::new(lat, lng));
        self
    }

    #[must_use]
    pub fn with_services<I, S>(mut self, services: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.services = Some(services.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_address(mut self, address: Address) -> Self {
        self.address = address;
        self
    }

    #[must_use]
    pub fn is_medme(&self) -> bool {
        self.source == PharmacySource::Medme
    }

    /// Case-insensitive substring match against name and address fields.
    #[must_use]
    pub fn matches_text(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        let fields = [
            Some(self.name.as_str()),
            self.address.line1.as_deref(),
            self.address.city.as_deref(),
            self.address.region.as_deref(),
            self.address.postal_code.as_deref(),
            self.address.raw.as_deref(),
        ];
        fields
            .into_iter()
            .flatten()
            .any(|f| f.to_lowercase().contains(&needle))
    }
}
