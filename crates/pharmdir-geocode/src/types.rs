//! Provider response types and the reshaped result served to clients.

use serde::{Deserialize, Serialize};

/// Geocoding result in the shape the web client consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResult {
    pub formatted_address: String,
    pub position: Position,
    pub place_id: String,
    pub address_components: Vec<AddressComponent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressComponent {
    pub long_name: String,
    pub short_name: String,
    pub types: Vec<String>,
}

// ---------------------------------------------------------------------------
// Mapbox forward-geocoding response
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct FeatureCollection {
    #[serde(default)]
    pub features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Feature {
    pub id: String,
    pub place_name: String,
    /// `[lng, lat]`.
    pub center: [f64; 2],
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub place_type: Vec<String>,
    #[serde(default)]
    pub context: Vec<ContextEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContextEntry {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub short_code: Option<String>,
}

/// `"region.123"` → `"region"`.
fn context_kind(id: &str) -> &str {
    id.split('.').next().unwrap_or(id)
}

/// `"US-CA"` → `"CA"`, `"us"` → `"US"`.
fn short_code_name(code: &str) -> String {
    code.rsplit('-').next().unwrap_or(code).to_uppercase()
}

impl From<Feature> for GeocodeResult {
    fn from(feature: Feature) -> Self {
        let mut address_components = Vec::with_capacity(feature.context.len() + 1);
        if let Some(text) = feature.text {
            address_components.push(AddressComponent {
                long_name: text.clone(),
                short_name: text,
                types: feature.place_type,
            });
        }
        address_components.extend(feature.context.into_iter().map(|entry| {
            let short_name = entry
                .short_code
                .as_deref()
                .map_or_else(|| entry.text.clone(), short_code_name);
            AddressComponent {
                types: vec![context_kind(&entry.id).to_string()],
                long_name: entry.text,
                short_name,
            }
        }));

        Self {
            formatted_address: feature.place_name,
            position: Position {
                lat: feature.center[1],
                lng: feature.center[0],
            },
            place_id: feature.id,
            address_components,
        }
    }
}
