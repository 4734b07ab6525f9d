//! Merge, de-duplicate, filter and rank pharmacies from every data source.
//!
//! Pure functions only: fetching happens in the search orchestrator and the
//! geocoder has already resolved the location into a [`LocationMatch`].

use std::collections::HashSet;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::display::generate_stable_display_data;
use crate::geo::Coordinates;
use crate::pharmacy::{Pharmacy, PharmacySource};
use crate::Country;

/// Partner logo attached to MedMe-linked listings. Bulk rows carrying this
/// image are the same pharmacy scraped a second time.
pub const MEDME_LOGO_PATH: &str = "/images/medme-logo.png";

/// Bulk-dataset listings under these names duplicate MedMe-linked pharmacies.
const MEDME_BRANDED_NAMES: &[&str] = &[
    "medme pharmacy",
    "medme health",
    "medme health pharmacy",
    "medme pharmacy & wellness",
];

const DEFAULT_RADIUS_KM: f64 = 25.0;

/// What the caller asked for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Free-text address, city, or `"lat, lng"` literal.
    pub location: Option<String>,
    pub radius_km: f64,
    #[serde(default)]
    pub services: Vec<String>,
    #[serde(default)]
    pub medme_only: bool,
    /// Narrows by name/address substring before ranking.
    pub query: Option<String>,
    pub country: Country,
    pub limit: Option<usize>,
}

impl SearchRequest {
    #[must_use]
    pub fn new(country: Country) -> Self {
        Self {
            location: None,
            radius_km: DEFAULT_RADIUS_KM,
            services: Vec::new(),
            medme_only: false,
            query: None,
            country,
            limit: None,
        }
    }

    /// Location text with surrounding whitespace removed, `None` when blank.
    #[must_use]
    pub fn location_text(&self) -> Option<&str> {
        self.location
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// How the location part of a request was resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationMatch {
    /// No location given: return everything, alphabetically.
    Anywhere,
    /// Geocoded centre for the exact-radius filter.
    Near(Coordinates),
    /// Geocoding produced nothing; match the text against name/address.
    Text(String),
}

/// Raw per-source results, already fetched.
#[derive(Debug, Clone, Default)]
pub struct MergeInput {
    pub regular: Vec<Pharmacy>,
    /// Active ids from the MedMe linkage table.
    pub medme_ids: HashSet<String>,
    /// Rows from the country bulk dataset.
    pub bulk: Vec<Pharmacy>,
}

fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Whether a bulk listing is a MedMe-branded duplicate.
///
/// Matches a known branded name, any name in `linked_names`, or the partner
/// logo sentinel. Two differently-named listings for the same store are not
/// caught.
#[must_use]
pub fn is_medme_branded(pharmacy: &Pharmacy, linked_names: &HashSet<String>) -> bool {
    let name = normalize_name(&pharmacy.name);
    MEDME_BRANDED_NAMES.contains(&name.as_str())
        || linked_names.contains(&name)
        || pharmacy.image_url.as_deref() == Some(MEDME_LOGO_PATH)
}

/// Service filter with an inclusive default.
///
/// A pharmacy without service data always matches. Otherwise any requested
/// service must substring-match one of its services in either direction,
/// case-insensitively.
#[must_use]
pub fn matches_services(pharmacy: &Pharmacy, requested: &[String]) -> bool {
    let requested: Vec<String> = requested
        .iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();
    if requested.is_empty() {
        return true;
    }
    let Some(services) = &pharmacy.services else {
        return true;
    };
    services.iter().any(|offered| {
        let offered = offered.to_lowercase();
        requested
            .iter()
            .any(|want| offered.contains(want.as_str()) || want.contains(offered.as_str()))
    })
}

fn tag_regular(mut pharmacy: Pharmacy, medme_ids: &HashSet<String>) -> Pharmacy {
    if medme_ids.contains(&pharmacy.id) {
        pharmacy.source = PharmacySource::Medme;
        pharmacy.image_url = Some(MEDME_LOGO_PATH.to_string());
    } else {
        pharmacy.source = PharmacySource::Regular;
    }
    pharmacy
}

fn sort_by_name(pharmacies: &mut [Pharmacy]) {
    pharmacies.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Combine every source into the final ranked list.
///
/// Steps: tag regular rows as MedMe when linked, drop MedMe duplicates from
/// the bulk dataset (or all bulk rows when `medme_only`), apply the free-text
/// query, the location (exact radius or text fallback), then the service
/// filter, and finally attach display data in result order.
#[must_use]
pub fn merge_results(
    input: MergeInput,
    location: &LocationMatch,
    request: &SearchRequest,
    now: NaiveDateTime,
) -> Vec<Pharmacy> {
    let MergeInput {
        regular,
        medme_ids,
        bulk,
    } = input;

    let mut candidates: Vec<Pharmacy> = regular
        .into_iter()
        .map(|p| tag_regular(p, &medme_ids))
        .collect();

    if request.medme_only {
        candidates.retain(Pharmacy::is_medme);
    } else {
        let linked_names: HashSet<String> = candidates
            .iter()
            .filter(|p| p.is_medme())
            .map(|p| normalize_name(&p.name))
            .collect();
        let before = bulk.len();
        let kept: Vec<Pharmacy> = bulk
            .into_iter()
            .filter(|p| !is_medme_branded(p, &linked_names))
            .collect();
        tracing::debug!(
            bulk_rows = before,
            excluded = before - kept.len(),
            "dropped MedMe duplicates from bulk dataset"
        );
        candidates.extend(kept);
    }

    if let Some(query) = request.query.as_deref().filter(|q| !q.trim().is_empty()) {
        candidates.retain(|p| p.matches_text(query));
    }

    let mut results = match location {
        LocationMatch::Near(center) => {
            let mut near: Vec<Pharmacy> = candidates
                .into_iter()
                .filter_map(|mut p| {
                    let coords = p.coordinates?;
                    let d = center.distance_to(coords);
                    if d <= request.radius_km {
                        p.distance_km = Some(d);
                        Some(p)
                    } else {
                        None
                    }
                })
                .collect();
            near.sort_by(|a, b| {
                a.distance_km
                    .unwrap_or(f64::INFINITY)
                    .total_cmp(&b.distance_km.unwrap_or(f64::INFINITY))
            });
            near
        }
        LocationMatch::Text(text) => {
            candidates.retain(|p| p.matches_text(text));
            sort_by_name(&mut candidates);
            candidates
        }
        LocationMatch::Anywhere => {
            sort_by_name(&mut candidates);
            candidates
        }
    };

    results.retain(|p| matches_services(p, &request.services));

    if let Some(limit) = request.limit {
        results.truncate(limit);
    }

    for (index, pharmacy) in results.iter_mut().enumerate() {
        pharmacy.display_data = Some(generate_stable_display_data(
            &pharmacy.id,
            &pharmacy.name,
            index,
            now,
        ));
    }

    results
}
