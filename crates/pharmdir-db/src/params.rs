//! Shared query parameters for the data-source adapters.

use pharmdir_core::{BoundingBox, Coordinates, Pharmacy};

const MAX_LIMIT: i64 = 5_000;

/// Shared tail of every adapter's `search` query. Binds `$3..=$6` are the
/// bounding box and `$7` the limit. With a box, rows come back nearest to
/// its centre first, so a limit keeps the closest rows; otherwise by name.
/// A NULL limit returns every row.
pub(crate) const ORDER_AND_LIMIT: &str = "\
    ORDER BY CASE WHEN $3::FLOAT8 IS NULL THEN NULL \
                  ELSE power(latitude - ($3 + $4) / 2, 2) \
                     + power((longitude - ($5 + $6) / 2) * cos(radians(($3 + $4) / 2)), 2) \
             END ASC NULLS LAST, \
             name ASC \
    LIMIT $7";

/// Filters pushed down into every adapter's `search` query.
///
/// The bounding box is coarse; callers still apply the exact radius.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchParams {
    /// Case-insensitive substring over name, address and city.
    pub query: Option<String>,
    /// State (US) or province (CA) code.
    pub region: Option<String>,
    pub bounds: Option<BoundingBox>,
    /// Row cap per source; `None` returns every matching row.
    pub limit: Option<i64>,
}

impl SearchParams {
    /// Bounding-box search around `center`.
    #[must_use]
    pub fn near(center: Coordinates, radius_km: f64) -> Self {
        Self {
            bounds: Some(BoundingBox::around(center, radius_km)),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// `ILIKE` pattern for the free-text query, with wildcards escaped.
    pub(crate) fn query_pattern(&self) -> Option<String> {
        self.query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(|q| {
                let escaped = q
                    .replace('\\', "\\\\")
                    .replace('%', "\\%")
                    .replace('_', "\\_");
                format!("%{escaped}%")
            })
    }

    pub(crate) fn region_upper(&self) -> Option<String> {
        self.region
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_uppercase)
    }

    pub(crate) fn effective_limit(&self) -> Option<i64> {
        self.limit.map(|l| l.clamp(1, MAX_LIMIT))
    }

    /// `(min_lat, max_lat, min_lng, max_lng)`, all `None` without a box.
    pub(crate) fn bound_values(&self) -> (Option<f64>, Option<f64>, Option<f64>, Option<f64>) {
        match self.bounds {
            Some(b) => (
                Some(b.min_lat),
                Some(b.max_lat),
                Some(b.min_lng),
                Some(b.max_lng),
            ),
            None => (None, None, None, None),
        }
    }
}

/// Exact-radius pass after a bounding-box query: attaches `distance_km`,
/// drops rows outside the circle or without coordinates, nearest first.
pub(crate) fn retain_within(
    pharmacies: Vec<Pharmacy>,
    center: Coordinates,
    radius_km: f64,
) -> Vec<Pharmacy> {
    let mut nearby: Vec<Pharmacy> = pharmacies
        .into_iter()
        .filter_map(|mut p| {
            let distance = center.distance_to(p.coordinates?);
            (distance <= radius_km).then(|| {
                p.distance_km = Some(distance);
                p
            })
        })
        .collect();
    nearby.sort_by(|a, b| {
        a.distance_km
            .unwrap_or(f64::INFINITY)
            .total_cmp(&b.distance_km.unwrap_or(f64::INFINITY))
    });
    nearby
}
