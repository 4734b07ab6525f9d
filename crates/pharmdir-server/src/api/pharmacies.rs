use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::NaiveDateTime;
use pharmdir_core::{
    generate_stable_display_data, Coordinates, Pharmacy, PharmacySource, SearchRequest,
    MEDME_LOGO_PATH,
};
use pharmdir_db::BulkDataset;
use pharmdir_search::SearchError;
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, parse_country, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct SearchQuery {
    pub location: Option<String>,
    pub radius_km: Option<f64>,
    /// Comma-separated service keywords.
    pub services: Option<String>,
    pub medme_only: Option<bool>,
    pub query: Option<String>,
    pub country: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct ResolvedLocation {
    pub lat: f64,
    pub lng: f64,
    pub strategy: &'static str,
}

#[derive(Debug, Serialize)]
pub(super) struct SearchResults {
    pub results: Vec<Pharmacy>,
    pub total: usize,
    pub location: Option<ResolvedLocation>,
}

#[derive(Debug, Deserialize)]
pub(super) struct NearbyQuery {
    pub lat: f64,
    pub lng: f64,
    pub radius_km: Option<f64>,
    pub country: Option<String>,
}

fn local_now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

fn search_error(request_id: &str, error: &SearchError) -> ApiError {
    match error {
        SearchError::InvalidRadius(_) => {
            ApiError::new(request_id, "bad_request", error.user_message())
        }
        SearchError::AllSourcesFailed | SearchError::Db(_) => {
            tracing::error!(error = %error, "pharmacy search failed");
            ApiError::new(request_id, "internal_error", error.user_message())
        }
    }
}

fn split_services(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

pub(super) async fn search_pharmacies(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<ApiResponse<SearchResults>>, ApiError> {
    let country = parse_country(&req_id.0, params.country.as_deref(), state.default_country)?;

    let mut request = SearchRequest::new(country);
    request.location = params.location;
    request.radius_km = params.radius_km.unwrap_or(state.default_radius_km);
    request.services = split_services(params.services.as_deref());
    request.medme_only = params.medme_only.unwrap_or(false);
    request.query = params.query;
    request.limit = usize::try_from(normalize_limit(params.limit)).ok();

    let outcome = state
        .search
        .search(&request, local_now())
        .await
        .map_err(|e| search_error(&req_id.0, &e))?;

    let data = SearchResults {
        total: outcome.results.len(),
        location: outcome.geocoded.map(|g| ResolvedLocation {
            lat: g.coordinates.lat,
            lng: g.coordinates.lng,
            strategy: g.strategy.as_str(),
        }),
        results: outcome.results,
    };
    Ok(Json(ApiResponse::new(data, req_id.0)))
}

pub(super) async fn nearby_pharmacies(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<NearbyQuery>,
) -> Result<Json<ApiResponse<Vec<Pharmacy>>>, ApiError> {
    let country = parse_country(&req_id.0, params.country.as_deref(), state.default_country)?;
    if !(-90.0..=90.0).contains(&params.lat) || !(-180.0..=180.0).contains(&params.lng) {
        return Err(ApiError::new(req_id.0, "bad_request", "lat/lng out of range"));
    }
    let center = Coordinates::new(params.lat, params.lng);

    let mut request = SearchRequest::new(country);
    request.radius_km = params.radius_km.unwrap_or(state.default_radius_km);
    let outcome = state
        .search
        .search_near(center, &request, local_now())
        .await
        .map_err(|e| search_error(&req_id.0, &e))?;
    Ok(Json(ApiResponse::new(outcome.results, req_id.0)))
}

pub(super) async fn get_pharmacy(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((source, id)): Path<(String, String)>,
) -> Result<Json<ApiResponse<Pharmacy>>, ApiError> {
    let source: PharmacySource = source.parse().map_err(|e: pharmdir_core::CoreError| {
        ApiError::new(req_id.0.clone(), "bad_request", e.to_string())
    })?;

    let found = match source {
        PharmacySource::Regular | PharmacySource::Medme => {
            let (pharmacy, linked) = tokio::try_join!(
                pharmdir_db::get_pharmacy_by_id(&state.pool, &id),
                pharmdir_db::is_medme_linked(&state.pool, &id),
            )
            .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
            pharmacy.map(|mut p| {
                if linked {
                    p.source = PharmacySource::Medme;
                    p.image_url = Some(MEDME_LOGO_PATH.to_string());
                }
                p
            })
        }
        PharmacySource::UsBulk => BulkDataset::Us
            .get_by_id(&state.pool, &id)
            .await
            .map_err(|e| map_db_error(req_id.0.clone(), &e))?,
        PharmacySource::CaBulk => BulkDataset::Ca
            .get_by_id(&state.pool, &id)
            .await
            .map_err(|e| map_db_error(req_id.0.clone(), &e))?,
    };

    let Some(mut pharmacy) = found else {
        return Err(ApiError::new(
            req_id.0,
            "not_found",
            format!("pharmacy {source}/{id} not found"),
        ));
    };
    pharmacy.display_data = Some(generate_stable_display_data(
        &pharmacy.id,
        &pharmacy.name,
        0,
        local_now(),
    ));
    Ok(Json(ApiResponse::new(pharmacy, req_id.0)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn services_are_split_and_trimmed() {
        assert_eq!(
            split_services(Some(" Vaccinations, ,flu shots")),
            ["Vaccinations", "flu shots"]
        );
        assert!(split_services(None).is_empty());
    }

    #[test]
    fn search_errors_map_to_api_codes() {
        let invalid = search_error("r", &SearchError::InvalidRadius(-1.0));
        assert_eq!(invalid.error.code, "bad_request");
        let failed = search_error("r", &SearchError::AllSourcesFailed);
        assert_eq!(failed.error.code, "internal_error");
        assert_eq!(failed.error.message, pharmdir_search::GENERIC_SEARCH_ERROR);
    }

    #[test]
    fn search_results_serialize_location() {
        let data = SearchResults {
            results: vec![],
            total: 0,
            location: Some(ResolvedLocation {
                lat: 34.0522,
                lng: -118.2437,
                strategy: "city_table",
            }),
        };
        let json = serde_json::to_value(&data).expect("serialize");
        assert_eq!(json["location"]["strategy"], "city_table");
        assert_eq!(json["total"], 0);
    }
}
