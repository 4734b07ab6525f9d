use axum::{
    extract::{Query, State},
    Extension, Json,
};
use pharmdir_geocode::{GeocodeError, GeocodeResult};
use serde::Deserialize;

use crate::middleware::RequestId;

use super::{parse_country, ApiError, ApiResponse, AppState};

const MAX_RESULTS: u8 = 5;

#[derive(Debug, Deserialize)]
pub(super) struct GeocodeQuery {
    pub q: Option<String>,
    pub country: Option<String>,
}

/// Forward geocoding proxy. Keeps the provider token server-side.
pub(super) async fn forward_geocode(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<GeocodeQuery>,
) -> Result<Json<ApiResponse<Vec<GeocodeResult>>>, ApiError> {
    let Some(query) = params.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) else {
        return Err(ApiError::new(req_id.0, "bad_request", "q is required"));
    };
    let country = parse_country(&req_id.0, params.country.as_deref(), state.default_country)?;

    let Some(provider) = state.search.geocoder().provider() else {
        return Err(ApiError::new(
            req_id.0,
            "service_unavailable",
            "geocoding provider is not configured",
        ));
    };

    let results = provider
        .forward_geocode(query, country, MAX_RESULTS)
        .await
        .map_err(|e| map_geocode_error(req_id.0.clone(), &e))?;
    Ok(Json(ApiResponse::new(results, req_id.0)))
}

fn map_geocode_error(request_id: String, error: &GeocodeError) -> ApiError {
    tracing::warn!(error = %error, "geocoding provider request failed");
    ApiError::new(request_id, "bad_gateway", "geocoding provider request failed")
}
