mod analytics;
mod geocode;
mod pharmacies;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use pharmdir_core::Country;
use pharmdir_search::{PgDirectory, SearchService};
use serde::Serialize;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::middleware::{
    enforce_rate_limit, request_id, require_bearer_auth, AuthState, RateLimitState, RequestId,
};

pub type Search = SearchService<PgDirectory, PgDirectory>;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub search: Arc<Search>,
    pub default_country: Country,
    pub default_radius_km: f64,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn new(data: T, request_id: String) -> Self {
        Self {
            data,
            meta: ResponseMeta::new(request_id),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "bad_gateway" => StatusCode::BAD_GATEWAY,
            "service_unavailable" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn normalize_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(50).clamp(1, 200)
}

pub(super) fn map_db_error(request_id: String, error: &pharmdir_db::DbError) -> ApiError {
    if let pharmdir_db::DbError::Core(core) = error {
        return ApiError::new(request_id, "bad_request", core.to_string());
    }
    tracing::error!(error = %error, "database query failed");
    ApiError::new(request_id, "internal_error", "database query failed")
}

/// Requested country, or the configured default when absent.
pub(super) fn parse_country(
    request_id: &str,
    raw: Option<&str>,
    default: Country,
) -> Result<Country, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(default),
        Some(code) => code.parse().map_err(|e: pharmdir_core::CoreError| {
            ApiError::new(request_id, "bad_request", e.to_string())
        }),
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn protected_router(auth: AuthState, rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/pharmacies/search",
            get(pharmacies::search_pharmacies),
        )
        .route(
            "/api/v1/pharmacies/nearby",
            get(pharmacies::nearby_pharmacies),
        )
        .route(
            "/api/v1/pharmacies/{source}/{id}",
            get(pharmacies::get_pharmacy),
        )
        .route("/api/v1/geocode", get(geocode::forward_geocode))
        .route(
            "/api/v1/analytics/events",
            post(analytics::record_event),
        )
        .route(
            "/api/v1/analytics/impressions",
            post(analytics::record_impressions),
        )
        .route(
            "/api/v1/analytics/impressions/summary",
            get(analytics::impression_summary),
        )
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    auth,
                    require_bearer_auth,
                )),
        )
}

pub fn build_app(state: AppState, auth: AuthState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new().route("/api/v1/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(protected_router(auth, rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match pharmdir_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(120, Duration::from_secs(60))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use pharmdir_geocode::Geocoder;
    use tower::ServiceExt;

    fn test_app(pool: PgPool) -> Router {
        let directory = PgDirectory::new(pool.clone());
        let search = SearchService::new(directory.clone(), Geocoder::new(None))
            .with_analytics(directory);
        let state = AppState {
            pool,
            search: Arc::new(search),
            default_country: Country::Us,
            default_radius_km: 25.0,
        };
        build_app(state, AuthState::disabled(), default_rate_limit_state())
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).expect("request"))
            .await
            .expect("response");
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        (status, serde_json::from_slice(&body).expect("json parse"))
    }

    async fn post_json(
        app: Router,
        uri: &str,
        body: &serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .expect("request"),
            )
            .await
            .expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        (status, serde_json::from_slice(&bytes).expect("json parse"))
    }

    async fn seed_pharmacy(pool: &PgPool, id: &str, name: &str, lat: f64, lng: f64) {
        sqlx::query(
            "INSERT INTO pharmacies (id, name, city, state, latitude, longitude) \
             VALUES ($1, $2, 'Los Angeles', 'CA', $3, $4)",
        )
        .bind(id)
        .bind(name)
        .bind(lat)
        .bind(lng)
        .execute(pool)
        .await
        .expect("seed pharmacy");
    }

    async fn seed_us_bulk(pool: &PgPool, id: &str, name: &str, lat: f64, lng: f64) {
        sqlx::query(
            "INSERT INTO us_pharmacies (id, name, city, state, latitude, longitude) \
             VALUES ($1, $2, 'Los Angeles', 'CA', $3, $4)",
        )
        .bind(id)
        .bind(name)
        .bind(lat)
        .bind(lng)
        .execute(pool)
        .await
        .expect("seed us bulk");
    }

    // -------------------------------------------------------------------------
    // Unit tests (no DB)
    // -------------------------------------------------------------------------

    #[test]
    fn normalize_limit_applies_defaults_and_bounds() {
        assert_eq!(normalize_limit(None), 50);
        assert_eq!(normalize_limit(Some(0)), 1);
        assert_eq!(normalize_limit(Some(1_000)), 200);
        assert_eq!(normalize_limit(Some(25)), 25);
    }

    #[test]
    fn api_error_codes_map_to_statuses() {
        let cases = [
            ("validation_error", StatusCode::BAD_REQUEST),
            ("not_found", StatusCode::NOT_FOUND),
            ("bad_gateway", StatusCode::BAD_GATEWAY),
            ("service_unavailable", StatusCode::SERVICE_UNAVAILABLE),
            ("anything_else", StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (code, status) in cases {
            let response = ApiError::new("req-1", code, "msg").into_response();
            assert_eq!(response.status(), status, "{code}");
        }
    }

    #[test]
    fn parse_country_defaults_and_rejects_unknown() {
        assert_eq!(parse_country("r", None, Country::Ca).unwrap(), Country::Ca);
        assert_eq!(
            parse_country("r", Some(" US "), Country::Ca).unwrap(),
            Country::Us
        );
        let err = parse_country("r", Some("uk"), Country::Us).unwrap_err();
        assert_eq!(err.error.code, "bad_request");
    }

    #[test]
    fn unsupported_country_db_error_is_bad_request() {
        let err = pharmdir_db::DbError::Core(pharmdir_core::CoreError::UnsupportedCountry(
            "mx".to_string(),
        ));
        assert_eq!(
            map_db_error("r".to_string(), &err).error.code,
            "bad_request"
        );
    }

    // -------------------------------------------------------------------------
    // Route integration tests (with DB)
    // -------------------------------------------------------------------------

    #[sqlx::test(migrations = "../../migrations")]
    async fn health_reports_ok(pool: PgPool) {
        let (status, json) = get_json(test_app(pool), "/api/v1/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["status"], "ok");
        assert!(json["meta"]["request_id"].is_string());
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn search_by_city_returns_nearest_first(pool: PgPool) {
        seed_pharmacy(&pool, "near", "Downtown Rx", 34.0525, -118.2440).await;
        seed_us_bulk(&pool, "us-mid", "Sunset Pharmacy", 34.0900, -118.3000).await;
        seed_pharmacy(&pool, "far", "Bay Area Rx", 37.7749, -122.4194).await;

        let (status, json) = get_json(
            test_app(pool),
            "/api/v1/pharmacies/search?location=Los%20Angeles&radius_km=25",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let ids: Vec<&str> = json["data"]["results"]
            .as_array()
            .expect("results array")
            .iter()
            .filter_map(|r| r["id"].as_str())
            .collect();
        assert_eq!(ids, ["near", "us-mid"]);
        assert_eq!(json["data"]["location"]["strategy"], "city_table");
        assert!(
            json["data"]["results"][0]["display_data"]["rating"].is_number()
        );
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn search_rejects_bad_radius_and_country(pool: PgPool) {
        let app = test_app(pool);
        let (status, json) = get_json(
            app.clone(),
            "/api/v1/pharmacies/search?location=Boston&radius_km=-5",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "bad_request");

        let (status, _) = get_json(app, "/api/v1/pharmacies/search?country=mx").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn nearby_uses_exact_radius(pool: PgPool) {
        seed_pharmacy(&pool, "center", "Center Rx", 34.0522, -118.2437).await;
        seed_us_bulk(&pool, "edge", "Edge Pharmacy", 34.0522 + 20.0 / 111.0, -118.2437).await;

        let (status, json) = get_json(
            test_app(pool),
            "/api/v1/pharmacies/nearby?lat=34.0522&lng=-118.2437&radius_km=10",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let data = json["data"].as_array().expect("data array");
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["id"], "center");
    }

    async fn drop_table(pool: &PgPool, table: &str) {
        sqlx::query(&format!("DROP TABLE {table} CASCADE"))
            .execute(pool)
            .await
            .expect("drop table");
    }

    fn result_ids(rows: &serde_json::Value) -> Vec<&str> {
        rows.as_array()
            .expect("results array")
            .iter()
            .filter_map(|r| r["id"].as_str())
            .collect()
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn nearby_survives_a_missing_source(pool: PgPool) {
        seed_pharmacy(&pool, "center", "Center Rx", 34.0522, -118.2437).await;
        seed_us_bulk(&pool, "us-near", "Sunset Pharmacy", 34.0600, -118.2437).await;
        drop_table(&pool, "medme_pharmacies").await;

        let (status, json) = get_json(
            test_app(pool),
            "/api/v1/pharmacies/nearby?lat=34.0522&lng=-118.2437&radius_km=10",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(result_ids(&json["data"]), ["center", "us-near"]);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn search_survives_a_missing_source(pool: PgPool) {
        seed_pharmacy(&pool, "near", "Downtown Rx", 34.0525, -118.2440).await;
        drop_table(&pool, "us_pharmacies").await;

        let (status, json) = get_json(
            test_app(pool),
            "/api/v1/pharmacies/search?location=Los%20Angeles&radius_km=25",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(result_ids(&json["data"]["results"]), ["near"]);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn nearby_fails_only_when_every_source_is_down(pool: PgPool) {
        for table in ["medme_pharmacies", "pharmacies", "us_pharmacies"] {
            drop_table(&pool, table).await;
        }

        let app = test_app(pool);
        let (status, json) = get_json(
            app.clone(),
            "/api/v1/pharmacies/nearby?lat=34.0522&lng=-118.2437&radius_km=10",
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"]["code"], "internal_error");
        assert_eq!(
            json["error"]["message"],
            pharmdir_search::GENERIC_SEARCH_ERROR
        );

        let (status, _) = get_json(
            app,
            "/api/v1/pharmacies/nearby?lat=34.0522&lng=-118.2437&radius_km=0",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn search_reaches_rows_beyond_the_alphabetical_head(pool: PgPool) {
        sqlx::query(
            "INSERT INTO pharmacies (id, name, city, state, latitude, longitude) \
             SELECT 'a-' || n, 'A Pharmacy ' || lpad(n::TEXT, 4, '0'), 'Los Angeles', 'CA', \
                    34.0822, -118.2437 \
             FROM generate_series(0, 1099) AS n",
        )
        .execute(&pool)
        .await
        .expect("seed crowd");
        seed_pharmacy(&pool, "zeta", "Zeta Pharmacy", 34.0522, -118.2437).await;

        let app = test_app(pool);
        let (status, json) = get_json(
            app.clone(),
            "/api/v1/pharmacies/search?location=Los%20Angeles&radius_km=10",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["results"][0]["id"], "zeta");

        let (status, json) = get_json(app, "/api/v1/pharmacies/search?query=Zeta").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(result_ids(&json["data"]["results"]), ["zeta"]);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn get_pharmacy_by_source_and_id(pool: PgPool) {
        seed_pharmacy(&pool, "linked", "Linked Rx", 34.05, -118.24).await;
        sqlx::query("INSERT INTO medme_pharmacies (pharmacy_id, is_active) VALUES ('linked', TRUE)")
            .execute(&pool)
            .await
            .expect("link");
        seed_us_bulk(&pool, "us-1", "Sunset Pharmacy", 34.09, -118.30).await;

        let app = test_app(pool);
        let (status, json) = get_json(app.clone(), "/api/v1/pharmacies/regular/linked").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["source"], "medme");
        assert_eq!(json["data"]["image_url"], pharmdir_core::MEDME_LOGO_PATH);

        let (status, json) = get_json(app.clone(), "/api/v1/pharmacies/us_bulk/us-1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["name"], "Sunset Pharmacy");

        let (status, _) = get_json(app.clone(), "/api/v1/pharmacies/us_bulk/missing").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = get_json(app, "/api/v1/pharmacies/mystery/us-1").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn geocode_without_provider_is_unavailable(pool: PgPool) {
        let (status, json) = get_json(test_app(pool), "/api/v1/geocode?q=Boston").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json["error"]["code"], "service_unavailable");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn impressions_round_trip_through_summary(pool: PgPool) {
        let app = test_app(pool);
        let session = uuid::Uuid::new_v4();
        let (status, json) = post_json(
            app.clone(),
            "/api/v1/analytics/impressions",
            &serde_json::json!({
                "session_id": session,
                "search_location": "Los Angeles",
                "pharmacies": [
                    { "id": "us-1", "source": "us_bulk", "position": 0 },
                    { "id": "r-1", "source": "regular", "position": 1 }
                ]
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["inserted"], 2);

        let (status, json) =
            get_json(app, "/api/v1/analytics/impressions/summary?since_days=1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"].as_array().map(Vec::len), Some(2));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn analytics_event_requires_type(pool: PgPool) {
        let app = test_app(pool);
        let (status, json) = post_json(
            app.clone(),
            "/api/v1/analytics/events",
            &serde_json::json!({ "event_type": "pharmacy_click", "properties": { "id": "us-1" } }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(json["data"]["id"].as_i64().is_some());

        let (status, _) = post_json(
            app,
            "/api/v1/analytics/events",
            &serde_json::json!({ "event_type": "  " }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
