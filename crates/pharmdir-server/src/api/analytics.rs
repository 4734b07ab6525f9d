use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use pharmdir_core::PharmacySource;
use pharmdir_db::{NewAnalyticsEvent, NewImpression};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState};

const MAX_BATCH: usize = 500;

#[derive(Debug, Deserialize)]
pub(super) struct EventBody {
    pub event_type: String,
    /// Falls back to the server's own analytics session.
    pub session_id: Option<Uuid>,
    #[serde(default)]
    pub properties: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub(super) struct EventRecorded {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub(super) struct ImpressionItem {
    pub id: String,
    pub source: PharmacySource,
    pub position: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ImpressionsBody {
    pub session_id: Option<Uuid>,
    pub search_location: Option<String>,
    pub pharmacies: Vec<ImpressionItem>,
}

#[derive(Debug, Serialize)]
pub(super) struct ImpressionsRecorded {
    pub inserted: u64,
}

#[derive(Debug, Deserialize)]
pub(super) struct SummaryQuery {
    pub since_days: Option<i32>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct ImpressionSummaryItem {
    pub pharmacy_id: String,
    pub pharmacy_source: String,
    pub impressions: i64,
    pub sessions: i64,
    pub last_seen_at: DateTime<Utc>,
}

pub(super) async fn record_event(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<EventBody>,
) -> Result<Json<ApiResponse<EventRecorded>>, ApiError> {
    let event_type = body.event_type.trim();
    if event_type.is_empty() {
        return Err(ApiError::new(
            req_id.0,
            "bad_request",
            "event_type must not be empty",
        ));
    }

    let properties = if body.properties.is_null() {
        serde_json::json!({})
    } else {
        body.properties
    };
    let event = NewAnalyticsEvent {
        event_type: event_type.to_string(),
        session_id: body.session_id.unwrap_or_else(pharmdir_search::session_id),
        properties,
    };
    let id = pharmdir_db::insert_analytics_event(&state.pool, &event)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(EventRecorded { id }, req_id.0)))
}

pub(super) async fn record_impressions(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<ImpressionsBody>,
) -> Result<Json<ApiResponse<ImpressionsRecorded>>, ApiError> {
    if body.pharmacies.len() > MAX_BATCH {
        return Err(ApiError::new(
            req_id.0,
            "bad_request",
            format!("at most {MAX_BATCH} impressions per request"),
        ));
    }

    let session_id = body.session_id.unwrap_or_else(pharmdir_search::session_id);
    let impressions: Vec<NewImpression> = body
        .pharmacies
        .into_iter()
        .map(|item| NewImpression {
            pharmacy_id: item.id,
            pharmacy_source: item.source,
            session_id,
            search_location: body.search_location.clone(),
            position: item.position,
        })
        .collect();

    let inserted = pharmdir_db::insert_pharmacy_impressions(&state.pool, &impressions)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(
        ImpressionsRecorded { inserted },
        req_id.0,
    )))
}

pub(super) async fn impression_summary(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<SummaryQuery>,
) -> Result<Json<ApiResponse<Vec<ImpressionSummaryItem>>>, ApiError> {
    let since_days = params.since_days.unwrap_or(7).clamp(1, 365);
    let rows = pharmdir_db::list_impression_summary(
        &state.pool,
        since_days,
        normalize_limit(params.limit),
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| ImpressionSummaryItem {
            pharmacy_id: row.pharmacy_id,
            pharmacy_source: row.pharmacy_source,
            impressions: row.impressions,
            sessions: row.sessions,
            last_seen_at: row.last_seen_at,
        })
        .collect();

    Ok(Json(ApiResponse::new(data, req_id.0)))
}
