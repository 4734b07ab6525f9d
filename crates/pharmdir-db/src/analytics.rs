//! Write-only telemetry tables and the impression read-model.

use chrono::{DateTime, Utc};
use pharmdir_core::PharmacySource;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// One pharmacy shown to a user in a result list.
#[derive(Debug, Clone)]
pub struct NewImpression {
    pub pharmacy_id: String,
    pub pharmacy_source: PharmacySource,
    pub session_id: Uuid,
    pub search_location: Option<String>,
    /// Zero-based rank in the result list.
    pub position: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct NewAnalyticsEvent {
    pub event_type: String,
    pub session_id: Uuid,
    pub properties: serde_json::Value,
}

/// Impression totals per pharmacy for the admin dashboard.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ImpressionSummaryRow {
    pub pharmacy_id: String,
    pub pharmacy_source: String,
    pub impressions: i64,
    pub sessions: i64,
    pub last_seen_at: DateTime<Utc>,
}

/// Insert a batch of impressions in one round-trip via `UNNEST`.
///
/// Returns the number of rows inserted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn insert_pharmacy_impressions(
    pool: &PgPool,
    impressions: &[NewImpression],
) -> Result<u64, DbError> {
    if impressions.is_empty() {
        return Ok(0);
    }

    let mut pharmacy_ids: Vec<String> = Vec::with_capacity(impressions.len());
    let mut sources: Vec<String> = Vec::with_capacity(impressions.len());
    let mut session_ids: Vec<Uuid> = Vec::with_capacity(impressions.len());
    let mut locations: Vec<Option<String>> = Vec::with_capacity(impressions.len());
    let mut positions: Vec<Option<i32>> = Vec::with_capacity(impressions.len());

    for imp in impressions {
        pharmacy_ids.push(imp.pharmacy_id.clone());
        sources.push(imp.pharmacy_source.as_str().to_string());
        session_ids.push(imp.session_id);
        locations.push(imp.search_location.clone());
        positions.push(imp.position);
    }

    let result = sqlx::query(
        "INSERT INTO pharmacy_impressions \
             (pharmacy_id, pharmacy_source, session_id, search_location, position) \
         SELECT * FROM UNNEST($1::text[], $2::text[], $3::uuid[], $4::text[], $5::int4[])",
    )
    .bind(&pharmacy_ids)
    .bind(&sources)
    .bind(&session_ids)
    .bind(&locations)
    .bind(&positions)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Record a generic analytics event.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn insert_analytics_event(
    pool: &PgPool,
    event: &NewAnalyticsEvent,
) -> Result<i64, DbError> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO analytics_events (event_type, session_id, properties) \
         VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(&event.event_type)
    .bind(event.session_id)
    .bind(&event.properties)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

/// Impression counts per pharmacy over the last `since_days` days.
///
/// Ordered by `impressions DESC`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_impression_summary(
    pool: &PgPool,
    since_days: i32,
    limit: i64,
) -> Result<Vec<ImpressionSummaryRow>, DbError> {
    let rows = sqlx::query_as::<_, ImpressionSummaryRow>(
        "SELECT pharmacy_id, pharmacy_source, \
                COUNT(*) AS impressions, \
                COUNT(DISTINCT session_id) AS sessions, \
                MAX(created_at) AS last_seen_at \
         FROM pharmacy_impressions \
         WHERE created_at > NOW() - make_interval(days => $1) \
         GROUP BY pharmacy_id, pharmacy_source \
         ORDER BY impressions DESC, pharmacy_id ASC \
         LIMIT $2",
    )
    .bind(since_days)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
