//! Search telemetry. Recording is best-effort and never fails a search.

use std::sync::OnceLock;

use async_trait::async_trait;
use pharmdir_core::{Pharmacy, SearchRequest};
use pharmdir_db::{DbError, NewAnalyticsEvent, NewImpression};
use uuid::Uuid;

use crate::directory::PgDirectory;

pub const SEARCH_EVENT: &str = "pharmacy_search";

static SESSION_ID: OnceLock<Uuid> = OnceLock::new();

/// Analytics session id, created on first use and kept for the life of the
/// process.
pub fn session_id() -> Uuid {
    *SESSION_ID.get_or_init(Uuid::new_v4)
}

#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    async fn record_event(&self, event: NewAnalyticsEvent) -> Result<(), DbError>;

    async fn record_impressions(&self, impressions: Vec<NewImpression>) -> Result<(), DbError>;
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAnalytics;

#[async_trait]
impl AnalyticsSink for NoopAnalytics {
    async fn record_event(&self, _event: NewAnalyticsEvent) -> Result<(), DbError> {
        Ok(())
    }

    async fn record_impressions(&self, _impressions: Vec<NewImpression>) -> Result<(), DbError> {
        Ok(())
    }
}

#[async_trait]
impl AnalyticsSink for PgDirectory {
    async fn record_event(&self, event: NewAnalyticsEvent) -> Result<(), DbError> {
        pharmdir_db::insert_analytics_event(self.pool(), &event).await?;
        Ok(())
    }

    async fn record_impressions(&self, impressions: Vec<NewImpression>) -> Result<(), DbError> {
        pharmdir_db::insert_pharmacy_impressions(self.pool(), &impressions).await?;
        Ok(())
    }
}

pub(crate) fn search_event(request: &SearchRequest, result_count: usize) -> NewAnalyticsEvent {
    NewAnalyticsEvent {
        event_type: SEARCH_EVENT.to_string(),
        session_id: session_id(),
        properties: serde_json::json!({
            "location": request.location_text(),
            "radius_km": request.radius_km,
            "services": request.services,
            "medme_only": request.medme_only,
            "query": request.query,
            "country": request.country.code(),
            "result_count": result_count,
        }),
    }
}

pub(crate) fn impressions(request: &SearchRequest, results: &[Pharmacy]) -> Vec<NewImpression> {
    let session_id = session_id();
    let location = request.location_text().map(str::to_string);
    results
        .iter()
        .enumerate()
        .map(|(position, p)| NewImpression {
            pharmacy_id: p.id.clone(),
            pharmacy_source: p.source,
            session_id,
            search_location: location.clone(),
            position: i32::try_from(position).ok(),
        })
        .collect()
}
