//! Postgres access for the pharmacy directory: one adapter per data source,
//! plus telemetry writes.

use thiserror::Error;

pub mod analytics;
pub mod bulk;
pub mod medme;
pub mod params;
pub mod pharmacies;
pub mod pool;

pub use analytics::{
    insert_analytics_event, insert_pharmacy_impressions, list_impression_summary,
    ImpressionSummaryRow, NewAnalyticsEvent, NewImpression,
};
pub use bulk::{BulkDataset, CaPharmacyRow, UsPharmacyRow};
pub use medme::{is_medme_linked, list_active_medme_ids};
pub use params::SearchParams;
pub use pharmacies::{
    get_nearby_pharmacies, get_pharmacy_by_id, search_pharmacies, PharmacyRow,
};
pub use pool::{connect_pool, health_check, run_migrations, PoolConfig};

#[derive(Debug, Error)]
pub enum DbError {
    /// Bad caller input, such as an unsupported country code.
    #[error(transparent)]
    Core(#[from] pharmdir_core::CoreError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}
