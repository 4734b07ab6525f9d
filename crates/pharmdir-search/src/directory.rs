//! The data sources a search reads from.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use pharmdir_core::Pharmacy;
use pharmdir_db::{BulkDataset, DbError, SearchParams};
use sqlx::PgPool;

/// Read access to every pharmacy data source.
///
/// Each method is called independently; an error from one must not affect
/// the others.
#[async_trait]
pub trait PharmacyDirectory: Send + Sync {
    /// Rows from the base directory.
    async fn fetch_regular(&self, params: &SearchParams) -> Result<Vec<Pharmacy>, DbError>;

    /// Ids of pharmacies with an active MedMe link.
    async fn fetch_medme_ids(&self) -> Result<HashSet<String>, DbError>;

    /// Rows from the country bulk dataset.
    async fn fetch_bulk(
        &self,
        dataset: BulkDataset,
        params: &SearchParams,
    ) -> Result<Vec<Pharmacy>, DbError>;
}

/// Postgres-backed directory.
#[derive(Debug, Clone)]
pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl PharmacyDirectory for PgDirectory {
    async fn fetch_regular(&self, params: &SearchParams) -> Result<Vec<Pharmacy>, DbError> {
        pharmdir_db::search_pharmacies(&self.pool, params).await
    }

    async fn fetch_medme_ids(&self) -> Result<HashSet<String>, DbError> {
        pharmdir_db::list_active_medme_ids(&self.pool).await
    }

    async fn fetch_bulk(
        &self,
        dataset: BulkDataset,
        params: &SearchParams,
    ) -> Result<Vec<Pharmacy>, DbError> {
        dataset.search(&self.pool, params).await
    }
}

#[async_trait]
impl<T: PharmacyDirectory + ?Sized> PharmacyDirectory for Arc<T> {
    async fn fetch_regular(&self, params: &SearchParams) -> Result<Vec<Pharmacy>, DbError> {
        self.as_ref().fetch_regular(params).await
    }

    async fn fetch_medme_ids(&self) -> Result<HashSet<String>, DbError> {
        self.as_ref().fetch_medme_ids().await
    }

    async fn fetch_bulk(
        &self,
        dataset: BulkDataset,
        params: &SearchParams,
    ) -> Result<Vec<Pharmacy>, DbError> {
        self.as_ref().fetch_bulk(dataset, params).await
    }
}
