//! Country bulk datasets (`us_pharmacies`, `ca_pharmacies`).
//!
//! [`BulkDataset`] selects the table for a country at construction time.
//! Unsupported country codes are rejected rather than mapped to an empty source.

mod ca;
mod us;

use pharmdir_core::{Coordinates, Country, Pharmacy, PharmacySource};
use sqlx::PgPool;

use crate::params::{retain_within, SearchParams};
use crate::DbError;

pub use ca::CaPharmacyRow;
pub use us::UsPharmacyRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkDataset {
    Us,
    Ca,
}

impl BulkDataset {
    #[must_use]
    pub fn for_country(country: Country) -> Self {
        match country {
            Country::Us => BulkDataset::Us,
            Country::Ca => BulkDataset::Ca,
        }
    }

    /// Resolve a raw country code.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Core`] wrapping `UnsupportedCountry` for anything
    /// other than `us`/`ca`.
    pub fn from_code(code: &str) -> Result<Self, DbError> {
        let country = code.parse::<Country>()?;
        Ok(Self::for_country(country))
    }

    #[must_use]
    pub fn country(self) -> Country {
        match self {
            BulkDataset::Us => Country::Us,
            BulkDataset::Ca => Country::Ca,
        }
    }

    /// Source tag carried by every row this dataset returns.
    #[must_use]
    pub fn source(self) -> PharmacySource {
        match self {
            BulkDataset::Us => PharmacySource::UsBulk,
            BulkDataset::Ca => PharmacySource::CaBulk,
        }
    }

    /// # Errors
    ///
    /// Returns [`DbError::Sqlx`] if the query fails.
    pub async fn search(
        self,
        pool: &PgPool,
        params: &SearchParams,
    ) -> Result<Vec<Pharmacy>, DbError> {
        match self {
            BulkDataset::Us => us::search(pool, params).await,
            BulkDataset::Ca => ca::search(pool, params).await,
        }
    }

    /// # Errors
    ///
    /// Returns [`DbError::Sqlx`] if the query fails.
    pub async fn get_by_id(self, pool: &PgPool, id: &str) -> Result<Option<Pharmacy>, DbError> {
        match self {
            BulkDataset::Us => us::get_by_id(pool, id).await,
            BulkDataset::Ca => ca::get_by_id(pool, id).await,
        }
    }

    /// Rows within `radius_km` of `center`, nearest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlx`] if the query fails.
    pub async fn get_nearby(
        self,
        pool: &PgPool,
        center: Coordinates,
        radius_km: f64,
    ) -> Result<Vec<Pharmacy>, DbError> {
        let candidates = self
            .search(pool, &SearchParams::near(center, radius_km))
            .await?;
        Ok(retain_within(candidates, center, radius_km))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatches_by_country_code() {
        assert_eq!(BulkDataset::from_code("us").unwrap(), BulkDataset::Us);
        assert_eq!(BulkDataset::from_code("CA").unwrap(), BulkDataset::Ca);
        assert_eq!(BulkDataset::Ca.country(), Country::Ca);
    }

    #[test]
    fn unsupported_country_fails_fast() {
        let err = BulkDataset::from_code("uk").unwrap_err();
        let DbError::Core(pharmdir_core::CoreError::UnsupportedCountry(code)) = err else {
            panic!("expected UnsupportedCountry, got {err:?}");
        };
        assert_eq!(code, "uk");
    }
}
