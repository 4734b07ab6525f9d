//! Adapter for the base `pharmacies` directory table.

use pharmdir_core::{Address, Coordinates, Pharmacy, PharmacySource};
use sqlx::PgPool;

use crate::params::{retain_within, SearchParams, ORDER_AND_LIMIT};
use crate::DbError;

/// A row from the `pharmacies` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PharmacyRow {
    pub id: String,
    pub name: String,
    pub address_line1: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub raw_address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub services: Option<Vec<String>>,
}

impl PharmacyRow {
    /// Converts to the assembled model, tagged `regular`. MedMe tagging happens at merge time.
    #[must_use]
    pub fn into_pharmacy(self) -> Pharmacy {
        let coordinates = match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some(Coordinates::new(lat, lng)),
            _ => None,
        };
        Pharmacy {
            address: Address {
                line1: self.address_line1,
                city: self.city,
                region: self.state,
                postal_code: self.zip,
                raw: self.raw_address,
            },
            coordinates,
            phone: self.phone,
            website: self.website,
            services: self.services,
            ..Pharmacy::new(self.id, self.name, PharmacySource::Regular)
        }
    }
}

const SELECT_COLUMNS: &str = "SELECT id, name, address_line1, city, state, zip, raw_address, \
                                     latitude, longitude, phone, website, services \
                              FROM pharmacies";

/// Search the base directory.
///
/// A bounding box excludes rows without coordinates, since NULL never
/// satisfies the range predicates. Nearest first with a box, else by name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn search_pharmacies(
    pool: &PgPool,
    params: &SearchParams,
) -> Result<Vec<Pharmacy>, DbError> {
    let (min_lat, max_lat, min_lng, max_lng) = params.bound_values();
    let rows = sqlx::query_as::<_, PharmacyRow>(&format!(
        "{SELECT_COLUMNS} \
         WHERE ($1::TEXT IS NULL \
                OR name ILIKE $1 OR address_line1 ILIKE $1 OR city ILIKE $1 \
                OR state ILIKE $1 OR zip ILIKE $1 OR raw_address ILIKE $1) \
           AND ($2::TEXT IS NULL OR UPPER(state) = $2) \
           AND ($3::FLOAT8 IS NULL OR latitude >= $3) \
           AND ($4::FLOAT8 IS NULL OR latitude <= $4) \
           AND ($5::FLOAT8 IS NULL OR longitude >= $5) \
           AND ($6::FLOAT8 IS NULL OR longitude <= $6) \
         {ORDER_AND_LIMIT}"
    ))
    .bind(params.query_pattern())
    .bind(params.region_upper())
    .bind(min_lat)
    .bind(max_lat)
    .bind(min_lng)
    .bind(max_lng)
    .bind(params.effective_limit())
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(PharmacyRow::into_pharmacy).collect())
}

/// Returns a single pharmacy by id, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_pharmacy_by_id(pool: &PgPool, id: &str) -> Result<Option<Pharmacy>, DbError> {
    let row = sqlx::query_as::<_, PharmacyRow>(&format!("{SELECT_COLUMNS} WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(PharmacyRow::into_pharmacy))
}

/// Pharmacies within `radius_km` of `center`, nearest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_nearby_pharmacies(
    pool: &PgPool,
    center: Coordinates,
    radius_km: f64,
) -> Result<Vec<Pharmacy>, DbError> {
    let candidates = search_pharmacies(pool, &SearchParams::near(center, radius_km)).await?;
    Ok(retain_within(candidates, center, radius_km))
}
