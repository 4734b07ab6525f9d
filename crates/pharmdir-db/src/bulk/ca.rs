use pharmdir_core::{Address, Coordinates, Pharmacy, PharmacySource};
use sqlx::PgPool;

use crate::params::{SearchParams, ORDER_AND_LIMIT};
use crate::DbError;

/// A row from the `ca_pharmacies` bulk dataset.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CaPharmacyRow {
    pub id: String,
    pub name: String,
    pub street_address: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub postal_code: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub image_url: Option<String>,
}

impl CaPharmacyRow {
    #[must_use]
    pub fn into_pharmacy(self) -> Pharmacy {
        Pharmacy {
            address: Address {
                line1: self.street_address,
                city: self.city,
                region: self.province,
                postal_code: self.postal_code,
                raw: None,
            },
            coordinates: Some(Coordinates::new(self.latitude, self.longitude)),
            phone: self.phone,
            website: self.website,
            image_url: self.image_url,
            ..Pharmacy::new(self.id, self.name, PharmacySource::CaBulk)
        }
    }
}

const SELECT_COLUMNS: &str = "SELECT id, name, street_address, city, province, postal_code, \
                                     latitude, longitude, phone, website, image_url \
                              FROM ca_pharmacies";

pub(super) async fn search(
    pool: &PgPool,
    params: &SearchParams,
) -> Result<Vec<Pharmacy>, DbError> {
    let (min_lat, max_lat, min_lng, max_lng) = params.bound_values();
    let rows = sqlx::query_as::<_, CaPharmacyRow>(&format!(
        "{SELECT_COLUMNS} \
         WHERE ($1::TEXT IS NULL \
                OR name ILIKE $1 OR street_address ILIKE $1 OR city ILIKE $1 \
                OR province ILIKE $1 OR postal_code ILIKE $1) \
           AND ($2::TEXT IS NULL OR UPPER(province) = $2) \
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

    Ok(rows.into_iter().map(CaPharmacyRow::into_pharmacy).collect())
}

pub(super) async fn get_by_id(pool: &PgPool, id: &str) -> Result<Option<Pharmacy>, DbError> {
    let row = sqlx::query_as::<_, CaPharmacyRow>(&format!("{SELECT_COLUMNS} WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(CaPharmacyRow::into_pharmacy))
}
