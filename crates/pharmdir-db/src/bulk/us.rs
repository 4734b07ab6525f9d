use pharmdir_core::{Address, Coordinates, Pharmacy, PharmacySource};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::params::{SearchParams, ORDER_AND_LIMIT};
use crate::DbError;

/// A row from the `us_pharmacies` bulk dataset.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UsPharmacyRow {
    pub id: String,
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub image_url: Option<String>,
    pub rating: Option<Decimal>,
    pub review_count: Option<i32>,
    pub hours_text: Option<String>,
}

impl UsPharmacyRow {
    #[must_use]
    pub fn into_pharmacy(self) -> Pharmacy {
        Pharmacy {
            address: Address {
                line1: self.address,
                city: self.city,
                region: self.state,
                postal_code: self.zip,
                raw: None,
            },
            coordinates: Some(Coordinates::new(self.latitude, self.longitude)),
            phone: self.phone,
            website: self.website,
            image_url: self.image_url,
            rating: self.rating.and_then(|r| r.to_f64()),
            review_count: self.review_count,
            hours_text: self.hours_text,
            ..Pharmacy::new(self.id, self.name, PharmacySource::UsBulk)
        }
    }
}

const SELECT_COLUMNS: &str = "SELECT id, name, address, city, state, zip, latitude, longitude, \
                                     phone, website, image_url, rating, review_count, hours_text \
                              FROM us_pharmacies";

pub(super) async fn search(
    pool: &PgPool,
    params: &SearchParams,
) -> Result<Vec<Pharmacy>, DbError> {
    let (min_lat, max_lat, min_lng, max_lng) = params.bound_values();
    let rows = sqlx::query_as::<_, UsPharmacyRow>(&format!(
        "{SELECT_COLUMNS} \
         WHERE ($1::TEXT IS NULL \
                OR name ILIKE $1 OR address ILIKE $1 OR city ILIKE $1 \
                OR state ILIKE $1 OR zip ILIKE $1) \
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

    Ok(rows.into_iter().map(UsPharmacyRow::into_pharmacy).collect())
}

pub(super) async fn get_by_id(pool: &PgPool, id: &str) -> Result<Option<Pharmacy>, DbError> {
    let row = sqlx::query_as::<_, UsPharmacyRow>(&format!("{SELECT_COLUMNS} WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(UsPharmacyRow::into_pharmacy))
}
