//! MedMe linkage: base pharmacies that accept online bookings.

use std::collections::HashSet;

use sqlx::PgPool;

use crate::DbError;

/// Ids of base pharmacies with an active MedMe link.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_active_medme_ids(pool: &PgPool) -> Result<HashSet<String>, DbError> {
    let rows: Vec<(String,)> =
        sqlx::query_as("SELECT pharmacy_id FROM medme_pharmacies WHERE is_active = TRUE")
            .fetch_all(pool)
            .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Whether a single pharmacy has an active MedMe link.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn is_medme_linked(pool: &PgPool, pharmacy_id: &str) -> Result<bool, DbError> {
    let linked: bool = sqlx::query_scalar(
        "SELECT EXISTS (\
             SELECT 1 FROM medme_pharmacies WHERE pharmacy_id = $1 AND is_active = TRUE\
         )",
    )
    .bind(pharmacy_id)
    .fetch_one(pool)
    .await?;
    Ok(linked)
}
