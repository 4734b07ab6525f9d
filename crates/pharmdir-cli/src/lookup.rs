//! `show` and `geocode` command handlers.

use pharmdir_core::{
    generate_stable_display_data, Country, Pharmacy, PharmacySource, MEDME_LOGO_PATH,
};
use pharmdir_db::BulkDataset;
use pharmdir_geocode::{GeocodeStrategy, Geocoder};

/// Fetch a single pharmacy from the table its source lives in.
pub(crate) async fn fetch_pharmacy(
    pool: &sqlx::PgPool,
    source: PharmacySource,
    id: &str,
) -> anyhow::Result<Option<Pharmacy>> {
    let found = match source {
        PharmacySource::Regular | PharmacySource::Medme => {
            let Some(mut pharmacy) = pharmdir_db::get_pharmacy_by_id(pool, id).await? else {
                return Ok(None);
            };
            if pharmdir_db::is_medme_linked(pool, id).await? {
                pharmacy.source = PharmacySource::Medme;
                pharmacy.image_url = Some(MEDME_LOGO_PATH.to_string());
            }
            Some(pharmacy)
        }
        PharmacySource::UsBulk => BulkDataset::Us.get_by_id(pool, id).await?,
        PharmacySource::CaBulk => BulkDataset::Ca.get_by_id(pool, id).await?,
    };
    Ok(found)
}

/// Print one pharmacy with its display data.
///
/// # Errors
///
/// Returns an error if `source` is unknown, the pharmacy does not exist, or
/// the query fails.
pub(crate) async fn run_show(pool: &sqlx::PgPool, source: &str, id: &str) -> anyhow::Result<()> {
    let source: PharmacySource = source.parse()?;
    let pharmacy = fetch_pharmacy(pool, source, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("pharmacy '{id}' not found in {source}"))?;

    let display = generate_stable_display_data(
        &pharmacy.id,
        &pharmacy.name,
        0,
        chrono::Local::now().naive_local(),
    );

    println!("{} ({})", pharmacy.name, pharmacy.source);
    println!("Address:   {}", pharmacy.address.formatted());
    if let Some(c) = pharmacy.coordinates {
        println!("Location:  {:.5}, {:.5}", c.lat, c.lng);
    }
    if let Some(phone) = &pharmacy.phone {
        println!("Phone:     {phone}");
    }
    if let Some(website) = &pharmacy.website {
        println!("Website:   {website}");
    }
    match &pharmacy.services {
        Some(services) => println!("Services:  {}", services.join(", ")),
        None => println!("Services:  (no data)"),
    }
    let rating = pharmacy.rating.unwrap_or(display.rating);
    println!("Rating:    {rating:.1} ({} reviews)", display.review_count);
    println!(
        "Hours:     {} ({})",
        pharmacy.hours_text.as_deref().unwrap_or(&display.hours),
        if display.is_open { "open now" } else { "closed" }
    );
    println!("Next slot: {}", display.next_available);
    Ok(())
}

/// Resolve `input` and print the coordinates and which strategy produced them.
///
/// # Errors
///
/// Returns an error if the location cannot be resolved at all.
pub(crate) async fn run_geocode(
    geocoder: &Geocoder,
    input: &str,
    country: Country,
) -> anyhow::Result<()> {
    let geocoded = geocoder
        .geocode(input, country)
        .await
        .ok_or_else(|| anyhow::anyhow!("could not resolve {input:?} in {country}"))?;
    println!(
        "{:.6}, {:.6} ({})",
        geocoded.coordinates.lat,
        geocoded.coordinates.lng,
        geocoded.strategy.as_str()
    );

    // Show the provider's alternatives for free-text input.
    if geocoded.strategy == GeocodeStrategy::Literal {
        return Ok(());
    }
    if let Some(provider) = geocoder.provider() {
        match provider.forward_geocode(input, country, 5).await {
            Ok(results) => {
                for result in results {
                    println!("  {} [{}]", result.formatted_address, result.place_id);
                }
            }
            Err(e) => tracing::warn!(error = %e, "provider lookup failed"),
        }
    }
    Ok(())
}
