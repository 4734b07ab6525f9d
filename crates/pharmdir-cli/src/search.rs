//! `search` and `nearby` command handlers.

use pharmdir_core::{Coordinates, Pharmacy, SearchRequest};
use pharmdir_search::{AnalyticsSink, PharmacyDirectory, SearchService};

const NAME_WIDTH: usize = 36;

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() > width {
        format!("{}...", text.chars().take(width - 3).collect::<String>())
    } else {
        text.to_string()
    }
}

fn fmt_distance(distance_km: Option<f64>) -> String {
    distance_km.map_or_else(|| "-".to_string(), |d| format!("{d:.1} km"))
}

/// One table row: distance, source, rating, name, address.
pub(crate) fn format_row(pharmacy: &Pharmacy) -> String {
    let rating = pharmacy
        .rating
        .or(pharmacy.display_data.as_ref().map(|d| d.rating))
        .map_or_else(|| "-".to_string(), |r| format!("{r:.1}"));
    format!(
        "{:<10}{:<10}{:<8}{:<w$}  {}",
        fmt_distance(pharmacy.distance_km),
        pharmacy.source.as_str(),
        rating,
        truncate(&pharmacy.name, NAME_WIDTH),
        pharmacy.address.formatted(),
        w = NAME_WIDTH,
    )
}

pub(crate) fn print_results(results: &[Pharmacy]) {
    if results.is_empty() {
        println!("no pharmacies found");
        return;
    }
    println!(
        "{:<10}{:<10}{:<8}{:<w$}  ADDRESS",
        "DISTANCE",
        "SOURCE",
        "RATING",
        "NAME",
        w = NAME_WIDTH
    );
    for pharmacy in results {
        println!("{}", format_row(pharmacy));
    }
}

/// Run one search and print the results table.
///
/// # Errors
///
/// Returns an error if the request is invalid or every source failed.
pub(crate) async fn run_search<D, A>(
    service: &SearchService<D, A>,
    request: &SearchRequest,
) -> anyhow::Result<()>
where
    D: PharmacyDirectory,
    A: AnalyticsSink,
{
    let outcome = service
        .search(request, chrono::Local::now().naive_local())
        .await?;

    if let Some(geocoded) = outcome.geocoded {
        println!(
            "location: {:.4}, {:.4} (via {})",
            geocoded.coordinates.lat,
            geocoded.coordinates.lng,
            geocoded.strategy.as_str()
        );
    } else if let Some(text) = request.location_text() {
        println!("location: could not resolve {text:?}; matching by text");
    }
    print_results(&outcome.results);
    Ok(())
}

/// Pharmacies within `request.radius_km` of `center`, nearest first.
///
/// # Errors
///
/// Returns an error if the radius is invalid or every source failed.
pub(crate) async fn run_nearby<D, A>(
    service: &SearchService<D, A>,
    center: Coordinates,
    request: &SearchRequest,
) -> anyhow::Result<()>
where
    D: PharmacyDirectory,
    A: AnalyticsSink,
{
    let outcome = service
        .search_near(center, request, chrono::Local::now().naive_local())
        .await?;
    print_results(&outcome.results);
    Ok(())
}
