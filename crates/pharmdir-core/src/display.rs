//! Deterministic display data for listings that have no ratings/hours backing store.
//!
//! Every value is derived from a 32-bit string hash of `seed + offset`, so the
//! same pharmacy renders identically on every request for a given wall-clock
//! hour. Do not substitute a real random source here.

use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};

const SERVICE_CATEGORY_SETS: &[&[&str]] = &[
    &["Vaccinations", "Prescription Refills", "Medication Review"],
    &["Flu Shots", "Travel Health", "Blood Pressure Monitoring"],
    &["Prescription Refills", "Diabetes Care", "Smoking Cessation"],
    &["COVID-19 Testing", "Vaccinations", "Minor Ailments"],
];

const OFFSET_RATING: u32 = 1;
const OFFSET_REVIEWS: u32 = 2;
const OFFSET_AVAILABLE: u32 = 3;
const OFFSET_OPEN: u32 = 4;
const OFFSET_CLOSE: u32 = 5;
const OFFSET_SLOT: u32 = 6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayData {
    pub rating: f64,
    pub review_count: u32,
    pub is_open: bool,
    pub hours: String,
    pub available: bool,
    pub next_available: String,
    pub service_categories: Vec<String>,
}

/// 32-bit multiplicative string hash (`h = h * 31 + unit`) over UTF-16 code units.
fn string_hash(s: &str) -> i32 {
    s.encode_utf16().fold(0_i32, |h, unit| {
        h.wrapping_shl(5)
            .wrapping_sub(h)
            .wrapping_add(i32::from(unit))
    })
}

/// Maps `hash(seed + offset)` into `[0, 1)`.
fn seeded_unit(seed: &str, offset: u32) -> f64 {
    let h = string_hash(&format!("{seed}{offset}"));
    f64::from(h.unsigned_abs() % 10_000) / 10_000.0
}

/// Picks an integer in `[low, low + span)` from the seeded unit value.
fn seeded_range(seed: &str, offset: u32, low: u32, span: u32) -> u32 {
    // unit < 1.0, so the product is strictly below `span`.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let step = (seeded_unit(seed, offset) * f64::from(span)).floor() as u32;
    low + step.min(span.saturating_sub(1))
}

fn format_hour(hour: u32, minute: u32) -> String {
    let suffix = if hour < 12 { "AM" } else { "PM" };
    let h12 = match hour % 12 {
        0 => 12,
        h => h,
    };
    format!("{h12}:{minute:02} {suffix}")
}

/// Build stable pseudo display data for one listing.
///
/// `index` is the listing's position in the result set and only selects the
/// service-category set. `now` is the caller's local wall-clock time; it
/// decides weekday vs weekend hours and the open/closed state.
#[must_use]
pub fn generate_stable_display_data(
    id: &str,
    name: &str,
    index: usize,
    now: NaiveDateTime,
) -> DisplayData {
    let seed = if id.trim().is_empty() { name } else { id };

    let rating = ((3.5 + seeded_unit(seed, OFFSET_RATING) * 1.5) * 10.0).round() / 10.0;
    let review_count = seeded_range(seed, OFFSET_REVIEWS, 50, 200);
    let available = seeded_unit(seed, OFFSET_AVAILABLE) > 0.2;

    let weekend = matches!(now.weekday(), Weekday::Sat | Weekday::Sun);
    let (open_hour, close_hour) = if weekend {
        (
            seeded_range(seed, OFFSET_OPEN, 9, 2),
            seeded_range(seed, OFFSET_CLOSE, 17, 2),
        )
    } else {
        (
            seeded_range(seed, OFFSET_OPEN, 7, 3),
            seeded_range(seed, OFFSET_CLOSE, 20, 3),
        )
    };

    let hour = now.hour();
    let is_open = hour >= open_hour && hour < close_hour;
    let hours = format!(
        "{} - {}",
        format_hour(open_hour, 0),
        format_hour(close_hour, 0)
    );

    let slot_minute = if seeded_unit(seed, OFFSET_SLOT) < 0.5 { 0 } else { 30 };
    let next_available = if !available {
        "Call for availability".to_string()
    } else if is_open && hour + 1 < close_hour {
        format!("Today at {}", format_hour(hour + 1, slot_minute))
    } else {
        format!("Tomorrow at {}", format_hour(open_hour, slot_minute))
    };

    let service_categories = SERVICE_CATEGORY_SETS[index % SERVICE_CATEGORY_SETS.len()]
        .iter()
        .map(|s| (*s).to_string())
        .collect();

    DisplayData {
        rating,
        review_count,
        is_open,
        hours,
        available,
        next_available,
        service_categories,
    }
}
