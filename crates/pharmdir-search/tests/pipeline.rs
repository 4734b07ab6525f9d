//! End-to-end tests for the search pipeline and controller against an
//! in-memory directory.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use pharmdir_core::{Coordinates, Country, Pharmacy, PharmacySource, SearchRequest};
use pharmdir_db::{BulkDataset, DbError, NewAnalyticsEvent, NewImpression, SearchParams};
use pharmdir_geocode::{GeocodeStrategy, Geocoder};
use pharmdir_search::{
    AnalyticsSink, Applied, PharmacyDirectory, SearchController, SearchError, SearchService,
    SearchState,
};

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

#[derive(Default)]
struct FakeDirectory {
    regular: Vec<Pharmacy>,
    medme_ids: HashSet<String>,
    bulk: Vec<Pharmacy>,
    fail_regular: bool,
    fail_medme: bool,
    fail_bulk: bool,
    slow_first_regular: Option<Duration>,
    regular_calls: AtomicUsize,
    bulk_calls: AtomicUsize,
    seen_params: Mutex<Vec<SearchParams>>,
}

impl FakeDirectory {
    fn last_params(&self) -> Option<SearchParams> {
        self.seen_params.lock().expect("params lock").last().cloned()
    }
}

/// Applies the filters a SQL adapter would: bounding box and text match.
fn select(rows: &[Pharmacy], params: &SearchParams) -> Vec<Pharmacy> {
    rows.iter()
        .filter(|p| match params.bounds {
            Some(bounds) => p.coordinates.is_some_and(|c| bounds.contains(c)),
            None => true,
        })
        .filter(|p| params.query.as_deref().is_none_or(|q| p.matches_text(q)))
        .cloned()
        .collect()
}

fn source_down() -> DbError {
    DbError::Sqlx(sqlx::Error::PoolTimedOut)
}

#[async_trait]
impl PharmacyDirectory for FakeDirectory {
    async fn fetch_regular(&self, params: &SearchParams) -> Result<Vec<Pharmacy>, DbError> {
        let call = self.regular_calls.fetch_add(1, Ordering::SeqCst);
        self.seen_params
            .lock()
            .expect("params lock")
            .push(params.clone());
        if let (0, Some(delay)) = (call, self.slow_first_regular) {
            tokio::time::sleep(delay).await;
        }
        if self.fail_regular {
            return Err(source_down());
        }
        Ok(select(&self.regular, params))
    }

    async fn fetch_medme_ids(&self) -> Result<HashSet<String>, DbError> {
        if self.fail_medme {
            return Err(source_down());
        }
        Ok(self.medme_ids.clone())
    }

    async fn fetch_bulk(
        &self,
        dataset: BulkDataset,
        params: &SearchParams,
    ) -> Result<Vec<Pharmacy>, DbError> {
        self.bulk_calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(dataset, BulkDataset::Us);
        if self.fail_bulk {
            return Err(source_down());
        }
        Ok(select(&self.bulk, params))
    }
}

struct BrokenAnalytics;

#[async_trait]
impl AnalyticsSink for BrokenAnalytics {
    async fn record_event(&self, _event: NewAnalyticsEvent) -> Result<(), DbError> {
        Err(source_down())
    }

    async fn record_impressions(&self, _impressions: Vec<NewImpression>) -> Result<(), DbError> {
        Err(source_down())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const LA: Coordinates = Coordinates::new(34.0522, -118.2437);
const BOSTON: Coordinates = Coordinates::new(42.3601, -71.0589);

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 1, 5)
        .and_then(|d| d.and_hms_opt(10, 0, 0))
        .expect("valid timestamp")
}

fn at(id: &str, name: &str, source: PharmacySource, c: Coordinates) -> Pharmacy {
    Pharmacy::new(id, name, source).with_coordinates(c.lat, c.lng)
}

fn request(location: &str) -> SearchRequest {
    let mut request = SearchRequest::new(Country::Us);
    request.location = Some(location.to_string());
    request
}

fn directory() -> FakeDirectory {
    FakeDirectory {
        regular: vec![
            at("r-la", "Echo Park Drugs", PharmacySource::Regular, LA),
            at("r-bos", "Beacon Hill Rx", PharmacySource::Regular, BOSTON),
        ],
        bulk: vec![at("us-la", "Sunset Pharmacy", PharmacySource::UsBulk, LA)],
        ..FakeDirectory::default()
    }
}

fn ids(results: &[Pharmacy]) -> Vec<&str> {
    results.iter().map(|p| p.id.as_str()).collect()
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

#[tokio::test]
async fn city_name_without_provider_resolves_from_city_table() {
    let service = SearchService::new(directory(), Geocoder::new(None));
    let outcome = service
        .search(&request("Los Angeles"), now())
        .await
        .expect("search");

    let geocoded = outcome.geocoded.expect("geocoded");
    assert_eq!(geocoded.strategy, GeocodeStrategy::CityTable);
    assert_eq!(geocoded.coordinates, LA);

    let mut got = ids(&outcome.results);
    got.sort_unstable();
    assert_eq!(got, ["r-la", "us-la"]);
    assert!(outcome.results.iter().all(|p| p.display_data.is_some()));
}

#[tokio::test]
async fn coordinate_literal_short_circuits_geocoding() {
    let service = SearchService::new(directory(), Geocoder::new(None));
    let outcome = service
        .search(&request("42.3601, -71.0589"), now())
        .await
        .expect("search");

    assert_eq!(
        outcome.geocoded.map(|g| g.strategy),
        Some(GeocodeStrategy::Literal)
    );
    assert_eq!(ids(&outcome.results), ["r-bos"]);
}

#[tokio::test]
async fn failing_source_contributes_nothing_but_search_succeeds() {
    let directory = FakeDirectory {
        fail_bulk: true,
        ..directory()
    };
    let (controller, _toasts) =
        SearchController::new(SearchService::new(directory, Geocoder::new(None)));

    let applied = controller.search(&request("Los Angeles"), now()).await;
    assert_eq!(applied, Applied::Current { toast: None });

    match controller.state().await {
        SearchState::Success(results) => assert_eq!(ids(&results), ["r-la"]),
        other => panic!("expected success, got {other:?}"),
    }
}

#[tokio::test]
async fn all_sources_failing_is_an_error_with_one_toast() {
    let directory = FakeDirectory {
        fail_regular: true,
        fail_medme: true,
        fail_bulk: true,
        ..directory()
    };
    let (controller, mut toasts) =
        SearchController::new(SearchService::new(directory, Geocoder::new(None)));

    controller.search(&request("Boston"), now()).await;
    controller.search(&request("Boston"), now()).await;

    assert_eq!(
        controller.state().await,
        SearchState::Error("Failed to search pharmacies".to_string())
    );
    assert_eq!(
        toasts.recv().await.as_deref(),
        Some("Failed to search pharmacies")
    );
    assert!(
        toasts.try_recv().is_err(),
        "repeated error must not toast again"
    );
}

#[tokio::test]
async fn invalid_radius_is_rejected_before_fetching() {
    let fake = Arc::new(directory());
    let service = SearchService::new(Arc::clone(&fake), Geocoder::new(None));
    let mut bad = request("Boston");
    bad.radius_km = 0.0;

    let err = service.search(&bad, now()).await.unwrap_err();
    assert!(matches!(err, SearchError::InvalidRadius(_)), "{err:?}");
    assert_eq!(fake.regular_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn medme_only_skips_bulk_dataset() {
    let mut fake = directory();
    fake.medme_ids.insert("r-la".to_string());
    let fake = Arc::new(fake);
    let service = SearchService::new(Arc::clone(&fake), Geocoder::new(None));

    let mut req = request("Los Angeles");
    req.medme_only = true;
    let outcome = service.search(&req, now()).await.expect("search");

    assert_eq!(ids(&outcome.results), ["r-la"]);
    assert_eq!(outcome.results[0].source, PharmacySource::Medme);
    assert_eq!(fake.bulk_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn medme_pharmacy_in_both_sources_appears_once() {
    let mut fake = directory();
    fake.regular
        .push(at("r-medme", "MedMe Pharmacy", PharmacySource::Regular, LA));
    fake.medme_ids.insert("r-medme".to_string());
    fake.bulk
        .push(at("us-medme", "MedMe Pharmacy", PharmacySource::UsBulk, LA));

    let service = SearchService::new(fake, Geocoder::new(None));
    let outcome = service
        .search(&request("Los Angeles"), now())
        .await
        .expect("search");

    let medme: Vec<&Pharmacy> = outcome
        .results
        .iter()
        .filter(|p| p.name == "MedMe Pharmacy")
        .collect();
    assert_eq!(medme.len(), 1);
    assert_eq!(medme[0].id, "r-medme");
}

#[tokio::test]
async fn telemetry_failure_does_not_fail_search() {
    let service =
        SearchService::new(directory(), Geocoder::new(None)).with_analytics(BrokenAnalytics);
    let outcome = service.search(&request("Boston"), now()).await;
    assert!(outcome.is_ok());
}

#[tokio::test]
async fn radius_search_sends_a_bounding_box_to_sources() {
    let fake = Arc::new(directory());
    let service = SearchService::new(Arc::clone(&fake), Geocoder::new(None));
    service
        .search(&request("Los Angeles"), now())
        .await
        .expect("search");

    let params = fake.last_params().expect("regular fetched");
    let bounds = params.bounds.expect("bounding box");
    assert!(bounds.contains(LA));
    assert!(!bounds.contains(BOSTON));
    assert!(params.limit.is_none());
}

#[tokio::test]
async fn unresolved_location_text_is_matched_at_the_source() {
    let mut fake = directory();
    fake.regular
        .push(Pharmacy::new("r-zeta", "Zeta Pharmacy", PharmacySource::Regular));
    let fake = Arc::new(fake);
    let geocoder = Geocoder::new(None).with_centroid_fallback(false);
    let service = SearchService::new(Arc::clone(&fake), geocoder);

    let outcome = service.search(&request("Zeta"), now()).await.expect("search");

    assert!(outcome.geocoded.is_none());
    assert_eq!(ids(&outcome.results), ["r-zeta"]);
    let params = fake.last_params().expect("regular fetched");
    assert_eq!(params.query.as_deref(), Some("Zeta"));
    assert!(params.bounds.is_none());
}

#[tokio::test]
async fn free_text_query_is_matched_at_the_source() {
    let fake = Arc::new(directory());
    let service = SearchService::new(Arc::clone(&fake), Geocoder::new(None));
    let mut req = SearchRequest::new(Country::Us);
    req.query = Some("beacon".to_string());

    let outcome = service.search(&req, now()).await.expect("search");

    assert_eq!(ids(&outcome.results), ["r-bos"]);
    let params = fake.last_params().expect("regular fetched");
    assert_eq!(params.query.as_deref(), Some("beacon"));
}

#[tokio::test]
async fn search_near_skips_geocoding_and_survives_a_failing_source() {
    let directory = FakeDirectory {
        fail_medme: true,
        ..directory()
    };
    let service = SearchService::new(directory, Geocoder::new(None));
    let mut req = SearchRequest::new(Country::Us);
    req.location = Some("Boston".to_string());
    req.radius_km = 5.0;

    let outcome = service.search_near(LA, &req, now()).await.expect("search");

    assert!(outcome.geocoded.is_none());
    assert_eq!(ids(&outcome.results), ["r-la", "us-la"]);
    assert!(outcome.results.iter().all(|p| p.distance_km.is_some()));
}

// ---------------------------------------------------------------------------
// Overlapping searches
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn slow_stale_search_cannot_overwrite_newer_result() {
    let directory = FakeDirectory {
        slow_first_regular: Some(Duration::from_millis(500)),
        ..directory()
    };
    let (controller, _toasts) =
        SearchController::new(SearchService::new(directory, Geocoder::new(None)));

    let slow = tokio::spawn({
        let controller = controller.clone();
        async move { controller.search(&request("Los Angeles"), now()).await }
    });
    // Let the first search start and block in its slow fetch.
    tokio::time::sleep(Duration::from_millis(10)).await;

    let fast = controller.search(&request("Boston"), now()).await;
    assert_eq!(fast, Applied::Current { toast: None });

    assert_eq!(slow.await.expect("join"), Applied::Stale);
    match controller.state().await {
        SearchState::Success(results) => assert_eq!(ids(&results), ["r-bos"]),
        other => panic!("expected success, got {other:?}"),
    }
}
