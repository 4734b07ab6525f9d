//! One search pass: geocode, fetch every source concurrently, merge.

use std::collections::HashSet;

use chrono::NaiveDateTime;
use pharmdir_core::{
    merge_results, Coordinates, LocationMatch, MergeInput, Pharmacy, SearchRequest,
};
use pharmdir_db::{BulkDataset, DbError, SearchParams};
use pharmdir_geocode::{Geocoded, Geocoder};

use crate::analytics::{self, AnalyticsSink, NoopAnalytics};
use crate::directory::PharmacyDirectory;
use crate::error::SearchError;

/// Results of a completed search.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub results: Vec<Pharmacy>,
    /// `None` when no location was given or it could not be resolved.
    pub geocoded: Option<Geocoded>,
}

pub struct SearchService<D, A = NoopAnalytics> {
    directory: D,
    geocoder: Geocoder,
    analytics: A,
}

impl<D: PharmacyDirectory> SearchService<D> {
    #[must_use]
    pub fn new(directory: D, geocoder: Geocoder) -> Self {
        Self {
            directory,
            geocoder,
            analytics: NoopAnalytics,
        }
    }
}

impl<D: PharmacyDirectory, A: AnalyticsSink> SearchService<D, A> {
    #[must_use]
    pub fn with_analytics<B: AnalyticsSink>(self, analytics: B) -> SearchService<D, B> {
        SearchService {
            directory: self.directory,
            geocoder: self.geocoder,
            analytics,
        }
    }

    pub fn geocoder(&self) -> &Geocoder {
        &self.geocoder
    }

    /// Run a full search.
    ///
    /// A failing source is logged and contributes no rows; the search only
    /// fails when every source it tried failed.
    ///
    /// # Errors
    ///
    /// - [`SearchError::InvalidRadius`] for a non-positive or non-finite radius.
    /// - [`SearchError::AllSourcesFailed`] when no source answered.
    pub async fn search(
        &self,
        request: &SearchRequest,
        now: NaiveDateTime,
    ) -> Result<SearchOutcome, SearchError> {
        validate_radius(request)?;

        let geocoded = match request.location_text() {
            Some(text) => self.geocoder.geocode(text, request.country).await,
            None => None,
        };
        let location = match (request.location_text(), geocoded) {
            (None, _) => LocationMatch::Anywhere,
            (Some(_), Some(g)) => LocationMatch::Near(g.coordinates),
            (Some(text), None) => LocationMatch::Text(text.to_string()),
        };

        let results = self.fetch_and_merge(&location, request, now).await?;
        Ok(SearchOutcome { results, geocoded })
    }

    /// Search around known coordinates; `request.location` is ignored.
    ///
    /// # Errors
    ///
    /// Same as [`SearchService::search`].
    pub async fn search_near(
        &self,
        center: Coordinates,
        request: &SearchRequest,
        now: NaiveDateTime,
    ) -> Result<SearchOutcome, SearchError> {
        validate_radius(request)?;
        let results = self
            .fetch_and_merge(&LocationMatch::Near(center), request, now)
            .await?;
        Ok(SearchOutcome {
            results,
            geocoded: None,
        })
    }

    async fn fetch_and_merge(
        &self,
        location: &LocationMatch,
        request: &SearchRequest,
        now: NaiveDateTime,
    ) -> Result<Vec<Pharmacy>, SearchError> {
        let params = source_params(location, request);
        let dataset = BulkDataset::for_country(request.country);

        let (regular, medme_ids, bulk) = tokio::join!(
            self.directory.fetch_regular(&params),
            self.directory.fetch_medme_ids(),
            async {
                if request.medme_only {
                    None
                } else {
                    Some(self.directory.fetch_bulk(dataset, &params).await)
                }
            },
        );

        let mut failures = 0_usize;
        let mut attempted = 2_usize;
        let regular = or_empty(regular, "regular", &mut failures);
        let medme_ids: HashSet<String> = or_empty(medme_ids, "medme", &mut failures);
        let bulk = match bulk {
            Some(rows) => {
                attempted += 1;
                or_empty(rows, dataset.source().as_str(), &mut failures)
            }
            None => Vec::new(),
        };
        if failures == attempted {
            return Err(SearchError::AllSourcesFailed);
        }

        let results = merge_results(
            MergeInput {
                regular,
                medme_ids,
                bulk,
            },
            location,
            request,
            now,
        );
        tracing::info!(
            country = %request.country,
            results = results.len(),
            failed_sources = failures,
            "search complete"
        );

        self.record(request, &results).await;
        Ok(results)
    }

    async fn record(&self, request: &SearchRequest, results: &[Pharmacy]) {
        let event = analytics::search_event(request, results.len());
        if let Err(e) = self.analytics.record_event(event).await {
            tracing::warn!(error = %e, "failed to record search event");
        }
        let impressions = analytics::impressions(request, results);
        if impressions.is_empty() {
            return;
        }
        if let Err(e) = self.analytics.record_impressions(impressions).await {
            tracing::warn!(error = %e, "failed to record pharmacy impressions");
        }
    }
}

fn validate_radius(request: &SearchRequest) -> Result<(), SearchError> {
    if request.radius_km.is_finite() && request.radius_km > 0.0 {
        Ok(())
    } else {
        Err(SearchError::InvalidRadius(request.radius_km))
    }
}

/// Filters pushed into every source query. Rows are never capped here; the
/// SQL text filter matches at least what `Pharmacy::matches_text` does.
fn source_params(location: &LocationMatch, request: &SearchRequest) -> SearchParams {
    let params = match location {
        LocationMatch::Near(center) => SearchParams::near(*center, request.radius_km),
        LocationMatch::Anywhere | LocationMatch::Text(_) => SearchParams::default(),
    };
    let query = request.query.as_deref().map(str::trim).filter(|q| !q.is_empty());
    let text = match location {
        LocationMatch::Text(text) => Some(text.as_str()),
        LocationMatch::Anywhere | LocationMatch::Near(_) => None,
    };
    match query.or(text) {
        Some(needle) => params.with_query(needle),
        None => params,
    }
}

fn or_empty<T: Default>(result: Result<T, DbError>, source: &str, failures: &mut usize) -> T {
    match result {
        Ok(rows) => rows,
        Err(e) => {
            *failures += 1;
            tracing::warn!(source, error = %e, "pharmacy source failed; continuing without it");
            T::default()
        }
    }
}
