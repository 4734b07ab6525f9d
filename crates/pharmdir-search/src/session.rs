//! Search state machine with generation tokens and toast de-duplication.
//!
//! Every search is stamped with a monotonically increasing generation. Only
//! the outcome of the latest generation is applied; older outcomes that
//! arrive late are discarded, so a slow stale search can never overwrite a
//! newer one.

use std::sync::Arc;

use chrono::NaiveDateTime;
use pharmdir_core::{Pharmacy, SearchRequest};
use tokio::sync::{mpsc, Mutex};

use crate::analytics::AnalyticsSink;
use crate::directory::PharmacyDirectory;
use crate::error::SearchError;
use crate::pipeline::SearchService;

#[derive(Debug, Clone, PartialEq)]
pub enum SearchState {
    Idle,
    Loading,
    Success(Vec<Pharmacy>),
    Error(String),
}

impl SearchState {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Success(_) => "success",
            Self::Error(_) => "error",
        }
    }
}

/// Issued by [`SearchSession::begin`]; identifies one search call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchTicket {
    generation: u64,
}

impl SearchTicket {
    #[must_use]
    pub fn generation(self) -> u64 {
        self.generation
    }
}

/// What happened to an outcome handed back to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    /// State updated; `toast` is set when the user should be notified.
    Current { toast: Option<String> },
    /// A newer search was started; the outcome was dropped.
    Stale,
}

#[derive(Debug)]
pub struct SearchSession {
    state: SearchState,
    generation: u64,
    last_error: Option<String>,
}

impl Default for SearchSession {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchSession {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: SearchState::Idle,
            generation: 0,
            last_error: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> &SearchState {
        &self.state
    }

    /// Enter `loading` from any state and stamp a new generation.
    pub fn begin(&mut self) -> SearchTicket {
        self.generation += 1;
        self.state = SearchState::Loading;
        SearchTicket {
            generation: self.generation,
        }
    }

    pub fn resolve(&mut self, ticket: SearchTicket, results: Vec<Pharmacy>) -> Applied {
        if !self.is_current(ticket) {
            return Applied::Stale;
        }
        self.state = SearchState::Success(results);
        self.last_error = None;
        Applied::Current { toast: None }
    }

    /// Move to `error`. A toast is returned only when the message differs
    /// from the previous error.
    pub fn reject(&mut self, ticket: SearchTicket, error: &SearchError) -> Applied {
        if !self.is_current(ticket) {
            return Applied::Stale;
        }
        let message = error.user_message();
        let toast = (self.last_error.as_deref() != Some(message.as_str())).then(|| message.clone());
        self.last_error = Some(message.clone());
        self.state = SearchState::Error(message);
        Applied::Current { toast }
    }

    fn is_current(&self, ticket: SearchTicket) -> bool {
        if ticket.generation == self.generation {
            return true;
        }
        tracing::debug!(
            stale = ticket.generation,
            latest = self.generation,
            "discarding outcome of superseded search"
        );
        false
    }
}

/// Drives searches through a shared [`SearchSession`].
///
/// Searches may overlap; the session decides which outcome wins. Toasts are
/// delivered on the channel returned by [`SearchController::new`].
pub struct SearchController<D, A> {
    service: Arc<SearchService<D, A>>,
    session: Arc<Mutex<SearchSession>>,
    toasts: mpsc::UnboundedSender<String>,
}

impl<D, A> Clone for SearchController<D, A> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            session: Arc::clone(&self.session),
            toasts: self.toasts.clone(),
        }
    }
}

impl<D: PharmacyDirectory, A: AnalyticsSink> SearchController<D, A> {
    #[must_use]
    pub fn new(service: SearchService<D, A>) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (toasts, rx) = mpsc::unbounded_channel();
        let controller = Self {
            service: Arc::new(service),
            session: Arc::new(Mutex::new(SearchSession::new())),
            toasts,
        };
        (controller, rx)
    }

    pub async fn state(&self) -> SearchState {
        self.session.lock().await.state().clone()
    }

    /// Run one search and apply its outcome if it is still the latest.
    pub async fn search(&self, request: &SearchRequest, now: NaiveDateTime) -> Applied {
        let ticket = self.session.lock().await.begin();
        let outcome = self.service.search(request, now).await;

        let mut session = self.session.lock().await;
        let applied = match outcome {
            Ok(outcome) => session.resolve(ticket, outcome.results),
            Err(e) => {
                tracing::warn!(generation = ticket.generation, error = %e, "search failed");
                session.reject(ticket, &e)
            }
        };
        drop(session);

        if let Applied::Current {
            toast: Some(message),
        } = &applied
        {
            // Nobody listening is fine.
            let _ = self.toasts.send(message.clone());
        }
        applied
    }
}

#[cfg(test)]
mod tests {
    use pharmdir_core::PharmacySource;

    use super::*;

    fn rows(ids: &[&str]) -> Vec<Pharmacy> {
        ids.iter()
            .map(|id| Pharmacy::new(*id, *id, PharmacySource::Regular))
            .collect()
    }

    #[test]
    fn starts_idle_and_moves_through_loading() {
        let mut session = SearchSession::new();
        assert_eq!(session.state(), &SearchState::Idle);

        let ticket = session.begin();
        assert_eq!(session.state(), &SearchState::Loading);

        assert_eq!(
            session.resolve(ticket, rows(&["a"])),
            Applied::Current { toast: None }
        );
        assert_eq!(session.state().as_str(), "success");
    }

    #[test]
    fn stale_result_is_discarded() {
        let mut session = SearchSession::new();
        let first = session.begin();
        let second = session.begin();

        assert_eq!(
            session.resolve(second, rows(&["new"])),
            Applied::Current { toast: None }
        );
        assert_eq!(session.resolve(first, rows(&["old"])), Applied::Stale);
        assert_eq!(session.state(), &SearchState::Success(rows(&["new"])));
    }

    #[test]
    fn stale_error_does_not_toast() {
        let mut session = SearchSession::new();
        let first = session.begin();
        let _second = session.begin();
        assert_eq!(
            session.reject(first, &SearchError::AllSourcesFailed),
            Applied::Stale
        );
        assert_eq!(session.state(), &SearchState::Loading);
    }

    #[test]
    fn repeated_error_toasts_once() {
        let mut session = SearchSession::new();

        let t = session.begin();
        let first = session.reject(t, &SearchError::AllSourcesFailed);
        assert_eq!(
            first,
            Applied::Current {
                toast: Some("Failed to search pharmacies".to_string())
            }
        );

        let t = session.begin();
        assert_eq!(
            session.reject(t, &SearchError::AllSourcesFailed),
            Applied::Current { toast: None }
        );
        assert_eq!(
            session.state(),
            &SearchState::Error("Failed to search pharmacies".to_string())
        );

        let t = session.begin();
        let different = session.reject(t, &SearchError::InvalidRadius(0.0));
        assert!(matches!(different, Applied::Current { toast: Some(_) }));
    }

    #[test]
    fn success_resets_toast_dedupe() {
        let mut session = SearchSession::new();
        let t = session.begin();
        session.reject(t, &SearchError::AllSourcesFailed);
        let t = session.begin();
        session.resolve(t, Vec::new());
        let t = session.begin();
        assert!(matches!(
            session.reject(t, &SearchError::AllSourcesFailed),
            Applied::Current { toast: Some(_) }
        ));
    }
}
