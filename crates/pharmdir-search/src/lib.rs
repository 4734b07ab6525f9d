//! Search orchestration: geocode, fetch sources concurrently, merge, and
//! track the user-visible search state.

pub mod analytics;
pub mod debounce;
pub mod directory;
pub mod error;
pub mod pipeline;
pub mod session;

pub use analytics::{session_id, AnalyticsSink, NoopAnalytics};
pub use debounce::Debouncer;
pub use directory::{PgDirectory, PharmacyDirectory};
pub use error::{SearchError, GENERIC_SEARCH_ERROR};
pub use pipeline::{SearchOutcome, SearchService};
pub use session::{Applied, SearchController, SearchSession, SearchState, SearchTicket};
