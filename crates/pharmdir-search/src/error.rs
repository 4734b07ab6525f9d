use thiserror::Error;

/// Shown to users whenever an error carries nothing more specific.
pub const GENERIC_SEARCH_ERROR: &str = "Failed to search pharmacies";

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search radius must be a positive number of kilometres, got {0}")]
    InvalidRadius(f64),

    /// Every data source attempted for this search failed.
    #[error("all pharmacy data sources failed")]
    AllSourcesFailed,

    #[error(transparent)]
    Db(#[from] pharmdir_db::DbError),
}

impl SearchError {
    /// Display string for the notification shown to the user.
    ///
    /// Input problems are reported verbatim; everything else collapses to
    /// [`GENERIC_SEARCH_ERROR`] so internals never reach the UI.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidRadius(_) => self.to_string(),
            Self::AllSourcesFailed | Self::Db(_) => GENERIC_SEARCH_ERROR.to_string(),
        }
    }
}
