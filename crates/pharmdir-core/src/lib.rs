pub mod app_config;
pub mod config;
pub mod country;
pub mod display;
pub mod geo;
pub mod merge;
pub mod pharmacy;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use country::Country;
pub use display::{generate_stable_display_data, DisplayData};
pub use geo::{distance_km, BoundingBox, Coordinates};
pub use merge::{
    is_medme_branded, matches_services, merge_results, LocationMatch, MergeInput, SearchRequest,
    MEDME_LOGO_PATH,
};
pub use pharmacy::{Address, Pharmacy, PharmacySource};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unsupported country code: {0:?} (expected \"us\" or \"ca\")")]
    UnsupportedCountry(String),
    #[error("unknown pharmacy source: {0:?}")]
    UnknownSource(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
