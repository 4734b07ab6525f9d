use crate::app_config::{AppConfig, Environment};
use crate::{ConfigError, Country};

const DEFAULT_GEOCODER_BASE_URL: &str = "https://api.mapbox.com/";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let database_url = require("DATABASE_URL")?;

    let env = parse_environment(&or_default("PHARMDIR_ENV", "development"));

    let bind_addr = or_default("PHARMDIR_BIND_ADDR", "0.0.0.0:3000")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("PHARMDIR_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("PHARMDIR_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("PHARMDIR_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("PHARMDIR_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("PHARMDIR_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let country = or_default("PHARMDIR_COUNTRY", "us")
        .parse::<Country>()
        .map_err(|e| invalid("PHARMDIR_COUNTRY", e.to_string()))?;

    let default_radius_km = or_default("PHARMDIR_DEFAULT_RADIUS_KM", "25")
        .parse::<f64>()
        .map_err(|e| invalid("PHARMDIR_DEFAULT_RADIUS_KM", e.to_string()))?;
    if !default_radius_km.is_finite() || default_radius_km <= 0.0 {
        return Err(invalid(
            "PHARMDIR_DEFAULT_RADIUS_KM",
            format!("radius must be a positive number of kilometres, got {default_radius_km}"),
        ));
    }

    let mapbox_access_token = lookup("MAPBOX_ACCESS_TOKEN")
        .ok()
        .filter(|t| !t.trim().is_empty());
    let geocoder_base_url = or_default("PHARMDIR_GEOCODER_BASE_URL", DEFAULT_GEOCODER_BASE_URL);
    let geocoder_timeout_secs = parse_u64("PHARMDIR_GEOCODER_TIMEOUT_SECS", "10")?;
    let geocode_centroid_fallback = parse_bool(
        "PHARMDIR_GEOCODE_CENTROID_FALLBACK",
        &or_default("PHARMDIR_GEOCODE_CENTROID_FALLBACK", "true"),
    )?;
    let search_debounce_ms = parse_u64("PHARMDIR_SEARCH_DEBOUNCE_MS", "300")?;

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        country,
        default_radius_km,
        mapbox_access_token,
        geocoder_base_url,
        geocoder_timeout_secs,
        geocode_centroid_fallback,
        search_debounce_ms,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

fn parse_bool(var: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: format!("expected a boolean, got {other:?}"),
        }),
    }
}
