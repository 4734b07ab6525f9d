mod api;
mod middleware;

use std::sync::Arc;

use pharmdir_geocode::Geocoder;
use pharmdir_search::{PgDirectory, SearchService};
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, default_rate_limit_state, AppState},
    middleware::AuthState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = pharmdir_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = pharmdir_db::PoolConfig::from_app_config(&config);
    let pool = pharmdir_db::connect_pool(&config.database_url, pool_config).await?;
    pharmdir_db::run_migrations(&pool).await?;

    let directory = PgDirectory::new(pool.clone());
    let geocoder = Geocoder::from_app_config(&config)?;
    let search = SearchService::new(directory.clone(), geocoder).with_analytics(directory);

    let auth = AuthState::from_env(matches!(config.env, pharmdir_core::Environment::Development))?;
    let state = AppState {
        pool,
        search: Arc::new(search),
        default_country: config.country,
        default_radius_km: config.default_radius_km,
    };
    let app = build_app(state, auth, default_rate_limit_state());

    tracing::info!(
        addr = %config.bind_addr,
        env = %config.env,
        country = %config.country,
        "starting pharmdir-server"
    );
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
