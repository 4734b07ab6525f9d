mod interactive;
mod lookup;
mod search;

use clap::{Parser, Subcommand};
use pharmdir_core::{AppConfig, Country};
use pharmdir_geocode::Geocoder;
use pharmdir_search::{PgDirectory, SearchService};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "pharmdir-cli")]
#[command(about = "Pharmacy directory search command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Search pharmacies near a location
    Search {
        /// Address, city, or "lat, lng"; omit to list everything
        location: Option<String>,
        /// Search radius in kilometres (defaults to PHARMDIR_DEFAULT_RADIUS_KM)
        #[arg(long)]
        radius_km: Option<f64>,
        /// Service keyword filter; repeat for several
        #[arg(long = "service")]
        services: Vec<String>,
        /// Only MedMe-linked pharmacies
        #[arg(long)]
        medme_only: bool,
        /// Narrow by name or address
        #[arg(long)]
        query: Option<String>,
        /// Country code, `us` or `ca` (defaults to PHARMDIR_COUNTRY)
        #[arg(long)]
        country: Option<Country>,
        /// Maximum number of results to show
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// List pharmacies within a radius of a coordinate
    Nearby {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
        #[arg(long)]
        radius_km: Option<f64>,
        #[arg(long)]
        country: Option<Country>,
    },
    /// Show one pharmacy by source and id
    Show {
        /// regular, medme, us_bulk or ca_bulk
        source: String,
        id: String,
    },
    /// Resolve a location the way searches do
    Geocode {
        input: String,
        #[arg(long)]
        country: Option<Country>,
    },
    /// Type locations line by line; searches fire after a quiet period
    Interactive {
        #[arg(long)]
        radius_km: Option<f64>,
        #[arg(long)]
        country: Option<Country>,
    },
    /// Database operations
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check database connectivity
    Ping,
    /// Apply pending migrations
    Migrate,
}

async fn connect(config: &AppConfig) -> anyhow::Result<sqlx::PgPool> {
    let pool_config = pharmdir_db::PoolConfig::from_app_config(config);
    Ok(pharmdir_db::connect_pool(&config.database_url, pool_config).await?)
}

fn build_search_service(
    pool: &sqlx::PgPool,
    config: &AppConfig,
) -> anyhow::Result<SearchService<PgDirectory, PgDirectory>> {
    let directory = PgDirectory::new(pool.clone());
    let geocoder = Geocoder::from_app_config(config)?;
    Ok(SearchService::new(directory.clone(), geocoder).with_analytics(directory))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("pharmdir-cli ready; run with --help for commands");
        return Ok(());
    };

    let config = pharmdir_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match command {
        Commands::Search {
            location,
            radius_km,
            services,
            medme_only,
            query,
            country,
            limit,
        } => {
            let pool = connect(&config).await?;
            let service = build_search_service(&pool, &config)?;
            let mut request = pharmdir_core::SearchRequest::new(country.unwrap_or(config.country));
            request.location = location;
            request.radius_km = radius_km.unwrap_or(config.default_radius_km);
            request.services = services;
            request.medme_only = medme_only;
            request.query = query;
            request.limit = Some(limit);
            search::run_search(&service, &request).await?;
        }
        Commands::Nearby {
            lat,
            lng,
            radius_km,
            country,
        } => {
            let pool = connect(&config).await?;
            let service = build_search_service(&pool, &config)?;
            let mut request = pharmdir_core::SearchRequest::new(country.unwrap_or(config.country));
            request.radius_km = radius_km.unwrap_or(config.default_radius_km);
            search::run_nearby(&service, pharmdir_core::Coordinates::new(lat, lng), &request)
                .await?;
        }
        Commands::Show { source, id } => {
            let pool = connect(&config).await?;
            lookup::run_show(&pool, &source, &id).await?;
        }
        Commands::Geocode { input, country } => {
            let geocoder = Geocoder::from_app_config(&config)?;
            lookup::run_geocode(&geocoder, &input, country.unwrap_or(config.country)).await?;
        }
        Commands::Interactive { radius_km, country } => {
            let pool = connect(&config).await?;
            let service = build_search_service(&pool, &config)?;
            interactive::run_interactive(
                service,
                country.unwrap_or(config.country),
                radius_km.unwrap_or(config.default_radius_km),
                config.search_debounce_ms,
            )
            .await?;
        }
        Commands::Db {
            command: DbCommands::Ping,
        } => {
            let pool = connect(&config).await?;
            pharmdir_db::health_check(&pool).await?;
            println!("database ok");
        }
        Commands::Db {
            command: DbCommands::Migrate,
        } => {
            let pool = connect(&config).await?;
            let applied = pharmdir_db::run_migrations(&pool).await?;
            println!("{applied} migration(s) applied");
        }
    }

    Ok(())
}
