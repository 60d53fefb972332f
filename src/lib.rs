pub mod api;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod db;
pub mod domain;
pub mod entities;
pub mod models;
pub mod rows;
pub mod state;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
pub use config::Config;
use state::SharedState;

pub async fn run(config: Config) -> anyhow::Result<()> {
    config.validate()?;

    init_tracing(&config);

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve) => {
            let prometheus_handle = install_metrics(&config)?;
            run_server(config, prometheus_handle).await
        }

        Some(Commands::Brands { search, page }) => {
            cli::cmd_brands(&config, search.as_deref(), page).await
        }

        Some(Commands::Models {
            brand_id,
            year,
            search,
            page,
        }) => cli::cmd_models(&config, brand_id, year, search.as_deref(), page).await,

        Some(Commands::Variants {
            model_id,
            search,
            page,
        }) => cli::cmd_variants(&config, model_id, search.as_deref(), page).await,

        Some(Commands::Search { query, scope, page }) => {
            cli::cmd_search(&config, &query.join(" "), scope.as_deref(), page).await
        }

        Some(Commands::Import { path }) => cli::cmd_import(&config, &path).await,

        Some(Commands::Stats) => cli::cmd_stats(&config).await,

        Some(Commands::Init) => {
            if Config::create_default_if_missing()? {
                println!("Created config.toml with default settings");
            } else {
                println!("config.toml already exists");
            }
            Ok(())
        }

        None => {
            println!("No command given. Run with --help for usage.");
            Ok(())
        }
    }
}

fn init_tracing(config: &Config) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    if config.observability.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn install_metrics(config: &Config) -> anyhow::Result<Option<PrometheusHandle>> {
    if !config.observability.metrics_enabled {
        return Ok(None);
    }

    use metrics_exporter_prometheus::PrometheusBuilder;
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;
    info!("Prometheus metrics recorder initialized");
    Ok(Some(handle))
}

async fn run_server(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<()> {
    info!(
        "vehicle-catalog v{} starting in server mode...",
        env!("CARGO_PKG_VERSION")
    );

    if !config.server.enabled {
        anyhow::bail!("server.enabled is false in config; nothing to serve");
    }

    let port = config.server.port;
    let shared = Arc::new(SharedState::new(config).await?);
    let api_state = api::create_app_state(Arc::clone(&shared), prometheus_handle);

    let purge_handle = spawn_cache_purge(Arc::clone(&shared));

    let app = api::router(api_state);
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("Web API running at http://{}", addr);

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    purge_handle.abort();
    if let Err(e) = result {
        error!("Web server error: {}", e);
        return Err(e.into());
    }

    info!("Server stopped");
    Ok(())
}

/// Expired entries are otherwise only dropped when their key is read again.
fn spawn_cache_purge(shared: Arc<SharedState>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(5 * 60));
        loop {
            interval.tick().await;
            let purged = shared.cache.purge_expired();
            if purged > 0 {
                info!(purged, remaining = shared.cache.len(), "Purged expired cache entries");
            }
        }
    })
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!("Error listening for shutdown: {}", e),
    }
}
