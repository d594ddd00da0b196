mod api;
mod cli;
mod state;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use sha2::Digest;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use ac_domain::clock::SystemClock;
use ac_domain::config::{Config, RunMode};
use ac_enrich::Enricher;
use ac_queue::FetchQueue;
use ac_service::ActService;
use ac_store::JsonCacheStore;
use ac_sweeper::CacheSweeper;
use ac_upstream::{HttpBandsintownClient, HttpMusicBrainzClient};

use cli::{Cli, Command, ConfigCommand};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None | Some(Command::Serve) => {
            let (config, _path) = cli::load_config()?;
            init_tracing(&config);
            run_server(Arc::new(config)).await
        }
        Some(Command::Config(ConfigCommand::Validate)) => {
            let (config, config_path) = cli::load_config()?;
            if !cli::config::validate(&config, &config_path) {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Config(ConfigCommand::Show)) => {
            let (config, _path) = cli::load_config()?;
            cli::config::show(&config);
            Ok(())
        }
        Some(Command::Version) => {
            println!("act-cache {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Structured JSON tracing, verbosity driven by `server.mode` (spec §6
/// `NODE_ENV`-like knob).
fn init_tracing(config: &Config) {
    let default_filter = match config.server.mode {
        RunMode::Test => "debug,ac_gateway=trace",
        RunMode::Production => "info,ac_gateway=info",
        RunMode::Other => "info",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .json()
        .init();
}

async fn run_server(config: Arc<Config>) -> anyhow::Result<()> {
    tracing::info!("act-cache starting");

    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ac_domain::config::ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ac_domain::config::ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ac_domain::config::ConfigSeverity::Error) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues.iter().filter(|i| i.severity == ac_domain::config::ConfigSeverity::Error).count()
        );
    }

    let clock = Arc::new(SystemClock);

    let store: Arc<dyn ac_store::CacheStore> =
        Arc::new(JsonCacheStore::new(std::path::Path::new(&config.store.dir))?);
    store.ensure_error_index().await?;
    tracing::info!(dir = %config.store.dir, "cache store ready");

    let timeout = Duration::from_millis(config.upstream.timeout_ms);
    let musicbrainz = Arc::new(HttpMusicBrainzClient::new(
        config.upstream.musicbrainz_base_url.clone(),
        &config.upstream.user_agent,
        timeout,
    )?);
    let bandsintown = Arc::new(HttpBandsintownClient::new(&config.upstream.user_agent, timeout)?);
    tracing::info!(base_url = %config.upstream.musicbrainz_base_url, "upstream clients ready");

    let enricher = Arc::new(Enricher::new(musicbrainz, bandsintown, clock.clone()));

    let queue = FetchQueue::new(
        store.clone(),
        enricher.clone(),
        clock.clone(),
        Duration::from_millis(config.queue.inter_fetch_delay_ms),
    );
    tracing::info!(delay_ms = config.queue.inter_fetch_delay_ms, "fetch queue ready");

    let service = Arc::new(ActService::new(
        store.clone(),
        enricher.clone(),
        queue,
        clock.clone(),
        Duration::from_millis(config.service.store_deadline_ms),
        config.service.staleness_ms,
    ));
    tracing::info!("act service ready");

    let sweeper = CacheSweeper::new(store.clone(), enricher, clock, config.sweeper.eviction_threshold);
    {
        let cycle_interval = Duration::from_millis(config.sweeper.cycle_interval_ms);
        let retry_delay = Duration::from_millis(config.sweeper.retry_delay_ms);
        tokio::spawn(async move {
            sweeper.run_forever(cycle_interval, retry_delay).await;
        });
    }
    tracing::info!(
        cycle_interval_ms = config.sweeper.cycle_interval_ms,
        eviction_threshold = config.sweeper.eviction_threshold,
        "cache sweeper started"
    );

    let admin_token_hash = match config.admin.totp_secret.as_deref() {
        Some(secret) if !secret.is_empty() => {
            tracing::info!("admin bearer-token auth enabled");
            Some(sha2::Sha256::digest(secret.as_bytes()).to_vec())
        }
        _ => {
            tracing::warn!("admin bearer-token auth DISABLED — set admin.totp_secret to enable");
            None
        }
    };

    let state = AppState { config: config.clone(), store, service, admin_token_hash };

    let app = api::router(state).layer(CorsLayer::permissive()).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!(bind = %config.server.bind, "act-cache listening");

    axum::serve(listener, app).await?;
    Ok(())
}
