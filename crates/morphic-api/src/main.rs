//! Morphic API server and admin CLI entry point.
//!
//! Binary name: `morphic`
//!
//! Parses CLI arguments, initializes tracing, then either serves the HTTP
//! API or runs one of the maintenance commands.

mod cli;
mod http;
mod state;

use std::path::Path;
use std::time::Duration;

use clap::Parser;
use console::style;
use tokio_util::sync::CancellationToken;

use morphic_infra::config::{data_dir, load_app_config};
use morphic_infra::sqlite::DatabasePool;
use morphic_infra::sqlite::pool::database_url_for;
use morphic_observe::tracing_setup::{TracingOptions, init_tracing, shutdown_tracing};

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = match cli.verbose {
        0 => "info,tower_http=info,sqlx=warn",
        1 => "debug,hyper=info,sqlx=info",
        _ => "trace",
    };
    init_tracing(TracingOptions {
        format: cli.log_format,
        enable_otel: cli.otel,
        default_filter: default_filter.to_string(),
    })
    .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let data_dir = cli.data_dir.clone().unwrap_or_else(data_dir);

    let result = match cli.command {
        Commands::Serve { host, port } => serve(&data_dir, host, port).await,

        Commands::Migrate => {
            let pool = open_database(&data_dir).await?;
            pool.close().await;
            println!(
                "  {} Database migrated at {}",
                style("✓").green().bold(),
                style(data_dir.join("morphic.db").display()).dim()
            );
            Ok(())
        }

        Commands::Chats { user, limit } => {
            let config = load_app_config(&data_dir).await;
            let user = user.unwrap_or(config.features.anonymous_user_id);
            let pool = open_database(&data_dir).await?;
            let result = cli::chats::list_chats(pool.clone(), &user, limit, cli.json).await;
            pool.close().await;
            result
        }

        Commands::Show { chat_id, reasoning } => {
            let pool = open_database(&data_dir).await?;
            let result = cli::show::show_chat(pool.clone(), &chat_id, reasoning, cli.json).await;
            pool.close().await;
            result
        }

        Commands::CacheConfig => {
            let config = load_app_config(&data_dir).await;
            cli::cache::print_cache_config(&config.cache, cli.json)
        }
    };

    shutdown_tracing();
    result
}

async fn open_database(data_dir: &Path) -> anyhow::Result<DatabasePool> {
    tokio::fs::create_dir_all(data_dir).await?;
    let pool = DatabasePool::new(&format!("{}?mode=rwc", database_url_for(data_dir))).await?;
    Ok(pool)
}

async fn serve(data_dir: &Path, host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    let state = AppState::init(data_dir).await?;

    let host = host.unwrap_or_else(|| state.config.server.host.clone());
    let port = port.unwrap_or(state.config.server.port);
    let addr = format!("{host}:{port}");

    let cancel = CancellationToken::new();
    let sweep_every = Duration::from_secs(state.config.cache.effective().sweep_interval_secs);
    let sweeper = state.cache.clone().spawn_sweeper(sweep_every, cancel.clone());

    let router = http::router::build_router(state.clone());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(
        %addr,
        providers = ?state.providers().list_names(),
        cloud = state.config.features.cloud_deployment,
        data_dir = %state.data_dir.display(),
        "morphic api listening"
    );
    println!();
    println!(
        "  {} Morphic API listening on {}",
        style("●").green().bold(),
        style(format!("http://{addr}")).cyan()
    );
    println!();

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cancel.cancel();
    if let Err(e) = sweeper.await {
        tracing::warn!(error = %e, "cache sweeper task failed");
    }
    state.cache.clear();
    state.db_pool.close().await;
    tracing::info!("shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for ctrl+c");
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
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
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

    tracing::info!("shutdown signal received");
}
