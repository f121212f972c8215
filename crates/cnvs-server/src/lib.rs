//! CNVS Scraper REST facade
//!
//! Serves the scraper's catalog operations as JSON routes:
//! - `GET /` - Service banner and endpoint list
//! - `GET /health` - Readiness of the session
//! - `GET /api/most-watched` - Today's most watched titles, with media
//! - `GET /api/search?q=` - Search, with media
//! - `GET /api/search-fast?q=` - Search without player or media resolution
//!
//! One [`AppContext`] is built at startup and handed to every handler. The
//! login runs in the background; catalog routes answer 503 until it succeeds.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use anyhow::Context;
use axum::routing::get;
use axum::Router;
use cnvs_core::{CnvsClient, CnvsScraper, KeepAlive, ScraperConfig};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

pub use config::ServerConfig;
pub use error::ApiError;
pub use state::AppContext;

/// Build the router over `ctx`.
pub fn router(ctx: AppContext) -> Router {
    Router::new()
        .route("/", get(routes::root))
        .route("/health", get(routes::health))
        .route("/api/most-watched", get(routes::most_watched))
        .route("/api/search", get(routes::search))
        .route("/api/search-fast", get(routes::search_fast))
        .fallback(routes::not_found)
        .with_state(ctx)
        .layer(CatchPanicLayer::custom(error::handle_panic))
        .layer(TraceLayer::new_for_http())
}

/// Install the global subscriber. `RUST_LOG` wins over `log_level`.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Run the server until Ctrl-C.
pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
    let client = CnvsClient::with_config(config.client_config())
        .context("Failed to build the HTTP client")?;
    let scraper = CnvsScraper::with_fetcher(
        Arc::new(client),
        config.session_config(),
        ScraperConfig::default(),
    );

    let shutdown = CancellationToken::new();
    let ctx = AppContext::new(Arc::new(scraper), shutdown.clone());

    let login_ctx = ctx.clone();
    tokio::spawn(async move {
        info!("logging in");
        if login_ctx.scraper().login(login_ctx.shutdown_token()).await {
            info!("scraper ready");
        } else {
            error!("login failed, catalog routes will answer 503");
        }
    });

    let keep_alive = KeepAlive::spawn(
        ctx.scraper().session().clone(),
        config.keep_alive_interval,
        shutdown.child_token(),
    );

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(%addr, "listening");

    axum::serve(listener, router(ctx))
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
        .context("Server error")?;

    keep_alive.shutdown().await;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal(token: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
    token.cancel();
}
