use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{
    http::{header, HeaderValue},
    routing::{get, post},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use apify_client::ApifyClient;
use pulseboard_common::Config;
use pulseboard_tracker::{
    ApifySocialFeed, LeaderboardMonitor, PgEngagementStore, SuggestionTracker,
};

mod rest;

pub struct AppState {
    pub tracker: Arc<SuggestionTracker>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("pulseboard=info".parse()?))
        .init();

    info!("Pulseboard starting...");

    let config = Config::from_env();
    config.log_redacted();

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;

    let store = Arc::new(PgEngagementStore::new(pool));
    store.migrate().await?;

    let feed = Arc::new(ApifySocialFeed::new(
        ApifyClient::new(config.apify_api_key.clone()),
        config.tracked_account.clone(),
    ));

    let tracker = Arc::new(SuggestionTracker::new(
        feed,
        store,
        config.refresh_post_count,
        config.reply_page_size,
    ));

    let monitor = Arc::new(LeaderboardMonitor::new(
        tracker.clone(),
        Duration::from_millis(config.poll_interval_ms),
    ));
    monitor.start();

    let state = Arc::new(AppState { tracker });

    let static_dir = std::path::PathBuf::from(&config.static_dir);
    let frontend =
        ServeDir::new(&static_dir).not_found_service(ServeFile::new(static_dir.join("index.html")));

    let app = Router::new()
        // REST API
        .route("/api/leaderboard", get(rest::api_leaderboard))
        .route("/api/stats", get(rest::api_stats))
        .route("/api/track", post(rest::api_track))
        // Everything else is the static frontend bundle
        .fallback_service(frontend)
        .with_state(state)
        // CORS
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        // Live data: never cache API responses
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        // Logging layer: method + path + status + latency only
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        );

    let addr = format!("{}:{}", config.web_host, config.web_port);
    info!("Pulseboard API listening on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(monitor.clone()))
        .await?;

    Ok(())
}

/// Ctrl-C stops the monitor before the server drains, so no new poll cycle
/// starts during shutdown; an in-flight cycle finishes on its own.
async fn shutdown_signal(monitor: Arc<LeaderboardMonitor>) {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutting down...");
    monitor.stop();
}
