use axum::{routing::get, Router};
use rust_kyc_api::config::Config;
use rust_kyc_api::db_storage::ReportStorage;
use rust_kyc_api::handlers::{self, AppState};
use rust_kyc_api::obs;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

/// Main entry point for the application.
///
/// Initializes tracing, configuration, the optional report archive, the
/// upstream clients and the history store, then serves the API.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    obs::init_tracing(obs::DEFAULT_FILTER);

    let config = Config::from_env()?;

    // The archive is optional; lookups work without a database
    let storage = match config.database_url {
        Some(ref url) => {
            let storage = ReportStorage::connect(url).await?;
            tracing::info!("Database connection pool established, report archive enabled");
            Some(storage)
        }
        None => None,
    };

    let app_state = Arc::new(AppState::new(&config, storage)?);
    tracing::info!(
        "History store initialized ({} entry capacity)",
        config.history_capacity
    );

    // Configure rate limiter: 10 requests/second per IP, burst of 20
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Invalid rate limiter configuration"))?,
    );

    let protected_routes = handlers::api_routes().layer(
        ServiceBuilder::new()
            // Lookup bodies are tiny; 64KB is plenty
            .layer(RequestBodyLimitLayer::new(64 * 1024))
            .layer(GovernorLayer {
                config: governor_conf,
            }),
    );

    // Health check bypasses rate limiting
    let app = Router::new()
        .route("/health", get(handlers::health))
        .merge(protected_routes)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
