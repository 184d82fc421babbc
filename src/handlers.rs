use crate::config::Config;
use crate::db_storage::ReportStorage;
use crate::enrichment::{normalize_handle, ProfileAggregator};
use crate::errors::AppError;
use crate::history::HistoryStore;
use crate::models::*;
use crate::report::format_profile_report;
use crate::services::InstagramService;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;

const DEFAULT_ARCHIVE_PAGE: i64 = 50;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Fan-out to the generative sources and the scrape.
    pub aggregator: ProfileAggregator,
    /// Scrape client used directly by the Instagram proxy endpoint.
    pub instagram: InstagramService,
    /// Bounded in-memory history, keyed by identity key.
    pub history: HistoryStore,
    /// Postgres archive (only when DATABASE_URL is configured).
    pub storage: Option<ReportStorage>,
}

impl AppState {
    pub fn new(config: &Config, storage: Option<ReportStorage>) -> Result<Self, AppError> {
        Ok(Self {
            aggregator: ProfileAggregator::new(config)?,
            instagram: InstagramService::new(config)?,
            history: HistoryStore::new(config.history_capacity),
            storage,
        })
    }
}

/// API routes, without rate limiting so callers decide how to layer them.
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/profiles/lookup", post(lookup_profile))
        .route("/api/v1/profiles/history", get(list_history))
        .route(
            "/api/v1/profiles/history/:id",
            get(get_history_entry).delete(delete_history_entry),
        )
        .route("/api/v1/profiles/history/:id/report", get(history_report))
        .route("/api/v1/instagram", get(instagram_profile))
        .route("/api/v1/archive", get(list_archive))
        .route(
            "/api/v1/archive/:id",
            get(get_archived_report).delete(delete_archived_report),
        )
}

/// Health check endpoint.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "rust-kyc-api",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// POST /api/v1/profiles/lookup
///
/// Aggregates a fresh profile for the handle and records it in the history
/// (and the archive, when configured). Only an invalid handle fails.
pub async fn lookup_profile(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LookupRequest>,
) -> Result<Json<ProfileRecord>, AppError> {
    tracing::info!("POST /profiles/lookup - handle: {}", request.handle);

    let record = state.aggregator.fetch_client_profile(&request.handle).await?;

    state.history.put(&record).await;

    if let Some(storage) = &state.storage {
        if let Err(e) = storage.upsert_report(&record).await {
            tracing::error!("Failed to archive report for {}: {}", record.id, e);
        }
    }

    Ok(Json(record))
}

/// GET /api/v1/profiles/history
pub async fn list_history(State(state): State<Arc<AppState>>) -> Json<Vec<ProfileRecord>> {
    Json(state.history.get_all().await)
}

/// GET /api/v1/profiles/history/:id
pub async fn get_history_entry(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ProfileRecord>, AppError> {
    let key = normalize_handle(&id)?;
    state
        .history
        .get(&key)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("No history entry for {}", key)))
}

/// DELETE /api/v1/profiles/history/:id
pub async fn delete_history_entry(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let key = normalize_handle(&id)?;
    if state.history.remove(&key).await {
        tracing::info!("History entry {} removed", key);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("No history entry for {}", key)))
    }
}

/// GET /api/v1/profiles/history/:id/report
///
/// Plain-text rendering of a stored profile.
pub async fn history_report(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let key = normalize_handle(&id)?;
    let record = state
        .history
        .get(&key)
        .await
        .ok_or_else(|| AppError::NotFound(format!("No history entry for {}", key)))?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        format_profile_report(&record),
    ))
}

/// GET /api/v1/instagram?username=
///
/// Thin proxy over the scrape source. Unlike the aggregator it reports each
/// failure kind with its own status (404, 429, 502, 504).
pub async fn instagram_profile(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UsernameQuery>,
) -> Result<impl IntoResponse, AppError> {
    let username = params
        .username
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Valid username is required".to_string()))?;
    let username = normalize_handle(&username)
        .map_err(|_| AppError::BadRequest("Invalid username format".to_string()))?;

    let profile = state.instagram.fetch_profile(&username).await?;

    Ok((
        [(
            header::CACHE_CONTROL,
            "public, s-maxage=300, stale-while-revalidate=600",
        )],
        Json(profile),
    ))
}

/// GET /api/v1/archive?limit=
pub async fn list_archive(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ArchiveQuery>,
) -> Result<Json<Vec<ProfileRecord>>, AppError> {
    let storage = archive(&state)?;
    let reports = storage
        .list_reports(params.limit.unwrap_or(DEFAULT_ARCHIVE_PAGE))
        .await?;
    Ok(Json(reports))
}

/// GET /api/v1/archive/:id
pub async fn get_archived_report(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ProfileRecord>, AppError> {
    let storage = archive(&state)?;
    let key = normalize_handle(&id)?;
    storage
        .get_report(&key)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("No archived report for {}", key)))
}

/// DELETE /api/v1/archive/:id
pub async fn delete_archived_report(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let storage = archive(&state)?;
    let key = normalize_handle(&id)?;
    if storage.delete_report(&key).await? {
        tracing::info!("Archived report {} removed", key);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("No archived report for {}", key)))
    }
}

fn archive(state: &AppState) -> Result<&ReportStorage, AppError> {
    state
        .storage
        .as_ref()
        .ok_or_else(|| AppError::Unavailable("Report archive is not configured".to_string()))
}
