use crate::cache::{LinkHealthCache, RefreshTrigger};
use crate::error::Result;
use crate::metrics::snapshot::MetricsSnapshot;
use crate::probe::LinkCheckResult;
use crate::stats::LinkHealthStats;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

const REFRESH_STARTED: &str = "Link check started in the background. Refresh in a few minutes.";
const REFRESH_RUNNING: &str = "A link check is already running in the background.";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsResponse {
    pub success: bool,
    pub results: Vec<LinkCheckResult>,
    pub stats: Option<LinkHealthStats>,
    pub is_cached: bool,
    pub last_checked: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckResponse {
    pub success: bool,
    pub message: String,
}

fn trigger_message(trigger: RefreshTrigger) -> &'static str {
    match trigger {
        RefreshTrigger::Started => REFRESH_STARTED,
        RefreshTrigger::AlreadyRunning => REFRESH_RUNNING,
    }
}

pub async fn get_results(State(cache): State<LinkHealthCache>) -> Json<ResultsResponse> {
    let read = cache.get_results();
    Json(ResultsResponse {
        success: true,
        results: read.entry.results.clone(),
        stats: read.entry.stats.clone(),
        is_cached: read.is_cached,
        last_checked: read.entry.last_checked,
        message: read.refresh.map(|t| trigger_message(t).to_string()),
    })
}

pub async fn request_check(State(cache): State<LinkHealthCache>) -> Json<CheckResponse> {
    let trigger = cache.request_check();
    Json(CheckResponse {
        success: true,
        message: trigger_message(trigger).to_string(),
    })
}

pub async fn get_metrics(State(cache): State<LinkHealthCache>) -> Json<MetricsSnapshot> {
    Json(cache.scheduler().get_metrics())
}

pub fn create_router(cache: LinkHealthCache) -> Router {
    Router::new()
        .route("/api/link-health/results", get(get_results))
        .route("/api/link-health/check", post(request_check))
        .route("/api/link-health/metrics", get(get_metrics))
        .with_state(cache)
}

/// Serves the API until Ctrl-C.
pub async fn serve(listener: TcpListener, cache: LinkHealthCache) -> Result<()> {
    log::info!("Link health API listening on http://{}", listener.local_addr()?);
    axum::serve(listener, create_router(cache))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            log::info!("Shutting down...");
        })
        .await?;
    Ok(())
}
