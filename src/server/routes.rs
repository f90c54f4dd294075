use std::sync::Arc;

use crate::config::settings::{MetricsConfig, SettingsConfig};
use crate::observability::metrics::get_metrics;
use crate::renewal::manager::RenewalManager;
use crate::status::project;

use anyhow::Result;
use axum::routing::get;
use axum::{extract::State, response::IntoResponse, Json, Router};
use http::{header::CONTENT_TYPE, StatusCode};
use prometheus::{Encoder, Registry, TextEncoder};

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub manager: Arc<RenewalManager>,
}

/// Start one Axum server exposing the health snapshot and, when enabled,
/// the prometheus scrape path.
pub async fn start(settings: &SettingsConfig, manager: Arc<RenewalManager>) -> Result<()> {
    let metrics = get_metrics().await;
    let state = AppState {
        registry: Arc::new(metrics.registry.clone()),
        manager,
    };

    let app = Router::new()
        .route("/status", get(get_status))
        .route("/status/view", get(get_status_view))
        .merge(metrics_router(&settings.metrics))
        .with_state(state);

    let bind_addr = &settings.server.host;
    let port = &settings.server.port;
    let listener = tokio::net::TcpListener::bind(format!("{}:{}", bind_addr, port)).await?;
    tracing::info!("status server listening on {}:{}", bind_addr, port);
    metrics.up.set(1);
    axum::serve(listener, app).await?;
    Ok(())
}

fn metrics_router(metrics_config: &MetricsConfig) -> Router<AppState> {
    let mut router = Router::new();
    if metrics_config.is_enabled {
        router = router.route(metrics_config.path.as_str(), get(get_metrics_text));
    }
    router
}

/// Full health snapshot surface.
async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.manager.snapshot().await)
}

/// Compact display projection of the same snapshot.
async fn get_status_view(State(state): State<AppState>) -> impl IntoResponse {
    Json(project(&state.manager.snapshot().await))
}

async fn get_metrics_text(State(state): State<AppState>) -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = state.registry.gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [(CONTENT_TYPE, "text/plain; version=0.0.4")],
            String::from_utf8_lossy(&buffer).into_owned(),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(CONTENT_TYPE, "text/plain; version=0.0.4")],
            format!("metrics encoding failed: {e}"),
        ),
    }
}
