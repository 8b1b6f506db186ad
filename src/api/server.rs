//! HTTP server setup: router and listener.

use super::images::serve_image;
use super::index::gallery_page;
use super::state::ApiState;
use crate::config::Config;
use crate::network::log_startup_banner;

use axum::Json;
use axum::Router;
use axum::http::Method;
use axum::routing::get;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Build the application router over shared state.
///
/// Images are embedded on other sites, so cross-origin reads are allowed.
pub fn build_router(state: Arc<ApiState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::HEAD])
        .allow_headers(Any);

    Router::new()
        .route("/", get(gallery_page))
        .route("/health", get(health))
        .route("/{*path}", get(serve_image))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server on `config.bind`.
///
/// Returns a handle that resolves when the server shuts down. The caller
/// passes a `tokio::sync::watch::Receiver<bool>` for graceful shutdown.
pub async fn start_http_server(
    config: Config,
    shutdown_rx: tokio::sync::watch::Receiver<bool>,
) -> anyhow::Result<tokio::task::JoinHandle<()>> {
    let bind = config.bind;
    let image_dir = config.base_dir.clone();
    let state = Arc::new(ApiState::new(config)?);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    let bound = listener.local_addr()?;
    tracing::info!(%bound, "HTTP server listening");
    log_startup_banner(bound, &image_dir);

    let handle = tokio::spawn(async move {
        let mut shutdown = shutdown_rx;
        if let Err(error) = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.wait_for(|v| *v).await;
            })
            .await
        {
            tracing::error!(%error, "HTTP server exited with error");
        }
    });

    Ok(handle)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
