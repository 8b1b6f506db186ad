//! The gallery page.

use super::base_url::public_base_url;
use super::state::ApiState;
use crate::catalog::scan;
use crate::gallery::GalleryPage;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use std::sync::Arc;

/// GET /
///
/// Lists every servable image with its public URL. If the image directory
/// cannot be read the page is still rendered, in an error state, with a 500.
pub(super) async fn gallery_page(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
) -> Response {
    let base_url = public_base_url(&headers);

    let config = state.config.clone();
    let scanned =
        tokio::task::spawn_blocking(move || scan(&config.base_dir, &config.extensions)).await;

    let (status, entries, error) = match scanned {
        Ok(Ok(entries)) => (StatusCode::OK, entries, None),
        Ok(Err(error)) => {
            tracing::error!(%error, "failed to scan image directory");
            (StatusCode::INTERNAL_SERVER_ERROR, Vec::new(), Some(error.to_string()))
        }
        Err(error) => {
            tracing::error!(%error, "catalog scan task failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Vec::new(),
                Some("the catalog scan was interrupted".to_string()),
            )
        }
    };

    let page = GalleryPage {
        image_dir: &state.config.base_dir,
        base_url: &base_url,
        entries: &entries,
        error: error.as_deref(),
    };

    match state.gallery.render(&page) {
        Ok(html) => (status, Html(html)).into_response(),
        Err(error) => {
            tracing::error!(%error, "failed to render gallery page");
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to render gallery").into_response()
        }
    }
}
