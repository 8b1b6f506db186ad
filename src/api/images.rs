//! Serves individual images from the image directory.
//!
//! GET /{path}
//!   - 200 with the file streamed, long-lived `Cache-Control`, and a
//!     `Content-Type` guessed from the extension.
//!   - 403 for traversal attempts and file types that are not served.
//!   - 404 when nothing servable exists at the path.

use super::state::ApiState;
use crate::resolver::{Rejection, resolve};

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use tokio_util::io::ReaderStream;

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        match self {
            Rejection::Forbidden => (StatusCode::FORBIDDEN, "forbidden").into_response(),
            Rejection::NotFound => (StatusCode::NOT_FOUND, "not found").into_response(),
        }
    }
}

pub(super) async fn serve_image(
    State(state): State<Arc<ApiState>>,
    Path(requested): Path<String>,
) -> Response {
    let config = state.config.clone();
    let lookup = requested.clone();
    let resolved = match tokio::task::spawn_blocking(move || {
        resolve(&config.base_dir, &config.extensions, &lookup)
    })
    .await
    {
        Ok(resolved) => resolved,
        Err(error) => {
            tracing::error!(%error, "image resolution task failed");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let resolved = match resolved {
        Ok(resolved) => resolved,
        Err(rejection) => {
            tracing::debug!(path = %requested, %rejection, "image request rejected");
            return rejection.into_response();
        }
    };

    // The file handle moves into the body stream and closes when the stream
    // finishes or the client goes away.
    let file = match tokio::fs::File::open(resolved.as_path()).await {
        Ok(file) => file,
        Err(error) => {
            tracing::warn!(
                path = %resolved.as_path().display(),
                %error,
                "failed to open resolved image"
            );
            return Rejection::NotFound.into_response();
        }
    };
    let length = file.metadata().await.ok().map(|metadata| metadata.len());
    let mime = mime_guess::from_path(resolved.as_path()).first_or_octet_stream();

    let mut response = Response::new(Body::from_stream(ReaderStream::new(file)));
    let headers = response.headers_mut();
    if let Ok(content_type) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(header::CONTENT_TYPE, content_type);
    }
    if let Some(length) = length {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    }
    headers.insert(header::CACHE_CONTROL, state.cache_control.clone());

    response
}
