//! HTTP front end for the image server.
//!
//! `GET /` renders the gallery, `GET /{path}` streams one image, and
//! `GET /health` answers liveness probes.

mod base_url;
mod images;
mod index;
mod server;
mod state;

pub use server::{build_router, start_http_server};
pub use state::ApiState;
