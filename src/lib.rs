//! DogHub image server.
//!
//! Serves the images under one directory over HTTP and renders a gallery of
//! copyable public links. [`catalog`] lists what can be served and
//! [`resolver`] decides whether a client path may be served; [`api`] wires
//! both to axum.

pub mod api;
pub mod catalog;
pub mod config;
pub mod gallery;
pub mod network;
pub mod resolver;

pub use catalog::{CatalogEntry, ScanError, scan};
pub use config::{Config, ConfigError, ConfigOverrides, ExtensionSet};
pub use resolver::{Rejection, ResolvedPath, resolve};
