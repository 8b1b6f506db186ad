//! Gallery page rendering.
//!
//! Pure presentation: takes the catalog entries and a public base URL and
//! produces HTML. It never touches the filesystem.

use crate::catalog::CatalogEntry;
use minijinja::{Environment, context};
use serde::Serialize;
use std::path::Path;

const TEMPLATE_NAME: &str = "gallery.html";
const TEMPLATE: &str = include_str!("../templates/gallery.html");

/// Everything the gallery template shows.
#[derive(Debug)]
pub struct GalleryPage<'a> {
    pub image_dir: &'a Path,
    /// Scheme and host without a trailing slash, e.g. `http://images.example.com`.
    pub base_url: &'a str,
    pub entries: &'a [CatalogEntry],
    /// Set when the catalog could not be read; the page shows an error state
    /// instead of the list.
    pub error: Option<&'a str>,
}

#[derive(Serialize)]
struct EntryView<'a> {
    name: &'a str,
    href: String,
    url: String,
}

/// Holds the parsed template; build once and share.
pub struct GalleryRenderer {
    env: Environment<'static>,
}

impl GalleryRenderer {
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        // `.html` names get HTML auto-escaping.
        env.add_template(TEMPLATE_NAME, TEMPLATE)?;
        Ok(Self { env })
    }

    pub fn render(&self, page: &GalleryPage<'_>) -> Result<String, minijinja::Error> {
        let template = self.env.get_template(TEMPLATE_NAME)?;

        let entries: Vec<EntryView<'_>> = page
            .entries
            .iter()
            .map(|entry| {
                let href = entry.url_path();
                let url = format!("{}/{}", page.base_url, href);
                EntryView {
                    name: entry.as_str(),
                    href,
                    url,
                }
            })
            .collect();
        let count = entries.len();

        template.render(context! {
            image_dir => page.image_dir.display().to_string(),
            base_url => page.base_url,
            entries => entries,
            count => count,
            error => page.error,
        })
    }
}
