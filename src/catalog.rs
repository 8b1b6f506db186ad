//! Image catalog discovery.
//!
//! Walks the image directory on every call and returns the servable files as
//! sorted, slash-separated paths relative to the directory root. Nothing is
//! cached between calls.

use crate::config::ExtensionSet;
use ignore::WalkBuilder;
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// The image directory could not be listed at all.
#[derive(Debug, thiserror::Error)]
#[error("failed to scan image directory {}: {source}", .path.display())]
pub struct ScanError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// One servable file, as a `/`-separated path relative to the image
/// directory. Usable verbatim (after percent-encoding) as a URL path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CatalogEntry(String);

impl CatalogEntry {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The entry with every segment percent-encoded, ready to append to a
    /// base URL after a `/`.
    pub fn url_path(&self) -> String {
        self.0
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }
}

impl fmt::Display for CatalogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// List every regular file under `base_dir` whose extension is in
/// `extensions`, sorted ascending.
///
/// Symlinked directories are not descended into. A symlinked file is listed
/// only when its target is a regular file inside `base_dir` with an allowed
/// extension, and names containing `\` are skipped, so every entry also
/// resolves through [`crate::resolver::resolve`].
pub fn scan(base_dir: &Path, extensions: &ExtensionSet) -> Result<Vec<CatalogEntry>, ScanError> {
    let scan_error = |source| ScanError {
        path: base_dir.to_path_buf(),
        source,
    };

    // The walker reports an unreadable root as an ordinary entry error, so
    // check it up front.
    let root = base_dir.canonicalize().map_err(scan_error)?;
    std::fs::read_dir(&root).map_err(scan_error)?;

    let walker = WalkBuilder::new(&root)
        .standard_filters(false)
        .follow_links(false)
        .build();

    let mut entries = Vec::new();
    for result in walker {
        let entry = match result {
            Ok(entry) => entry,
            Err(error) => {
                tracing::warn!(%error, "skipping unreadable entry in image directory");
                continue;
            }
        };

        let Some(file_type) = entry.file_type() else {
            continue;
        };
        let path = entry.path();

        let servable = if file_type.is_file() {
            true
        } else if file_type.is_symlink() {
            symlink_target_servable(path, &root, extensions)
        } else {
            false
        };
        if !servable || !extensions.matches(path) {
            continue;
        }

        match relative_entry(&root, path) {
            Some(relative) => entries.push(relative),
            None => {
                tracing::debug!(
                    path = %path.display(),
                    "skipping file with a name not usable in URLs"
                );
            }
        }
    }

    entries.sort();
    tracing::debug!(
        base_dir = %root.display(),
        count = entries.len(),
        "scanned image catalog"
    );
    Ok(entries)
}

fn symlink_target_servable(link: &Path, root: &Path, extensions: &ExtensionSet) -> bool {
    match link.canonicalize() {
        Ok(target) => {
            target.starts_with(root) && target.is_file() && extensions.matches(&target)
        }
        Err(error) => {
            tracing::debug!(path = %link.display(), %error, "skipping dangling symlink");
            false
        }
    }
}

fn relative_entry(root: &Path, path: &Path) -> Option<CatalogEntry> {
    let relative = path.strip_prefix(root).ok()?;
    let mut segments = Vec::new();
    for component in relative.components() {
        match component {
            // `\` is a separator for the resolver, so such names cannot be served.
            Component::Normal(segment) => {
                let segment = segment.to_str()?;
                if segment.contains('\\') {
                    return None;
                }
                segments.push(segment);
            }
            _ => return None,
        }
    }
    if segments.is_empty() {
        return None;
    }
    Some(CatalogEntry(segments.join("/")))
}
