//! Resolution of client-supplied image paths.
//!
//! Security model, checked in order and short-circuiting:
//!   1. The request must be a relative path with no `..` segment. Both `/`
//!      and `\` count as separators.
//!   2. Joined onto the image directory, it must canonicalise (resolving
//!      symlinks) to an existing regular file still under that directory.
//!   3. The canonical path's extension must be in the allowlist.
//!
//! Step 2 is what catches symlinks pointing out of the tree; step 1 alone
//! cannot. The extension check runs on the canonical path so a link named
//! `cute.png` cannot expose a non-image target.

use crate::config::ExtensionSet;
use std::path::{Component, Path, PathBuf};

/// Why a request was not resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    /// Traversal or absolute-path attempt, a target outside the image
    /// directory, or a file type that is not served.
    #[error("forbidden")]
    Forbidden,
    /// Nothing servable exists at the requested path.
    #[error("not found")]
    NotFound,
}

/// A canonical path to a regular file inside the image directory.
///
/// Only [`resolve`] constructs these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath(PathBuf);

impl ResolvedPath {
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    pub fn into_path_buf(self) -> PathBuf {
        self.0
    }
}

impl AsRef<Path> for ResolvedPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

/// Resolve `requested` against `base_dir`.
///
/// Reads filesystem metadata only. The file may change between this check
/// and the caller opening it.
pub fn resolve(
    base_dir: &Path,
    extensions: &ExtensionSet,
    requested: &str,
) -> Result<ResolvedPath, Rejection> {
    let relative = parse_request(requested)?;

    let root = base_dir.canonicalize().map_err(|error| {
        tracing::error!(
            base_dir = %base_dir.display(),
            %error,
            "image directory is not accessible"
        );
        Rejection::NotFound
    })?;

    let canonical = root
        .join(&relative)
        .canonicalize()
        .map_err(|_| Rejection::NotFound)?;
    if !canonical.starts_with(&root) {
        tracing::warn!(requested, "request resolved outside the image directory");
        return Err(Rejection::Forbidden);
    }

    let metadata = std::fs::metadata(&canonical).map_err(|_| Rejection::NotFound)?;
    if !metadata.is_file() {
        return Err(Rejection::NotFound);
    }

    if !extensions.matches(&canonical) {
        return Err(Rejection::Forbidden);
    }

    Ok(ResolvedPath(canonical))
}

/// Split the request into segments and rebuild it as a relative path.
///
/// Empty and `.` segments are dropped. Anything that could climb or anchor
/// the path is refused.
fn parse_request(requested: &str) -> Result<PathBuf, Rejection> {
    if requested.is_empty() || requested.contains('\0') {
        return Err(Rejection::Forbidden);
    }
    if requested.starts_with(['/', '\\']) {
        return Err(Rejection::Forbidden);
    }

    let mut relative = PathBuf::new();
    for segment in requested.split(['/', '\\']) {
        match segment {
            // `a.jpg/` and `sub//a.jpg` name the same file as `a.jpg` and
            // `sub/a.jpg`.
            "" | "." => continue,
            ".." => return Err(Rejection::Forbidden),
            segment => relative.push(segment),
        }
    }

    // Drive letters and UNC prefixes only show up as components on Windows.
    let only_normal = relative
        .components()
        .all(|component| matches!(component, Component::Normal(_)));
    if relative.as_os_str().is_empty() || !only_normal {
        return Err(Rejection::Forbidden);
    }

    Ok(relative)
}
