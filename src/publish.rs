//! Artifact resolution for the HLS serving path.
//!
//! [`resolve`] is the only gate between a request path and the filesystem:
//! any path containing `..` is refused before it is joined onto the storage
//! root. There is no allow-list of namespaces; any existing directory is
//! servable, including one that is still being populated.

use hlsforge_common::paths::{is_manifest_file, is_segment_file};
use hlsforge_common::{Error, Result};
use std::path::{Path, PathBuf};

/// Segments are write-once, so they may be cached forever.
pub const SEGMENT_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

/// What kind of HLS artifact a path names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Segment,
    Manifest,
    Other,
}

impl ArtifactKind {
    pub fn of(path: &Path) -> Self {
        if is_segment_file(path) {
            Self::Segment
        } else if is_manifest_file(path) {
            Self::Manifest
        } else {
            Self::Other
        }
    }

    /// `Cache-Control` value for this kind, if any.
    pub fn cache_control(&self, manifest_max_age_secs: u64) -> Option<String> {
        match self {
            Self::Segment => Some(SEGMENT_CACHE_CONTROL.to_string()),
            Self::Manifest => Some(format!("public, max-age={manifest_max_age_secs}")),
            Self::Other => None,
        }
    }

    /// Content type to serve this kind with; `None` defers to the file server.
    pub fn content_type(&self) -> Option<&'static str> {
        match self {
            Self::Segment => Some("video/mp2t"),
            Self::Manifest => Some("application/vnd.apple.mpegurl"),
            Self::Other => None,
        }
    }
}

/// A request path resolved to a file under the storage root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub kind: ArtifactKind,
}

/// Resolve `request_path` (relative to the HLS mount, e.g.
/// `"<namespace>/index.m3u8"`) against `root`.
///
/// Does not check that the file exists; the file server reports that.
///
/// # Errors
///
/// Returns [`Error::Validation`] for paths that contain `..`, are empty, are
/// absolute, or contain backslashes or NUL bytes.
pub fn resolve(root: &Path, request_path: &str) -> Result<Artifact> {
    if request_path.contains("..") {
        return Err(Error::validation("invalid path"));
    }
    if request_path.contains('\\') || request_path.contains('\0') {
        return Err(Error::validation("invalid path"));
    }

    let relative = request_path.trim_start_matches('/');
    if relative.is_empty() {
        return Err(Error::validation("empty path"));
    }

    let relative = Path::new(relative);
    if relative.is_absolute() {
        return Err(Error::validation("invalid path"));
    }

    Ok(Artifact {
        path: root.join(relative),
        kind: ArtifactKind::of(relative),
    })
}
