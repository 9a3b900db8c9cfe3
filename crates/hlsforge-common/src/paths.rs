//! Storage layout and file-type helpers.
//!
//! Every upload lives in `<root>/<namespace>/`:
//!
//! ```text
//! <root>/<namespace>/
//! ├── upload.<ext>       # transient, removed after the transcode
//! ├── index.m3u8         # VOD playlist
//! ├── segment_000.ts     # MPEG-TS segments, write-once
//! ├── segment_001.ts
//! └── .complete          # written after the engine exits successfully
//! ```

use std::path::{Path, PathBuf};

use crate::Namespace;

/// Upload extensions accepted by intake.
const UPLOAD_EXTENSIONS: &[&str] = &["mp4", "mov", "mkv", "webm"];

/// File stem of the transient upload artifact.
pub const UPLOAD_STEM: &str = "upload";

/// Fixed manifest filename.
pub const MANIFEST_NAME: &str = "index.m3u8";

/// Segment filename pattern handed to the engine.
pub const SEGMENT_PATTERN: &str = "segment_%03d.ts";

/// Marker file signalling a fully transcoded namespace.
pub const COMPLETE_MARKER: &str = ".complete";

/// Return the normalized (lowercase) extension of `filename` if it is an
/// accepted upload type.
///
/// # Examples
///
/// ```
/// use hlsforge_common::paths::upload_extension;
///
/// assert_eq!(upload_extension("Holiday.MOV"), Some("mov"));
/// assert_eq!(upload_extension("clip.webm"), Some("webm"));
/// assert_eq!(upload_extension("notes.txt"), None);
/// assert_eq!(upload_extension("no_extension"), None);
/// ```
pub fn upload_extension(filename: &str) -> Option<&'static str> {
    let ext = Path::new(filename).extension()?.to_str()?.to_ascii_lowercase();
    UPLOAD_EXTENSIONS.iter().copied().find(|allowed| *allowed == ext)
}

/// Get the list of accepted upload extensions.
pub fn upload_extensions() -> &'static [&'static str] {
    UPLOAD_EXTENSIONS
}

/// Directory holding all artifacts of `namespace`.
pub fn namespace_dir(root: &Path, namespace: &Namespace) -> PathBuf {
    root.join(namespace.as_str())
}

/// Path of the transient upload inside a namespace directory.
pub fn upload_path(dir: &Path, ext: &str) -> PathBuf {
    dir.join(format!("{UPLOAD_STEM}.{ext}"))
}

/// Path of the manifest inside a namespace directory.
pub fn manifest_path(dir: &Path) -> PathBuf {
    dir.join(MANIFEST_NAME)
}

/// Path of the segment with the given sequence number.
///
/// # Examples
///
/// ```
/// use hlsforge_common::paths::segment_path;
/// use std::path::Path;
///
/// let p = segment_path(Path::new("/data/abc"), 7);
/// assert_eq!(p, Path::new("/data/abc/segment_007.ts"));
/// ```
pub fn segment_path(dir: &Path, index: u32) -> PathBuf {
    dir.join(format!("segment_{index:03}.ts"))
}

/// Path of the completion marker inside a namespace directory.
pub fn marker_path(dir: &Path) -> PathBuf {
    dir.join(COMPLETE_MARKER)
}

/// Check if a path names an HLS segment.
pub fn is_segment_file(path: &Path) -> bool {
    has_extension(path, "ts")
}

/// Check if a path names an HLS manifest.
pub fn is_manifest_file(path: &Path) -> bool {
    has_extension(path, "m3u8")
}

fn has_extension(path: &Path, wanted: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(wanted))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_extension_case_insensitive() {
        assert_eq!(upload_extension("a.MP4"), Some("mp4"));
        assert_eq!(upload_extension("a.Mkv"), Some("mkv"));
        assert_eq!(upload_extension("dir/a.mov"), Some("mov"));
    }

    #[test]
    fn test_upload_extension_rejects() {
        assert_eq!(upload_extension("a.txt"), None);
        assert_eq!(upload_extension("a.mp4.exe"), None);
        assert_eq!(upload_extension(".mp4"), None);
        assert_eq!(upload_extension(""), None);
    }

    #[test]
    fn test_layout() {
        let ns = Namespace::parse("0123456789abcdef01234567").unwrap();
        let dir = namespace_dir(Path::new("/srv"), &ns);
        assert_eq!(dir, Path::new("/srv/0123456789abcdef01234567"));
        assert_eq!(upload_path(&dir, "mkv").file_name().unwrap(), "upload.mkv");
        assert_eq!(manifest_path(&dir).file_name().unwrap(), "index.m3u8");
        assert_eq!(marker_path(&dir).file_name().unwrap(), ".complete");
        assert_eq!(segment_path(&dir, 0).file_name().unwrap(), "segment_000.ts");
    }

    #[test]
    fn test_kind_detection() {
        assert!(is_segment_file(Path::new("segment_000.ts")));
        assert!(is_manifest_file(Path::new("index.m3u8")));
        assert!(!is_segment_file(Path::new("index.m3u8")));
        assert!(!is_manifest_file(Path::new("upload.mp4")));
    }
}
