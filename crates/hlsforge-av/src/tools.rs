//! External tool detection.

use crate::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Name of the transcoding engine binary.
pub const FFMPEG: &str = "ffmpeg";

/// Information about an external tool.
#[derive(Debug, Clone)]
pub struct ToolInfo {
    /// Name of the tool.
    pub name: String,
    /// Whether the tool is available.
    pub available: bool,
    /// First line of the tool's version output, if available.
    pub version: Option<String>,
    /// Path to the tool executable.
    pub path: Option<PathBuf>,
}

/// Check whether ffmpeg can be run, preferring a configured path over `PATH`.
///
/// # Example
///
/// ```no_run
/// use hlsforge_av::check_ffmpeg;
///
/// let info = check_ffmpeg(None);
/// if info.available {
///     println!("ffmpeg version: {:?}", info.version);
/// }
/// ```
pub fn check_ffmpeg(configured: Option<&Path>) -> ToolInfo {
    match get_tool_path(FFMPEG, configured) {
        Ok(path) => check_tool_at(FFMPEG, &path, "-version"),
        Err(_) => ToolInfo {
            name: FFMPEG.to_string(),
            available: false,
            version: None,
            path: None,
        },
    }
}

/// Run `<path> <version_arg>` and report whether it succeeded.
pub fn check_tool_at(name: &str, path: &Path, version_arg: &str) -> ToolInfo {
    match Command::new(path).arg(version_arg).output() {
        Ok(output) if output.status.success() => ToolInfo {
            name: name.to_string(),
            available: true,
            version: String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .map(|s| s.to_string()),
            path: Some(path.to_path_buf()),
        },
        _ => ToolInfo {
            name: name.to_string(),
            available: false,
            version: None,
            path: None,
        },
    }
}

/// Require that a tool is on `PATH`, returning its location.
///
/// # Errors
///
/// Returns an error if the tool is not found.
pub fn require_tool(name: &str) -> Result<PathBuf> {
    which::which(name).map_err(|_| Error::tool_not_found(name))
}

/// Get the path to a tool, preferring a configured path over PATH lookup.
///
/// A configured path that does not exist is reported rather than silently
/// replaced, since it almost always means a typo in the config file.
pub fn get_tool_path(name: &str, configured: Option<&Path>) -> Result<PathBuf> {
    match configured {
        Some(path) if path.exists() => Ok(path.to_path_buf()),
        Some(path) => Err(Error::file_not_found(path)),
        None => require_tool(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_tool_not_found() {
        let err = require_tool("nonexistent_tool_12345").unwrap_err();
        assert!(matches!(err, Error::ToolNotFound { .. }));
    }

    #[test]
    fn test_configured_path_missing() {
        let err = get_tool_path(FFMPEG, Some(Path::new("/nonexistent/ffmpeg"))).unwrap_err();
        assert!(matches!(err, Error::FileNotFound { .. }));
    }

    #[test]
    fn test_configured_path_exists() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = get_tool_path(FFMPEG, Some(file.path())).unwrap();
        assert_eq!(path, file.path());
    }

    #[test]
    fn test_check_missing_configured_ffmpeg() {
        let info = check_ffmpeg(Some(Path::new("/nonexistent/ffmpeg")));
        assert!(!info.available);
        assert!(info.version.is_none());
        assert!(info.path.is_none());
    }
}
