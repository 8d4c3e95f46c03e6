//! External tool detection.
//!
//! vidmend drives two binaries: `ffprobe` for metadata and `ffmpeg` for
//! extraction and encoding. [`ToolPaths`] resolves where they live.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Information about an external tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    /// Name of the tool.
    pub name: String,
    /// Whether the tool is available.
    pub available: bool,
    /// Version string if available.
    pub version: Option<String>,
    /// Path to the tool executable.
    pub path: Option<PathBuf>,
}

/// Check if a tool is available using a custom version argument.
///
/// # Example
///
/// ```no_run
/// use vidmend_av::tools::check_tool_with_arg;
///
/// let info = check_tool_with_arg("ffmpeg", "-version");
/// if info.available {
///     println!("ffmpeg version: {:?}", info.version);
/// }
/// ```
pub fn check_tool_with_arg(name: &str, version_arg: &str) -> ToolInfo {
    let result = Command::new(name).arg(version_arg).output();

    match result {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .map(|s| s.to_string());

            ToolInfo {
                name: name.to_string(),
                available: true,
                version,
                path: which::which(name).ok(),
            }
        }
        _ => ToolInfo {
            name: name.to_string(),
            available: false,
            version: None,
            path: None,
        },
    }
}

/// Check ffmpeg and ffprobe.
pub fn check_tools(paths: &ToolPaths) -> Vec<ToolInfo> {
    [("ffmpeg", &paths.ffmpeg), ("ffprobe", &paths.ffprobe)]
        .into_iter()
        .map(|(name, path)| {
            let mut info = check_tool_with_arg(&path.to_string_lossy(), "-version");
            info.name = name.to_string();
            info
        })
        .collect()
}

/// Require that a tool is available on `PATH`, returning its path.
///
/// # Errors
///
/// Returns an error if the tool is not found.
pub fn require_tool(name: &str) -> Result<PathBuf> {
    which::which(name).map_err(|_| Error::tool_not_found(name))
}

/// Get the path to a tool, preferring a configured path over PATH lookup.
pub fn get_tool_path(name: &str, config_path: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = config_path {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        tracing::warn!("configured {name} path {:?} does not exist, searching PATH", path);
    }

    require_tool(name)
}

/// Resolved locations of the binaries vidmend runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl ToolPaths {
    /// Resolve both tools, falling back to the bare program name when lookup
    /// fails so the spawn error surfaces at the first job that needs it.
    pub fn discover(ffmpeg: Option<&Path>, ffprobe: Option<&Path>) -> Self {
        let resolve = |name: &str, configured: Option<&Path>| {
            get_tool_path(name, configured).unwrap_or_else(|e| {
                tracing::debug!("{e}; relying on PATH at spawn time");
                PathBuf::from(name)
            })
        };

        Self {
            ffmpeg: resolve("ffmpeg", ffmpeg),
            ffprobe: resolve("ffprobe", ffprobe),
        }
    }
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}
