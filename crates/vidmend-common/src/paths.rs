//! Path utilities: video extension checks and temp artifact naming.
//!
//! Temp artifacts are named after the input file's stem so that concurrent
//! jobs working on different inputs never share a file name.

use std::path::{Path, PathBuf};

/// List of recognised video file extensions.
const VIDEO_EXTENSIONS: &[&str] = &[
    "mkv", "mp4", "avi", "m4v", "ts", "webm", "mov", "wmv", "flv", "mts", "m2ts",
];

/// Check if a path has a video file extension.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use vidmend_common::paths::is_video_file;
///
/// assert!(is_video_file(Path::new("capture.MKV")));
/// assert!(!is_video_file(Path::new("notes.txt")));
/// ```
pub fn is_video_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Location of an extracted audio track: `{dir}/{stem}_track{N}.wav`.
///
/// ```
/// use std::path::{Path, PathBuf};
/// use vidmend_common::paths::extracted_track_path;
///
/// assert_eq!(
///     extracted_track_path(Path::new("/out"), "clip", 1),
///     PathBuf::from("/out/clip_track1.wav")
/// );
/// ```
pub fn extracted_track_path(dir: &Path, stem: &str, track: usize) -> PathBuf {
    dir.join(format!("{stem}_track{track}.wav"))
}

/// Prefix for encoder two-pass statistics files: `{dir}/{stem}_2pass`.
pub fn two_pass_log_prefix(dir: &Path, stem: &str) -> PathBuf {
    dir.join(format!("{stem}_2pass"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_extensions_case_insensitive() {
        assert!(is_video_file(Path::new("/a/b.Mp4")));
        assert!(is_video_file(Path::new("rec.m2ts")));
        assert!(!is_video_file(Path::new("noise.wav")));
        assert!(!is_video_file(Path::new("no_extension")));
    }

    #[test]
    fn test_two_pass_prefix() {
        assert_eq!(
            two_pass_log_prefix(Path::new("out"), "game"),
            PathBuf::from("out/game_2pass")
        );
    }
}
