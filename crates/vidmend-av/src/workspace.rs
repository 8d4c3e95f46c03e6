//! Output directory and intermediate file management for one job.

use crate::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// A file written while a job runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub path: PathBuf,
    /// Remove the file once the job finishes, whatever the outcome.
    pub delete_on_completion: bool,
}

impl Artifact {
    /// An intermediate file removed at the end of the job.
    pub fn temporary(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            delete_on_completion: true,
        }
    }

    /// A file that outlives the job.
    pub fn kept(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            delete_on_completion: false,
        }
    }
}

/// Output directory of a job together with the artifacts it registered.
///
/// Dropping a workspace leaves files in place: the owner calls
/// [`Workspace::cleanup`] on every exit path.
///
/// # Example
///
/// ```no_run
/// use vidmend_av::{Artifact, Workspace};
///
/// let mut workspace = Workspace::create("/videos/out")?;
/// workspace.register(Artifact::temporary(workspace.file("clip_track1.wav")));
/// // ... run the job ...
/// workspace.cleanup();
/// # Ok::<(), vidmend_av::Error>(())
/// ```
#[derive(Debug)]
pub struct Workspace {
    output_dir: PathBuf,
    artifacts: Vec<Artifact>,
}

impl Workspace {
    /// Create the output directory (and parents) if needed.
    pub fn create(output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        std::fs::create_dir_all(&output_dir)?;
        Ok(Self {
            output_dir,
            artifacts: Vec::new(),
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Path of a file inside the output directory.
    pub fn file(&self, name: &str) -> PathBuf {
        self.output_dir.join(name)
    }

    pub fn register(&mut self, artifact: Artifact) {
        self.artifacts.push(artifact);
    }

    pub fn register_all(&mut self, artifacts: impl IntoIterator<Item = Artifact>) {
        self.artifacts.extend(artifacts);
    }

    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }

    /// Delete every registered temporary artifact and forget all entries.
    ///
    /// Files that were never created are skipped silently; other removal
    /// failures are logged. Returns the number of files removed.
    pub fn cleanup(&mut self) -> usize {
        let mut removed = 0;
        for artifact in self.artifacts.drain(..) {
            if !artifact.delete_on_completion {
                continue;
            }
            match std::fs::remove_file(&artifact.path) {
                Ok(()) => {
                    tracing::debug!("Removed {}", artifact.path.display());
                    removed += 1;
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!("Failed to remove {}: {}", artifact.path.display(), e);
                }
            }
        }
        removed
    }
}
