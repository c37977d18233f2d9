// Upload collector - Turns user-picked paths into media sources

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::domain::errors::*;
use crate::domain::model::*;

/// Collects video files from files and directories
///
/// Directories are walked recursively in sorted order. Anything without a
/// video content type is skipped. In single mode only the first video is kept.
pub struct UploadCollector {
    multiple: bool,
}

impl UploadCollector {
    /// Collector for a single trim source
    pub fn single() -> Self {
        Self { multiple: false }
    }

    /// Collector for merge clips
    pub fn multiple() -> Self {
        Self { multiple: true }
    }

    pub async fn collect(&self, paths: &[PathBuf]) -> Result<Vec<MediaSource>, DomainError> {
        let roots = paths.to_vec();
        let candidates = tokio::task::spawn_blocking(move || expand(&roots))
            .await
            .map_err(|e| DomainError::FsFail(format!("scan task failed: {}", e)))??;

        let mut sources = Vec::new();
        for path in candidates {
            if video_content_type(&path).is_none() {
                debug!(path = %path.display(), "Skipping non-video file");
                continue;
            }
            sources.push(MediaSource::open(&path).await?);
            if !self.multiple {
                break;
            }
        }
        Ok(sources)
    }
}

fn expand(paths: &[PathBuf]) -> Result<Vec<PathBuf>, DomainError> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            files.extend(walk(path));
        } else if path.is_file() {
            files.push(path.clone());
        } else {
            return Err(DomainError::BadArgs(format!(
                "Input does not exist: {}",
                path.display()
            )));
        }
    }
    Ok(files)
}

fn walk(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!(error = %e, "Skipping unreadable entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect()
}
