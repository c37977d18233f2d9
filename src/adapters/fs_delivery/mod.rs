//! Delivery of finished artifacts into a local output directory

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tracing::info;

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::*;

/// Writes artifacts into `output_dir`, never overwriting an existing file
///
/// Bytes land in a temporary file beside the destination first and are
/// renamed into place once complete.
pub struct FsDeliveryAdapter {
    output_dir: PathBuf,
}

impl FsDeliveryAdapter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

#[async_trait]
impl DeliveryPort for FsDeliveryAdapter {
    async fn deliver(&self, artifact: &Artifact) -> Result<DeliveryReceipt, DomainError> {
        let dir = self.output_dir.clone();
        let name = sanitize_file_name(&artifact.suggested_name);
        let bytes = artifact.bytes.clone();

        let path = tokio::task::spawn_blocking(move || write_unique(&dir, &name, &bytes))
            .await
            .map_err(|e| DomainError::DeliveryError(format!("delivery task failed: {}", e)))??;

        info!(path = %path.display(), bytes = artifact.bytes.len(), "Artifact delivered");
        Ok(DeliveryReceipt {
            location: path.to_string_lossy().to_string(),
            bytes_written: artifact.bytes.len() as u64,
        })
    }
}

fn write_unique(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf, DomainError> {
    std::fs::create_dir_all(dir).map_err(|e| {
        DomainError::DeliveryError(format!("cannot create {}: {}", dir.display(), e))
    })?;

    let mut temp = NamedTempFile::new_in(dir)
        .map_err(|e| DomainError::DeliveryError(format!("cannot stage output: {}", e)))?;
    temp.write_all(bytes)
        .and_then(|_| temp.as_file().sync_all())
        .map_err(|e| DomainError::DeliveryError(format!("cannot write output: {}", e)))?;

    let mut attempt = 0;
    loop {
        let candidate = dir.join(numbered_name(name, attempt));
        match temp.persist_noclobber(&candidate) {
            Ok(_) => return Ok(candidate),
            Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists && attempt < 10_000 => {
                temp = e.file;
                attempt += 1;
            }
            Err(e) => {
                return Err(DomainError::DeliveryError(format!(
                    "cannot save {}: {}",
                    candidate.display(),
                    e.error
                )))
            }
        }
    }
}

/// `clip.mp4`, `clip-1.mp4`, `clip-2.mp4`, ...
fn numbered_name(name: &str, attempt: usize) -> String {
    if attempt == 0 {
        return name.to_string();
    }
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{}-{}.{}", stem, attempt, ext),
        _ => format!("{}-{}", name, attempt),
    }
}

/// Keep only the final path component and drop characters that are unsafe in file names
fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| match c {
            ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim().trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        "output.mp4".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("trimmed-clip.mp4"), "trimmed-clip.mp4");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\videos\\a:b.mp4"), "a_b.mp4");
        assert_eq!(sanitize_file_name(".."), "output.mp4");
        assert_eq!(sanitize_file_name(""), "output.mp4");
    }

    #[test]
    fn test_numbered_name() {
        assert_eq!(numbered_name("merged-video.mp4", 0), "merged-video.mp4");
        assert_eq!(numbered_name("merged-video.mp4", 2), "merged-video-2.mp4");
        assert_eq!(numbered_name("README", 1), "README-1");
    }

    #[tokio::test]
    async fn test_deliver_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = FsDeliveryAdapter::new(dir.path());

        let first = adapter
            .deliver(&Artifact::new(b"one".to_vec(), "merged-video.mp4", "video/mp4"))
            .await
            .unwrap();
        let second = adapter
            .deliver(&Artifact::new(b"two".to_vec(), "merged-video.mp4", "video/mp4"))
            .await
            .unwrap();

        assert!(first.location.ends_with("merged-video.mp4"));
        assert!(second.location.ends_with("merged-video-1.mp4"));
        assert_eq!(second.bytes_written, 3);
        assert_eq!(std::fs::read(&first.location).unwrap(), b"one");
        assert_eq!(std::fs::read(&second.location).unwrap(), b"two");

        // No temporary files left behind
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[tokio::test]
    async fn test_deliver_creates_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("out").join("videos");
        let adapter = FsDeliveryAdapter::new(&nested);

        let receipt = adapter
            .deliver(&Artifact::new(vec![0u8; 16], "trimmed-a.mp4", "video/mp4"))
            .await
            .unwrap();
        assert!(nested.join("trimmed-a.mp4").exists());
        assert_eq!(receipt.bytes_written, 16);
    }
}
