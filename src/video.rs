use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::{PipelineError, Result};

/// A single input video, identified by its filename
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoAsset {
    /// Path to the source file
    pub path: PathBuf,
    /// Filename with the extension stripped
    pub base_name: String,
}

impl VideoAsset {
    pub fn new(path: PathBuf) -> Result<Self> {
        let base_name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(str::to_string)
            .ok_or_else(|| {
                PipelineError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("invalid video filename: {}", path.display()),
                ))
            })?;

        Ok(Self { path, base_name })
    }

    pub fn filename(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.base_name.clone())
    }
}

/// Enumerate `*.mp4` files (case-insensitive) directly inside `dir`.
///
/// Subdirectories and other file types are ignored. The result is sorted by
/// filename so batches run in a reproducible order.
pub fn discover_videos(dir: &Path) -> Result<Vec<VideoAsset>> {
    if !dir.is_dir() {
        return Err(PipelineError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("input directory does not exist: {}", dir.display()),
        )));
    }

    let mut assets = Vec::new();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable directory entry: {}", e);
                continue;
            }
        };
        let path = entry.path();

        if entry.file_type().is_file() && is_video_file(path) {
            match VideoAsset::new(path.to_path_buf()) {
                Ok(asset) => assets.push(asset),
                Err(e) => warn!("Skipping unreadable video entry: {}", e),
            }
        }
    }

    assets.sort_by(|a, b| a.filename().cmp(&b.filename()));

    info!("📹 Found {} video file(s) in {}", assets.len(), dir.display());
    Ok(assets)
}

/// Check whether a path names a supported video file
pub fn is_video_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("mp4"))
        .unwrap_or(false)
}
