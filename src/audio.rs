use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};

use crate::video::VideoAsset;
use crate::{PipelineError, Result};

/// Wait applied before re-verifying a freshly written audio file. ffmpeg
/// gives no flush confirmation, so visibility is tolerated rather than
/// synchronized.
const SETTLE_DELAY: Duration = Duration::from_millis(200);

/// Extracted audio file on disk, 1:1 with its source video
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioArtifact {
    pub path: PathBuf,
    pub size: u64,
}

/// How the audio file for a video came to exist this run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionOutcome {
    /// ffmpeg was invoked and wrote the file
    Extracted,
    /// The file was already present; extraction was not attempted
    SkippedExisting,
}

/// Verify the media tool at `program` is reachable before any file work
/// begins.
///
/// Returns false on any failure to run the version query; the caller must
/// treat that as fatal for the whole run.
pub async fn check_media_tool(program: &Path) -> bool {
    let result = tokio::process::Command::new(program)
        .arg("-version")
        .output()
        .await;

    match result {
        Ok(output) if output.status.success() => true,
        Ok(output) => {
            error!(
                "❌ {} version query exited with: {}",
                program.display(),
                output.status
            );
            false
        }
        Err(e) => {
            error!(
                "❌ {} is not installed or not on PATH: {}",
                program.display(),
                e
            );
            false
        }
    }
}

/// Demuxes one video's audio track into a standalone mp3 file
#[derive(Debug, Clone)]
pub struct AudioExtractor {
    program: PathBuf,
}

impl Default for AudioExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioExtractor {
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("ffmpeg"),
        }
    }

    /// Use a specific media tool binary instead of `ffmpeg` from PATH
    pub fn with_program(program: PathBuf) -> Self {
        Self { program }
    }

    /// Extract the audio track of `video` into `audio_path`.
    ///
    /// If `audio_path` already exists the extraction is skipped entirely;
    /// an existing artifact is the idempotence marker for re-runs. Codec and
    /// quality are fixed, the container follows the `.mp3` extension.
    pub async fn extract(&self, video: &VideoAsset, audio_path: &Path) -> Result<ExtractionOutcome> {
        if tokio::fs::try_exists(audio_path).await? {
            info!(
                "⏭️  Audio already exists, skipping extraction: {}",
                audio_path.display()
            );
            return Ok(ExtractionOutcome::SkippedExisting);
        }

        info!("🎬 Extracting: {} → {}", video.filename(), audio_path.display());

        let output = tokio::process::Command::new(&self.program)
            .arg("-i")
            .arg(&video.path)
            .args(["-vn", "-acodec", "libmp3lame", "-q:a", "2", "-y"])
            .arg(audio_path)
            .output()
            .await
            .map_err(|e| PipelineError::Extraction {
                video: video.filename(),
                detail: format!("failed to spawn {}: {}", self.program.display(), e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PipelineError::Extraction {
                video: video.filename(),
                detail: format!(
                    "ffmpeg exited with {}: {}",
                    output.status,
                    stderr.lines().last().unwrap_or("").trim()
                ),
            });
        }

        Ok(ExtractionOutcome::Extracted)
    }

    /// Re-verify the audio artifact after extraction (or skip) and read its
    /// size for diagnostics. Fails with `MissingAudio` if the file is absent
    /// or empty even though the previous stage reported success.
    pub async fn verify(&self, audio_path: &Path) -> Result<AudioArtifact> {
        tokio::time::sleep(SETTLE_DELAY).await;

        let metadata = tokio::fs::metadata(audio_path).await.map_err(|_| {
            PipelineError::MissingAudio(audio_path.display().to_string())
        })?;

        if metadata.len() == 0 {
            return Err(PipelineError::MissingAudio(audio_path.display().to_string()));
        }

        info!(
            "🎵 Audio artifact ready: {} ({:.1} MB)",
            audio_path.display(),
            metadata.len() as f64 / 1_000_000.0
        );

        Ok(AudioArtifact {
            path: audio_path.to_path_buf(),
            size: metadata.len(),
        })
    }
}
