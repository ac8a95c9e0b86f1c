use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{error, info};

use crate::audio::{self, AudioExtractor, ExtractionOutcome};
use crate::config::{Config, OutputFormat};
use crate::format::TranscriptWriter;
use crate::transcription::TranscriptionEngine;
use crate::video::{self, VideoAsset};
use crate::{PipelineError, Result};

/// Per-file pipeline stages, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessingStage {
    Pending,
    Extracting,
    Extracted,
    Transcribing,
    Transcribed,
    Formatted,
}

impl ProcessingStage {
    pub fn status_string(&self) -> &'static str {
        match self {
            ProcessingStage::Pending => "pending",
            ProcessingStage::Extracting => "extracting audio",
            ProcessingStage::Extracted => "audio extracted",
            ProcessingStage::Transcribing => "transcribing",
            ProcessingStage::Transcribed => "transcribed",
            ProcessingStage::Formatted => "formatted",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessingStatus {
    Completed,
    Failed,
}

/// Terminal outcome for one video
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileOutcome {
    pub video: String,
    pub status: ProcessingStatus,
    /// Last stage the file reached (the failing stage for failures)
    pub stage: ProcessingStage,
    /// Transcript files written for this video
    pub written: Vec<PathBuf>,
    /// Whether the audio artifact was reused instead of re-extracted
    pub extraction_skipped: bool,
    pub error: Option<String>,
}

/// Summary of a whole batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed: Duration,
    pub outcomes: Vec<FileOutcome>,
}

/// Drives every discovered video through extract → verify → transcribe →
/// persist, strictly one file at a time.
///
/// A failure in any stage marks that file failed and the batch moves on;
/// only the media-tool preflight aborts the whole run.
pub struct BatchDriver {
    config: Config,
    extractor: AudioExtractor,
    writer: TranscriptWriter,
    engine: Box<dyn TranscriptionEngine>,
}

impl BatchDriver {
    pub fn new(config: Config, format: OutputFormat, engine: Box<dyn TranscriptionEngine>) -> Self {
        let program = media_tool_program(&config);
        Self {
            config,
            extractor: AudioExtractor::with_program(program),
            writer: TranscriptWriter::new(format),
            engine,
        }
    }

    /// Run the full batch: preflight, enumerate, process each file
    pub async fn run(&self) -> Result<RunReport> {
        let program = media_tool_program(&self.config);
        if !audio::check_media_tool(&program).await {
            return Err(PipelineError::Preflight(format!(
                "{} version query failed; install ffmpeg and ensure it is reachable",
                program.display()
            )));
        }

        let assets = video::discover_videos(&self.config.dirs.video_dir)?;
        self.process_all(assets).await
    }

    /// Process an already-enumerated list of videos sequentially
    pub async fn process_all(&self, assets: Vec<VideoAsset>) -> Result<RunReport> {
        let start = Instant::now();

        tokio::fs::create_dir_all(&self.config.dirs.audio_dir).await?;
        tokio::fs::create_dir_all(&self.config.dirs.text_dir).await?;

        let total = assets.len();
        let mut outcomes = Vec::with_capacity(total);

        for (index, asset) in assets.iter().enumerate() {
            info!("🎬 Processing {}/{}: {}", index + 1, total, asset.filename());
            outcomes.push(self.process_one(asset).await);
        }

        let succeeded = outcomes
            .iter()
            .filter(|o| o.status == ProcessingStatus::Completed)
            .count();
        let failed = total - succeeded;

        info!(
            "✅ Batch complete: {} succeeded, {} failed of {} in {:.1}s",
            succeeded,
            failed,
            total,
            start.elapsed().as_secs_f64()
        );

        Ok(RunReport {
            total,
            succeeded,
            failed,
            elapsed: start.elapsed(),
            outcomes,
        })
    }

    /// Run one video through the pipeline, converting any stage error into
    /// a failed outcome so the batch continues.
    async fn process_one(&self, asset: &VideoAsset) -> FileOutcome {
        let mut stage = ProcessingStage::Pending;
        let mut extraction_skipped = false;

        match self.pipeline(asset, &mut stage, &mut extraction_skipped).await {
            Ok(written) => FileOutcome {
                video: asset.filename(),
                status: ProcessingStatus::Completed,
                stage,
                written,
                extraction_skipped,
                error: None,
            },
            Err(e) => {
                error!(
                    "❌ {} failed while {}: {}",
                    asset.filename(),
                    stage.status_string(),
                    e
                );
                FileOutcome {
                    video: asset.filename(),
                    status: ProcessingStatus::Failed,
                    stage,
                    written: Vec::new(),
                    extraction_skipped,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    async fn pipeline(
        &self,
        asset: &VideoAsset,
        stage: &mut ProcessingStage,
        extraction_skipped: &mut bool,
    ) -> Result<Vec<PathBuf>> {
        let audio_path = self
            .config
            .dirs
            .audio_dir
            .join(format!("{}.mp3", asset.base_name));

        *stage = ProcessingStage::Extracting;
        let outcome = self.extractor.extract(asset, &audio_path).await?;
        *extraction_skipped = outcome == ExtractionOutcome::SkippedExisting;

        // Downstream stages require the artifact to exist and be non-empty,
        // whether it was just written or reused.
        let artifact = self.extractor.verify(&audio_path).await?;
        *stage = ProcessingStage::Extracted;

        *stage = ProcessingStage::Transcribing;
        let result = self.engine.transcribe(&artifact.path).await?;
        *stage = ProcessingStage::Transcribed;

        let written = self
            .writer
            .write(&result, &asset.base_name, &self.config.dirs.text_dir)
            .await?;
        *stage = ProcessingStage::Formatted;

        Ok(written)
    }
}

/// Resolve the media tool binary: `ffmpeg` inside the configured tool
/// directory, or plain `ffmpeg` from PATH when none is set.
fn media_tool_program(config: &Config) -> PathBuf {
    match config.transcription.media_tool_dir {
        Some(ref dir) => dir.join("ffmpeg"),
        None => PathBuf::from("ffmpeg"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcription::{Segment, TranscriptResult};
    use async_trait::async_trait;
    use std::path::Path;
    use tempfile::TempDir;

    /// Engine double that fails for one chosen base name
    struct FakeEngine {
        fail_on: Option<String>,
    }

    #[async_trait]
    impl TranscriptionEngine for FakeEngine {
        async fn transcribe(&self, audio_path: &Path) -> crate::Result<TranscriptResult> {
            let stem = audio_path
                .file_stem()
                .unwrap()
                .to_string_lossy()
                .to_string();

            if self.fail_on.as_deref() == Some(stem.as_str()) {
                return Err(PipelineError::Transcription {
                    audio: audio_path.display().to_string(),
                    detail: "simulated engine failure".to_string(),
                });
            }

            Ok(TranscriptResult {
                language: "en".to_string(),
                segments: vec![Segment {
                    start: 0.0,
                    end: 1.5,
                    text: format!(" transcript of {} ", stem),
                }],
            })
        }
    }

    /// Lay out videos/ with dummy mp4s and audios/ with matching non-empty
    /// mp3s so extraction takes the idempotent skip path.
    fn setup(temp_dir: &TempDir, names: &[&str]) -> Config {
        let video_dir = temp_dir.path().join("videos");
        let audio_dir = temp_dir.path().join("audios");
        let text_dir = temp_dir.path().join("texts");
        std::fs::create_dir_all(&video_dir).unwrap();
        std::fs::create_dir_all(&audio_dir).unwrap();

        for name in names {
            std::fs::write(video_dir.join(format!("{}.mp4", name)), b"video").unwrap();
            std::fs::write(audio_dir.join(format!("{}.mp3", name)), b"audio").unwrap();
        }

        Config {
            dirs: crate::config::DirConfig {
                video_dir,
                audio_dir,
                text_dir,
            },
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_preflight_failure_aborts_before_any_file_work() {
        let temp_dir = TempDir::new().unwrap();
        let video_dir = temp_dir.path().join("videos");
        let audio_dir = temp_dir.path().join("audios");
        let text_dir = temp_dir.path().join("texts");
        std::fs::create_dir_all(&video_dir).unwrap();
        std::fs::write(video_dir.join("clip1.mp4"), b"video").unwrap();

        let mut config = Config::default();
        config.dirs = crate::config::DirConfig {
            video_dir,
            audio_dir: audio_dir.clone(),
            text_dir: text_dir.clone(),
        };
        // Point the tool directory somewhere with no ffmpeg in it.
        config.transcription.media_tool_dir = Some(temp_dir.path().join("no-tools"));

        let driver = BatchDriver::new(
            config,
            OutputFormat::Both,
            Box::new(FakeEngine { fail_on: None }),
        );

        let result = driver.run().await;
        assert!(matches!(result, Err(PipelineError::Preflight(_))));

        // The run aborted before any file-level processing.
        assert!(!audio_dir.exists());
        assert!(!text_dir.exists());
    }

    #[tokio::test]
    async fn test_failure_is_isolated_to_one_file() {
        let temp_dir = TempDir::new().unwrap();
        let config = setup(&temp_dir, &["a", "b", "c"]);
        let text_dir = config.dirs.text_dir.clone();
        let video_dir = config.dirs.video_dir.clone();

        let driver = BatchDriver::new(
            config,
            OutputFormat::Both,
            Box::new(FakeEngine {
                fail_on: Some("b".to_string()),
            }),
        );

        let assets = crate::video::discover_videos(&video_dir).unwrap();
        let report = driver.process_all(assets).await.unwrap();

        assert_eq!(report.total, 3);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 1);

        // Files before and after the failure still completed.
        assert!(text_dir.join("a.txt").exists());
        assert!(text_dir.join("a.json").exists());
        assert!(text_dir.join("c.txt").exists());
        assert!(text_dir.join("c.json").exists());
        assert!(!text_dir.join("b.txt").exists());
        assert!(!text_dir.join("b.json").exists());

        let failed = &report.outcomes[1];
        assert_eq!(failed.video, "b.mp4");
        assert_eq!(failed.status, ProcessingStatus::Failed);
        assert_eq!(failed.stage, ProcessingStage::Transcribing);
        assert!(failed.error.as_deref().unwrap().contains("simulated"));
    }

    #[tokio::test]
    async fn test_existing_audio_is_reused() {
        let temp_dir = TempDir::new().unwrap();
        let config = setup(&temp_dir, &["clip2"]);
        let video_dir = config.dirs.video_dir.clone();
        let text_dir = config.dirs.text_dir.clone();

        let driver = BatchDriver::new(
            config,
            OutputFormat::Structured,
            Box::new(FakeEngine { fail_on: None }),
        );

        let assets = crate::video::discover_videos(&video_dir).unwrap();
        let report = driver.process_all(assets).await.unwrap();

        assert_eq!(report.succeeded, 1);
        assert!(report.outcomes[0].extraction_skipped);
        assert!(text_dir.join("clip2.json").exists());
        assert!(!text_dir.join("clip2.txt").exists());
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let temp_dir = TempDir::new().unwrap();
        let config = setup(&temp_dir, &[]);

        let driver = BatchDriver::new(
            config,
            OutputFormat::Text,
            Box::new(FakeEngine { fail_on: None }),
        );

        let report = driver.process_all(Vec::new()).await.unwrap();
        assert_eq!(report.total, 0);
        assert_eq!(report.succeeded, 0);
        assert_eq!(report.failed, 0);
        assert!(report.outcomes.is_empty());
    }

    #[tokio::test]
    async fn test_missing_audio_fails_during_extraction_stage() {
        let temp_dir = TempDir::new().unwrap();
        let config = setup(&temp_dir, &["clip"]);

        // Empty the artifact so verification rejects it after the skip.
        std::fs::write(config.dirs.audio_dir.join("clip.mp3"), b"").unwrap();
        let video_dir = config.dirs.video_dir.clone();

        let driver = BatchDriver::new(
            config,
            OutputFormat::Text,
            Box::new(FakeEngine { fail_on: None }),
        );

        let assets = crate::video::discover_videos(&video_dir).unwrap();
        let report = driver.process_all(assets).await.unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.outcomes[0].stage, ProcessingStage::Extracting);
    }
}
