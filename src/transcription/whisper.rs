use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::TranscriptionConfig;
use crate::{PipelineError, Result};

/// One contiguous time-bounded span of a transcript
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Segment {
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    /// Transcribed text, possibly with surrounding whitespace
    pub text: String,
}

/// Fixed-shape transcription result, validated at the adapter boundary.
///
/// Segment order is the engine's presentation order and must be preserved.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranscriptResult {
    /// Detected (or forced) language code
    pub language: String,
    /// Timed segments in chronological order
    pub segments: Vec<Segment>,
}

/// Seam between the batch pipeline and the speech-recognition engine
#[async_trait]
pub trait TranscriptionEngine: Send + Sync {
    async fn transcribe(&self, audio_path: &Path) -> Result<TranscriptResult>;
}

/// Compute device for the engine, selected once per run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputeDevice {
    Cuda,
    Cpu,
}

impl ComputeDevice {
    fn as_arg(&self) -> &'static str {
        match self {
            ComputeDevice::Cuda => "cuda",
            ComputeDevice::Cpu => "cpu",
        }
    }
}

/// Adapter around the external Whisper CLI.
///
/// Loaded once per run: the backend command is resolved and the compute
/// device and numeric precision are fixed up front, then every file goes
/// through the same `transcribe` call.
#[derive(Debug, Clone)]
pub struct WhisperTranscriber {
    model: String,
    language: Option<String>,
    device: ComputeDevice,
    fp16: bool,
    media_tool_dir: Option<PathBuf>,
}

impl WhisperTranscriber {
    /// Resolve the engine and pick device/precision for the whole run.
    ///
    /// CUDA hardware selects GPU inference with reduced precision; otherwise
    /// the engine runs on CPU at full precision. The media tool location is
    /// an explicit parameter applied only to the engine's child environment.
    pub async fn load(config: &TranscriptionConfig) -> Result<Self> {
        if !command_available("whisper").await {
            return Err(PipelineError::Preflight(
                "whisper CLI not found (install openai-whisper)".to_string(),
            ));
        }

        let device = if cuda_available().await {
            ComputeDevice::Cuda
        } else {
            ComputeDevice::Cpu
        };
        let fp16 = device == ComputeDevice::Cuda;

        info!(
            "🧠 Whisper model '{}' on {} ({})",
            config.model,
            device.as_arg(),
            if fp16 { "fp16" } else { "fp32" }
        );

        Ok(Self {
            model: config.model.clone(),
            language: config.language.clone(),
            device,
            fp16,
            media_tool_dir: config.media_tool_dir.clone(),
        })
    }

    async fn run_whisper(&self, audio_path: &Path) -> Result<TranscriptResult> {
        let scratch = tempfile::tempdir().map_err(PipelineError::Io)?;

        let mut cmd = tokio::process::Command::new("whisper");
        cmd.arg(audio_path)
            .arg("--model")
            .arg(&self.model)
            .arg("--output_dir")
            .arg(scratch.path())
            .arg("--output_format")
            .arg("json")
            .arg("--verbose")
            .arg("False")
            .arg("--device")
            .arg(self.device.as_arg())
            .arg("--fp16")
            .arg(if self.fp16 { "True" } else { "False" });

        if let Some(ref language) = self.language {
            cmd.arg("--language").arg(language);
        }

        // The decoder locates ffmpeg through PATH; extend it for the child
        // only instead of mutating this process's environment.
        if let Some(ref tool_dir) = self.media_tool_dir {
            let path = std::env::var("PATH").unwrap_or_default();
            cmd.env(
                "PATH",
                format!("{}:{}", tool_dir.display(), path),
            );
        }

        debug!("Executing whisper command: {:?}", cmd);

        let output = cmd.output().await.map_err(|e| PipelineError::Transcription {
            audio: audio_path.display().to_string(),
            detail: format!("failed to spawn whisper: {}", e),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PipelineError::Transcription {
                audio: audio_path.display().to_string(),
                detail: format!(
                    "whisper exited with {}: {}",
                    output.status,
                    stderr.lines().last().unwrap_or("").trim()
                ),
            });
        }

        let stem = audio_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let json_path = scratch.path().join(format!("{}.json", stem));

        let json_content =
            tokio::fs::read_to_string(&json_path)
                .await
                .map_err(|e| PipelineError::Transcription {
                    audio: audio_path.display().to_string(),
                    detail: format!("no JSON output at {}: {}", json_path.display(), e),
                })?;

        let raw: WhisperOutput =
            serde_json::from_str(&json_content).map_err(|e| PipelineError::Transcription {
                audio: audio_path.display().to_string(),
                detail: format!("unparseable engine output: {}", e),
            })?;

        build_result(raw, self.language.as_deref()).map_err(|detail| {
            PipelineError::Transcription {
                audio: audio_path.display().to_string(),
                detail,
            }
        })
    }
}

#[async_trait]
impl TranscriptionEngine for WhisperTranscriber {
    async fn transcribe(&self, audio_path: &Path) -> Result<TranscriptResult> {
        info!("🎤 Transcribing: {}", audio_path.display());

        let result = self.run_whisper(audio_path).await?;

        info!(
            "✅ Transcribed {} segment(s), language '{}'",
            result.segments.len(),
            result.language
        );
        Ok(result)
    }
}

/// Validate the engine's dictionary-shaped output into the fixed-shape record
fn build_result(
    raw: WhisperOutput,
    language_hint: Option<&str>,
) -> std::result::Result<TranscriptResult, String> {
    let language = raw
        .language
        .filter(|l| !l.is_empty())
        .or_else(|| language_hint.map(str::to_string))
        .unwrap_or_else(|| "unknown".to_string());

    let mut segments = Vec::with_capacity(raw.segments.len());
    for (index, seg) in raw.segments.into_iter().enumerate() {
        if !seg.start.is_finite() || !seg.end.is_finite() {
            return Err(format!("segment {} has non-finite timestamps", index));
        }
        if seg.start < 0.0 {
            return Err(format!("segment {} starts before zero: {}", index, seg.start));
        }
        if seg.end < seg.start {
            return Err(format!(
                "segment {} ends ({}) before it starts ({})",
                index, seg.end, seg.start
            ));
        }
        segments.push(Segment {
            start: seg.start,
            end: seg.end,
            text: seg.text,
        });
    }

    Ok(TranscriptResult { language, segments })
}

/// Check if a command is available
async fn command_available(cmd_name: &str) -> bool {
    tokio::process::Command::new(cmd_name)
        .arg("--help")
        .output()
        .await
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Detect CUDA hardware for GPU inference
async fn cuda_available() -> bool {
    if std::env::var("CUDA_VISIBLE_DEVICES").map_or(false, |v| !v.is_empty() && v != "-1") {
        return true;
    }

    tokio::process::Command::new("nvidia-smi")
        .arg("-L")
        .output()
        .await
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Whisper JSON output document
#[derive(Debug, Clone, Deserialize)]
struct WhisperOutput {
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    segments: Vec<WhisperSegment>,
}

#[derive(Debug, Clone, Deserialize)]
struct WhisperSegment {
    start: f64,
    end: f64,
    text: String,
}
