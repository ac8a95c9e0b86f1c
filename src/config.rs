use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, Result};

/// Configuration for a batch transcription run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory layout for inputs and derived artifacts
    pub dirs: DirConfig,

    /// Transcription engine settings
    pub transcription: TranscriptionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirConfig {
    /// Directory containing the input `*.mp4` files
    pub video_dir: PathBuf,

    /// Directory receiving extracted audio files
    pub audio_dir: PathBuf,

    /// Directory receiving transcript files (text and/or JSON)
    pub text_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    /// Whisper model size identifier (tiny, base, small, medium, large)
    pub model: String,

    /// Language hint; None lets the engine auto-detect per file
    pub language: Option<String>,

    /// Directory holding the media tool binaries, prepended to the engine
    /// child process PATH. Replaces the process-wide environment mutation
    /// the engine would otherwise need to locate its audio decoder.
    pub media_tool_dir: Option<PathBuf>,
}

/// Which transcript representations a run persists.
///
/// Fixed once before the batch starts and applied uniformly to every file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Text,
    Structured,
    Both,
}

impl OutputFormat {
    pub fn wants_text(&self) -> bool {
        matches!(self, OutputFormat::Text | OutputFormat::Both)
    }

    pub fn wants_structured(&self) -> bool {
        matches!(self, OutputFormat::Structured | OutputFormat::Both)
    }
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "structured" => Ok(OutputFormat::Structured),
            "both" => Ok(OutputFormat::Both),
            other => Err(anyhow!(
                "unknown output format '{}' (expected text, structured, or both)",
                other
            )),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Text => "text",
            OutputFormat::Structured => "structured",
            OutputFormat::Both => "both",
        };
        write!(f, "{}", name)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dirs: DirConfig {
                video_dir: PathBuf::from("videos"),
                audio_dir: PathBuf::from("audios"),
                text_dir: PathBuf::from("texts"),
            },
            transcription: TranscriptionConfig {
                model: "base".to_string(),
                language: None,
                media_tool_dir: None,
            },
        }
    }
}

impl Config {
    /// Load configuration from file, falling back to environment overrides
    pub fn load() -> Result<Self> {
        let config_paths = ["clipscribe.toml", "config/clipscribe.toml"];

        for path in &config_paths {
            if let Ok(config_str) = std::fs::read_to_string(path) {
                match toml::from_str::<Config>(&config_str) {
                    Ok(config) => {
                        tracing::info!("📄 Loaded configuration from: {}", path);
                        return Ok(config.with_env_overrides());
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file {}: {}", path, e);
                    }
                }
            }
        }

        Ok(Self::default().with_env_overrides())
    }

    /// Apply `CLIPSCRIBE_*` environment variable overrides
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(dir) = std::env::var("CLIPSCRIBE_VIDEO_DIR") {
            self.dirs.video_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("CLIPSCRIBE_AUDIO_DIR") {
            self.dirs.audio_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("CLIPSCRIBE_TEXT_DIR") {
            self.dirs.text_dir = PathBuf::from(dir);
        }
        if let Ok(model) = std::env::var("CLIPSCRIBE_MODEL") {
            self.transcription.model = model;
        }
        if let Ok(language) = std::env::var("CLIPSCRIBE_LANGUAGE") {
            if !language.is_empty() {
                self.transcription.language = Some(language);
            }
        }
        if let Ok(dir) = std::env::var("CLIPSCRIBE_MEDIA_TOOL_DIR") {
            if !dir.is_empty() {
                self.transcription.media_tool_dir = Some(PathBuf::from(dir));
            }
        }
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.transcription.model.trim().is_empty() {
            return Err(anyhow!("transcription model must not be empty"));
        }
        if let Some(ref language) = self.transcription.language {
            if language.trim().is_empty() {
                return Err(anyhow!("language hint must not be empty when set"));
            }
        }
        Ok(())
    }
}
