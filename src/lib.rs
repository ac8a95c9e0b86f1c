/// Clipscribe - batch video-to-transcript conversion
///
/// Converts a folder of video recordings into extracted audio tracks and
/// time-aligned transcripts, one file at a time, reusing artifacts that
/// already exist on disk.

pub mod video;
pub mod audio;
pub mod processing;
pub mod config;
pub mod format;
pub mod transcription;

// Re-export main types for easy access
pub use crate::config::{Config, OutputFormat};
pub use crate::processing::{BatchDriver, FileOutcome, ProcessingStage, ProcessingStatus, RunReport};
pub use crate::video::VideoAsset;
pub use crate::audio::{AudioArtifact, AudioExtractor, ExtractionOutcome};
pub use crate::format::TranscriptWriter;
pub use crate::transcription::{Segment, TranscriptResult, TranscriptionEngine, WhisperTranscriber};

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Error types for the per-file pipeline and the run-level preflight
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("media tool unavailable: {0}")]
    Preflight(String),

    #[error("audio extraction failed for {video}: {detail}")]
    Extraction { video: String, detail: String },

    #[error("audio artifact missing or empty: {0}")]
    MissingAudio(String),

    #[error("transcription failed for {audio}: {detail}")]
    Transcription { audio: String, detail: String },

    #[error("failed to persist {path}: {detail}")]
    Persistence { path: String, detail: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
