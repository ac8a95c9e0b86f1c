pub mod whisper;

pub use whisper::{Segment, TranscriptResult, TranscriptionEngine, WhisperTranscriber};
