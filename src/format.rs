use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::OutputFormat;
use crate::transcription::{Segment, TranscriptResult};
use crate::{PipelineError, Result};

/// Maps one transcript into its persisted representations.
///
/// Both forms are derived from the same `TranscriptResult`; producing them
/// never re-invokes the engine.
#[derive(Debug, Clone, Copy)]
pub struct TranscriptWriter {
    format: OutputFormat,
}

impl TranscriptWriter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Write the selected representation(s) of `result` into `text_dir`,
    /// named after `base_name`. Returns the paths written.
    pub async fn write(
        &self,
        result: &TranscriptResult,
        base_name: &str,
        text_dir: &Path,
    ) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();

        if self.format.wants_structured() {
            let path = text_dir.join(format!("{}.json", base_name));
            let document = render_structured(result).map_err(|e| PipelineError::Persistence {
                path: path.display().to_string(),
                detail: e.to_string(),
            })?;
            persist(&path, &document).await?;
            info!("💾 Structured transcript saved: {}", path.display());
            written.push(path);
        }

        if self.format.wants_text() {
            let path = text_dir.join(format!("{}.txt", base_name));
            persist(&path, &render_text(result)).await?;
            info!("💾 Text transcript saved: {}", path.display());
            written.push(path);
        }

        Ok(written)
    }
}

/// Render the human-readable form: a language header, a blank line, then one
/// `[start ~ end] text` line per segment with two-decimal timestamps.
pub fn render_text(result: &TranscriptResult) -> String {
    let mut out = format!("# Detected language: {}\n\n", result.language);

    for segment in &result.segments {
        out.push_str(&format!(
            "[{:.2} ~ {:.2}] {}\n",
            segment.start,
            segment.end,
            segment.text.trim()
        ));
    }

    out
}

/// Render the machine-readable form: `{ language, segments: [...] }` with
/// trimmed text, in the engine's segment order.
pub fn render_structured(result: &TranscriptResult) -> serde_json::Result<String> {
    let trimmed = TranscriptResult {
        language: result.language.clone(),
        segments: result
            .segments
            .iter()
            .map(|s| Segment {
                start: s.start,
                end: s.end,
                text: s.text.trim().to_string(),
            })
            .collect(),
    };

    serde_json::to_string_pretty(&trimmed)
}

async fn persist(path: &Path, content: &str) -> Result<()> {
    tokio::fs::write(path, content)
        .await
        .map_err(|e| PipelineError::Persistence {
            path: path.display().to_string(),
            detail: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_result() -> TranscriptResult {
        TranscriptResult {
            language: "ko".to_string(),
            segments: vec![
                Segment {
                    start: 0.0,
                    end: 3.5,
                    text: " 안녕하세요 ".to_string(),
                },
                Segment {
                    start: 3.5,
                    end: 7.25,
                    text: "  welcome back\n".to_string(),
                },
            ],
        }
    }

    #[test]
    fn test_text_rendering() {
        let text = render_text(&sample_result());
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(lines[0], "# Detected language: ko");
        assert_eq!(lines[1], "");
        assert_eq!(lines[2], "[0.00 ~ 3.50] 안녕하세요");
        assert_eq!(lines[3], "[3.50 ~ 7.25] welcome back");
        assert_eq!(lines.len(), 2 + sample_result().segments.len());
    }

    #[test]
    fn test_text_rendering_empty_segments() {
        let result = TranscriptResult {
            language: "en".to_string(),
            segments: Vec::new(),
        };

        let text = render_text(&result);
        assert_eq!(text, "# Detected language: en\n\n");
    }

    #[test]
    fn test_structured_round_trip() {
        let document = render_structured(&sample_result()).unwrap();
        let parsed: TranscriptResult = serde_json::from_str(&document).unwrap();

        assert_eq!(parsed.language, "ko");
        assert_eq!(parsed.segments.len(), 2);
        // Text is persisted trimmed; order and timestamps survive the trip.
        assert_eq!(parsed.segments[0].text, "안녕하세요");
        assert_eq!(parsed.segments[1].text, "welcome back");
        assert_eq!(parsed.segments[0].start, 0.0);
        assert_eq!(parsed.segments[1].end, 7.25);
    }

    #[test]
    fn test_structured_empty_segments() {
        let result = TranscriptResult {
            language: "en".to_string(),
            segments: Vec::new(),
        };

        let document = render_structured(&result).unwrap();
        let value: serde_json::Value = serde_json::from_str(&document).unwrap();
        assert_eq!(value["language"], "en");
        assert!(value["segments"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_write_text_only() {
        let temp_dir = TempDir::new().unwrap();
        let writer = TranscriptWriter::new(OutputFormat::Text);

        let written = writer
            .write(&sample_result(), "clip1", temp_dir.path())
            .await
            .unwrap();

        assert_eq!(written, vec![temp_dir.path().join("clip1.txt")]);
        assert!(!temp_dir.path().join("clip1.json").exists());

        let content = std::fs::read_to_string(&written[0]).unwrap();
        assert!(content.starts_with("# Detected language: "));
    }

    #[tokio::test]
    async fn test_write_both_from_one_result() {
        let temp_dir = TempDir::new().unwrap();
        let writer = TranscriptWriter::new(OutputFormat::Both);

        let written = writer
            .write(&sample_result(), "clip1", temp_dir.path())
            .await
            .unwrap();

        assert_eq!(written.len(), 2);
        assert!(temp_dir.path().join("clip1.json").exists());
        assert!(temp_dir.path().join("clip1.txt").exists());
    }

    #[tokio::test]
    async fn test_write_structured_only() {
        let temp_dir = TempDir::new().unwrap();
        let writer = TranscriptWriter::new(OutputFormat::Structured);

        let written = writer
            .write(&sample_result(), "clip2", temp_dir.path())
            .await
            .unwrap();

        assert_eq!(written, vec![temp_dir.path().join("clip2.json")]);
        assert!(!temp_dir.path().join("clip2.txt").exists());

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&written[0]).unwrap()).unwrap();
        assert!(value.get("language").is_some());
        assert!(value.get("segments").is_some());
    }
}
