use anyhow::Result;
use clap::{Arg, Command};
use std::io::Write;
use std::path::PathBuf;
use tracing::{info, warn};

use clipscribe::config::{Config, OutputFormat};
use clipscribe::processing::{BatchDriver, ProcessingStatus};
use clipscribe::transcription::WhisperTranscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter("clipscribe=info,warn")
        .init();

    let matches = Command::new("clipscribe")
        .version("0.1.0")
        .about("Batch-convert a folder of videos into audio tracks and transcripts")
        .arg(
            Arg::new("video-dir")
                .short('d')
                .long("video-dir")
                .value_name("DIR")
                .help("Directory containing the .mp4 files to process"),
        )
        .arg(
            Arg::new("audio-dir")
                .short('a')
                .long("audio-dir")
                .value_name("DIR")
                .help("Directory for extracted audio files"),
        )
        .arg(
            Arg::new("text-dir")
                .short('t')
                .long("text-dir")
                .value_name("DIR")
                .help("Directory for transcript files"),
        )
        .arg(
            Arg::new("model")
                .short('m')
                .long("model")
                .value_name("SIZE")
                .help("Whisper model size (tiny, base, small, medium, large)"),
        )
        .arg(
            Arg::new("language")
                .short('l')
                .long("language")
                .value_name("CODE")
                .help("Force a transcript language instead of auto-detecting"),
        )
        .arg(
            Arg::new("format")
                .short('f')
                .long("format")
                .value_name("FORMAT")
                .help("Output format: text, structured, or both (prompted if omitted)"),
        )
        .get_matches();

    // Load configuration, then let CLI flags override it
    let mut config = Config::load().unwrap_or_else(|e| {
        warn!("Failed to load config, using defaults: {}", e);
        Config::default()
    });

    if let Some(dir) = matches.get_one::<String>("video-dir") {
        config.dirs.video_dir = PathBuf::from(dir);
    }
    if let Some(dir) = matches.get_one::<String>("audio-dir") {
        config.dirs.audio_dir = PathBuf::from(dir);
    }
    if let Some(dir) = matches.get_one::<String>("text-dir") {
        config.dirs.text_dir = PathBuf::from(dir);
    }
    if let Some(model) = matches.get_one::<String>("model") {
        config.transcription.model = model.clone();
    }
    if let Some(language) = matches.get_one::<String>("language") {
        config.transcription.language = Some(language.clone());
    }

    config.validate()?;

    // The output format is fixed once, before any file is touched
    let format = match matches.get_one::<String>("format") {
        Some(raw) => raw.parse::<OutputFormat>()?,
        None => prompt_output_format()?,
    };

    info!("🚀 clipscribe starting");
    info!("📁 Videos: {}", config.dirs.video_dir.display());
    info!("📂 Audio: {}", config.dirs.audio_dir.display());
    info!("📂 Transcripts: {} ({})", config.dirs.text_dir.display(), format);

    // Model handle is loaded once; device and precision are fixed here
    let engine = WhisperTranscriber::load(&config.transcription).await?;

    let driver = BatchDriver::new(config, format, Box::new(engine));
    let report = driver.run().await?;

    for outcome in &report.outcomes {
        if outcome.status == ProcessingStatus::Failed {
            warn!(
                "❌ {}: {}",
                outcome.video,
                outcome.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    info!(
        "🎉 All conversions attempted: {} succeeded, {} failed ({:.1}s)",
        report.succeeded,
        report.failed,
        report.elapsed.as_secs_f64()
    );

    Ok(())
}

/// Ask the operator which transcript representation(s) to write,
/// re-prompting until the answer is valid.
fn prompt_output_format() -> Result<OutputFormat> {
    let stdin = std::io::stdin();

    loop {
        print!("Output format [text/structured/both]: ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            anyhow::bail!("stdin closed before an output format was chosen");
        }

        match line.parse::<OutputFormat>() {
            Ok(format) => return Ok(format),
            Err(e) => eprintln!("{}", e),
        }
    }
}
