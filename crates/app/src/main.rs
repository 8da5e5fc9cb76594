mod demo;

use anyhow::Context;
use clap::Parser;
use demo::{DocumentExtractor, ToneGenerator};
use readalong_audio::{CpalSink, PlaybackController};
use readalong_foundation::PlaybackState;
use readalong_session::{
    ControlMsg, DisplayCommand, PlaybackOrchestrator, SessionConfig, SessionHandle,
};
use std::path::PathBuf;

const SAMPLE_TEXT: &str = "Reading along is easier when the words light up. \
Each sentence streams in as it is synthesized. \
Playback starts on the first chunk, not the last. \
Pause and resume keep your place on the page.";

/// Demo sample rate for the tone generator; the sink reports the real
/// device rate once the stream is up.
const DEMO_SAMPLE_RATE: u32 = 22_050;

#[derive(Parser, Debug)]
#[command(name = "readalong", about = "Read a document aloud with word highlighting")]
struct Cli {
    /// Text to read; omit to use the built-in sample passage.
    text: Option<String>,

    /// Read the document from a file instead.
    #[arg(long, conflicts_with = "text")]
    file: Option<PathBuf>,

    /// Speech rate multiplier.
    #[arg(long, default_value_t = 1.0)]
    speed: f32,

    /// Voice identifier passed to the generator.
    #[arg(long, default_value = "en-default")]
    voice: String,
}

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    let text = match (&cli.text, &cli.file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("reading document {}", path.display()))?,
        (None, None) => SAMPLE_TEXT.to_string(),
    };
    let words: Vec<String> = text.split_whitespace().map(str::to_string).collect();
    tracing::info!("Reading {} words aloud", words.len());

    let controller = PlaybackController::new(CpalSink::new());
    let extractor = DocumentExtractor::new(text);
    let generator = ToneGenerator::new(DEMO_SAMPLE_RATE);
    let config = SessionConfig {
        voice_id: cli.voice,
        speed: cli.speed,
        ..SessionConfig::default()
    };

    let (orchestrator, handle) =
        PlaybackOrchestrator::new(controller, extractor, generator, config);
    let session = tokio::spawn(orchestrator.run());

    handle
        .control
        .send(ControlMsg::Play)
        .await
        .context("session ended before play")?;

    run_display(handle, &words).await?;

    session.await.context("session task panicked")?;
    tracing::info!("Done");
    Ok(())
}

/// Renders display commands to the terminal until the session lands back
/// in stopped, or ctrl-c asks it to.
async fn run_display(mut handle: SessionHandle, words: &[String]) -> anyhow::Result<()> {
    let mut started = false;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupt received; stopping session");
                // Session may already be gone; nothing to do then.
                let _ = handle.control.send(ControlMsg::Stop).await;
            }
            command = handle.display.recv() => {
                let Some(command) = command else { break };
                match command {
                    DisplayCommand::HighlightWord { index } => {
                        let word = words.get(index).map(String::as_str).unwrap_or("?");
                        println!("  [{index:>3}] {word}");
                    }
                    DisplayCommand::HighlightScroll { index } => {
                        println!("  ---- view centered on word {index} ----");
                    }
                    DisplayCommand::HighlightReset => {
                        println!("  ---- highlight cleared ----");
                    }
                    DisplayCommand::StateChanged { state, .. } => {
                        tracing::info!("Playback state: {state}");
                        match state {
                            PlaybackState::Loading => started = true,
                            PlaybackState::Stopped if started => break,
                            _ => {}
                        }
                    }
                    DisplayCommand::SessionError { code, message, recoverable } => {
                        tracing::error!("Session error [{code}]: {message} (recoverable: {recoverable})");
                        if !recoverable {
                            break;
                        }
                    }
                }
            }
        }
    }
    // Dropping the control sender shuts the orchestrator down.
    drop(handle);
    Ok(())
}
