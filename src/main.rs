use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use eyre::{Result, bail};
use log::{debug, info};
use serde::Serialize;

mod cli;

use cli::{Cli, Command, OutputFormat};
use ytlearn::config::{Config, Settings};
use ytlearn::error::Envelope;
use ytlearn::llm::{ModelClient, mask_key};
use ytlearn::metadata::MetadataClient;
use ytlearn::pipeline::Pipeline;
use ytlearn::server::AppState;
use ytlearn::youtube::{InnerTubeBackend, TranscriptFetcher};

fn setup_logging() -> Result<()> {
    let log_dir = log_dir();
    std::fs::create_dir_all(&log_dir)?;
    let log_file = log_dir.join("ytlearn.log");

    let target = Box::new(std::fs::OpenOptions::new().create(true).append(true).open(&log_file)?);

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized: {}", log_file.display());
    Ok(())
}

fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ytlearn")
        .join("logs")
}

fn build_after_help() -> String {
    let log_path = log_dir().join("ytlearn.log");
    let config_path = ytlearn::config::config_path();

    format!(
        "\nENVIRONMENT:\n  GEMINI_API_KEY     generative model credential\n  YOUTUBE_API_KEY    YouTube Data API credential (metadata endpoints)\n  YTLEARN_MODEL      model name (gemini-*, claude-*, gpt-*)\n  PORT               server port\n\nConfig is read from: {}\nLogs are written to: {}",
        config_path.display(),
        log_path.display()
    )
}

fn print_envelope<T: Serialize>(envelope: Envelope<T>) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    match envelope {
        Envelope::Success(_) => Ok(()),
        Envelope::Failure(err) => bail!(err),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging()?;

    let after_help = build_after_help();
    let cmd = <Cli as clap::CommandFactory>::command().after_help(after_help);
    let matches = cmd.get_matches();
    let cli = <Cli as clap::FromArgMatches>::from_arg_matches(&matches)?;

    // Load config file (non-fatal if missing/invalid)
    let config = Config::load().unwrap_or_default();
    let settings = Settings::resolve(config);

    if cli.verbose {
        let config_path = ytlearn::config::config_path();
        if config_path.exists() {
            eprintln!("Config: {}", config_path.display());
        }
        eprintln!("Model: {}", settings.model);
        if let Some(ref key) = settings.gemini_api_key {
            eprintln!("Gemini key: {}", mask_key(key));
        }
    }
    debug!("Resolved settings: model={} port={}", settings.model, settings.port);

    let timeout = Duration::from_secs(settings.request_timeout_secs);
    let client = reqwest::Client::builder().timeout(timeout).build()?;

    let fetcher = TranscriptFetcher::new(
        Arc::new(InnerTubeBackend::new(client.clone())),
        &settings.preferred_languages,
    );
    let generator = Arc::new(ModelClient::from_settings(client.clone(), &settings));
    if !generator.has_credential() {
        info!("No usable credential for model {}; generation requests will fail", settings.model);
    }
    let pipeline = Pipeline::new(fetcher.clone(), generator);

    match cli.command {
        Command::Serve { host, port } => {
            let host = host.unwrap_or_else(|| settings.host.clone());
            let port = port.unwrap_or(settings.port);
            let addr = format!("{host}:{port}");
            let state = AppState {
                pipeline: Arc::new(pipeline),
                metadata: Arc::new(MetadataClient::new(client, settings.youtube_api_key.clone())),
            };
            eprintln!("Listening on http://{addr}");
            ytlearn::server::serve(state, &addr, timeout).await?;
        }
        Command::Transcript { url, format } => {
            let video_id = ytlearn::VideoId::resolve(&url)?;
            let transcript = fetcher.fetch(&video_id).await?;

            if cli.verbose {
                eprintln!(
                    "Video: {}\nLanguage: {}\nSegments: {}",
                    transcript.video_id,
                    transcript.language,
                    transcript.segments.len(),
                );
            }

            let rendered = match format {
                OutputFormat::Text => ytlearn::output::render_text(&transcript),
                OutputFormat::Timestamped => ytlearn::output::render_timestamped(&transcript),
                OutputFormat::Json => ytlearn::output::render_json(&transcript),
            };
            println!("{rendered}");
        }
        Command::Notes { url, style } => {
            print_envelope(pipeline.generate_notes(&url, style).await)?;
        }
        Command::Quiz { url, questions } => {
            print_envelope(pipeline.generate_quiz(&url, questions).await)?;
        }
    }

    Ok(())
}
