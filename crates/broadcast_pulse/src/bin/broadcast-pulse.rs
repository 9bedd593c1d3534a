use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use broadcast_datastore::PgJobStore;
use broadcast_pulse::{
    media::{ffmpeg::FfmpegCapture, fs_storage::FsSnapshotStorage},
    ocr::tesseract::TesseractOcr,
    tracing::init_tracing_subscriber,
    PipelineBuilder, PipelineConfig, WhisperClient,
};

#[derive(Parser)]
#[command(name = "broadcast-pulse", about = "Broadcast snapshot and summary pipeline")]
struct Cli {
    /// Database connection URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// API key for the transcription endpoint
    #[arg(long, env = "TRANSCRIBE_API_KEY")]
    transcribe_api_key: String,

    /// Override for the transcription endpoint base URL
    #[arg(long, env = "TRANSCRIBE_BASE_URL")]
    transcribe_base_url: Option<String>,

    /// Language hint passed to the transcriber
    #[arg(long, env = "TRANSCRIBE_LANGUAGE")]
    language: Option<String>,

    /// Working directory for snapshots and audio
    #[arg(long, default_value = "/var/tmp/broadcast-pulse")]
    workdir: PathBuf,

    /// ffmpeg executable
    #[arg(long, default_value = "ffmpeg")]
    ffmpeg_bin: String,

    /// tesseract executable
    #[arg(long, default_value = "tesseract")]
    tesseract_bin: String,

    /// OCR language passed to tesseract
    #[arg(long)]
    ocr_language: Option<String>,

    /// Seconds between supervisor reconciliation passes
    #[arg(long, default_value = "60")]
    reconcile_interval: u64,

    /// Seconds between snapshots of one broadcast
    #[arg(long, default_value = "10")]
    capture_interval: u64,

    /// Seconds between dispatcher cycles
    #[arg(long, default_value = "30")]
    check_interval: u64,

    /// Summarization attempts per job
    #[arg(long, env = "MAX_SUMMARY_RETRIES", default_value = "3")]
    max_retries: i32,

    /// Seconds before a Processing job counts as stuck
    #[arg(long, default_value = "900")]
    processing_timeout: i64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run supervisor and dispatcher until interrupted
    Run,
    /// Run one dispatcher cycle (claim, process, reclaim) and exit
    Cycle,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let _guard = sentry::init((
        std::env::var("SENTRY_DSN").unwrap_or_default(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: Some("production".into()),
            ..Default::default()
        },
    ));

    let cli = Cli::parse();
    init_tracing_subscriber()?;

    let store = PgJobStore::init(&cli.database_url).await?;
    let mut transcriber = WhisperClient::new(&cli.transcribe_api_key);
    if let Some(ref base_url) = cli.transcribe_base_url {
        transcriber = transcriber.with_base_url(base_url.clone());
    }

    let config = PipelineConfig {
        reconcile_interval: Duration::from_secs(cli.reconcile_interval),
        capture_interval: Duration::from_secs(cli.capture_interval),
        check_interval: Duration::from_secs(cli.check_interval),
        max_retries: cli.max_retries,
        processing_timeout: chrono::Duration::seconds(cli.processing_timeout),
        language_hint: cli.language.clone(),
        ..Default::default()
    };

    let pipeline = PipelineBuilder::new()
        .config(config)
        .store(store)
        .capture(FfmpegCapture::new(&cli.ffmpeg_bin))
        .storage(FsSnapshotStorage::new(&cli.workdir))
        .ocr(TesseractOcr::new(&cli.tesseract_bin, cli.ocr_language.clone()))
        .transcriber(transcriber)
        .build();

    match cli.command {
        Command::Run => {
            tracing::info!("Starting broadcast pipeline...");
            let shutdown = CancellationToken::new();
            let signal_token = shutdown.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("Shutdown signal received");
                    signal_token.cancel();
                }
            });
            pipeline.run(shutdown).await;
        }
        Command::Cycle => {
            let outcome = pipeline.run_dispatcher_cycle().await?;
            tracing::info!(?outcome, "Dispatcher cycle finished");
        }
    }

    Ok(())
}
