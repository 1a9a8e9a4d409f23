use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info, warn, Level};

use video_thumbs::{
    config::Config,
    dispatch::{self, DirectoryRepository, EventBus, FileProcessingEvent, HandlerOutcome, ProcessedFileState},
    media::{Dimension, ProcessingRequest, SourceMedia, TaskType},
    processing::ProcessRunner,
};

#[derive(Parser)]
#[command(
    name = "video-thumbs",
    version,
    about = "Generate a preview image for a video file",
    long_about = "Extracts a frame from a video with ffmpeg, scales or crops it with ImageMagick and stores it as preview_<checksum>_<name>.jpg. A placeholder image is written when no frame can be produced."
)]
struct Cli {
    /// Video file to generate a preview for
    #[arg(short, long)]
    input: PathBuf,

    /// Directory the preview is stored in
    #[arg(short, long)]
    output_dir: PathBuf,

    /// Processing task (Image.Preview or Image.CropScaleMask)
    #[arg(short, long, default_value = "Image.Preview")]
    task: String,

    /// Target width, e.g. 120, 120m or 120c-50
    #[arg(long, default_value = "120")]
    width: Dimension,

    /// Target height, e.g. 90, 90m or 90c+20
    #[arg(long, default_value = "90")]
    height: Dimension,

    #[arg(long, default_value_t = 0)]
    max_width: u32,

    #[arg(long, default_value_t = 0)]
    max_height: u32,

    #[arg(long, default_value_t = 0)]
    min_width: u32,

    #[arg(long, default_value_t = 0)]
    min_height: u32,

    /// Use the fast, non-antialiased sample operator
    #[arg(long)]
    use_sample: bool,

    /// Keep the frame as is when no scaling is needed
    #[arg(long)]
    no_scale: bool,

    /// Configuration file (optional)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .init();

    info!("Starting video-thumbs v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = match &cli.config {
        Some(config_path) => {
            info!("Loading configuration from {:?}", config_path);
            Config::from_file(config_path)?
        }
        None => {
            info!("Using default configuration");
            Config::default()
        }
    };
    let config = Arc::new(config);

    let transcoder = config.extension.processor_binary();
    if !ProcessRunner::is_available(&transcoder).await {
        warn!("{:?} is not available, a placeholder will be generated", transcoder);
    }

    let mut bus = EventBus::new();
    let repository = Arc::new(DirectoryRepository::new(&cli.output_dir));
    if !dispatch::register(&mut bus, config, repository)? {
        info!("Nothing to do: previews are disabled");
        return Ok(());
    }

    let task: TaskType = cli.task.parse()?;
    let request = ProcessingRequest::new(task, cli.width, cli.height)
        .with_max(cli.max_width, cli.max_height)
        .with_min(cli.min_width, cli.min_height)
        .with_sample(cli.use_sample)
        .with_no_scale(cli.no_scale);

    let event = FileProcessingEvent {
        source: SourceMedia::from_local_path(&cli.input),
        task: cli.task.clone(),
        request,
        processed: ProcessedFileState::new_file(),
    };

    let mut failed = false;
    for outcome in bus.publish(&event).await {
        match outcome {
            Ok(HandlerOutcome::Processed(record)) => {
                info!("Preview saved to: {:?} ({}x{}, {} bytes)",
                      record.path, record.width, record.height, record.size);
            }
            Ok(HandlerOutcome::Ignored(reason)) => {
                info!("Input was not processed: {:?}", reason);
            }
            Err(e) => {
                error!("{}", e.user_message());
                if e.is_recoverable() {
                    info!("This failure may be temporary, try again later");
                }
                failed = true;
            }
        }
    }

    if failed {
        anyhow::bail!("Preview generation failed for {}", event.source.name);
    }

    Ok(())
}
