use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};

use tubefetch::core::models::Resolution;
use tubefetch::ui::{drain_pending, pump_events, AudioMode, ConsoleSink, DownloadForm, EventEmitter, Tab};
use tubefetch::utils::logging::init_tracing;
use tubefetch::{spawn_download_runtime, AppConfig, Locator, YtDlpResolver};

#[derive(Parser)]
#[command(name = "tubefetch")]
#[command(author, version, about = "Download the audio or video of YouTube links with yt-dlp", long_about = None)]
struct Cli {
    /// Video or playlist URL, prompted for when omitted
    url: Option<String>,

    /// Download the audio track (the default)
    #[arg(long, conflicts_with = "video")]
    audio: bool,

    /// Download video at RES (e.g. 1080p, 720p); without a value uses the configured default
    #[arg(long, value_name = "RES", num_args = 0..=1)]
    video: Option<Option<Resolution>>,

    /// Download the audio of every entry of a playlist
    #[arg(long, conflicts_with = "video")]
    playlist: bool,

    /// Destination directory, defaults to download.destination_path
    #[arg(short, long, value_name = "DIR")]
    dest: Option<PathBuf>,

    /// Configuration file to use instead of the platform default
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// yt-dlp executable
    #[arg(long = "yt-dlp", value_name = "PATH")]
    yt_dlp: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn prompt_url() -> Result<String> {
    print!("URL: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read URL from stdin")?;
    Ok(line.trim().to_string())
}

fn is_playlist_page(url: &str) -> bool {
    Locator::parse(url)
        .map(|locator| locator.is_playlist_page())
        .unwrap_or(false)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load_or_default(cli.config.as_deref());
    let level = if cli.verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    init_tracing(level);
    info!("🚀 Starting {} v{}", tubefetch::NAME, tubefetch::VERSION);

    if let Some(path) = cli.yt_dlp {
        config.youtube.binary_path = path;
    }

    let url = match cli.url {
        Some(url) => url,
        None => prompt_url()?,
    };

    let mut form = DownloadForm::new(url);
    if cli.audio {
        form.select_tab(Tab::Audio);
    }
    match cli.video {
        Some(resolution) => {
            form.select_tab(Tab::Video);
            form.set_video_resolution(resolution.unwrap_or(config.download.default_resolution));
        }
        None => {
            if cli.playlist || is_playlist_page(&form.url) {
                form.set_audio_mode(AudioMode::Playlist);
            }
        }
    }

    let destination = cli
        .dest
        .unwrap_or_else(|| config.download.destination_path.clone());

    let (events, mut rx) = EventEmitter::channel();
    let mut sink = ConsoleSink::new();

    let Some(request) = form.submit(Some(destination), &events) else {
        drain_pending(&mut rx, &mut sink);
        std::process::exit(2);
    };

    let resolver = Arc::new(YtDlpResolver::new(config.youtube.clone())?);
    if !resolver.check_available().await? {
        bail!(
            "yt-dlp not found at {:?}; install it or pass --yt-dlp",
            config.youtube.binary_path
        );
    }

    let handle = spawn_download_runtime(resolver, events)?;
    let run = tokio::spawn({
        let handle = handle.clone();
        async move { handle.submit(request).await }
    });

    let pump = pump_events(&mut rx, &mut sink);
    tokio::pin!(pump);
    let mut interrupted = false;
    let summary = loop {
        tokio::select! {
            summary = &mut pump => break summary,
            signal = tokio::signal::ctrl_c(), if !interrupted => {
                signal.context("Failed to listen for Ctrl-C")?;
                interrupted = true;
                let cancelled = handle.cancel_all().await?;
                warn!("Interrupted, cancelled {} running download(s)", cancelled);
            }
        }
    };

    let outcomes = run.await.context("Download task panicked")??;
    let failed = outcomes.iter().filter(|o| !o.is_success()).count();
    info!(
        "Finished with {} outcome(s), {} failed",
        outcomes.len(),
        failed
    );

    if summary.is_none() || failed > 0 || outcomes.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}
