use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;
use std::path::{Path, PathBuf};
use tokio::time::Duration;

use local_picture_saver::config::{self, Settings};
use local_picture_saver::security::InputValidator;
use local_picture_saver::uploader::progress_tracker::{
    new_progress_state, record_unreadable, safe_progress_read, ProgressState, UploadProgress,
};
use local_picture_saver::uploader::{retry_failed_uploads, RetryPolicy, UploadOutcome};
use local_picture_saver::{AppError, MediaItem, UploadClient, UploadQueue, UploadResult};

/// Upload photos and videos to a LocalPictureSaver server.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Photos or videos to upload (at most 10)
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Server address (overrides the settings file)
    #[arg(long)]
    server: Option<String>,

    /// API token sent as a bearer token (overrides the settings file)
    #[arg(long)]
    token: Option<String>,

    /// Number of uploads in flight at once
    #[arg(long)]
    concurrency: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Retry rounds for failures worth retrying
    #[arg(long)]
    retries: Option<u32>,

    /// Settings file to read instead of the default location
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print results and progress as JSON instead of plain lines
    #[arg(long)]
    json: bool,
}

/// Starts logging before anything else can fail. Returns true when
/// `RUST_LOG` is set, in which case it wins over the settings file.
fn init_logging() -> bool {
    let from_env = std::env::var_os("RUST_LOG").is_some();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("trace")).init();
    if !from_env {
        log::set_max_level(LevelFilter::Info);
    }

    from_env
}

fn merge_settings(args: &Args, mut settings: Settings) -> Result<Settings> {
    if let Some(server) = &args.server {
        settings.server_address = server.clone();
    }
    if let Some(token) = &args.token {
        settings.api_token = token.clone();
    }
    if let Some(concurrency) = args.concurrency {
        settings.concurrency = concurrency;
    }
    if let Some(timeout_secs) = args.timeout_secs {
        settings.timeout_secs = timeout_secs;
    }
    if let Some(retries) = args.retries {
        settings.max_retries = retries;
    }

    config::validate_settings(&settings).context("invalid settings")?;
    Ok(settings)
}

fn load_failure_message(path: &Path, error: &AppError) -> String {
    if error.is_permanent() {
        format!("Skipping {}: {}", path.display(), error)
    } else {
        format!(
            "Could not read {} (trying again may help): {}",
            path.display(),
            error
        )
    }
}

/// Reads every selected file. Files that cannot be read are counted in
/// `progress` as failures and left out of the returned batch.
async fn load_items(paths: &[PathBuf], progress: &ProgressState) -> Vec<MediaItem> {
    let mut items = Vec::with_capacity(paths.len());

    for path in paths {
        match MediaItem::from_path(path).await {
            Ok(item) => items.push(item),
            Err(e) => {
                log::error!("{}", load_failure_message(path, &e));
                let filename = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                record_unreadable(progress, &filename, &e.to_string());
            }
        }
    }

    items
}

fn json_report(
    summary: &str,
    results: &[UploadResult],
    progress: Option<&UploadProgress>,
) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&serde_json::json!({
        "summary": summary,
        "results": results,
        "progress": progress,
    }))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level_from_env = init_logging();

    let file_settings = match &args.config {
        Some(path) => config::load_settings_from(path),
        None => config::load_settings(),
    }
    .context("loading settings")?;
    let settings = merge_settings(&args, file_settings)?;

    if !log_level_from_env {
        log::set_max_level(settings.log_level_filter());
    }

    InputValidator::validate_selection_size(args.files.len())?;

    let progress = new_progress_state(args.files.len());
    let items = load_items(&args.files, &progress).await;
    let skipped = args.files.len() - items.len();

    let client = UploadClient::with_timeout(Duration::from_secs(settings.timeout_secs))?;
    let queue = UploadQueue::new(client)
        .with_concurrency(settings.concurrency)
        .with_progress(progress.clone());

    let cancel = queue.cancellation_token();
    ctrlc::set_handler(move || {
        log::warn!("Interrupted, cancelling uploads");
        cancel.cancel();
    })
    .context("installing Ctrl-C handler")?;

    // Settings are snapshotted here; nothing below re-reads them.
    let upload_config = settings.upload_config();
    let results = queue
        .process(&items, upload_config.clone())
        .await
        .context("no readable media files to upload")?;
    let results = retry_failed_uploads(
        &queue,
        &items,
        results,
        &upload_config,
        &RetryPolicy::with_max_retries(settings.max_retries),
    )
    .await;

    let snapshot = safe_progress_read(&progress, "final summary", |p| p.clone());
    let summary = snapshot.as_ref().map(|p| p.summary()).unwrap_or_else(|| {
        format!(
            "{} of {} uploaded",
            results.iter().filter(|r| r.is_success()).count(),
            args.files.len()
        )
    });

    if args.json {
        println!("{}", json_report(&summary, &results, snapshot.as_ref())?);
    } else {
        for result in &results {
            match &result.outcome {
                UploadOutcome::Success => println!("ok      {}", result.filename),
                other => println!("failed  {} ({})", result.filename, other),
            }
        }
        println!("{}", summary);
    }

    if skipped > 0 || results.iter().any(|r| !r.is_success()) {
        std::process::exit(1);
    }

    Ok(())
}
