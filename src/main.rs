//! Image Uploadr - upload images and print their public URLs
//!
//! Prints the uploaded URL for each file, or the local path when the upload
//! is skipped. Failures are reported on stderr.

use clap::Parser;
use image_uploadr::{config::Config, upload::Uploader, UploadOutcome};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Image Uploadr - upload images to a configured endpoint
#[derive(Parser, Debug)]
#[command(name = "image-uploadr")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Override upload-url (also enables upload)
    #[arg(long)]
    url: Option<String>,

    /// Override upload-format (multipart, json, binary)
    #[arg(long)]
    format: Option<String>,

    /// Override upload-response-path
    #[arg(long)]
    response_path: Option<String>,

    /// Extra `Name: Value` header, may be repeated
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,

    /// Print Prometheus metrics to stderr on exit
    #[arg(long)]
    metrics: bool,

    /// Image files to upload
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    apply_overrides(&mut config, &args);

    init_logging(&config, args.log_level.as_deref())?;

    info!("Starting Image Uploadr v{}", image_uploadr::VERSION);
    if let Some(path) = &args.config {
        info!("Loaded configuration from {:?}", path);
    }

    let uploader = Uploader::new(config.upload)?;
    match uploader.config().endpoint() {
        Some(endpoint) if uploader.config().enabled => info!(endpoint = %endpoint, "Upload enabled"),
        _ => info!("Upload disabled or unconfigured, printing local paths"),
    }

    let mut failed = false;
    for file in &args.files {
        match uploader.upload(file).await {
            UploadOutcome::Success(url) => println!("{url}"),
            UploadOutcome::Fallback => println!("{}", file.display()),
            UploadOutcome::Failure(message) => {
                failed = true;
                eprintln!("{}: {}", file.display(), message);
            }
        }
    }

    if args.metrics {
        eprint!("{}", image_uploadr::metrics::gather_text());
    }

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn apply_overrides(config: &mut Config, args: &Args) {
    let upload = &mut config.upload;
    if let Some(url) = &args.url {
        upload.url = Some(url.clone());
        upload.enabled = true;
    }
    if let Some(format) = &args.format {
        upload.format = format.clone();
    }
    if let Some(rule) = &args.response_path {
        upload.response_path = rule.clone();
    }
    upload.headers.extend(args.headers.iter().cloned());
}

/// Initialize logging on stderr; `RUST_LOG` takes precedence when set.
fn init_logging(config: &Config, level_override: Option<&str>) -> anyhow::Result<()> {
    let level = level_override
        .unwrap_or(&config.logging.level)
        .to_lowercase();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    if config.logging.json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }

    Ok(())
}
