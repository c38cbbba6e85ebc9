//! CLI entry point for oda-fetch.

use std::io::{self, IsTerminal};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use oda_fetch::config::{DEFAULT_BIND, DEFAULT_OUTPUT_DIR};
use oda_fetch::{FileConfig, OriginConfig, RetrievalClient, load_file_config, server};
use tracing::{debug, info};
use url::Url;

mod cli;

use cli::{Args, Command, FetchArgs, ServeArgs};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let file_config = load_file_config(args.config.as_deref())?.unwrap_or_default();
    let origin = build_origin_config(&args, &file_config)?;
    let client = RetrievalClient::new(origin).context("Invalid origin configuration")?;

    match &args.command {
        Command::Fetch(fetch) => run_fetch(&client, fetch, &file_config, args.quiet).await,
        Command::Serve(serve) => run_serve(client, serve, &file_config).await,
    }
}

/// Layers CLI flags over the config file over built-in defaults.
fn build_origin_config(args: &Args, file_config: &FileConfig) -> Result<OriginConfig> {
    let mut origin = OriginConfig::default().merged_with(file_config)?;

    if let Some(base_url) = &args.base_url {
        origin.base_url =
            Url::parse(base_url).with_context(|| format!("Invalid --base-url: {base_url}"))?;
    }
    if let Some(secs) = args.timeout {
        origin.request_timeout = Duration::from_secs(secs);
    }
    if let Some(max_candidates) = args.max_candidates {
        origin.max_candidates = max_candidates;
    }
    if args.allow_html {
        origin.reject_html_payload = false;
    }
    Ok(origin)
}

async fn run_fetch(
    client: &RetrievalClient,
    fetch: &FetchArgs,
    file_config: &FileConfig,
    quiet: bool,
) -> Result<()> {
    let output = fetch
        .output
        .clone()
        .or_else(|| file_config.output_dir.as_deref().map(directory_path))
        .unwrap_or_else(|| directory_path(Path::new(DEFAULT_OUTPUT_DIR)));

    let spinner = (!quiet && io::stderr().is_terminal())
        .then(|| start_spinner(&fetch.public_data_pk));

    let outcome = client
        .retrieve_to_disk(&fetch.public_data_pk, fetch.file_detail_sn, output)
        .await;

    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    let saved = outcome
        .with_context(|| format!("Failed to retrieve publicDataPk {}", fetch.public_data_pk))?;
    info!(
        file_name = %saved.file_name,
        content_type = %saved.content_type,
        bytes = saved.bytes_written,
        "saved"
    );
    println!("{}", saved.path.display());
    Ok(())
}

async fn run_serve(
    client: RetrievalClient,
    serve: &ServeArgs,
    file_config: &FileConfig,
) -> Result<()> {
    let addr = match serve.bind.or(file_config.bind) {
        Some(addr) => addr,
        None => DEFAULT_BIND
            .parse::<SocketAddr>()
            .context("Invalid default bind address")?,
    };
    server::serve(client, addr).await
}

/// A bare directory name needs a trailing separator to be treated as a
/// directory before it exists.
fn directory_path(dir: &Path) -> PathBuf {
    let mut raw = dir.as_os_str().to_owned();
    raw.push(std::path::MAIN_SEPARATOR_STR);
    PathBuf::from(raw)
}

fn start_spinner(public_data_pk: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(format!("Retrieving publicDataPk {public_data_pk}..."));
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}
