//! CLI argument definitions using clap derive macros.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Retrieve data files from the data.go.kr public data portal.
///
/// Resolves a public data id (publicDataPk) to its file through the portal's
/// own page flow and saves or serves the bytes.
#[derive(Parser, Debug)]
#[command(name = "oda-fetch")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: $XDG_CONFIG_HOME/oda-fetch/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Origin base URL override
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Per-request timeout in seconds (1-3600)
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub timeout: Option<u64>,

    /// Highest candidate file sequence to probe (1-100)
    #[arg(long, global = true, value_parser = clap::value_parser!(u32).range(1..=100))]
    pub max_candidates: Option<u32>,

    /// Accept text/html download payloads instead of treating them as origin errors
    #[arg(long, global = true)]
    pub allow_html: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Retrieve one file and save it to disk
    Fetch(FetchArgs),
    /// Serve retrieved files over HTTP
    Serve(ServeArgs),
}

/// Arguments for `fetch`.
#[derive(clap::Args, Debug)]
pub struct FetchArgs {
    /// Public data id (publicDataPk)
    pub public_data_pk: String,

    /// Candidate file sequence to probe first (fileDetailSn)
    #[arg(long = "sn", value_parser = clap::value_parser!(u32).range(1..))]
    pub file_detail_sn: Option<u32>,

    /// Output directory, or a file path whose parent directory is used
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for `serve`.
#[derive(clap::Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(short, long)]
    pub bind: Option<SocketAddr>,
}
