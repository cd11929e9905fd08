//! tips: slice, filter and inspect the devices on a tailnet.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "tips")]
#[command(about = "Tailnet IPs - query the devices on a tailnet")]
#[command(version)]
struct Cli {
    /// Devices to show: name prefixes joined by `|`, or `@` for all, with an
    /// optional [from:to] slice
    #[arg(value_name = "SELECTOR")]
    selector: Vec<String>,

    /// Filter on device attributes, e.g. "linux, (prod | +exit)"
    #[arg(short = 'f', long = "filter")]
    filter: Option<String>,

    /// Slice of the results to show, e.g. [0:10]
    #[arg(long = "slice")]
    slice: Option<String>,

    /// Sort order, e.g. "user,machine:dsc"
    #[arg(short = 's', long = "sort")]
    sort: Option<String>,

    /// Tailnet to query (defaults to the API key's tailnet)
    #[arg(short = 't', long = "tailnet")]
    tailnet: Option<String>,

    /// Ignore the local index and fetch fresh data
    #[arg(short = 'n', long = "nocache")]
    nocache: bool,

    /// Seconds a local index stays fresh
    #[arg(long = "cache-ttl", value_name = "SECS")]
    cache_ttl: Option<u64>,

    /// Read devices from a JSON file instead of the API
    #[arg(long = "devices-file", value_name = "PATH")]
    devices_file: Option<PathBuf>,

    /// Print devices as JSON
    #[arg(long = "json", conflicts_with = "ips")]
    json: bool,

    /// Print only the first address of each device
    #[arg(long = "ips")]
    ips: bool,

    /// Debug logging (overrides TIPS_LOG)
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("TIPS_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let output = if cli.json {
        commands::OutputFormat::Json
    } else if cli.ips {
        commands::OutputFormat::Ips
    } else {
        commands::OutputFormat::Table
    };

    let opts = commands::QueryOptions {
        selector: cli.selector.join(" "),
        filter: cli.filter,
        slice: cli.slice,
        sort: cli.sort,
        tailnet: cli.tailnet,
        nocache: cli.nocache,
        cache_ttl: cli.cache_ttl,
        devices_file: cli.devices_file,
        output,
    };

    if let Err(e) = commands::devices(&opts) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
