//! CLI command implementations.

use std::io::{self, Write};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use meshdb::{
    parse_filter, parse_selector, parse_slice, parse_sort, process, CachedRepository, Config,
    Device, DeviceSource, ProcessOptions, Result, Store,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Ips,
}

/// Everything the command line can ask for.
pub struct QueryOptions {
    pub selector: String,
    pub filter: Option<String>,
    pub slice: Option<String>,
    pub sort: Option<String>,
    pub tailnet: Option<String>,
    pub nocache: bool,
    pub cache_ttl: Option<u64>,
    pub devices_file: Option<PathBuf>,
    pub output: OutputFormat,
}

/// Flags win over the config file.
fn load_config(opts: &QueryOptions) -> Result<Config> {
    let mut config = Config::load()?;
    if let Some(tailnet) = &opts.tailnet {
        config.tailnet = tailnet.clone();
    }
    if let Some(ttl) = opts.cache_ttl {
        config.cache_ttl_secs = ttl;
    }
    if let Some(path) = &opts.devices_file {
        config.devices_file = Some(path.clone());
    }
    if let Some(sort) = &opts.sort {
        config.sort = Some(sort.clone());
    }
    Ok(config)
}

/// Look up devices, then filter, sort, slice and print them.
pub fn devices(opts: &QueryOptions) -> Result<()> {
    let config = load_config(opts)?;

    // Parse everything up front so bad input never triggers a fetch.
    let selector = parse_selector(&opts.selector)?;
    let filter = parse_filter(opts.filter.as_deref().unwrap_or(""))?;
    let slice = parse_slice(opts.slice.as_deref().unwrap_or(""))?;
    let sort = parse_sort(config.sort.as_deref().unwrap_or(""))?;

    tracing::debug!(%selector, "parsed selector");
    if let Some(expr) = &filter {
        tracing::debug!("filter:\n{}", expr.dump());
    }

    let source = DeviceSource::from_config(&config)?;
    let store = Store::new(config.scope(), config.index_dir());
    let mut repo =
        CachedRepository::new(source, store, config.cache_ttl()).force_refresh(opts.nocache);

    let found = repo.search(selector.clone())?;
    let timings = repo.timings();
    tracing::debug!(
        cache_hit = timings.cache_hit,
        cache_latency = ?timings.cache_latency,
        source_latency = ?timings.source_latency,
        count = found.len(),
        "searched devices"
    );

    let total = found.len();
    let options = ProcessOptions {
        filter,
        sort,
        // A slice on the selector beats --slice.
        slice: selector.slice.filter(|s| s.is_defined()).or(slice),
    };
    let shown = process(found, &options);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match opts.output {
        OutputFormat::Json => write_json(&mut out, &shown)?,
        OutputFormat::Ips => write_ips(&mut out, &shown)?,
        OutputFormat::Table => {
            writeln!(out, "Tailnet: {}  Machines: {}/{}", config.tailnet, shown.len(), total)?;
            write_table(&mut out, &shown, Utc::now())?;
        }
    }
    Ok(())
}

fn write_json(out: &mut impl Write, devices: &[Device]) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, devices)?;
    writeln!(out)?;
    Ok(())
}

fn write_ips(out: &mut impl Write, devices: &[Device]) -> Result<()> {
    for device in devices {
        if let Some(addr) = device.addresses.first() {
            writeln!(out, "{}", addr)?;
        }
    }
    Ok(())
}

const HEADERS: [&str; 8] = [
    "No", "Machine", "Address", "Tags", "User", "Version", "Exit", "LastSeen",
];

fn row(idx: usize, device: &Device, now: DateTime<Utc>) -> [String; 8] {
    let exit = match &device.enriched_info {
        Some(info) if info.has_exit_node_option => "yes",
        Some(_) => "no",
        None => "-",
    };
    [
        idx.to_string(),
        device.short_name().to_string(),
        device.addresses.first().cloned().unwrap_or_default(),
        device.tags().collect::<Vec<_>>().join(","),
        device.user.clone(),
        device.version().to_string(),
        exit.to_string(),
        last_seen(device, now),
    ]
}

fn write_table(out: &mut impl Write, devices: &[Device], now: DateTime<Utc>) -> Result<()> {
    let rows: Vec<[String; 8]> = devices
        .iter()
        .enumerate()
        .map(|(i, d)| row(i, d, now))
        .collect();

    let mut widths = HEADERS.map(str::len);
    for r in &rows {
        for (w, cell) in widths.iter_mut().zip(r.iter()) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut line = |cells: &[&str]| -> io::Result<()> {
        let padded: Vec<String> = cells
            .iter()
            .zip(widths.iter())
            .map(|(cell, w)| format!("{:<w$}", cell, w = w))
            .collect();
        writeln!(out, "{}", padded.join("  ").trim_end())
    };

    line(&HEADERS[..])?;
    for r in &rows {
        let cells: Vec<&str> = r.iter().map(String::as_str).collect();
        line(&cells)?;
    }
    Ok(())
}

/// `online` when the local node says so, otherwise a coarse age.
fn last_seen(device: &Device, now: DateTime<Utc>) -> String {
    if device.is_online() {
        return "online".to_string();
    }
    let Some(seen) = device.last_seen else {
        return "-".to_string();
    };

    let secs = (now - seen).num_seconds().max(0);
    match secs {
        0..=59 => "just now".to_string(),
        60..=3599 => format!("{}m ago", secs / 60),
        3600..=86_399 => format!("{}h ago", secs / 3600),
        _ => format!("{}d ago", secs / 86_400),
    }
}
