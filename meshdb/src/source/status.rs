//! Enrichment from the local client's `status --json` output.
//!
//! Only works from inside the tailnet. Anything that goes wrong here is
//! logged and ignored: devices are still usable without it.

use std::collections::HashMap;
use std::process::Command;

use serde::Deserialize;

use crate::device::{Device, EnrichedInfo};
use crate::{Error, Result};

#[derive(Debug, Deserialize)]
struct StatusReport {
    #[serde(rename = "Self")]
    self_node: Option<PeerStatus>,
    #[serde(rename = "Peer", default)]
    peers: HashMap<String, PeerStatus>,
}

#[derive(Debug, Deserialize)]
struct PeerStatus {
    #[serde(rename = "PublicKey", default)]
    public_key: String,
    #[serde(rename = "DNSName", default)]
    dns_name: String,
    #[serde(rename = "Online", default)]
    online: bool,
    #[serde(rename = "ExitNodeOption", default)]
    exit_node_option: bool,
}

impl PeerStatus {
    fn into_info(self, is_self: bool) -> (String, EnrichedInfo) {
        let info = EnrichedInfo {
            dns_name: self.dns_name,
            is_self,
            online: self.online,
            has_exit_node_option: self.exit_node_option,
        };
        (self.public_key, info)
    }
}

/// Parse status output into enrichment keyed by node key.
pub fn parse_status(output: &[u8]) -> Result<HashMap<String, EnrichedInfo>> {
    let report: StatusReport = serde_json::from_slice(output)?;

    let mut infos: HashMap<String, EnrichedInfo> = report
        .peers
        .into_values()
        .map(|peer| peer.into_info(false))
        .collect();
    if let Some(me) = report.self_node {
        let (key, info) = me.into_info(true);
        infos.insert(key, info);
    }
    infos.remove("");
    Ok(infos)
}

/// Attach enrichment to every device whose node key is known. Returns how
/// many devices matched.
pub fn enrich(devices: &mut [Device], infos: &HashMap<String, EnrichedInfo>) -> usize {
    let mut matched = 0;
    for device in devices.iter_mut() {
        if let Some(info) = infos.get(&device.node_key) {
            device.enriched_info = Some(info.clone());
            matched += 1;
        }
    }
    matched
}

/// Runs `<program> status --json`.
#[derive(Debug, Clone)]
pub struct StatusCommand {
    program: String,
}

impl StatusCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn query(&self) -> Result<HashMap<String, EnrichedInfo>> {
        let output = Command::new(&self.program)
            .args(["status", "--json"])
            .output()
            .map_err(|e| Error::Fetch(format!("running {}: {}", self.program, e)))?;

        if !output.status.success() {
            return Err(Error::Fetch(format!(
                "{} status exited with {}",
                self.program, output.status
            )));
        }
        parse_status(&output.stdout)
    }

    /// Best effort: failures are logged at debug level and leave devices
    /// untouched.
    pub fn enrich(&self, devices: &mut [Device]) {
        match self.query() {
            Ok(infos) => {
                let matched = enrich(devices, &infos);
                tracing::debug!(matched, total = devices.len(), "enriched devices from status");
            }
            Err(e) => tracing::debug!(error = %e, "status enrichment skipped"),
        }
    }
}
