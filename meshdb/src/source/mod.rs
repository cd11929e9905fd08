//! Sources - where fresh records come from when the index is stale.
//!
//! - `remote`: the control plane's devices endpoint
//! - `status`: local status command, used to enrich remote records
//! - `file`: a JSON dump on disk, for offline use and tests

mod file;
mod remote;
pub mod status;

pub use file::FileSource;
pub use remote::RemoteSource;
pub use status::StatusCommand;

use crate::config::{Config, API_KEY_ENV};
use crate::device::Device;
use crate::store::Indexable;
use crate::{Error, Result};

/// Anything that can produce the complete entity list for a scope.
pub trait Source {
    type Item: Indexable;

    /// Fetch every entity. Called once per index rebuild.
    fn fetch_all(&self) -> Result<Vec<Self::Item>>;
}

/// The device source selected by configuration.
pub enum DeviceSource {
    Remote(RemoteSource),
    File(FileSource),
}

impl DeviceSource {
    /// A configured devices file wins; otherwise the remote API, which
    /// needs an API key.
    pub fn from_config(config: &Config) -> Result<Self> {
        if let Some(path) = &config.devices_file {
            return Ok(Self::File(FileSource::new(path)));
        }

        let api_key = config
            .api_key()
            .ok_or_else(|| Error::Config(format!("{} is not set", API_KEY_ENV)))?;
        let remote = RemoteSource::new(
            &config.api_base_url,
            &config.tailnet,
            api_key,
            config.api_timeout(),
        )?
        .with_status(StatusCommand::new(&config.cli_path));
        Ok(Self::Remote(remote))
    }
}

impl Source for DeviceSource {
    type Item = Device;

    fn fetch_all(&self) -> Result<Vec<Device>> {
        match self {
            Self::Remote(s) => s.fetch_all(),
            Self::File(s) => s.fetch_all(),
        }
    }
}
