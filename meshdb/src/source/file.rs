//! Devices read from a JSON array on disk.

use std::path::{Path, PathBuf};

use super::Source;
use crate::device::Device;
use crate::{Error, Result};

pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Source for FileSource {
    type Item = Device;

    fn fetch_all(&self) -> Result<Vec<Device>> {
        let contents = std::fs::read(&self.path)
            .map_err(|e| Error::Fetch(format!("reading {}: {}", self.path.display(), e)))?;
        let devices: Vec<Device> = serde_json::from_slice(&contents)?;
        tracing::debug!(file = %self.path.display(), count = devices.len(), "loaded devices file");
        Ok(devices)
    }
}
