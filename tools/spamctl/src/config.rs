use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Contents of a `spamctl` configuration file
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub beam: beam::config::Config,
    pub osbf: beam_sf_osbf::Config,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
        let data = std::fs::read_to_string(path)?;
        let config = toml::from_str(&data)?;
        Ok(config)
    }

    /// Directory of the class tables: the `osbf` path, falling back to the `beam` data directory
    pub fn data_dir(&self) -> Option<&PathBuf> {
        self.osbf.path().or(self.beam.data_dir.as_ref())
    }
}
