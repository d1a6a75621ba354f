use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::module::Module;

/// Filter strategies that can be placed into a chain
#[derive(Hash, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    /// Statistical spam classification (orthogonal sparse bigrams)
    #[display(fmt = "osbf")]
    Osbf,
    /// Script driven filtering
    #[display(fmt = "sieve")]
    Sieve,
}

impl FilterKind {
    pub fn module(&self) -> Module {
        match self {
            FilterKind::Osbf => Module::SpamFilter,
            FilterKind::Sieve => Module::Sieve,
        }
    }
}

/// Represents the global filtering configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub debug: bool,
    /// Directory holding the data files of every filter
    pub data_dir: Option<PathBuf>,
    /// Name of the chain built from `chain`
    pub chain_name: String,
    /// Filters to run, in order
    pub chain: Vec<FilterKind>,
}

impl Default for Config {
    fn default() -> Self {
        Config::new()
    }
}

// Implementation to create, load and save the config
impl Config {
    /// Creates the configuration
    /// # Examples
    ///
    /// ```
    /// use beam::config::Config;
    /// let config = Config::new();
    /// ```
    pub fn new() -> Config {
        Config {
            debug: false,
            data_dir: None,
            chain_name: "default".into(),
            chain: vec![FilterKind::Osbf],
        }
    }

    /// Loads and return the parsed TOML configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Config, Error> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::ConfigNotFound);
        }
        let config_data = std::fs::read_to_string(path)?;
        toml::from_str(&config_data).map_err(Error::from)
    }

    /// Loads and return the parsed TOML configuration from reader
    pub fn from_reader<R: Read>(reader: &mut R) -> Result<Config, Error> {
        let mut data = String::new();
        reader.read_to_string(&mut data)?;
        toml::from_str(&data).map_err(Error::from)
    }

    /// Saves the configuration to disk
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let config_data = toml::to_string(&self)?;
        std::fs::write(path, config_data)?;
        Ok(())
    }

    /// Saves the configuration to writer
    pub fn save_to_writer<W: Write>(&self, writer: &mut W) -> Result<(), Error> {
        let config_data = toml::to_string(&self)?;
        writer.write_all(config_data.as_bytes())?;
        writer.flush()?;
        Ok(())
    }
}
