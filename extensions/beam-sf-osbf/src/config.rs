use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::classifier::{Class, MIN_PMAX_PMIN_RATIO};
use crate::learner::LearnWeighting;
use crate::table::{Grooming, DEFAULT_FILE_LENGTH, MICROGROOM_CHAIN_LENGTH, MICROGROOM_STOP_AFTER};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    path: Option<PathBuf>,
    spam_file: String,
    tofu_file: String,
    buckets: u32,
    microgroom: bool,
    microgroom_chain_length: usize,
    microgroom_stop_after: usize,
    min_pmax_pmin_ratio: f64,
    prime_window: bool,
    learn_weighting: LearnWeighting,
    max_text_size: Option<usize>,
    spam_folder: Option<String>,
}

impl Config {
    /// Directory holding the class tables. Tables only live in memory when unset.
    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    pub fn spam_file(&self) -> &str {
        &self.spam_file
    }

    pub fn tofu_file(&self) -> &str {
        &self.tofu_file
    }

    /// Bucket count of newly created tables
    pub fn buckets(&self) -> u32 {
        self.buckets
    }

    pub fn microgroom(&self) -> bool {
        self.microgroom
    }

    pub fn microgroom_chain_length(&self) -> usize {
        self.microgroom_chain_length
    }

    pub fn microgroom_stop_after(&self) -> usize {
        self.microgroom_stop_after
    }

    pub fn min_pmax_pmin_ratio(&self) -> f64 {
        self.min_pmax_pmin_ratio
    }

    pub fn prime_window(&self) -> bool {
        self.prime_window
    }

    pub fn learn_weighting(&self) -> LearnWeighting {
        self.learn_weighting
    }

    pub fn max_text_size(&self) -> Option<usize> {
        self.max_text_size
    }

    /// Folder assigned to messages classified as spam when used in a filter chain
    pub fn spam_folder(&self) -> Option<&str> {
        self.spam_folder.as_deref()
    }
}

impl Config {
    pub fn path_mut(&mut self) -> &mut Option<PathBuf> {
        &mut self.path
    }

    pub fn spam_file_mut(&mut self) -> &mut String {
        &mut self.spam_file
    }

    pub fn tofu_file_mut(&mut self) -> &mut String {
        &mut self.tofu_file
    }

    pub fn buckets_mut(&mut self) -> &mut u32 {
        &mut self.buckets
    }

    pub fn microgroom_mut(&mut self) -> &mut bool {
        &mut self.microgroom
    }

    pub fn microgroom_chain_length_mut(&mut self) -> &mut usize {
        &mut self.microgroom_chain_length
    }

    pub fn microgroom_stop_after_mut(&mut self) -> &mut usize {
        &mut self.microgroom_stop_after
    }

    pub fn min_pmax_pmin_ratio_mut(&mut self) -> &mut f64 {
        &mut self.min_pmax_pmin_ratio
    }

    pub fn prime_window_mut(&mut self) -> &mut bool {
        &mut self.prime_window
    }

    pub fn learn_weighting_mut(&mut self) -> &mut LearnWeighting {
        &mut self.learn_weighting
    }

    pub fn max_text_size_mut(&mut self) -> &mut Option<usize> {
        &mut self.max_text_size
    }

    pub fn spam_folder_mut(&mut self) -> &mut Option<String> {
        &mut self.spam_folder
    }
}

impl Config {
    /// Grooming limits, or `None` when microgrooming is disabled
    pub fn grooming(&self) -> Option<Grooming> {
        self.microgroom.then_some(Grooming {
            chain_length: self.microgroom_chain_length,
            stop_after: self.microgroom_stop_after,
        })
    }

    /// Location of the table file of a class
    pub fn table_path(&self, class: Class) -> Option<PathBuf> {
        let file = match class {
            Class::Spam => &self.spam_file,
            Class::Tofu => &self.tofu_file,
        };
        self.path.as_ref().map(|dir| dir.join(file))
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            path: None,
            spam_file: "spam.osbf".into(),
            tofu_file: "tofu.osbf".into(),
            buckets: DEFAULT_FILE_LENGTH,
            microgroom: true,
            microgroom_chain_length: MICROGROOM_CHAIN_LENGTH,
            microgroom_stop_after: MICROGROOM_STOP_AFTER,
            min_pmax_pmin_ratio: MIN_PMAX_PMIN_RATIO,
            prime_window: true,
            learn_weighting: LearnWeighting::Unit,
            max_text_size: Some(512 * 1024),
            spam_folder: Some("spam".into()),
        }
    }
}

impl Config {
    /// Test configuration. Used for in-memory
    pub fn testing() -> Config {
        Config {
            path: None,
            buckets: 1021,
            ..Default::default()
        }
    }

    /// Minimal production configuration
    pub fn minimal<P: AsRef<Path>>(path: P) -> Config {
        Config {
            path: Some(path.as_ref().to_path_buf()),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod test {
    use super::Config;
    use crate::classifier::Class;
    use crate::learner::LearnWeighting;

    #[test]
    fn table_paths_follow_the_directory() {
        let config = Config::minimal("/var/lib/beam");
        assert_eq!(
            config.table_path(Class::Spam),
            Some("/var/lib/beam/spam.osbf".into())
        );
        assert_eq!(
            config.table_path(Class::Tofu),
            Some("/var/lib/beam/tofu.osbf".into())
        );
        assert_eq!(Config::testing().table_path(Class::Spam), None);
    }

    #[test]
    fn partial_toml_keeps_defaults() -> anyhow::Result<()> {
        let config: Config = toml::from_str(
            r#"
            buckets = 4099
            microgroom = false
            learn_weighting = "distance"
            "#,
        )?;
        assert_eq!(config.buckets(), 4099);
        assert_eq!(config.grooming(), None);
        assert_eq!(config.learn_weighting(), LearnWeighting::Distance);
        assert_eq!(config.spam_file(), "spam.osbf");
        assert!(config.prime_window());
        Ok(())
    }

    #[test]
    fn accessors_write_through() {
        let mut config = Config::testing();
        *config.microgroom_chain_length_mut() = 7;
        *config.spam_folder_mut() = None;
        let grooming = config.grooming();
        assert_eq!(grooming.map(|g| g.chain_length), Some(7));
        assert_eq!(config.spam_folder(), None);
    }
}
