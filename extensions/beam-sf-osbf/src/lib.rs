pub mod classifier;
pub mod config;
pub mod hasher;
pub mod learner;
pub mod store;
pub mod table;
pub mod tokenizer;

use beam::error::Error;
use beam::filter::Filter;
use beam::message::{MessageContext, Verdict};
use beam::module::Module;
use beam::spam_filter::SpamFilter;
use beam::sync::{Arc, Mutex};
use beam::{Extension, SingleHandle};
use serde::{Deserialize, Serialize};

pub use classifier::{Class, ClassStats, Classification};
pub use config::Config;
pub use learner::{LearnReport, LearnWeighting};
pub use table::{ClassTable, TableStatistics};

pub type Result<T> = std::result::Result<T, Error>;

/// Occupancy of both class tables
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub spam: TableStatistics,
    pub tofu: TableStatistics,
}

#[derive(Debug)]
struct ClassData {
    table: ClassTable,
    dirty: bool,
}

#[derive(Debug)]
struct Tables {
    spam: ClassData,
    tofu: ClassData,
}

impl Tables {
    fn get_mut(&mut self, class: Class) -> &mut ClassData {
        match class {
            Class::Spam => &mut self.spam,
            Class::Tofu => &mut self.tofu,
        }
    }
}

#[derive(Debug, Default)]
struct State {
    tables: Option<Tables>,
    last_error: String,
}

impl State {
    fn record<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            self.last_error = format!("{}: {e}", e.enum_to_string());
        }
        result
    }
}

/// Two class (spam/tofu) OSBF classifier.
///
/// The handle is cheap to clone; clones share the same tables. Tables are loaded on
/// first use and only written back by [`OsbfClassifier::store`].
#[derive(Clone)]
pub struct OsbfClassifier {
    config: Arc<Config>,
    state: Arc<Mutex<State>>,
}

impl std::fmt::Debug for OsbfClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OsbfClassifier")
            .field("config", &self.config)
            .field("loaded", &self.state.lock().tables.is_some())
            .finish()
    }
}

impl Extension for OsbfClassifier {
    fn id(&self) -> String {
        String::from("beam-sf-osbf")
    }

    fn name(&self) -> String {
        String::from("OSBF Spam Filter")
    }

    fn description(&self) -> String {
        String::from(
            "Spam filter classifying messages with orthogonal sparse bigrams and \
             Bayesian chain rule scoring",
        )
    }

    fn module(&self) -> Module {
        Module::SpamFilter
    }
}

impl SingleHandle for OsbfClassifier {}

impl OsbfClassifier {
    pub fn new(config: Config) -> Self {
        OsbfClassifier {
            config: Arc::new(config),
            state: Arc::default(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Loads both class tables if they are not loaded yet
    #[tracing::instrument(skip(self))]
    pub fn open(&self) -> Result<()> {
        self.run(None, |_| Ok(()))
    }

    /// Learns (or, with `revert`, unlearns) the text as a member of `class`
    #[tracing::instrument(skip(self, text), fields(len = text.len()))]
    pub fn train(&self, class: Class, text: &str, revert: bool) -> Result<LearnReport> {
        let config = &self.config;
        self.run(Some(text), |tables| {
            let data = tables.get_mut(class);
            let report = learner::learn(
                &mut data.table,
                hasher::features(text, config.prime_window()),
                revert,
                config.learn_weighting(),
                config.grooming(),
            )?;
            data.dirty = true;
            tracing::debug!(
                %class,
                revert,
                inserted = report.inserted,
                released = report.released,
                evicted = report.evicted,
                learnings = data.table.learnings(),
                "class table trained"
            );
            Ok(report)
        })
    }

    #[tracing::instrument(skip(self, text), fields(len = text.len()))]
    pub fn classify(&self, text: &str) -> Result<Classification> {
        let config = &self.config;
        self.run(Some(text), |tables| {
            Ok(classifier::classify(
                &tables.spam.table,
                &tables.tofu.table,
                hasher::features(text, config.prime_window()),
                config.min_pmax_pmin_ratio(),
            ))
        })
    }

    /// Writes modified or not yet existing tables to disk. Nothing is written for in-memory
    /// classifiers or when no table changed since the last store.
    #[tracing::instrument(skip(self))]
    pub fn store(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.last_error.clear();
        let result = match state.tables.as_mut() {
            Some(tables) => self.save(tables),
            None => Ok(()),
        };
        state.record(result)
    }

    /// Compacts the chains of both tables
    #[tracing::instrument(skip(self))]
    pub fn pack(&self) -> Result<()> {
        self.run(None, |tables| {
            for class in Class::ALL {
                let data = tables.get_mut(class);
                data.table.pack();
                data.dirty = true;
            }
            Ok(())
        })
    }

    pub fn statistics(&self) -> Result<Statistics> {
        self.run(None, |tables| {
            Ok(Statistics {
                spam: tables.spam.table.statistics(),
                tofu: tables.tofu.table.statistics(),
            })
        })
    }

    /// Description of the last failure, or of a table that had to be replaced by an
    /// empty one. Empty after a clean call.
    pub fn error_string(&self) -> String {
        self.state.lock().last_error.clone()
    }

    fn run<T>(&self, text: Option<&str>, op: impl FnOnce(&mut Tables) -> Result<T>) -> Result<T> {
        let mut state = self.state.lock();
        state.last_error.clear();
        let result = self.prepare(&mut state, text).and_then(op);
        state.record(result)
    }

    fn prepare<'a>(&self, state: &'a mut State, text: Option<&str>) -> Result<&'a mut Tables> {
        if let (Some(text), Some(max)) = (text, self.config.max_text_size()) {
            if text.len() > max {
                return Err(Error::MessageTooLarge {
                    size: text.len(),
                    max,
                });
            }
        }

        if state.tables.is_none() {
            let (spam, spam_dirty) = self.load(Class::Spam, &mut state.last_error)?;
            let (tofu, tofu_dirty) = self.load(Class::Tofu, &mut state.last_error)?;
            state.tables = Some(Tables {
                spam: ClassData {
                    table: spam,
                    dirty: spam_dirty,
                },
                tofu: ClassData {
                    table: tofu,
                    dirty: tofu_dirty,
                },
            });
        }
        state.tables.as_mut().ok_or(Error::ClassifierNotInitialized)
    }

    /// Loads the table of a class. The flag tells whether the table has no file yet and
    /// should be written by the next store.
    fn load(&self, class: Class, diagnostic: &mut String) -> Result<(ClassTable, bool)> {
        let buckets = self.config.buckets();
        let Some(path) = self.config.table_path(class) else {
            return Ok((ClassTable::new(buckets)?, false));
        };
        let fresh = !path.exists();

        match store::load(&path, buckets) {
            Ok(table) => Ok((table, fresh)),
            Err(e) if e.is_fatal() => {
                tracing::error!(
                    %class,
                    path = %path.display(),
                    error = %e,
                    "class table is unusable"
                );
                Err(e)
            }
            Err(e) => {
                tracing::warn!(
                    %class,
                    path = %path.display(),
                    error = %e,
                    "cannot read class table, starting with an empty one"
                );
                *diagnostic = format!("{class} table {}: {e}", path.display());
                Ok((ClassTable::new(buckets)?, false))
            }
        }
    }

    fn save(&self, tables: &mut Tables) -> Result<()> {
        for class in Class::ALL {
            let data = tables.get_mut(class);
            if !data.dirty {
                continue;
            }
            let Some(path) = self.config.table_path(class) else {
                continue;
            };
            store::save(&path, &data.table)?;
            data.dirty = false;
        }
        Ok(())
    }
}

impl Filter for OsbfClassifier {
    fn initialize(&self) -> Result<()> {
        self.open()
    }

    fn apply(&self, message: &mut MessageContext) -> Result<Verdict> {
        let result = self.classify(&message.text())?;
        message.set_spam(result.is_spam);
        if result.is_spam {
            if let Some(folder) = self.config.spam_folder() {
                message.set_folder(folder);
            }
        }
        message.add_note(format!(
            "{}: {} (pR {:.2})",
            self.id(),
            result.class(),
            result.pr()
        ));
        Ok(Verdict::from(result.is_spam))
    }

    fn sanity_check(&self) -> Result<()> {
        let config = &self.config;
        let complaint = if config.buckets() == 0 {
            "bucket count must be positive"
        } else if config.microgroom() && config.microgroom_chain_length() == 0 {
            "microgroom chain length must be positive"
        } else if config.microgroom() && config.microgroom_stop_after() == 0 {
            "microgroom stop after must be positive"
        } else if !(config.min_pmax_pmin_ratio() >= 1.0) {
            "min pmax/pmin ratio must be at least 1"
        } else if config.path().is_some() && config.spam_file() == config.tofu_file() {
            "spam and tofu tables must use different files"
        } else {
            return Ok(());
        };
        Err(Error::FilterMisconfigured {
            complaint: complaint.into(),
        })
    }
}

impl SpamFilter for OsbfClassifier {
    fn learn_as_spam(&self, text: &str) -> Result<()> {
        self.train(Class::Spam, text, false).map(|_| ())
    }

    fn unlearn_as_spam(&self, text: &str) -> Result<()> {
        self.train(Class::Spam, text, true).map(|_| ())
    }

    fn learn_as_tofu(&self, text: &str) -> Result<()> {
        self.train(Class::Tofu, text, false).map(|_| ())
    }

    fn unlearn_as_tofu(&self, text: &str) -> Result<()> {
        self.train(Class::Tofu, text, true).map(|_| ())
    }

    fn is_spam(&self, text: &str) -> Result<bool> {
        self.classify(text).map(|result| result.is_spam)
    }

    fn store(&self) -> Result<()> {
        OsbfClassifier::store(self)
    }

    fn error_string(&self) -> String {
        OsbfClassifier::error_string(self)
    }
}
