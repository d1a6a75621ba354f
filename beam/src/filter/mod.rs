pub mod chain;

use crate::error::Error;
use crate::message::{MessageContext, Verdict};
use crate::sync::{Arc, RwLock, RwLockReadGuard};
use crate::{Extension, SingleHandle};
use dyn_clone::DynClone;

pub use chain::FilterChain;

/// Filter interface used by the [`FilterChain`] to run any filtering strategy against a message in
/// a uniform way. Strategies (statistical classification, scripted rules, ...) live in their own
/// extension crates and are selected through configuration.
pub trait Filter: Extension + Send + Sync + SingleHandle + DynClone {
    /// Prepares the filter for use (loading data files, compiling scripts, ...)
    fn initialize(&self) -> Result<(), Error> {
        Ok(())
    }

    /// Runs the filter against the message, recording any decision inside of the [`MessageContext`]
    fn apply(&self, message: &mut MessageContext) -> Result<Verdict, Error>;

    /// Checks that the filter is configured in a way it can be used
    fn sanity_check(&self) -> Result<(), Error> {
        Ok(())
    }
}

dyn_clone::clone_trait_object!(Filter);

#[derive(Clone)]
pub struct FilterAdapter {
    object: Arc<RwLock<Box<dyn Filter>>>,
}

impl FilterAdapter {
    pub fn new(object: Arc<RwLock<Box<dyn Filter>>>) -> Self {
        FilterAdapter { object }
    }

    pub fn read_guard(&self) -> RwLockReadGuard<Box<dyn Filter>> {
        self.object.read()
    }
}

impl<F: Filter + 'static> From<F> for FilterAdapter {
    fn from(filter: F) -> Self {
        FilterAdapter::new(Arc::new(RwLock::new(Box::new(filter))))
    }
}

impl FilterAdapter {
    pub fn initialize(&self) -> Result<(), Error> {
        self.read_guard().initialize()
    }

    pub fn apply(&self, message: &mut MessageContext) -> Result<Verdict, Error> {
        self.read_guard().apply(message)
    }

    pub fn sanity_check(&self) -> Result<(), Error> {
        self.read_guard().sanity_check()
    }

    pub fn id(&self) -> String {
        self.read_guard().id()
    }
}
