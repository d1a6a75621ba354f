use super::FilterAdapter;
use crate::config::{Config, FilterKind};
use crate::error::Error;
use crate::message::{MessageContext, Verdict};

/// A named, ordered list of filters that is run against incoming messages.
///
/// Filters run in order until one of them reaches a decisive verdict or asks for processing to
/// stop. A filter that fails is logged and skipped, so a broken filter never causes a message to
/// be lost.
#[derive(Clone, Default)]
pub struct FilterChain {
    name: String,
    filters: Vec<FilterAdapter>,
}

impl std::fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterChain")
            .field("name", &self.name)
            .field(
                "filters",
                &self.filters.iter().map(|f| f.id()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl FilterChain {
    pub fn new(name: impl Into<String>) -> Self {
        FilterChain {
            name: name.into(),
            filters: vec![],
        }
    }

    /// Builds the chain described by the configuration. `factory` creates the filter for each
    /// configured kind, and may fail with [`Error::FilterUnavailable`] for kinds it cannot provide.
    pub fn from_config<F>(config: &Config, mut factory: F) -> Result<Self, Error>
    where
        F: FnMut(FilterKind) -> Result<FilterAdapter, Error>,
    {
        let mut chain = FilterChain::new(config.chain_name.clone());
        for kind in &config.chain {
            chain.push(factory(*kind)?);
        }
        tracing::debug!(chain = %chain.name, filters = chain.len(), "filter chain built");
        Ok(chain)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn filters(&self) -> &[FilterAdapter] {
        &self.filters
    }

    /// Appends a filter at the end of the chain
    pub fn push(&mut self, filter: impl Into<FilterAdapter>) {
        self.filters.push(filter.into());
    }

    /// Builder variant of [`FilterChain::push`]
    pub fn with(mut self, filter: impl Into<FilterAdapter>) -> Self {
        self.push(filter);
        self
    }

    /// Initializes and checks every filter in the chain
    pub fn initialize(&self) -> Result<(), Error> {
        if self.filters.is_empty() {
            return Err(Error::EmptyFilterChain);
        }
        for filter in &self.filters {
            filter.sanity_check()?;
            filter.initialize()?;
            tracing::debug!(chain = %self.name, filter = %filter.id(), "filter initialized");
        }
        Ok(())
    }

    /// Runs the chain against the message and returns the first decisive verdict, or
    /// [`Verdict::Pass`] if no filter reached one.
    pub fn apply(&self, message: &mut MessageContext) -> Verdict {
        for filter in &self.filters {
            let id = filter.id();
            match filter.apply(message) {
                Ok(verdict) => {
                    tracing::trace!(chain = %self.name, filter = %id, %verdict, "filter applied");
                    if verdict.is_decisive() || message.stop_processing() {
                        return verdict;
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        chain = %self.name,
                        filter = %id,
                        error = %e,
                        "filter failed, skipping"
                    );
                    message.add_note(format!("{id}: {e}"));
                }
            }
        }
        Verdict::Pass
    }
}

#[cfg(test)]
mod test {
    use super::FilterChain;
    use crate::config::{Config, FilterKind};
    use crate::error::Error;
    use crate::filter::{Filter, FilterAdapter};
    use crate::message::{MessageContext, Verdict};
    use crate::module::Module;
    use crate::{Extension, SingleHandle};

    #[derive(Clone)]
    struct Fixed(&'static str, Option<Verdict>);

    impl SingleHandle for Fixed {}

    impl Extension for Fixed {
        fn id(&self) -> String {
            self.0.into()
        }

        fn name(&self) -> String {
            self.id()
        }

        fn module(&self) -> Module {
            Module::Unknown
        }
    }

    impl Filter for Fixed {
        fn apply(&self, message: &mut MessageContext) -> Result<Verdict, Error> {
            message.add_note(self.0);
            self.1.ok_or(Error::Other)
        }
    }

    /// Asks the chain to stop without deciding
    #[derive(Clone)]
    struct Halt;

    impl SingleHandle for Halt {}

    impl Extension for Halt {
        fn id(&self) -> String {
            String::from("halt")
        }

        fn name(&self) -> String {
            self.id()
        }

        fn module(&self) -> Module {
            Module::Sieve
        }
    }

    impl Filter for Halt {
        fn apply(&self, message: &mut MessageContext) -> Result<Verdict, Error> {
            message.set_stop_processing(true);
            Ok(Verdict::Pass)
        }
    }

    #[test]
    fn stops_at_first_decisive_verdict() {
        let chain = FilterChain::new("inbox")
            .with(Fixed("a", Some(Verdict::Pass)))
            .with(Fixed("b", Some(Verdict::Spam)))
            .with(Fixed("c", Some(Verdict::Tofu)));
        let mut msg = MessageContext::from_raw("hello");
        assert_eq!(chain.apply(&mut msg), Verdict::Spam);
        assert_eq!(msg.notes(), ["a", "b"]);
    }

    #[test]
    fn stop_processing_ends_the_chain() {
        let chain = FilterChain::new("inbox")
            .with(Fixed("a", Some(Verdict::Pass)))
            .with(Halt)
            .with(Fixed("c", Some(Verdict::Spam)));
        let mut msg = MessageContext::from_raw("hello");
        assert_eq!(chain.apply(&mut msg), Verdict::Pass);
        assert!(msg.stop_processing());
        assert_eq!(msg.notes(), ["a"]);
    }

    #[test]
    fn failing_filter_is_skipped() {
        let chain = FilterChain::new("inbox")
            .with(Fixed("broken", None))
            .with(Fixed("ok", Some(Verdict::Tofu)));
        let mut msg = MessageContext::from_raw("hello");
        assert_eq!(chain.apply(&mut msg), Verdict::Tofu);
        assert_eq!(msg.notes().len(), 3);
    }

    #[test]
    fn empty_chain_cannot_initialize() {
        let chain = FilterChain::new("empty");
        assert!(matches!(chain.initialize(), Err(Error::EmptyFilterChain)));
        let mut msg = MessageContext::default();
        assert_eq!(chain.apply(&mut msg), Verdict::Pass);
    }

    #[test]
    fn chain_follows_config_order() -> anyhow::Result<()> {
        let mut config = Config::new();
        config.chain = vec![FilterKind::Sieve, FilterKind::Osbf];
        let chain = FilterChain::from_config(&config, |kind| {
            Ok(FilterAdapter::from(match kind {
                FilterKind::Sieve => Fixed("sieve", Some(Verdict::Pass)),
                FilterKind::Osbf => Fixed("osbf", Some(Verdict::Spam)),
            }))
        })?;
        assert_eq!(chain.name(), "default");
        let ids = chain.filters().iter().map(|f| f.id()).collect::<Vec<_>>();
        assert_eq!(ids, ["sieve", "osbf"]);
        Ok(())
    }

    #[test]
    fn unavailable_kind_fails_the_build() {
        let config = Config::new();
        let result = FilterChain::from_config(&config, |kind| {
            Err(Error::FilterUnavailable {
                name: kind.to_string(),
            })
        });
        assert!(matches!(result, Err(Error::FilterUnavailable { name }) if name == "osbf"));
    }
}
