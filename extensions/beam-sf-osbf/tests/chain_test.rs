#[cfg(test)]
mod test {
    use beam::config::{Config as BeamConfig, FilterKind};
    use beam::error::Error;
    use beam::filter::{FilterAdapter, FilterChain};
    use beam::message::{MessageContext, Verdict};
    use beam::spam_filter::SpamFilter;
    use beam_sf_osbf::{Config, OsbfClassifier};

    fn chain(filter: &OsbfClassifier, config: &BeamConfig) -> Result<FilterChain, Error> {
        FilterChain::from_config(config, |kind| match kind {
            FilterKind::Osbf => Ok(FilterAdapter::from(filter.clone())),
            other => Err(Error::FilterUnavailable {
                name: other.to_string(),
            }),
        })
    }

    #[test]
    fn chain_runs_the_shared_classifier() -> anyhow::Result<()> {
        let filter = OsbfClassifier::new(Config::testing());
        let chain = chain(&filter, &BeamConfig::new())?;
        chain.initialize()?;

        // training through the original handle is seen by the chain
        filter.learn_as_spam("buy viagra now")?;
        filter.learn_as_tofu("meeting notes attached")?;

        let mut spam = MessageContext::from_raw("Subject: hi\n\nbuy cheap viagra");
        assert_eq!(chain.apply(&mut spam), Verdict::Spam);
        assert_eq!(spam.folder(), Some("spam"));

        let mut tofu = MessageContext::from_raw("Subject: hi\n\nmeeting notes attached");
        assert_eq!(chain.apply(&mut tofu), Verdict::Tofu);
        assert_eq!(tofu.is_spam(), Some(false));
        assert_eq!(tofu.folder(), None);
        Ok(())
    }

    #[test]
    fn failing_classifier_never_drops_mail() -> anyhow::Result<()> {
        let mut config = Config::testing();
        *config.max_text_size_mut() = Some(4);
        let filter = OsbfClassifier::new(config);
        let chain = chain(&filter, &BeamConfig::new())?;

        let mut message = MessageContext::from_raw("Subject: hi\n\nfar too long");
        assert_eq!(chain.apply(&mut message), Verdict::Pass);
        assert_eq!(message.is_spam(), None);
        assert_eq!(message.notes().len(), 1);
        assert!(!filter.error_string().is_empty());
        Ok(())
    }

    #[test]
    fn sieve_is_not_provided() {
        let filter = OsbfClassifier::new(Config::testing());
        let mut config = BeamConfig::new();
        config.chain = vec![FilterKind::Osbf, FilterKind::Sieve];
        assert!(matches!(
            chain(&filter, &config),
            Err(Error::FilterUnavailable { name }) if name == "sieve"
        ));
    }
}
