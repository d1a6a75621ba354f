#[cfg(test)]
mod test {
    use beam::error::Error;
    use beam::spam_filter::SpamFilter;
    use beam_sf_osbf::store::FILE_VERSION;
    use beam_sf_osbf::{Class, Config, LearnWeighting, OsbfClassifier};

    fn on_disk(dir: &std::path::Path) -> Config {
        let mut config = Config::minimal(dir);
        *config.buckets_mut() = 1021;
        config
    }

    #[test]
    fn spam_and_tofu_are_told_apart() -> anyhow::Result<()> {
        let filter = OsbfClassifier::new(Config::testing());
        filter.learn_as_spam("buy viagra now")?;
        filter.learn_as_tofu("meeting notes attached")?;

        let result = filter.classify("buy cheap viagra")?;
        assert!(result.is_spam);
        assert!(result.spam.unique_features > 0);
        assert!(result.spam.ptc > result.tofu.ptc);
        assert!(result.pr() > 0.0);
        Ok(())
    }

    #[test]
    fn untrained_and_empty_messages_are_tofu() -> anyhow::Result<()> {
        let filter = OsbfClassifier::new(Config::testing());
        let result = filter.classify("anything at all")?;
        assert!(!result.is_spam);
        assert_eq!(result.spam.ptc, result.tofu.ptc);

        filter.learn_as_spam("buy viagra now")?;
        assert!(!filter.is_spam("")?);
        Ok(())
    }

    #[test]
    fn unlearn_restores_stored_tables_bit_for_bit() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let filter = OsbfClassifier::new(on_disk(dir.path()));
        filter.learn_as_spam("buy viagra now")?;
        filter.learn_as_tofu("meeting notes attached")?;
        filter.store()?;
        let spam = std::fs::read(dir.path().join("spam.osbf"))?;
        let tofu = std::fs::read(dir.path().join("tofu.osbf"))?;

        for text in ["limited offer, act now", "the quarterly report is attached"] {
            filter.learn_as_spam(text)?;
            filter.unlearn_as_spam(text)?;
            filter.learn_as_tofu(text)?;
            filter.unlearn_as_tofu(text)?;
        }
        filter.store()?;

        assert_eq!(std::fs::read(dir.path().join("spam.osbf"))?, spam);
        assert_eq!(std::fs::read(dir.path().join("tofu.osbf"))?, tofu);
        Ok(())
    }

    #[test]
    fn tables_survive_a_restart() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        {
            let filter = OsbfClassifier::new(on_disk(dir.path()));
            filter.learn_as_spam("buy viagra now")?;
            filter.learn_as_tofu("meeting notes attached")?;
            filter.store()?;
            // storing again without changes is harmless
            filter.store()?;
        }

        let spam = std::fs::read(dir.path().join("spam.osbf"))?;
        assert_eq!(spam.len(), 12 + 1021 * 12);
        assert_eq!(&spam[..4], &FILE_VERSION);

        let filter = OsbfClassifier::new(on_disk(dir.path()));
        assert!(filter.is_spam("buy cheap viagra")?);
        let stats = filter.statistics()?;
        assert_eq!(stats.spam.learnings, 1);
        assert_eq!(stats.tofu.learnings, 1);
        Ok(())
    }

    #[test]
    fn stored_bucket_count_wins_over_config() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let filter = OsbfClassifier::new(on_disk(dir.path()));
        filter.open()?;
        filter.store()?;
        assert!(dir.path().join("spam.osbf").exists());
        assert!(dir.path().join("tofu.osbf").exists());

        std::fs::remove_file(dir.path().join("tofu.osbf"))?;
        let mut config = on_disk(dir.path());
        *config.buckets_mut() = 4099;
        let filter = OsbfClassifier::new(config);
        let stats = filter.statistics()?;
        assert_eq!(stats.spam.buckets, 1021);
        assert_eq!(stats.tofu.buckets, 4099);
        Ok(())
    }

    #[test]
    fn unknown_version_is_refused() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let mut bytes = vec![b'O', b'S', b'B', 9];
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&[0; 12]);
        std::fs::write(dir.path().join("spam.osbf"), bytes)?;

        let filter = OsbfClassifier::new(on_disk(dir.path()));
        assert!(matches!(
            filter.open(),
            Err(Error::UnsupportedTableVersion { .. })
        ));
        assert!(!filter.error_string().is_empty());
        assert!(filter.learn_as_spam("anything").is_err());
        Ok(())
    }

    #[test]
    fn unreadable_table_falls_back_to_empty() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        // a directory where the table file should be cannot be read
        std::fs::create_dir(dir.path().join("tofu.osbf"))?;

        let filter = OsbfClassifier::new(on_disk(dir.path()));
        filter.open()?;
        assert!(filter.error_string().contains("tofu"));
        assert_eq!(filter.statistics()?.tofu.used, 0);
        assert!(!filter.is_spam("meeting notes attached")?);
        Ok(())
    }

    #[test]
    fn full_table_is_left_untouched() -> anyhow::Result<()> {
        let mut config = Config::testing();
        *config.buckets_mut() = 16;
        let filter = OsbfClassifier::new(config);

        let text = (0..20).map(|i| format!("token{i}")).collect::<Vec<_>>().join(" ");
        let result = filter.learn_as_spam(&text);
        assert!(matches!(result, Err(Error::ClassTableFull { buckets: 16 })));
        assert!(!filter.error_string().is_empty());

        let stats = filter.statistics()?;
        assert_eq!(stats.spam.used, 0);
        assert_eq!(stats.spam.learnings, 0);
        Ok(())
    }

    #[test]
    fn bucket_values_saturate() -> anyhow::Result<()> {
        let mut config = Config::testing();
        *config.learn_weighting_mut() = LearnWeighting::Distance;
        let filter = OsbfClassifier::new(config);
        for _ in 0..25 {
            filter.learn_as_spam("again and again")?;
        }
        let stats = filter.statistics()?;
        assert!(stats.spam.saturated > 0);
        assert_eq!(stats.spam.learnings, 25);
        Ok(())
    }

    #[test]
    fn learnings_never_go_negative() -> anyhow::Result<()> {
        let filter = OsbfClassifier::new(Config::testing());
        filter.unlearn_as_tofu("never learned")?;
        let report = filter.train(Class::Tofu, "never learned", true)?;
        assert_eq!(report.skipped, report.features);
        assert_eq!(filter.statistics()?.tofu.learnings, 0);
        Ok(())
    }

    #[test]
    fn concurrent_learning_is_serialized() -> anyhow::Result<()> {
        let filter = OsbfClassifier::new(Config::testing());
        let handles = (0..8)
            .map(|i| {
                let filter = filter.clone();
                std::thread::spawn(move || -> Result<(), Error> {
                    for j in 0..10 {
                        filter.learn_as_spam(&format!("worker {i} message {j}"))?;
                        filter.is_spam("worker message")?;
                    }
                    Ok(())
                })
            })
            .collect::<Vec<_>>();

        for handle in handles {
            handle.join().map_err(|_| anyhow::anyhow!("worker panicked"))??;
        }
        assert_eq!(filter.statistics()?.spam.learnings, 80);
        Ok(())
    }
}
