mod config;

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use beam::config::FilterKind;
use beam::error::Error;
use beam::filter::{FilterAdapter, FilterChain};
use beam::message::MessageContext;
use beam_sf_osbf::{tokenizer, Class, OsbfClassifier, TableStatistics};
use clap::{Parser, Subcommand};
use comfy_table::Table;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[derive(Debug, Parser)]
#[clap(name = "spamctl", about = "Train and query the OSBF spam filter")]
struct Opt {
    /// Path to a TOML file holding `[beam]` and `[osbf]` tables
    #[clap(long)]
    config: Option<PathBuf>,

    /// Directory of the class tables, overriding the configuration
    #[clap(long)]
    path: Option<PathBuf>,

    /// Log at debug level regardless of RUST_LOG
    #[clap(short, long)]
    verbose: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the class tables that do not exist yet
    Init,
    /// Learn (or unlearn) messages as spam or tofu
    Learn {
        #[clap(long, conflicts_with = "tofu", required_unless_present = "tofu")]
        spam: bool,
        #[clap(long)]
        tofu: bool,
        /// Undo a previous learn of the same messages
        #[clap(long)]
        revert: bool,
        /// Message files, `-` reads standard input
        #[clap(required = true)]
        files: Vec<PathBuf>,
    },
    /// Run the configured filter chain against messages
    Classify {
        #[clap(required = true)]
        files: Vec<PathBuf>,
    },
    /// Write missing or modified class tables
    Store,
    /// Show occupancy of both class tables
    Stats {
        /// Print the figures as JSON
        #[clap(long)]
        json: bool,
    },
    /// Compact the bucket chains of both class tables
    Pack,
    /// Print the effective configuration
    DumpConfig,
}

fn read_message(path: &Path) -> anyhow::Result<String> {
    let bytes = match path.to_str() {
        Some("-") => {
            let mut buffer = vec![];
            std::io::stdin().read_to_end(&mut buffer)?;
            buffer
        }
        _ => std::fs::read(path).with_context(|| format!("cannot read {}", path.display()))?,
    };
    Ok(tokenizer::decode(&bytes).into_owned())
}

fn stats_row(class: Class, stats: &TableStatistics) -> Vec<String> {
    vec![
        class.to_string(),
        stats.buckets.to_string(),
        stats.learnings.to_string(),
        stats.used.to_string(),
        stats.free.to_string(),
        stats.saturated.to_string(),
        stats.max_chain.to_string(),
        format!("{:.2}", stats.average_probe),
    ]
}

fn print_stats(filter: &OsbfClassifier) -> anyhow::Result<()> {
    let stats = filter.statistics()?;
    let mut table = Table::new();
    table.set_header(vec![
        "Class",
        "Buckets",
        "Learnings",
        "Used",
        "Free",
        "Saturated",
        "Longest Chain",
        "Average Probe",
    ]);
    table.add_row(stats_row(Class::Spam, &stats.spam));
    table.add_row(stats_row(Class::Tofu, &stats.tofu));
    println!("{table}");
    Ok(())
}

fn learn(
    filter: &OsbfClassifier,
    class: Class,
    revert: bool,
    files: &[PathBuf],
) -> anyhow::Result<()> {
    let mut table = Table::new();
    table.set_header(vec![
        "File", "Features", "Inserted", "Updated", "Released", "Evicted", "Skipped",
    ]);

    let mut failed = 0;
    for file in files {
        let report = read_message(file)
            .and_then(|text| Ok(filter.train(class, &text, revert)?));
        match report {
            Ok(report) => {
                table.add_row(vec![
                    file.display().to_string(),
                    report.features.to_string(),
                    report.inserted.to_string(),
                    report.updated.to_string(),
                    report.released.to_string(),
                    report.evicted.to_string(),
                    report.skipped.to_string(),
                ]);
            }
            Err(e) => {
                tracing::error!(file = %file.display(), error = %e, "message not learned");
                failed += 1;
            }
        }
    }

    filter.store()?;
    println!("{table}");
    if failed > 0 {
        bail!("{failed} of {} messages could not be learned", files.len());
    }
    Ok(())
}

fn classify(filter: &OsbfClassifier, config: &Config, files: &[PathBuf]) -> anyhow::Result<()> {
    let chain = FilterChain::from_config(&config.beam, |kind| match kind {
        FilterKind::Osbf => Ok(FilterAdapter::from(filter.clone())),
        other => Err(Error::FilterUnavailable {
            name: other.to_string(),
        }),
    })?;
    chain.initialize()?;

    let mut table = Table::new();
    table.set_header(vec!["File", "Verdict", "Folder", "Notes"]);
    for file in files {
        let text = read_message(file)?;
        let mut message = MessageContext::from_raw(&text);
        let verdict = chain.apply(&mut message);
        table.add_row(vec![
            file.display().to_string(),
            verdict.to_string(),
            message.folder().unwrap_or_default().to_string(),
            message.notes().join("; "),
        ]);
    }
    println!("{table}");
    Ok(())
}

/// Creates the classifier over the table directory given on the command line or in the
/// configuration
fn open(path: Option<PathBuf>, config: &mut Config) -> anyhow::Result<OsbfClassifier> {
    let Some(dir) = path.or_else(|| config.data_dir().cloned()) else {
        bail!("no table directory configured, use --path or set `data_dir` in the configuration");
    };
    *config.osbf.path_mut() = Some(dir);

    let filter = OsbfClassifier::new(config.osbf.clone());
    tracing::debug!(?filter, "classifier created");
    Ok(filter)
}

fn main() -> anyhow::Result<()> {
    let opt = Opt::parse();

    let mut config = match opt.config.as_ref() {
        Some(path) => Config::load(path)
            .with_context(|| format!("cannot load configuration {}", path.display()))?,
        None => Config::default(),
    };

    let env_filter = match opt.verbose || config.beam.debug {
        true => EnvFilter::new("debug"),
        false => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let filter = match opt.command {
        Command::DumpConfig => {
            println!("{}", toml::to_string(&config)?);
            return Ok(());
        }
        Command::Init | Command::Store => {
            let filter = open(opt.path, &mut config)?;
            filter.open()?;
            filter.store()?;
            print_stats(&filter)?;
            filter
        }
        Command::Learn {
            spam,
            tofu: _,
            revert,
            files,
        } => {
            let class = match spam {
                true => Class::Spam,
                false => Class::Tofu,
            };
            let filter = open(opt.path, &mut config)?;
            learn(&filter, class, revert, &files)?;
            filter
        }
        Command::Classify { files } => {
            let filter = open(opt.path, &mut config)?;
            classify(&filter, &config, &files)?;
            filter
        }
        Command::Stats { json } => {
            let filter = open(opt.path, &mut config)?;
            match json {
                true => println!("{}", serde_json::to_string_pretty(&filter.statistics()?)?),
                false => print_stats(&filter)?,
            }
            filter
        }
        Command::Pack => {
            let filter = open(opt.path, &mut config)?;
            filter.pack()?;
            filter.store()?;
            print_stats(&filter)?;
            filter
        }
    };

    let error = filter.error_string();
    if !error.is_empty() {
        tracing::warn!(%error, "classifier reported a problem");
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn learn_writes_tables_to_the_configured_directory() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let config_path = dir.path().join("spamctl.toml");
        std::fs::write(
            &config_path,
            format!(
                "[osbf]\npath = {:?}\nbuckets = 1021\n",
                dir.path().display().to_string()
            ),
        )?;
        let spam = dir.path().join("spam.eml");
        std::fs::write(&spam, "buy viagra now")?;
        let tofu = dir.path().join("tofu.eml");
        std::fs::write(&tofu, "meeting notes attached")?;

        let mut config = Config::load(&config_path)?;
        let filter = open(None, &mut config)?;
        learn(&filter, Class::Spam, false, &[spam])?;
        learn(&filter, Class::Tofu, false, &[tofu])?;

        assert!(dir.path().join("spam.osbf").exists());
        assert!(dir.path().join("tofu.osbf").exists());
        let stats = OsbfClassifier::new(config.osbf.clone()).statistics()?;
        assert_eq!(stats.spam.learnings, 1);
        assert_eq!(stats.tofu.buckets, 1021);
        Ok(())
    }

    #[test]
    fn unreadable_message_fails_the_batch() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let message = dir.path().join("spam.eml");
        std::fs::write(&message, "buy viagra now")?;

        let mut config = Config::default();
        *config.osbf.buckets_mut() = 1021;
        let filter = open(Some(dir.path().to_path_buf()), &mut config)?;
        let files = [message, dir.path().join("missing.eml")];
        assert!(learn(&filter, Class::Spam, false, &files).is_err());
        // the readable message is still learned and stored
        assert_eq!(filter.statistics()?.spam.learnings, 1);
        assert!(dir.path().join("spam.osbf").exists());
        Ok(())
    }

    #[test]
    fn a_table_directory_is_required() {
        let mut config = Config::default();
        assert!(open(None, &mut config).is_err());
    }
}
