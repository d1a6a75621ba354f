//! Applies (or reverts) the features of one message to a class table.

use std::collections::HashSet;

use beam::error::Error;
use serde::{Deserialize, Serialize};

use crate::hasher::Feature;
use crate::table::{ClassTable, Grooming};

/// Amount added to a bucket for every distinct feature of a learned message
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LearnWeighting {
    /// One occurrence per message
    #[default]
    Unit,
    /// The distance weight of the feature
    Distance,
}

impl LearnWeighting {
    pub fn weight(&self, feature: &Feature) -> u32 {
        match self {
            LearnWeighting::Unit => 1,
            LearnWeighting::Distance => feature.weight,
        }
    }
}

/// What a single learn or unlearn did to the table
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearnReport {
    /// Distinct features in the message
    pub features: usize,
    /// Features that claimed a new bucket
    pub inserted: usize,
    /// Features whose bucket value changed without claiming or releasing it
    pub updated: usize,
    /// Buckets released because their value reached zero
    pub released: usize,
    /// Buckets evicted by microgrooming
    pub evicted: usize,
    /// Features not present in the table on revert
    pub skipped: usize,
}

/// Drops repeated `(hash, key)` features, keeping the first occurrence
pub fn distinct<I: IntoIterator<Item = Feature>>(features: I) -> Vec<Feature> {
    let mut seen = HashSet::new();
    features
        .into_iter()
        .filter(|feature| seen.insert(feature.id()))
        .collect()
}

/// Adds the distinct features of a message to `table`, or removes them when
/// `revert` is set, and adjusts the learning counter.
///
/// Learning fails with [`Error::ClassTableFull`] before touching the table if
/// there are fewer empty buckets than new features.
pub fn learn<I>(
    table: &mut ClassTable,
    features: I,
    revert: bool,
    weighting: LearnWeighting,
    grooming: Option<Grooming>,
) -> Result<LearnReport, Error>
where
    I: IntoIterator<Item = Feature>,
{
    let features = distinct(features);
    let mut report = LearnReport {
        features: features.len(),
        ..Default::default()
    };

    if revert {
        for feature in &features {
            let Some(slot) = table.find(feature.hash, feature.key) else {
                report.skipped += 1;
                continue;
            };
            match table.decrement(slot, weighting.weight(feature)) {
                0 => report.released += 1,
                _ => report.updated += 1,
            }
        }
        table.unlearned();
        return Ok(report);
    }

    let new = features
        .iter()
        .filter(|f| table.find(f.hash, f.key).is_none())
        .count();
    if new > table.free() {
        tracing::error!(
            buckets = table.bucket_count(),
            free = table.free(),
            new,
            "class table has no room for the message"
        );
        return Err(Error::ClassTableFull {
            buckets: table.bucket_count(),
        });
    }

    for feature in &features {
        let weight = weighting.weight(feature);
        if let Some(slot) = table.find(feature.hash, feature.key) {
            table.increment(slot, weight);
            report.updated += 1;
            continue;
        }

        table.insert(feature.hash, feature.key, weight)?;
        report.inserted += 1;

        if let Some(limits) = grooming {
            let home = table.home(feature.hash);
            if table.chain_len(home) > limits.chain_length {
                report.evicted += table.microgroom(home, &limits, Some(feature.id()));
            }
        }
    }
    table.learned();

    tracing::trace!(?report, "features applied");
    Ok(report)
}
