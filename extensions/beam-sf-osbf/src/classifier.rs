//! Bayesian chain rule scoring of a feature stream against the two class tables.

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::hasher::Feature;
use crate::learner::distinct;
use crate::table::ClassTable;

/// Features whose larger class probability is less than this many times the
/// smaller one are ignored.
pub const MIN_PMAX_PMIN_RATIO: f64 = 9.0;

#[derive(Hash, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum Class {
    #[display(fmt = "spam")]
    Spam,
    #[display(fmt = "tofu")]
    Tofu,
}

impl Class {
    pub const ALL: [Class; 2] = [Class::Spam, Class::Tofu];

    fn index(self) -> usize {
        match self {
            Class::Spam => 0,
            Class::Tofu => 1,
        }
    }
}

/// Per class figures gathered while scoring a message
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassStats {
    pub learnings: u32,
    /// Sum of the weights of the features found in the class
    pub hits: u64,
    /// Sum of the bucket values of the features found in the class
    pub total_hits: u64,
    /// Distinct features found in the class
    pub unique_features: usize,
    /// Distinct features absent from the class
    pub missed_features: usize,
    /// Local probability contributed by the last informative feature
    pub pltc: f64,
    /// Final normalized probability of the class
    pub ptc: f64,
    /// Natural log of the unnormalized probability
    pub log_ptc: f64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub is_spam: bool,
    pub spam: ClassStats,
    pub tofu: ClassStats,
    /// Distinct features of the message
    pub total_features: usize,
    /// Features that moved the probabilities
    pub informative_features: usize,
}

impl Classification {
    pub fn stats(&self, class: Class) -> &ClassStats {
        match class {
            Class::Spam => &self.spam,
            Class::Tofu => &self.tofu,
        }
    }

    pub fn class(&self) -> Class {
        match self.is_spam {
            true => Class::Spam,
            false => Class::Tofu,
        }
    }

    /// Decimal log ratio of the spam and tofu probabilities. Positive leans spam.
    pub fn pr(&self) -> f64 {
        (self.spam.log_ptc - self.tofu.log_ptc) / std::f64::consts::LN_10
    }
}

/// Scores the distinct features of a message. Ties, including a message
/// without any known feature, go to tofu.
pub fn classify<I>(
    spam: &ClassTable,
    tofu: &ClassTable,
    features: I,
    min_ratio: f64,
) -> Classification
where
    I: IntoIterator<Item = Feature>,
{
    let features = distinct(features);
    let tables = [spam, tofu];
    let learnings = tables.map(|t| t.learnings());

    let mut stats = [ClassStats::default(); 2];
    for class in Class::ALL {
        stats[class.index()].learnings = learnings[class.index()];
    }
    let mut informative = 0;

    for feature in &features {
        let mut values = [0u32; 2];
        for (c, table) in tables.iter().enumerate() {
            match table.find(feature.hash, feature.key) {
                Some(slot) => {
                    let value = table.bucket(slot).value;
                    values[c] = value;
                    stats[c].unique_features += 1;
                    stats[c].hits += u64::from(feature.weight);
                    stats[c].total_hits += u64::from(value);
                }
                None => stats[c].missed_features += 1,
            }
        }

        let p = [0usize, 1].map(|c| f64::from(values[c]) / (f64::from(learnings[c]) + 1.0));
        let sum = p[0] + p[1];
        if sum <= 0.0 {
            continue;
        }

        let (pmin, pmax) = (p[0].min(p[1]), p[0].max(p[1]));
        if pmin > 0.0 && pmax / pmin < min_ratio {
            continue;
        }

        let r = (pmax - pmin) / (pmax + pmin);
        let wr2 = f64::from(feature.weight) * r * r;
        let cf = wr2 / (wr2 + 1.0);

        for c in 0..2usize {
            let pltc = 0.5 + cf * (p[c] / sum - 0.5);
            stats[c].pltc = pltc;
            stats[c].log_ptc += pltc.ln();
        }
        informative += 1;
    }

    let max = stats[0].log_ptc.max(stats[1].log_ptc);
    let scaled = [0usize, 1].map(|c| (stats[c].log_ptc - max).exp());
    let total = scaled[0] + scaled[1];
    for c in 0..2usize {
        stats[c].ptc = scaled[c] / total;
    }

    let [spam, tofu] = stats;
    let classification = Classification {
        is_spam: spam.log_ptc > tofu.log_ptc,
        spam,
        tofu,
        total_features: features.len(),
        informative_features: informative,
    };
    tracing::debug!(
        is_spam = classification.is_spam,
        pr = classification.pr(),
        features = classification.total_features,
        informative,
        "message classified"
    );
    classification
}
