use derive_more::Display;
use serde::{Deserialize, Serialize};

//
/// `SpamFilter` - Statistical classification of messages into spam and tofu, trained
///              by the user through learn/unlearn requests.
///
/// `Sieve` - Script driven filtering, where a user supplied rule set decides what happens
///         to a message (file into a folder, discard, keep, ...).
///
#[derive(Hash, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Display)]
#[serde(rename_all = "lowercase")]
pub enum Module {
    /// Statistical spam classification
    #[display(fmt = "spamfilter")]
    SpamFilter,

    /// Rule based filtering driven by a sieve script
    #[display(fmt = "sieve")]
    Sieve,

    /// Unknown module. Should be used by default where a module cannot be identified for any
    /// specific reason.
    #[display(fmt = "unknown")]
    Unknown,
}

impl Default for Module {
    fn default() -> Self {
        Self::Unknown
    }
}

impl<A> From<A> for Module
where
    A: AsRef<str>,
{
    fn from(module: A) -> Self {
        match module.as_ref() {
            "spamfilter" => Module::SpamFilter,
            "sieve" => Module::Sieve,
            _ => Module::Unknown,
        }
    }
}
