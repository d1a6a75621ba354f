use crate::error::Error;
use crate::filter::Filter;
use dyn_clone::DynClone;

/// Training interface of a two class (spam/tofu) statistical filter.
///
/// Every operation takes the decoded message text. Implementations are expected to serialize
/// access to their class data internally, so the trait only requires shared references.
pub trait SpamFilter: Filter + DynClone {
    /// Teaches the filter that the text is spam
    fn learn_as_spam(&self, text: &str) -> Result<(), Error>;

    /// Reverts a previous [`SpamFilter::learn_as_spam`] of the same text
    fn unlearn_as_spam(&self, text: &str) -> Result<(), Error>;

    /// Teaches the filter that the text is legitimate
    fn learn_as_tofu(&self, text: &str) -> Result<(), Error>;

    /// Reverts a previous [`SpamFilter::learn_as_tofu`] of the same text
    fn unlearn_as_tofu(&self, text: &str) -> Result<(), Error>;

    /// Returns true if the text is classified as spam
    fn is_spam(&self, text: &str) -> Result<bool, Error>;

    /// Writes the current class data to persistent storage
    fn store(&self) -> Result<(), Error>;

    /// Last recorded error, empty if the previous operation succeeded
    fn error_string(&self) -> String;
}

dyn_clone::clone_trait_object!(SpamFilter);
