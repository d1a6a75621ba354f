/// Errors that would host custom errors for modules, utilities, etc.
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    //Filter Errors
    #[error("Filter \"{name}\" is not available in this build")]
    FilterUnavailable { name: String },
    #[error("Filter chain is empty")]
    EmptyFilterChain,
    #[error("Filter is misconfigured: {complaint}")]
    FilterMisconfigured { complaint: String },

    //SpamFilter Errors
    #[error("Classifier has not been initialized")]
    ClassifierNotInitialized,
    #[error("Class table is full ({buckets} buckets), no free slot for a new feature")]
    ClassTableFull { buckets: u32 },
    #[error("Class table version {found:?} is not supported (expected {expected:?})")]
    UnsupportedTableVersion { found: [u8; 4], expected: [u8; 4] },
    #[error("Class table is corrupted: {reason}")]
    CorruptedClassTable { reason: String },
    #[error("Bucket count {0} is invalid")]
    InvalidBucketCount(u32),
    #[error("Message of {size} bytes exceeds the limit of {max} bytes")]
    MessageTooLarge { size: usize, max: usize },

    //Config Errors
    #[error("Configuration file cannot be found")]
    ConfigNotFound,
    #[error("Cannot deserialize configuration: {0}")]
    TomlDeserializeError(#[from] toml::de::Error),
    #[error("Cannot serialize configuration: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    //Misc
    #[error("{0}")]
    IoError(#[from] std::io::Error),
    #[error("Functionality is not yet implemented")]
    Unimplemented,
    #[error("An unknown error has occurred")]
    Other,
}

impl Error {
    /// Name of the variant, stable across message wording changes. Every variant
    /// has an arm, so adding one without a name does not compile.
    pub fn enum_to_string(&self) -> String {
        let name = match self {
            Error::FilterUnavailable { .. } => "FilterUnavailable",
            Error::EmptyFilterChain => "EmptyFilterChain",
            Error::FilterMisconfigured { .. } => "FilterMisconfigured",
            Error::ClassifierNotInitialized => "ClassifierNotInitialized",
            Error::ClassTableFull { .. } => "ClassTableFull",
            Error::UnsupportedTableVersion { .. } => "UnsupportedTableVersion",
            Error::CorruptedClassTable { .. } => "CorruptedClassTable",
            Error::InvalidBucketCount(_) => "InvalidBucketCount",
            Error::MessageTooLarge { .. } => "MessageTooLarge",
            Error::ConfigNotFound => "ConfigNotFound",
            Error::TomlDeserializeError(_) => "TomlDeserializeError",
            Error::TomlSerializeError(_) => "TomlSerializeError",
            Error::IoError(_) => "IoError",
            Error::Unimplemented => "Unimplemented",
            Error::Other => "Other",
        };
        name.to_string()
    }

    /// Errors that need an operator to look at the data files before the
    /// classifier can be used again
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedTableVersion { .. } | Error::CorruptedClassTable { .. }
        )
    }
}
