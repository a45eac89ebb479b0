use thiserror::Error;

/// Errors raised while loading or annotating a pedigree
#[derive(Debug, Error)]
pub enum PedigreeError {
    /// A required column is absent from the header row
    #[error("required column \"{0}\" not in file")]
    MissingColumn(String),

    /// Person identifiers must be integers
    #[error("non-numeric personID: {0}")]
    NonNumericId(String),

    /// A column override used a name that is not a known option
    #[error("unknown column option \"{0}\"")]
    UnknownOption(String),

    /// The identifier does not belong to the pedigree
    #[error("unknown individual {0}")]
    UnknownIndividual(String),

    /// Two individuals that share an ancestor are not connected through
    /// parent/child links, which means the graph was built inconsistently
    #[error("no lineage path between {from} and {to}")]
    NoPath { from: String, to: String },

    #[error("invalid configuration: {0}")]
    Config(#[from] ron::error::SpannedError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PedigreeError>;
