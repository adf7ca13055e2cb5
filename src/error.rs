//! Typed errors for timestamp parsing, record validation and publishing.

/// A stored feeding timestamp that is not `MM/DD/YYYY - HH:MM`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimestampError {
    #[error("timestamp is empty")]
    Empty,

    #[error("timestamp {0:?} does not match MM/DD/YYYY - HH:MM")]
    Layout(String),

    #[error("timestamp {0:?} is not a real calendar date and time")]
    OutOfRange(String),
}

/// A stored record that is missing data the aggregator requires.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("record {record} is missing required field `{field}`")]
    MissingField {
        record: String,
        field: &'static str,
    },

    #[error("record {0} is not an object")]
    NotAnObject(String),

    #[error("invalid export: {0}")]
    Export(#[from] serde_json::Error),
}

/// Failure of a publish command, split by which half failed.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("local update rejected: {0}")]
    Local(String),

    #[error("persisting failed after {attempts} attempt(s): {source}")]
    Persist {
        attempts: u32,
        #[source]
        source: anyhow::Error,
    },
}
