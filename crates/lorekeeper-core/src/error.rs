use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A field name outside the monitored-field list.
    #[error("unknown monitored field: {0}")]
    UnknownField(String),

    /// Consolidated data that breaks an identity rule, e.g. one card id
    /// filed under two sets.
    #[error("invalid data: {0}")]
    InvalidData(String),
}

pub type Result<T> = std::result::Result<T, Error>;
