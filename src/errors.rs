use thiserror::Error;

#[derive(Debug, Error)]
pub enum AccessError {
    #[error("relationships are not supported: {0}")]
    RelationshipsUnsupported(String),

    #[error("cannot convert '{value}' on field '{field}' to {target}")]
    LiteralCoercion { field: String, value: String, target: &'static str },

    #[error("write was not acknowledged by the store: {0}")]
    WriteNotAcknowledged(String),

    #[error("resource '{id}' does not exist in collection '{collection}'")]
    ResourceNotFound { collection: String, id: String },

    #[error("transaction conflict: {0}")]
    TransactionConflict(String),

    #[error("collection not found: {0}")]
    UnknownCollection(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("query error: {0}")]
    Query(String),

    #[error("serde JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl AccessError {
    /// True for failures a caller may safely retry; client input errors and
    /// not-found conditions are final.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::WriteNotAcknowledged(_) | Self::TransactionConflict(_))
    }
}
