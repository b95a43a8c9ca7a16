//! Error types for the reward ledger
//!
//! One flat enum with string payloads, plus `From` conversions for the
//! driver crates.

/// Main error type for ledger operations
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Missing input: {0}")]
    MissingInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    /// A unique index rejected a write (concurrent insert of the same key)
    #[error("Duplicate key: {0}")]
    Duplicate(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("NATS error: {0}")]
    Nats(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    /// Whether the caller should treat this as "discard, do not retry"
    pub fn is_discardable(&self) -> bool {
        matches!(self, Self::BadRequest(_) | Self::MissingInput(_))
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        Self::BadRequest(format!("JSON error: {}", err))
    }
}

impl From<reqwest::Error> for LedgerError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.to_string())
    }
}

impl From<async_nats::Error> for LedgerError {
    fn from(err: async_nats::Error) -> Self {
        Self::Nats(err.to_string())
    }
}

impl From<mongodb::error::Error> for LedgerError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<bson::ser::Error> for LedgerError {
    fn from(err: bson::ser::Error) -> Self {
        Self::Internal(format!("BSON serialization error: {}", err))
    }
}

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discardable_errors() {
        assert!(LedgerError::MissingInput("event_id".into()).is_discardable());
        assert!(LedgerError::BadRequest("amount".into()).is_discardable());
        assert!(!LedgerError::Database("timeout".into()).is_discardable());
        assert!(!LedgerError::Duplicate("rewards".into()).is_discardable());
    }

    #[test]
    fn test_json_error_maps_to_bad_request() {
        let err: LedgerError = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
        assert!(matches!(err, LedgerError::BadRequest(_)));
    }
}
