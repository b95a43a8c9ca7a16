//! Common metadata for all documents
//!
//! `created_at` is written once on insert (or `$setOnInsert` on upsert) and
//! never appears in a progress `$set`.

use bson::DateTime;
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Common metadata for all documents
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Metadata {
    /// Whether this document has been soft-deleted
    #[serde(default)]
    pub is_deleted: bool,

    /// When the document was last updated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,

    /// When the document was created
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,
}

impl Metadata {
    /// Create new metadata with current timestamp
    pub fn new() -> Self {
        Self {
            is_deleted: false,
            updated_at: Some(DateTime::now()),
            created_at: Some(DateTime::now()),
        }
    }

    /// Creation time as chrono, for the staleness check
    pub fn created_at_utc(&self) -> Option<chrono::DateTime<Utc>> {
        self.created_at.map(|d| d.to_chrono())
    }

    /// Metadata backdated to a specific creation time
    pub fn created(at: chrono::DateTime<Utc>) -> Self {
        let at = DateTime::from_chrono(at);
        Self {
            is_deleted: false,
            updated_at: Some(at),
            created_at: Some(at),
        }
    }
}
