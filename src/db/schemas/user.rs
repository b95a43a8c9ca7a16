//! User profile schema
//!
//! Read-only here: profiles are written by the account service. The ledger
//! resolves wallets and display attributes from them.

use bson::{oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for user profiles
pub const USER_COLLECTION: &str = "users";

/// User profile stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct UserProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub user_id: String,

    #[serde(default)]
    pub wallet_address: Option<String>,

    #[serde(default)]
    pub display_handle: Option<String>,

    #[serde(default)]
    pub display_name: Option<String>,
}

impl UserProfile {
    pub fn new(user_id: impl Into<String>, wallet_address: Option<String>) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            user_id: user_id.into(),
            wallet_address,
            display_handle: None,
            display_name: None,
        }
    }

    pub fn with_display(mut self, handle: impl Into<String>, name: impl Into<String>) -> Self {
        self.display_handle = Some(handle.into());
        self.display_name = Some(name.into());
        self
    }
}

/// The account service owns this collection and its indexes
impl IntoIndexes for UserProfile {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        Vec::new()
    }
}

impl MutMetadata for UserProfile {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
