//! Database layer
//!
//! MongoDB connection management, schemas, and the ledger store seam.

pub mod memory;
pub mod mongo;
pub mod schemas;
pub mod store;

pub use memory::InMemoryLedgerStore;
pub use mongo::{MongoClient, MongoCollection};
pub use store::{
    LedgerStore, MongoLedgerStore, MongoUserDirectory, SharedDirectory, SharedStore, UserDirectory,
};
