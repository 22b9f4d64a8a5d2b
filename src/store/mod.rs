//! Document store boundary
//!
//! The coordination core never talks to peers directly: all shared state
//! lives in a document database offering atomic read-modify-write
//! transactions and push-style change subscriptions. This module defines
//! the document addressing/result types and `memory` provides the
//! in-process store that implements the contract.

pub mod memory;

pub use memory::{DocWatch, MemoryStore, QueryWatch, Txn};

use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Location of a single document: a collection name plus a document id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocPath {
    pub collection: String,
    pub id: String,
}

impl DocPath {
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// A document returned from a query, with its id.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

impl Document {
    /// Decode the document into a typed value.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        Ok(serde_json::from_value(self.data.clone())?)
    }
}

/// Store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Transaction retries exhausted; the storage layer gave up.
    #[error("storage unavailable: transaction retries exhausted")]
    Unavailable,
    /// A field-merge update addressed a document that does not exist.
    #[error("document missing: {0}")]
    Missing(DocPath),
    /// A document failed to (de)serialize; data-integrity error.
    #[error("corrupt document: {0}")]
    Corrupt(#[from] serde_json::Error),
}
