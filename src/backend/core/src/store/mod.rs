//! Document-store seam.
//!
//! The core components talk to persistence exclusively through the
//! [`DocumentStore`] trait: named collections of JSON documents with
//! per-document versions, equality/ordered/paginated queries, and atomic
//! multi-document transactions with guarded writes.
//!
//! The transaction primitive is the correctness mechanism for the capacity
//! invariant: a writer reads a document (observing its version), then commits
//! a [`WriteGuard::Version`]-guarded write. If another writer committed in
//! between, the guard fails with [`StoreError::WriteConflict`] and the caller
//! retries from a fresh read. Guard checks and writes happen atomically for
//! the whole batch: either every op in a transaction applies, or none do.

mod memory;
mod query;

pub use memory::MemoryStore;
pub use query::{FieldFilter, OrderBy, StartAfter, StoreQuery};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════════════════════════

/// Errors reported by a document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A write guard failed: the document was created, modified, or deleted
    /// by a concurrent transaction. Retry from a fresh read.
    #[error("write conflict on {collection}/{id}")]
    WriteConflict { collection: String, id: String },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// A specialized Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

// ═══════════════════════════════════════════════════════════════════════════════
// Documents
// ═══════════════════════════════════════════════════════════════════════════════

/// A stored document: id, monotonically increasing version, JSON payload.
///
/// The version changes on every committed write and is the token used by
/// [`WriteGuard::Version`] to detect concurrent modification.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub version: u64,
    pub data: Value,
}

impl Document {
    /// Deserialize the payload into a typed value.
    pub fn decode<T: DeserializeOwned>(&self) -> StoreResult<T> {
        serde_json::from_value(self.data.clone())
            .map_err(|e| StoreError::Serialization(e.to_string()))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Transactions
// ═══════════════════════════════════════════════════════════════════════════════

/// Precondition attached to a transactional write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteGuard {
    /// No precondition; last writer wins.
    Any,
    /// The document must not exist yet.
    MustNotExist,
    /// The document must exist at exactly this version.
    Version(u64),
}

/// A single operation inside a transaction.
#[derive(Debug, Clone)]
pub enum WriteOp {
    Put {
        collection: String,
        id: String,
        data: Value,
        guard: WriteGuard,
    },
    Delete {
        collection: String,
        id: String,
        guard: WriteGuard,
    },
}

/// An atomic batch of guarded writes.
///
/// All guards are checked and all ops applied under a single commit; a failed
/// guard aborts the whole batch with [`StoreError::WriteConflict`].
#[derive(Debug, Clone, Default)]
pub struct Transaction {
    ops: Vec<WriteOp>,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a document unconditionally.
    pub fn put(mut self, collection: impl Into<String>, id: impl Into<String>, data: Value) -> Self {
        self.ops.push(WriteOp::Put {
            collection: collection.into(),
            id: id.into(),
            data,
            guard: WriteGuard::Any,
        });
        self
    }

    /// Create a document that must not exist yet.
    pub fn create(
        mut self,
        collection: impl Into<String>,
        id: impl Into<String>,
        data: Value,
    ) -> Self {
        self.ops.push(WriteOp::Put {
            collection: collection.into(),
            id: id.into(),
            data,
            guard: WriteGuard::MustNotExist,
        });
        self
    }

    /// Replace a document that must still be at `version`.
    pub fn update(
        mut self,
        collection: impl Into<String>,
        id: impl Into<String>,
        version: u64,
        data: Value,
    ) -> Self {
        self.ops.push(WriteOp::Put {
            collection: collection.into(),
            id: id.into(),
            data,
            guard: WriteGuard::Version(version),
        });
        self
    }

    /// Delete a document (idempotent: deleting an absent document is a no-op).
    pub fn delete(mut self, collection: impl Into<String>, id: impl Into<String>) -> Self {
        self.ops.push(WriteOp::Delete {
            collection: collection.into(),
            id: id.into(),
            guard: WriteGuard::Any,
        });
        self
    }

    /// Delete a document that must still be at `version`.
    pub fn delete_versioned(
        mut self,
        collection: impl Into<String>,
        id: impl Into<String>,
        version: u64,
    ) -> Self {
        self.ops.push(WriteOp::Delete {
            collection: collection.into(),
            id: id.into(),
            guard: WriteGuard::Version(version),
        });
        self
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Store Trait
// ═══════════════════════════════════════════════════════════════════════════════

/// The persistence seam used by every core component.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Fetch a document by id.
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>>;

    /// Run an equality-filtered, ordered, paginated scan.
    async fn query(&self, collection: &str, query: &StoreQuery) -> StoreResult<Vec<Document>>;

    /// Atomically commit a batch of guarded writes.
    async fn commit(&self, tx: Transaction) -> StoreResult<()>;

    /// Write a single document unconditionally.
    async fn put(&self, collection: &str, id: &str, data: Value) -> StoreResult<()> {
        self.commit(Transaction::new().put(collection, id, data)).await
    }

    /// Delete a single document.
    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        self.commit(Transaction::new().delete(collection, id)).await
    }
}
