//! In-memory document store.
//!
//! The reference [`DocumentStore`] implementation, used by the server binary
//! and the test suite. Collections are plain maps behind a
//! `parking_lot::RwLock`; commits take the write lock, so guard verification
//! and application happen atomically with respect to every other transaction.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use super::query::compare_values;
use super::{Document, DocumentStore, StoreError, StoreQuery, StoreResult, Transaction, WriteGuard, WriteOp};
use crate::pagination::SortDirection;

#[derive(Debug, Clone)]
struct StoredDocument {
    version: u64,
    data: Value,
}

/// In-process document store with versioned documents and atomic transactions.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, BTreeMap<String, StoredDocument>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently in a collection (test helper).
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .get(collection)
            .map(|c| c.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    fn verify_guard(
        collections: &HashMap<String, BTreeMap<String, StoredDocument>>,
        collection: &str,
        id: &str,
        guard: &WriteGuard,
    ) -> StoreResult<()> {
        let existing = collections.get(collection).and_then(|c| c.get(id));

        let ok = match guard {
            WriteGuard::Any => true,
            WriteGuard::MustNotExist => existing.is_none(),
            WriteGuard::Version(v) => existing.map(|d| d.version) == Some(*v),
        };

        if ok {
            Ok(())
        } else {
            Err(StoreError::WriteConflict {
                collection: collection.to_string(),
                id: id.to_string(),
            })
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        let collections = self.collections.read();
        Ok(collections.get(collection).and_then(|c| {
            c.get(id).map(|stored| Document {
                id: id.to_string(),
                version: stored.version,
                data: stored.data.clone(),
            })
        }))
    }

    async fn query(&self, collection: &str, query: &StoreQuery) -> StoreResult<Vec<Document>> {
        let collections = self.collections.read();
        let Some(col) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut matches: Vec<(&String, &StoredDocument)> = col
            .iter()
            .filter(|(_, stored)| {
                query.filters.iter().all(|f| {
                    stored.data.get(&f.field).map(|v| v == &f.value).unwrap_or(false)
                })
            })
            .collect();

        if let Some(order) = &query.order_by {
            matches.sort_by(|(a_id, a), (b_id, b)| {
                let a_key = a.data.get(&order.field).unwrap_or(&Value::Null);
                let b_key = b.data.get(&order.field).unwrap_or(&Value::Null);
                let cmp = compare_values(a_key, b_key).then_with(|| a_id.cmp(b_id));
                match order.direction {
                    SortDirection::Asc => cmp,
                    SortDirection::Desc => cmp.reverse(),
                }
            });
        }

        let mut results: Vec<Document> = matches
            .into_iter()
            .skip_while(|(id, stored)| {
                // Resume strictly after the cursor position in sort order.
                let Some(after) = &query.start_after else {
                    return false;
                };
                let Some(order) = &query.order_by else {
                    return false;
                };
                let key = stored.data.get(&order.field).unwrap_or(&Value::Null);
                let cmp = compare_values(key, &after.value).then_with(|| (*id).cmp(&after.id));
                let at_or_before = match order.direction {
                    SortDirection::Asc => cmp != std::cmp::Ordering::Greater,
                    SortDirection::Desc => cmp != std::cmp::Ordering::Less,
                };
                at_or_before
            })
            .map(|(id, stored)| Document {
                id: id.clone(),
                version: stored.version,
                data: stored.data.clone(),
            })
            .collect();

        if let Some(limit) = query.limit {
            results.truncate(limit);
        }

        Ok(results)
    }

    async fn commit(&self, tx: Transaction) -> StoreResult<()> {
        let mut collections = self.collections.write();

        // Verify every guard before touching anything, so a failed guard
        // leaves the store untouched.
        for op in tx.ops() {
            match op {
                WriteOp::Put {
                    collection,
                    id,
                    guard,
                    ..
                }
                | WriteOp::Delete {
                    collection,
                    id,
                    guard,
                } => Self::verify_guard(&collections, collection, id, guard)?,
            }
        }

        for op in tx.ops() {
            match op {
                WriteOp::Put {
                    collection,
                    id,
                    data,
                    ..
                } => {
                    let col = collections.entry(collection.clone()).or_default();
                    let version = col.get(id).map(|d| d.version + 1).unwrap_or(1);
                    col.insert(
                        id.clone(),
                        StoredDocument {
                            version,
                            data: data.clone(),
                        },
                    );
                }
                WriteOp::Delete { collection, id, .. } => {
                    if let Some(col) = collections.get_mut(collection) {
                        col.remove(id);
                    }
                }
            }
        }

        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_put_and_get() {
        let store = MemoryStore::new();
        store
            .put("events", "e1", json!({"title": "Rust Meetup"}))
            .await
            .unwrap();

        let fetched = store.get("events", "e1").await.unwrap().unwrap();
        assert_eq!(fetched.version, 1);
        assert_eq!(fetched.data["title"], "Rust Meetup");
    }

    #[tokio::test]
    async fn test_put_bumps_version() {
        let store = MemoryStore::new();
        store.put("events", "e1", json!({"n": 1})).await.unwrap();
        store.put("events", "e1", json!({"n": 2})).await.unwrap();

        let doc = store.get("events", "e1").await.unwrap().unwrap();
        assert_eq!(doc.version, 2);
        assert_eq!(doc.data["n"], 2);
    }

    #[tokio::test]
    async fn test_version_guard_detects_concurrent_write() {
        let store = MemoryStore::new();
        store.put("events", "e1", json!({"count": 0})).await.unwrap();
        let doc = store.get("events", "e1").await.unwrap().unwrap();

        // Another writer sneaks in.
        store.put("events", "e1", json!({"count": 5})).await.unwrap();

        let result = store
            .commit(Transaction::new().update("events", "e1", doc.version, json!({"count": 1})))
            .await;

        assert!(matches!(result, Err(StoreError::WriteConflict { .. })));
        let current = store.get("events", "e1").await.unwrap().unwrap();
        assert_eq!(current.data["count"], 5);
    }

    #[tokio::test]
    async fn test_must_not_exist_guard() {
        let store = MemoryStore::new();
        store
            .commit(Transaction::new().create("regs", "r1", json!({"a": 1})))
            .await
            .unwrap();

        let result = store
            .commit(Transaction::new().create("regs", "r1", json!({"a": 2})))
            .await;
        assert!(matches!(result, Err(StoreError::WriteConflict { .. })));
    }

    #[tokio::test]
    async fn test_failed_guard_aborts_whole_batch() {
        let store = MemoryStore::new();
        store.put("events", "e1", json!({"count": 0})).await.unwrap();

        let result = store
            .commit(
                Transaction::new()
                    .create("regs", "r1", json!({"user": "u1"}))
                    .update("events", "e1", 99, json!({"count": 1})),
            )
            .await;

        assert!(matches!(result, Err(StoreError::WriteConflict { .. })));
        // The registration must not have been applied either.
        assert!(store.get("regs", "r1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = MemoryStore::new();
        store
            .commit(Transaction::new().delete("events", "missing"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_query_filters_orders_and_limits() {
        let store = MemoryStore::new();
        for (id, status, created) in [
            ("a", "approved", "2024-01-01T00:00:00Z"),
            ("b", "pending", "2024-02-01T00:00:00Z"),
            ("c", "approved", "2024-03-01T00:00:00Z"),
            ("d", "approved", "2024-04-01T00:00:00Z"),
        ] {
            store
                .put("events", id, json!({"status": status, "createdAt": created}))
                .await
                .unwrap();
        }

        let query = StoreQuery::new()
            .filter("status", "approved")
            .order_by("createdAt", SortDirection::Desc)
            .limit(2);
        let page = store.query("events", &query).await.unwrap();

        let ids: Vec<&str> = page.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["d", "c"]);
    }

    #[tokio::test]
    async fn test_query_start_after_resumes_scan() {
        let store = MemoryStore::new();
        for (id, created) in [
            ("a", "2024-01-01T00:00:00Z"),
            ("b", "2024-02-01T00:00:00Z"),
            ("c", "2024-03-01T00:00:00Z"),
        ] {
            store
                .put("events", id, json!({"createdAt": created}))
                .await
                .unwrap();
        }

        let query = StoreQuery::new()
            .order_by("createdAt", SortDirection::Desc)
            .start_after(json!("2024-03-01T00:00:00Z"), "c");
        let page = store.query("events", &query).await.unwrap();

        let ids: Vec<&str> = page.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }
}
