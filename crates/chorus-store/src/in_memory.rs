//! HashMap-backed document store for tests, demos and offline development.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use crate::document_store::DocumentStore;
use crate::error::{Result, StoreError};
use crate::path::CollectionPath;
use crate::query::Query;
use crate::record::{compare_values, Record};

/// In-memory document store keyed by collection path.
///
/// Clone-friendly via Arc; clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDocumentStore {
    collections: Arc<RwLock<HashMap<String, Vec<Record>>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a document with a caller-chosen id (replacing any previous one).
    pub fn insert(&self, collection: &CollectionPath, record: Record) -> Result<()> {
        let mut collections = self
            .collections
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".into()))?;
        let docs = collections.entry(collection.as_str().to_string()).or_default();
        docs.retain(|existing| existing.id != record.id);
        docs.push(record);
        Ok(())
    }

    /// Snapshot of every document in `collection`, in insertion order.
    pub fn records(&self, collection: &CollectionPath) -> Result<Vec<Record>> {
        let collections = self
            .collections
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".into()))?;
        Ok(collections
            .get(collection.as_str())
            .cloned()
            .unwrap_or_default())
    }

    fn run_query(&self, query: &Query) -> Result<Vec<Record>> {
        if query.limit == 0 {
            return Err(StoreError::InvalidQuery("limit must be positive".into()));
        }

        let collections = self
            .collections
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".into()))?;
        let Some(docs) = collections.get(query.collection.as_str()) else {
            return Ok(Vec::new());
        };

        let field = query.order_by.as_str();
        // Documents without the ordering field never match an ordered query.
        let mut matching: Vec<&Record> = docs
            .iter()
            .filter(|record| record.fields.contains_key(field))
            .collect();
        matching.sort_by(|a, b| query.direction.apply(position(a, b, field)));

        let page: Vec<Record> = matching
            .into_iter()
            .filter(|record| match &query.start_after {
                Some(cursor) => query.direction.apply(position(record, cursor, field)) == Ordering::Greater,
                None => true,
            })
            .take(query.limit)
            .cloned()
            .collect();

        debug!(
            collection = %query.collection,
            returned = page.len(),
            resumed = query.start_after.is_some(),
            "In-memory query"
        );
        Ok(page)
    }
}

/// Ascending position of `a` relative to `b`: by field value, then document id.
fn position(a: &Record, b: &Record, field: &str) -> Ordering {
    let null = Value::Null;
    let av = a.get(field).unwrap_or(&null);
    let bv = b.get(field).unwrap_or(&null);
    compare_values(av, bv).then_with(|| a.id.cmp(&b.id))
}

impl DocumentStore for InMemoryDocumentStore {
    async fn query(&self, query: &Query) -> Result<Vec<Record>> {
        self.run_query(query)
    }

    async fn add(&self, collection: &CollectionPath, fields: Map<String, Value>) -> Result<String> {
        let id = Uuid::new_v4().simple().to_string();
        self.insert(collection, Record::new(id.clone(), fields))?;
        debug!(collection = %collection, id = %id, "Added document");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Direction;
    use crate::record::StoreTimestamp;
    use serde_json::json;

    fn shard() -> CollectionPath {
        CollectionPath::root("rooms")
            .unwrap()
            .child("R1", "alpha")
            .unwrap()
    }

    fn doc(id: &str, seconds: i64) -> Record {
        let mut fields = Map::new();
        fields.insert(
            "timestamp".into(),
            StoreTimestamp { seconds, nanos: 0 }.to_value(),
        );
        Record::new(id, fields)
    }

    fn seeded() -> InMemoryDocumentStore {
        let store = InMemoryDocumentStore::new();
        for (id, t) in [("a", 10), ("b", 40), ("c", 30), ("d", 20), ("e", 50)] {
            store.insert(&shard(), doc(id, t)).unwrap();
        }
        store
    }

    fn ids(records: &[Record]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_orders_descending_and_limits() {
        let store = seeded();
        let q = Query::new(shard(), "timestamp")
            .direction(Direction::Descending)
            .limit(3);
        let page = store.query(&q).await.unwrap();
        assert_eq!(ids(&page), vec!["e", "b", "c"]);
    }

    #[tokio::test]
    async fn test_resumes_after_cursor_record() {
        let store = seeded();
        let first = store
            .query(
                &Query::new(shard(), "timestamp")
                    .direction(Direction::Descending)
                    .limit(2),
            )
            .await
            .unwrap();
        let next = store
            .query(
                &Query::new(shard(), "timestamp")
                    .direction(Direction::Descending)
                    .limit(2)
                    .start_after(first.last().cloned()),
            )
            .await
            .unwrap();
        assert_eq!(ids(&next), vec!["c", "d"]);
    }

    #[tokio::test]
    async fn test_ties_break_on_document_id() {
        let store = InMemoryDocumentStore::new();
        store.insert(&shard(), doc("y", 5)).unwrap();
        store.insert(&shard(), doc("x", 5)).unwrap();
        let page = store
            .query(&Query::new(shard(), "timestamp").direction(Direction::Descending))
            .await
            .unwrap();
        assert_eq!(ids(&page), vec!["y", "x"]);
    }

    #[tokio::test]
    async fn test_null_values_sort_last_when_descending_and_missing_fields_are_excluded() {
        let store = seeded();
        let mut null_fields = Map::new();
        null_fields.insert("timestamp".into(), json!(null));
        store.insert(&shard(), Record::new("n", null_fields)).unwrap();
        store.insert(&shard(), Record::new("m", Map::new())).unwrap();

        let page = store
            .query(&Query::new(shard(), "timestamp").direction(Direction::Descending))
            .await
            .unwrap();
        assert_eq!(ids(&page), vec!["e", "b", "c", "d", "a", "n"]);
    }

    #[tokio::test]
    async fn test_add_assigns_unique_ids() {
        let store = InMemoryDocumentStore::new();
        let a = store.add(&shard(), Map::new()).await.unwrap();
        let b = store.add(&shard(), Map::new()).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(store.records(&shard()).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_collection_is_empty_and_zero_limit_is_rejected() {
        let store = seeded();
        let other = CollectionPath::root("nothing").unwrap();
        assert!(store
            .query(&Query::new(other, "timestamp"))
            .await
            .unwrap()
            .is_empty());
        assert!(store
            .query(&Query::new(shard(), "timestamp").limit(0))
            .await
            .is_err());
    }
}
