use std::future::Future;

use serde_json::{Map, Value};

use crate::error::Result;
use crate::path::CollectionPath;
use crate::query::Query;
use crate::record::Record;

/// Read and append access to a hierarchical document store.
///
/// Implementations must be safe to query concurrently; the sync engine fans
/// out one query per shard and joins them.
pub trait DocumentStore: Send + Sync {
    /// Run an ordered, limited query and return the matching documents in order.
    fn query(&self, query: &Query) -> impl Future<Output = Result<Vec<Record>>> + Send;

    /// Append a new document to `collection`, returning the id the store assigned.
    fn add(
        &self,
        collection: &CollectionPath,
        fields: Map<String, Value>,
    ) -> impl Future<Output = Result<String>> + Send;
}
