//! Instrumented store and fixtures shared by the unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::{json, Map, Value};
use tokio::sync::Notify;

use chorus_shared::{Author, DeliveryStatus, Message, MessageId, ShardId};
use chorus_store::{
    CollectionPath, DocumentStore, InMemoryDocumentStore, LocalImage, Query, Record, StoreError,
    StoreTimestamp, UploadError, Uploader,
};

pub(crate) fn rooms() -> CollectionPath {
    CollectionPath::root("rooms").unwrap()
}

pub(crate) fn shard_path(room: &str, shard: &str) -> CollectionPath {
    rooms().child(room, shard).unwrap()
}

pub(crate) fn author() -> Author {
    Author {
        id: "u1".into(),
        display_name: "Ada".into(),
        avatar_url: "https://avatars.test/u1".into(),
    }
}

pub(crate) fn message_record(id: &str, seconds: i64) -> Record {
    let fields = json!({
        "_id": id,
        "text": format!("m{seconds}"),
        "timestamp": StoreTimestamp { seconds, nanos: 0 }.to_value(),
        "user": { "_id": "u1", "name": "Ada", "avatar": "" },
        "image": "",
    });
    match fields {
        Value::Object(map) => Record::new(id, map),
        _ => unreachable!(),
    }
}

pub(crate) fn null_timestamp_record(id: &str) -> Record {
    let mut record = message_record(id, 0);
    record.fields.insert("timestamp".into(), Value::Null);
    record
}

pub(crate) fn message(id: &str, seconds: i64) -> Message {
    Message {
        id: MessageId::new(id),
        shard: Some(ShardId::new("alpha")),
        text: String::new(),
        created_at: chrono::DateTime::from_timestamp(seconds, 0).unwrap(),
        author: author(),
        image_ref: None,
        status: DeliveryStatus::Confirmed,
    }
}

pub(crate) fn timestamps(messages: &[Message]) -> Vec<i64> {
    messages.iter().map(|m| m.created_at.timestamp()).collect()
}

/// Seed `room/shard` with one record per timestamp, ids `{shard}-{seconds}`.
pub(crate) fn seed(store: &ScriptedStore, room: &str, shard: &str, seconds: &[i64]) {
    for s in seconds {
        store.insert(room, shard, message_record(&format!("{shard}-{s}"), *s));
    }
}

/// In-memory store that counts queries, can fail on demand and can yield
/// to the scheduler so concurrent callers interleave.
#[derive(Default)]
pub(crate) struct ScriptedStore {
    inner: InMemoryDocumentStore,
    queries: Mutex<HashMap<String, usize>>,
    failing: Mutex<HashSet<String>>,
    fail_adds: AtomicBool,
    adds: AtomicUsize,
    yields: usize,
    add_gate: Option<Arc<Notify>>,
}

impl ScriptedStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Every query yields `n` times before answering.
    pub(crate) fn with_yields(mut self, n: usize) -> Self {
        self.yields = n;
        self
    }

    /// Every add waits for a notification before writing.
    pub(crate) fn with_add_gate(mut self, gate: Arc<Notify>) -> Self {
        self.add_gate = Some(gate);
        self
    }

    pub(crate) fn insert(&self, room: &str, shard: &str, record: Record) {
        self.inner.insert(&shard_path(room, shard), record).unwrap();
    }

    pub(crate) fn records(&self, room: &str, shard: &str) -> Vec<Record> {
        self.inner.records(&shard_path(room, shard)).unwrap()
    }

    pub(crate) fn fail_queries_on(&self, room: &str, shard: &str) {
        self.failing
            .lock()
            .unwrap()
            .insert(shard_path(room, shard).to_string());
    }

    pub(crate) fn heal(&self, room: &str, shard: &str) {
        self.failing
            .lock()
            .unwrap()
            .remove(shard_path(room, shard).as_str());
    }

    pub(crate) fn fail_adds(&self) {
        self.fail_adds.store(true, Ordering::SeqCst);
    }

    pub(crate) fn queries_for(&self, room: &str, shard: &str) -> usize {
        self.queries
            .lock()
            .unwrap()
            .get(shard_path(room, shard).as_str())
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn total_queries(&self) -> usize {
        self.queries.lock().unwrap().values().sum()
    }

    pub(crate) fn add_calls(&self) -> usize {
        self.adds.load(Ordering::SeqCst)
    }
}

impl DocumentStore for ScriptedStore {
    async fn query(&self, query: &Query) -> chorus_store::Result<Vec<Record>> {
        let path = query.collection.to_string();
        *self.queries.lock().unwrap().entry(path.clone()).or_default() += 1;

        for _ in 0..self.yields {
            tokio::task::yield_now().await;
        }

        let failing = self.failing.lock().unwrap().contains(&path);
        if failing {
            return Err(StoreError::Unavailable(format!("injected failure on {path}")));
        }
        self.inner.query(query).await
    }

    async fn add(
        &self,
        collection: &CollectionPath,
        fields: Map<String, Value>,
    ) -> chorus_store::Result<String> {
        self.adds.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.add_gate {
            gate.notified().await;
        }
        if self.fail_adds.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected write failure".into()));
        }
        self.inner.add(collection, fields).await
    }
}

/// Uploader that records requested names and answers with a fixed URL scheme.
#[derive(Default)]
pub(crate) struct ScriptedUploader {
    pub(crate) calls: Arc<Mutex<Vec<String>>>,
    fail: bool,
}

impl ScriptedUploader {
    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

impl Uploader for ScriptedUploader {
    async fn upload(&self, _image: &LocalImage, name: &str) -> Result<String, UploadError> {
        self.calls.lock().unwrap().push(name.to_string());
        if self.fail {
            return Err(UploadError::Rejected("injected upload failure".into()));
        }
        Ok(format!("https://cdn.test/{name}"))
    }
}
