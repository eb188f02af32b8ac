//! Page-at-a-time reads from a single shard.

use std::sync::Arc;

use tracing::{debug, warn};

use chorus_shared::constants::FIELD_TIMESTAMP;
use chorus_shared::{Message, RoomId, ShardId};
use chorus_store::{CollectionPath, Direction, DocumentStore, Query, Record};

use crate::codec::decode_record;
use crate::error::{Result, SyncError};

/// Pagination state of one shard.
#[derive(Debug, Clone, PartialEq)]
pub struct ShardCursor {
    pub shard: ShardId,
    /// Last raw record returned for this shard; the next page starts after it.
    pub last_seen: Option<Record>,
    /// No older records remain.
    pub exhausted: bool,
}

impl ShardCursor {
    pub fn fresh(shard: ShardId) -> Self {
        Self {
            shard,
            last_seen: None,
            exhausted: false,
        }
    }
}

/// One decoded page of a shard.
#[derive(Debug, Clone)]
pub struct ShardPage {
    /// Newest first.
    pub messages: Vec<Message>,
    pub cursor: ShardCursor,
    /// Records skipped because they could not be decoded.
    pub dropped: usize,
}

/// Reads shard sub-collections `{rooms}/{room}/{shard}` newest first.
pub struct ShardReader<S> {
    store: Arc<S>,
    rooms: CollectionPath,
}

impl<S: DocumentStore> ShardReader<S> {
    pub fn new(store: Arc<S>, rooms: CollectionPath) -> Self {
        Self { store, rooms }
    }

    pub fn collection(&self, room: &RoomId, shard: &ShardId) -> chorus_store::Result<CollectionPath> {
        self.rooms.child(room.as_str(), shard.as_str())
    }

    /// Fetch up to `page_size` messages of `shard`, continuing after `after`.
    ///
    /// Only an empty page marks the cursor exhausted; a short page keeps the
    /// shard open so late writes older than the tail are still read.  Records
    /// that fail to decode are dropped without failing the page.
    pub async fn fetch(
        &self,
        room: &RoomId,
        shard: &ShardId,
        page_size: usize,
        after: Option<&ShardCursor>,
    ) -> Result<ShardPage> {
        let fetch_error = |source| SyncError::Fetch {
            shard: shard.clone(),
            source,
        };

        let previous = after.and_then(|c| c.last_seen.clone());
        let query = Query::new(self.collection(room, shard).map_err(fetch_error)?, FIELD_TIMESTAMP)
            .direction(Direction::Descending)
            .limit(page_size)
            .start_after(previous.clone());

        let records = self.store.query(&query).await.map_err(fetch_error)?;

        let mut messages = Vec::with_capacity(records.len());
        let mut dropped = 0;
        for record in &records {
            match decode_record(shard, record) {
                Ok(message) => messages.push(message),
                Err(e) => {
                    dropped += 1;
                    warn!(room = %room, shard = %shard, record = %record.id, error = %e, "Dropping undecodable record");
                }
            }
        }

        let cursor = ShardCursor {
            shard: shard.clone(),
            last_seen: records.last().cloned().or(previous),
            exhausted: records.is_empty(),
        };

        debug!(
            room = %room,
            shard = %shard,
            fetched = records.len(),
            decoded = messages.len(),
            exhausted = cursor.exhausted,
            "Fetched shard page"
        );

        Ok(ShardPage {
            messages,
            cursor,
            dropped,
        })
    }
}
