//! Merging independently paginated shards into one newest-first page.
//!
//! Each call fans out one read per shard, joins them and orders the union
//! by `created_at` descending.  Shards advance their own cursors so a busy
//! shard can be paged deep while a quiet one is already exhausted.

use std::sync::Arc;

use futures::future::try_join_all;
use tracing::debug;

use chorus_shared::{Message, RoomId, ShardId};
use chorus_store::{CollectionPath, DocumentStore};

use crate::error::Result;
use crate::reader::{ShardCursor, ShardPage, ShardReader};

/// Per-shard cursors, kept in shard fetch order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShardCursors(Vec<ShardCursor>);

impl ShardCursors {
    pub fn get(&self, shard: &ShardId) -> Option<&ShardCursor> {
        self.0.iter().find(|c| &c.shard == shard)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ShardCursor> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when no shard has older records left (or there are no shards).
    pub fn all_exhausted(&self) -> bool {
        self.0.iter().all(|c| c.exhausted)
    }

    fn upsert(&mut self, cursor: ShardCursor) {
        match self.0.iter_mut().find(|c| c.shard == cursor.shard) {
            Some(slot) => *slot = cursor,
            None => self.0.push(cursor),
        }
    }
}

impl FromIterator<ShardCursor> for ShardCursors {
    fn from_iter<I: IntoIterator<Item = ShardCursor>>(iter: I) -> Self {
        let mut cursors = Self::default();
        for cursor in iter {
            cursors.upsert(cursor);
        }
        cursors
    }
}

/// Result of a merge fetch.
#[derive(Debug, Clone, Default)]
pub struct MergedPage {
    /// Newest first; equal timestamps keep shard fetch order.
    pub messages: Vec<Message>,
    pub cursors: ShardCursors,
}

impl MergedPage {
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Merge fetcher bound to one room.
pub struct MergeEngine<S> {
    reader: ShardReader<S>,
    room: RoomId,
}

impl<S: DocumentStore> MergeEngine<S> {
    pub fn new(store: Arc<S>, rooms: CollectionPath, room: RoomId) -> Self {
        Self {
            reader: ShardReader::new(store, rooms),
            room,
        }
    }

    pub fn room(&self) -> &RoomId {
        &self.room
    }

    /// First page of every shard, merged.
    pub async fn fetch_initial(&self, shards: &[ShardId], page_size: usize) -> Result<MergedPage> {
        let pages = try_join_all(
            shards
                .iter()
                .map(|shard| self.reader.fetch(&self.room, shard, page_size, None)),
        )
        .await?;

        let cursors = pages.iter().map(|p| p.cursor.clone()).collect();
        let messages = merge_pages(pages);
        debug!(room = %self.room, shards = shards.len(), count = messages.len(), "Initial merge fetch");
        Ok(MergedPage { messages, cursors })
    }

    /// Next page of every shard that is not exhausted, each from its own cursor.
    ///
    /// Returns an empty page, without touching the store, once every shard is
    /// exhausted.
    pub async fn fetch_older(&self, cursors: &ShardCursors, page_size: usize) -> Result<MergedPage> {
        let pending: Vec<&ShardCursor> = cursors.iter().filter(|c| !c.exhausted).collect();
        if pending.is_empty() {
            debug!(room = %self.room, "All shards exhausted");
            return Ok(MergedPage {
                messages: Vec::new(),
                cursors: cursors.clone(),
            });
        }

        let pages = try_join_all(
            pending
                .iter()
                .map(|cursor| self.reader.fetch(&self.room, &cursor.shard, page_size, Some(*cursor))),
        )
        .await?;

        let mut next = cursors.clone();
        for page in &pages {
            next.upsert(page.cursor.clone());
        }
        let messages = merge_pages(pages);
        debug!(room = %self.room, shards = pending.len(), count = messages.len(), "Older merge fetch");
        Ok(MergedPage {
            messages,
            cursors: next,
        })
    }
}

/// Concatenate shard pages in fetch order, then stable-sort newest first.
fn merge_pages(pages: Vec<ShardPage>) -> Vec<Message> {
    let mut messages: Vec<Message> = pages.into_iter().flat_map(|p| p.messages).collect();
    messages.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    messages
}

/// Stable merge of two newest-first sequences; on ties `newer` entries come first.
pub fn merge_descending(newer: Vec<Message>, older: Vec<Message>) -> Vec<Message> {
    let mut merged = Vec::with_capacity(newer.len() + older.len());
    let mut left = newer.into_iter().peekable();
    let mut right = older.into_iter().peekable();
    loop {
        let take_left = match (left.peek(), right.peek()) {
            (Some(l), Some(r)) => l.created_at >= r.created_at,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => break,
        };
        let next = if take_left { left.next() } else { right.next() };
        merged.extend(next);
    }
    merged
}
