use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{MessageId, MessageKey, ShardId};

/// Snapshot of the sender taken when the message was composed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Author {
    pub id: String,
    pub display_name: String,
    pub avatar_url: String,
}

/// Where a message stands with respect to the durable store.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DeliveryStatus {
    /// Shown optimistically, write not finished.
    Pending,
    /// Read from, or written to, the store.
    Confirmed,
    /// The write never happened or was rejected.
    Failed,
}

/// A single chat message as displayed in a timeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    /// Shard the message was read from or routed to.
    pub shard: Option<ShardId>,
    /// Empty for image-only messages.
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub author: Author,
    pub image_ref: Option<String>,
    pub status: DeliveryStatus,
}

impl Message {
    pub fn key(&self) -> MessageKey {
        MessageKey {
            shard: self.shard.clone(),
            id: self.id.clone(),
        }
    }

    pub fn has_image(&self) -> bool {
        self.image_ref.as_deref().is_some_and(|r| !r.is_empty())
    }
}
