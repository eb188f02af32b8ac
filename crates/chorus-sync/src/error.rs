use thiserror::Error;

use chorus_shared::{RoomId, ShardId};
use chorus_store::{StoreError, UploadError};

/// Errors surfaced by the sync engine to its host.
///
/// None of these are fatal: the timeline keeps its previous state and the
/// host is expected to report them to the user.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Reading one shard failed; the whole merge fetch is abandoned.
    #[error("Fetch from shard {shard} failed: {source}")]
    Fetch {
        shard: ShardId,
        #[source]
        source: StoreError,
    },

    /// The room has no destination shard, nothing was written.
    #[error("No shard routed for room {room}")]
    Routing { room: RoomId },

    #[error("Attachment upload failed: {0}")]
    Upload(#[from] UploadError),

    #[error("Persisting to shard {shard} failed: {source}")]
    Persist {
        shard: ShardId,
        #[source]
        source: StoreError,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Timeline for room {0} is closed")]
    Closed(RoomId),

    #[error("Nothing to send: draft has neither text nor image")]
    EmptyDraft,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("At least one shard must be configured")]
    NoShards,

    #[error("Shard listed twice: {0}")]
    DuplicateShard(String),

    #[error("Invalid shard name: {0:?}")]
    InvalidShard(String),

    #[error("Invalid root collection: {0:?}")]
    InvalidRootCollection(String),

    #[error("Page size must be at least 1")]
    ZeroPageSize,

    #[error("Malformed route entry: {0:?} (expected room=shard)")]
    MalformedRoute(String),

    #[error("Room {room} routes to unknown shard {shard}")]
    UnknownRouteTarget { room: String, shard: String },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SyncError>;
