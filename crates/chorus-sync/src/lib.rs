//! # chorus-sync
//!
//! Keeps the message timeline of one chat room in step with a document
//! store whose history is split over several independently paginated shard
//! collections.
//!
//! - [`reader::ShardReader`] pages one shard newest-first and decodes records.
//! - [`merge::MergeEngine`] fans a page request out to every shard, joins the
//!   results and orders them by time; each shard keeps its own cursor.
//! - [`timeline::Timeline`] owns the displayed list: initial load, older
//!   pages merged at the tail, optimistic appends at the head.
//! - [`send::SendPipeline`] uploads attachments, shows the message at once and
//!   writes it to the shard the room is routed to.

pub mod codec;
pub mod config;
pub mod events;
pub mod merge;
pub mod reader;
pub mod routing;
pub mod send;
pub mod timeline;

mod error;

#[cfg(test)]
mod test_support;

pub use config::SyncConfig;
pub use error::{ConfigError, Result, SyncError};
pub use events::TimelineEvent;
pub use merge::{MergeEngine, MergedPage, ShardCursors};
pub use reader::{ShardCursor, ShardPage, ShardReader};
pub use routing::RoutingTable;
pub use send::{Attachment, Draft, SendPipeline};
pub use timeline::{LoadOutcome, Timeline};
