//! Identifiers, the canonical chat message model and protocol constants
//! shared by the store client and the sync engine.

pub mod constants;
pub mod error;
pub mod message;
pub mod types;

pub use error::DecodeError;
pub use message::{Author, DeliveryStatus, Message};
pub use types::{MessageId, MessageKey, RoomId, ShardId};
