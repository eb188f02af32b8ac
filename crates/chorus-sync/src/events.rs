use serde::Serialize;

use chorus_shared::{DeliveryStatus, MessageKey, RoomId};

/// Capacity of the per-timeline event channel.
pub const EVENT_CAPACITY: usize = 64;

/// Changes a UI layer can react to.  Receivers that lag simply miss events;
/// the timeline snapshot is always authoritative.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TimelineEvent {
    Reset { room: RoomId, count: usize },
    Prepended { room: RoomId, count: usize },
    Appended { room: RoomId, key: MessageKey, index: usize },
    StatusChanged { room: RoomId, key: MessageKey, status: DeliveryStatus },
    Failed { room: RoomId, error: String },
    Closed { room: RoomId },
}
