//! Static room -> shard routing for new messages.

use std::collections::HashMap;

use chorus_shared::{RoomId, ShardId};

use crate::error::ConfigError;

/// Which shard a room writes new messages into.
///
/// Rooms missing from the table cannot send; see [`crate::SyncError::Routing`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingTable {
    routes: HashMap<RoomId, ShardId>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_route(mut self, room: impl Into<String>, shard: impl Into<String>) -> Self {
        self.insert(RoomId::new(room), ShardId::new(shard));
        self
    }

    pub fn insert(&mut self, room: RoomId, shard: ShardId) -> Option<ShardId> {
        self.routes.insert(room, shard)
    }

    pub fn resolve(&self, room: &RoomId) -> Option<&ShardId> {
        self.routes.get(room)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RoomId, &ShardId)> {
        self.routes.iter()
    }

    /// Parse `room=shard` pairs separated by commas.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let mut table = Self::new();
        for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (room, shard) = entry
                .split_once('=')
                .map(|(r, s)| (r.trim(), s.trim()))
                .filter(|(r, s)| !r.is_empty() && !s.is_empty())
                .ok_or_else(|| ConfigError::MalformedRoute(entry.to_string()))?;
            table.insert(RoomId::new(room), ShardId::new(shard));
        }
        Ok(table)
    }

    /// Every route must point at one of `shards`.
    pub fn validate(&self, shards: &[ShardId]) -> Result<(), ConfigError> {
        for (room, shard) in &self.routes {
            if !shards.contains(shard) {
                return Err(ConfigError::UnknownRouteTarget {
                    room: room.to_string(),
                    shard: shard.to_string(),
                });
            }
        }
        Ok(())
    }
}
