//! Sync configuration loaded from environment variables.
//!
//! Every setting has a default matching the shipped deployment, so a host can
//! start with zero configuration.  Call [`SyncConfig::validate`] once at
//! startup before building the engine.

use std::collections::HashSet;
use std::path::PathBuf;

use chorus_shared::constants::{
    DEFAULT_PAGE_SIZE, DEFAULT_ROOT_COLLECTION, DEFAULT_ROUTES, DEFAULT_SHARDS,
};
use chorus_shared::ShardId;

use crate::error::ConfigError;
use crate::routing::RoutingTable;

/// Sync engine configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Collection holding one document per room.
    /// Env: `CHORUS_ROOT_COLLECTION`
    /// Default: `chatRoomsCollection`
    pub root_collection: String,

    /// Shard sub-collections of every room, in fetch order.
    /// Env: `CHORUS_SHARDS` (comma separated)
    /// Default: `messageCollection,messageCollectionTwo`
    pub shards: Vec<ShardId>,

    /// Room -> shard routes for new messages.
    /// Env: `CHORUS_ROUTES` (`room=shard,...`)
    pub routes: RoutingTable,

    /// Records requested per shard page.
    /// Env: `CHORUS_PAGE_SIZE`
    /// Default: `50`
    pub page_size: usize,

    /// Directory receiving uploaded attachments.
    /// Env: `CHORUS_BLOB_PATH`
    /// Default: `./images`
    pub blob_path: PathBuf,

    /// Public URL prefix for uploaded attachments.
    /// Env: `CHORUS_IMAGE_BASE_URL`
    /// Default: none (`file://` references).
    pub image_base_url: Option<String>,

    /// Largest accepted attachment (10 MiB).
    pub max_attachment_size: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        let mut routes = RoutingTable::new();
        for (room, shard) in DEFAULT_ROUTES {
            routes = routes.with_route(room, shard);
        }
        Self {
            root_collection: DEFAULT_ROOT_COLLECTION.to_string(),
            shards: DEFAULT_SHARDS.iter().map(|s| ShardId::new(*s)).collect(),
            routes,
            page_size: DEFAULT_PAGE_SIZE,
            blob_path: PathBuf::from("./images"),
            image_base_url: None,
            max_attachment_size: 10 * 1024 * 1024,
        }
    }
}

impl SyncConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`SyncConfig::from_env`] with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(root) = lookup("CHORUS_ROOT_COLLECTION") {
            config.root_collection = root.trim().to_string();
        }

        if let Some(list) = lookup("CHORUS_SHARDS") {
            config.shards = list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ShardId::new)
                .collect();
        }

        if let Some(raw) = lookup("CHORUS_ROUTES") {
            match RoutingTable::parse(&raw) {
                Ok(routes) => config.routes = routes,
                Err(e) => {
                    tracing::warn!(error = %e, "Invalid CHORUS_ROUTES, using default");
                }
            }
        }

        if let Some(val) = lookup("CHORUS_PAGE_SIZE") {
            match val.trim().parse::<usize>() {
                Ok(n) => config.page_size = n,
                Err(_) => {
                    tracing::warn!(value = %val, "Invalid CHORUS_PAGE_SIZE, using default");
                }
            }
        }

        if let Some(path) = lookup("CHORUS_BLOB_PATH") {
            config.blob_path = PathBuf::from(path);
        }

        if let Some(url) = lookup("CHORUS_IMAGE_BASE_URL") {
            if !url.is_empty() {
                config.image_base_url = Some(url);
            }
        }

        config
    }

    /// Structural checks that must pass before any room is opened.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.root_collection.is_empty() || self.root_collection.contains('/') {
            return Err(ConfigError::InvalidRootCollection(
                self.root_collection.clone(),
            ));
        }
        if self.shards.is_empty() {
            return Err(ConfigError::NoShards);
        }
        let mut seen = HashSet::new();
        for shard in &self.shards {
            if shard.as_str().is_empty() || shard.as_str().contains('/') {
                return Err(ConfigError::InvalidShard(shard.to_string()));
            }
            if !seen.insert(shard) {
                return Err(ConfigError::DuplicateShard(shard.to_string()));
            }
        }
        if self.page_size == 0 {
            return Err(ConfigError::ZeroPageSize);
        }
        self.routes.validate(&self.shards)
    }
}
