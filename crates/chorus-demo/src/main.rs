//! # chorus-demo
//!
//! Runs the sync engine against an in-memory store seeded with a room whose
//! history is spread over every configured shard:
//! - loads the newest page and pages back until history is exhausted
//! - sends a text message through the routing table
//! - prints the head of the resulting timeline
//!
//! Configuration comes from `CHORUS_*` environment variables; `RUST_LOG`
//! controls verbosity.

mod seed;

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use chorus_shared::{Author, RoomId};
use chorus_store::{BlobUploader, CollectionPath, InMemoryDocumentStore};
use chorus_sync::{
    Draft, LoadOutcome, MergeEngine, SendPipeline, SyncConfig, SyncError, Timeline, TimelineEvent,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,chorus_sync=debug")),
        )
        .init();

    info!("Starting chorus demo v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load and validate configuration
    // -----------------------------------------------------------------------
    let config = SyncConfig::from_env();
    config
        .validate()
        .map_err(SyncError::Config)
        .context("invalid sync configuration")?;
    info!(
        root = %config.root_collection,
        shards = config.shards.len(),
        routes = config.routes.len(),
        page_size = config.page_size,
        "Loaded configuration"
    );

    let room = config
        .routes
        .iter()
        .map(|(room, _)| room.clone())
        .min()
        .unwrap_or_else(|| RoomId::new("demo-room"));

    // -----------------------------------------------------------------------
    // 3. Initialize subsystems
    // -----------------------------------------------------------------------
    let store = Arc::new(InMemoryDocumentStore::new());
    let rooms = CollectionPath::root(&config.root_collection)?;
    let seeded = seed::seed_room(&store, &rooms, &room, &config.shards)?;
    info!(room = %room, records = seeded, "Seeded demo history");

    let uploader = Arc::new(
        BlobUploader::new(
            config.blob_path.clone(),
            config.image_base_url.clone(),
            config.max_attachment_size,
        )
        .await?,
    );

    let timeline = Timeline::open(
        MergeEngine::new(store.clone(), rooms.clone(), room.clone()),
        config.page_size,
    );
    let pipeline = SendPipeline::new(store, uploader, config.routes.clone(), rooms);

    // Forward timeline events to the log, as a UI would consume them.
    let forwarder = tokio::spawn(forward_events(timeline.subscribe()));

    // -----------------------------------------------------------------------
    // 4. Load history, newest page first, then page back to the start
    // -----------------------------------------------------------------------
    timeline.load(&config.shards).await?;
    loop {
        match timeline.load_older().await? {
            LoadOutcome::Applied { added } => info!(added, total = timeline.len(), "Loaded older page"),
            outcome => {
                info!(?outcome, total = timeline.len(), "Stopped paging");
                break;
            }
        }
    }
    for cursor in timeline.cursors().iter() {
        info!(shard = %cursor.shard, exhausted = cursor.exhausted, "Shard cursor");
    }

    // -----------------------------------------------------------------------
    // 5. Send a message
    // -----------------------------------------------------------------------
    let author = Author {
        id: "demo-user".into(),
        display_name: "Demo User".into(),
        avatar_url: "https://i.pravatar.cc/300".into(),
    };
    match pipeline
        .send(&timeline, Draft::new(author).with_text("Hello from chorus"))
        .await
    {
        Ok(key) => info!(key = %key, "Sent message"),
        Err(e) => warn!(error = %e, "Send failed"),
    }

    for message in timeline.messages().iter().take(5) {
        info!(
            at = %message.created_at,
            shard = message.shard.as_ref().map(|s| s.as_str()).unwrap_or("-"),
            status = ?message.status,
            image = message.has_image(),
            text = %message.text,
            "Timeline entry"
        );
    }

    timeline.close();
    drop(timeline);
    forwarder.await?;
    Ok(())
}

/// Log timeline events until the channel closes; returns how many were logged.
/// Events lost to lag are skipped.
async fn forward_events(mut events: broadcast::Receiver<TimelineEvent>) -> usize {
    let mut forwarded = 0;
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Event forwarder lagged");
                continue;
            }
            Err(RecvError::Closed) => break,
        };
        match serde_json::to_string(&event) {
            Ok(json) => info!(event = %json, "Timeline event"),
            Err(e) => warn!(error = %e, "Unserializable timeline event"),
        }
        forwarded += 1;
    }
    forwarded
}
