//! Composing, optimistically showing and persisting new messages.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use chorus_shared::{Author, DeliveryStatus, Message, MessageId, MessageKey};
use chorus_store::{attachment_name, CollectionPath, DocumentStore, LocalImage, Uploader};

use crate::codec::encode_message;
use crate::error::{Result, SyncError};
use crate::routing::RoutingTable;
use crate::timeline::Timeline;

/// Image attached to a draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attachment {
    /// Already uploaded; the reference is used as is.
    Uploaded(String),
    /// On the device; uploaded before the message is shown.
    Local(LocalImage),
}

/// A message as composed by the user, before it has an identity in any shard.
#[derive(Debug, Clone)]
pub struct Draft {
    pub text: Option<String>,
    pub attachment: Option<Attachment>,
    pub provisional_id: MessageId,
    pub now: DateTime<Utc>,
    pub author: Author,
}

impl Draft {
    /// Empty draft stamped with a fresh provisional id and the current time.
    pub fn new(author: Author) -> Self {
        Self {
            text: None,
            attachment: None,
            provisional_id: MessageId::provisional(),
            now: Utc::now(),
            author,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_image_ref(mut self, reference: impl Into<String>) -> Self {
        self.attachment = Some(Attachment::Uploaded(reference.into()));
        self
    }

    pub fn with_local_image(mut self, image: LocalImage) -> Self {
        self.attachment = Some(Attachment::Local(image));
        self
    }

    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    fn is_empty(&self) -> bool {
        self.text.as_deref().map_or(true, str::is_empty) && self.attachment.is_none()
    }
}

pub struct SendPipeline<S, U> {
    store: Arc<S>,
    uploader: Arc<U>,
    routes: RoutingTable,
    rooms: CollectionPath,
}

impl<S: DocumentStore, U: Uploader> SendPipeline<S, U> {
    pub fn new(store: Arc<S>, uploader: Arc<U>, routes: RoutingTable, rooms: CollectionPath) -> Self {
        Self {
            store,
            uploader,
            routes,
            rooms,
        }
    }

    /// Send `draft` into the room of `timeline`.
    ///
    /// Local images are uploaded first; a failed upload aborts before anything
    /// is shown.  The message is then appended to the timeline as `Pending`
    /// and written to the room's routed shard.  A routing miss or failed write
    /// leaves the entry in place marked `Failed` and returns the error.
    pub async fn send<T: DocumentStore>(&self, timeline: &Timeline<T>, draft: Draft) -> Result<MessageKey> {
        if draft.is_empty() {
            return Err(SyncError::EmptyDraft);
        }
        let room = timeline.room().clone();

        let image_ref = match draft.attachment {
            Some(Attachment::Local(image)) => {
                let name = attachment_name(&draft.author.id, draft.now);
                match self.uploader.upload(&image, &name).await {
                    Ok(reference) => Some(reference),
                    Err(e) => {
                        warn!(room = %room, path = %image.path.display(), error = %e, "Attachment upload failed");
                        return Err(e.into());
                    }
                }
            }
            Some(Attachment::Uploaded(reference)) => Some(reference).filter(|r| !r.is_empty()),
            None => None,
        };
        let text = draft.text.unwrap_or_default();
        if text.is_empty() && image_ref.is_none() {
            return Err(SyncError::EmptyDraft);
        }

        let shard = self.routes.resolve(&room).cloned();
        let message = Message {
            id: draft.provisional_id,
            shard: shard.clone(),
            text,
            created_at: draft.now,
            author: draft.author,
            image_ref,
            status: DeliveryStatus::Pending,
        };
        let key = message.key();
        let fields = encode_message(&message);

        if !timeline.append(message) {
            debug!(room = %room, key = %key, "Message not shown, timeline closed or key present");
        }

        let Some(shard) = shard else {
            warn!(room = %room, "No shard routed for room, message not stored");
            timeline.set_status(&key, DeliveryStatus::Failed);
            return Err(SyncError::Routing { room });
        };

        let persisted = match self.rooms.child(room.as_str(), shard.as_str()) {
            Ok(collection) => self.store.add(&collection, fields).await,
            Err(e) => Err(e),
        };

        match persisted {
            Ok(doc_id) => {
                timeline.set_status(&key, DeliveryStatus::Confirmed);
                info!(room = %room, shard = %shard, key = %key, doc = %doc_id, "Message sent");
                Ok(key)
            }
            Err(source) => {
                warn!(room = %room, shard = %shard, key = %key, error = %source, "Message write failed");
                timeline.set_status(&key, DeliveryStatus::Failed);
                Err(SyncError::Persist { shard, source })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::sync::Notify;

    use chorus_shared::{RoomId, ShardId};

    use crate::merge::MergeEngine;
    use crate::test_support::{author, rooms, ScriptedStore, ScriptedUploader};

    fn open(store: &Arc<ScriptedStore>, room: &str) -> Timeline<ScriptedStore> {
        Timeline::open(MergeEngine::new(store.clone(), rooms(), RoomId::new(room)), 50)
    }

    fn pipeline(
        store: &Arc<ScriptedStore>,
        uploader: ScriptedUploader,
    ) -> SendPipeline<ScriptedStore, ScriptedUploader> {
        SendPipeline::new(
            store.clone(),
            Arc::new(uploader),
            RoutingTable::new().with_route("R1", "alpha").with_route("R2", "beta"),
            rooms(),
        )
    }

    #[tokio::test]
    async fn test_message_is_shown_before_the_write_completes() {
        let gate = Arc::new(Notify::new());
        let store = Arc::new(ScriptedStore::new().with_add_gate(gate.clone()));
        let timeline = open(&store, "R1");
        timeline.load(&[ShardId::new("alpha")]).await.unwrap();
        let pipeline = pipeline(&store, ScriptedUploader::default());

        let observe = async {
            tokio::task::yield_now().await;
            let head = timeline.messages()[0].clone();
            assert_eq!(head.text, "hi");
            assert_eq!(head.status, DeliveryStatus::Pending);
            assert!(store.records("R1", "alpha").is_empty());
            gate.notify_one();
        };
        let (sent, ()) = tokio::join!(
            pipeline.send(&timeline, Draft::new(author()).with_text("hi")),
            observe
        );

        let key = sent.unwrap();
        assert_eq!(key.shard, Some(ShardId::new("alpha")));
        assert_eq!(timeline.get(&key).unwrap().status, DeliveryStatus::Confirmed);

        let stored = store.records("R1", "alpha");
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].fields["text"], json!("hi"));
        assert_eq!(stored[0].fields["_id"], json!(key.id.as_str()));
        assert_eq!(stored[0].fields["image"], json!(""));
        assert!(store.records("R1", "beta").is_empty());
    }

    #[tokio::test]
    async fn test_unrouted_room_writes_nothing() {
        let store = Arc::new(ScriptedStore::new());
        let timeline = open(&store, "R9");
        let pipeline = pipeline(&store, ScriptedUploader::default());

        let err = pipeline
            .send(&timeline, Draft::new(author()).with_text("lost"))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Routing { ref room } if room.as_str() == "R9"));
        assert_eq!(store.add_calls(), 0);

        let messages = timeline.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].status, DeliveryStatus::Failed);
    }

    #[tokio::test]
    async fn test_failed_write_marks_the_entry_failed() {
        let store = Arc::new(ScriptedStore::new());
        store.fail_adds();
        let timeline = open(&store, "R2");
        let pipeline = pipeline(&store, ScriptedUploader::default());

        let err = pipeline
            .send(&timeline, Draft::new(author()).with_text("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Persist { ref shard, .. } if shard.as_str() == "beta"));
        assert_eq!(timeline.messages()[0].status, DeliveryStatus::Failed);
    }

    #[tokio::test]
    async fn test_local_image_is_uploaded_first() {
        let store = Arc::new(ScriptedStore::new());
        let timeline = open(&store, "R1");
        let uploader = ScriptedUploader::default();
        let calls = uploader.calls.clone();
        let pipeline = pipeline(&store, uploader);

        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let draft = Draft::new(author())
            .with_local_image(LocalImage::new("/tmp/photo.jpg"))
            .at(now);
        let key = pipeline.send(&timeline, draft).await.unwrap();

        assert_eq!(*calls.lock().unwrap(), vec!["images/u1_1700000000000".to_string()]);
        let shown = timeline.get(&key).unwrap();
        assert_eq!(shown.text, "");
        assert_eq!(
            shown.image_ref.as_deref(),
            Some("https://cdn.test/images/u1_1700000000000")
        );
        assert_eq!(
            store.records("R1", "alpha")[0].fields["image"],
            json!("https://cdn.test/images/u1_1700000000000")
        );
    }

    #[tokio::test]
    async fn test_failed_upload_shows_nothing_and_writes_nothing() {
        let store = Arc::new(ScriptedStore::new());
        let timeline = open(&store, "R1");
        let pipeline = pipeline(&store, ScriptedUploader::failing());

        let draft = Draft::new(author()).with_local_image(LocalImage::new("/tmp/photo.jpg"));
        assert!(matches!(
            pipeline.send(&timeline, draft).await,
            Err(SyncError::Upload(_))
        ));
        assert!(timeline.is_empty());
        assert_eq!(store.add_calls(), 0);
    }

    #[tokio::test]
    async fn test_uploaded_reference_is_used_as_is() {
        let store = Arc::new(ScriptedStore::new());
        let timeline = open(&store, "R1");
        let uploader = ScriptedUploader::default();
        let calls = uploader.calls.clone();
        let pipeline = pipeline(&store, uploader);

        let key = pipeline
            .send(&timeline, Draft::new(author()).with_image_ref("https://img/9"))
            .await
            .unwrap();
        assert!(calls.lock().unwrap().is_empty());
        assert_eq!(timeline.get(&key).unwrap().image_ref.as_deref(), Some("https://img/9"));
    }

    #[tokio::test]
    async fn test_empty_draft_is_rejected() {
        let store = Arc::new(ScriptedStore::new());
        let timeline = open(&store, "R1");
        let pipeline = pipeline(&store, ScriptedUploader::default());
        assert!(matches!(
            pipeline.send(&timeline, Draft::new(author()).with_text("")).await,
            Err(SyncError::EmptyDraft)
        ));
        assert!(timeline.is_empty());
    }

    #[tokio::test]
    async fn test_blank_uploaded_reference_without_text_is_rejected() {
        let store = Arc::new(ScriptedStore::new());
        let timeline = open(&store, "R1");
        let pipeline = pipeline(&store, ScriptedUploader::default());
        assert!(matches!(
            pipeline.send(&timeline, Draft::new(author()).with_image_ref("")).await,
            Err(SyncError::EmptyDraft)
        ));
        assert!(timeline.is_empty());
        assert_eq!(store.add_calls(), 0);
    }

    #[tokio::test]
    async fn test_sent_message_is_read_back_on_reload() {
        let store = Arc::new(ScriptedStore::new());
        let timeline = open(&store, "R1");
        let pipeline = pipeline(&store, ScriptedUploader::default());
        pipeline
            .send(&timeline, Draft::new(author()).with_text("persisted"))
            .await
            .unwrap();

        timeline
            .load(&[ShardId::new("alpha"), ShardId::new("beta")])
            .await
            .unwrap();
        let messages = timeline.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, "persisted");
        assert_eq!(messages[0].status, DeliveryStatus::Confirmed);
    }
}
