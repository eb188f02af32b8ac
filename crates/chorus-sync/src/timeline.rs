//! The in-memory, newest-first message list of one open room.
//!
//! A [`Timeline`] is cheap to clone; clones share the same state.  The state
//! lock is never held across an await: every operation takes a snapshot,
//! releases the lock for I/O and re-checks the session epoch before applying
//! the result, so late results of a closed or reloaded session are dropped.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use chorus_shared::{DeliveryStatus, Message, MessageKey, RoomId, ShardId};
use chorus_store::DocumentStore;

use crate::error::{Result, SyncError};
use crate::events::{TimelineEvent, EVENT_CAPACITY};
use crate::merge::{merge_descending, MergeEngine, ShardCursors};

/// What a load call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The result was applied; `added` entries are new.
    Applied { added: usize },
    /// Another load was already running; nothing was fetched.
    InFlight,
    /// Every shard is exhausted; nothing was fetched.
    Exhausted,
    /// No initial load has completed yet.
    NotLoaded,
    /// The session moved on while fetching; the result was dropped.
    Stale,
}

#[derive(Debug, Default)]
struct TimelineState {
    messages: Vec<Message>,
    keys: HashSet<MessageKey>,
    cursors: ShardCursors,
    loaded: bool,
    loading: bool,
    loading_older: bool,
    epoch: u64,
    closed: bool,
}

impl TimelineState {
    fn is_current(&self, epoch: u64) -> bool {
        !self.closed && self.epoch == epoch
    }
}

pub struct Timeline<S> {
    engine: Arc<MergeEngine<S>>,
    page_size: usize,
    state: Arc<Mutex<TimelineState>>,
    events: broadcast::Sender<TimelineEvent>,
}

impl<S> Clone for Timeline<S> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            page_size: self.page_size,
            state: self.state.clone(),
            events: self.events.clone(),
        }
    }
}

impl<S: DocumentStore> Timeline<S> {
    /// Open an empty timeline for the engine's room.
    ///
    /// A zero `page_size` is raised to 1 so every page can come back empty.
    pub fn open(engine: MergeEngine<S>, page_size: usize) -> Self {
        if page_size == 0 {
            warn!(room = %engine.room(), "Page size 0 raised to 1");
        }
        let page_size = page_size.max(1);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        info!(room = %engine.room(), page_size, "Opened timeline");
        Self {
            engine: Arc::new(engine),
            page_size,
            state: Arc::new(Mutex::new(TimelineState::default())),
            events,
        }
    }

    pub fn room(&self) -> &RoomId {
        self.engine.room()
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TimelineEvent> {
        self.events.subscribe()
    }

    /// Replace the whole timeline with the first merged page of `shards`.
    ///
    /// On failure the previous contents are kept.
    pub async fn load(&self, shards: &[ShardId]) -> Result<LoadOutcome> {
        let epoch = {
            let mut state = self.lock();
            if state.closed {
                return Err(SyncError::Closed(self.room().clone()));
            }
            state.epoch += 1;
            state.loading = true;
            state.loading_older = false;
            state.epoch
        };

        let result = self.engine.fetch_initial(shards, self.page_size).await;

        let mut state = self.lock();
        if !state.is_current(epoch) {
            debug!(room = %self.room(), "Dropping stale initial load");
            return Ok(LoadOutcome::Stale);
        }
        state.loading = false;

        match result {
            Ok(page) => {
                let count = page.messages.len();
                state.keys = page.messages.iter().map(Message::key).collect();
                state.messages = page.messages;
                state.cursors = page.cursors;
                state.loaded = true;
                drop(state);

                info!(room = %self.room(), count, "Timeline loaded");
                self.emit(TimelineEvent::Reset {
                    room: self.room().clone(),
                    count,
                });
                Ok(LoadOutcome::Applied { added: count })
            }
            Err(e) => {
                drop(state);
                self.report_failure(&e);
                Err(e)
            }
        }
    }

    /// Fetch the next older page of every non-exhausted shard and merge it
    /// in at the tail.
    pub async fn load_older(&self) -> Result<LoadOutcome> {
        let (epoch, cursors) = {
            let mut state = self.lock();
            if state.closed {
                return Err(SyncError::Closed(self.room().clone()));
            }
            if state.loading || state.loading_older {
                return Ok(LoadOutcome::InFlight);
            }
            if !state.loaded {
                return Ok(LoadOutcome::NotLoaded);
            }
            if state.cursors.all_exhausted() {
                return Ok(LoadOutcome::Exhausted);
            }
            state.loading_older = true;
            (state.epoch, state.cursors.clone())
        };

        let result = self.engine.fetch_older(&cursors, self.page_size).await;

        let mut state = self.lock();
        if !state.is_current(epoch) {
            debug!(room = %self.room(), "Dropping stale older page");
            return Ok(LoadOutcome::Stale);
        }
        state.loading_older = false;

        match result {
            Ok(page) => {
                state.cursors = page.cursors;
                let added = merge_at_tail(&mut state, self.room(), page.messages);
                drop(state);

                debug!(room = %self.room(), added, "Merged older page");
                self.emit(TimelineEvent::Prepended {
                    room: self.room().clone(),
                    count: added,
                });
                Ok(LoadOutcome::Applied { added })
            }
            Err(e) => {
                drop(state);
                self.report_failure(&e);
                Err(e)
            }
        }
    }

    /// Insert a message at the newest end without waiting for the store.
    ///
    /// A message older than the current head is placed after every strictly
    /// newer entry.  Returns `false` if the key is already present or the
    /// timeline is closed.
    pub fn append(&self, message: Message) -> bool {
        let key = message.key();
        let index = {
            let mut state = self.lock();
            if state.closed {
                debug!(room = %self.room(), key = %key, "Append to closed timeline ignored");
                return false;
            }
            if !state.keys.insert(key.clone()) {
                return false;
            }
            let index = state
                .messages
                .iter()
                .position(|m| m.created_at <= message.created_at)
                .unwrap_or(state.messages.len());
            if index > 0 {
                warn!(room = %self.room(), key = %key, index, "Appended message is older than the newest entry");
            }
            state.messages.insert(index, message);
            index
        };

        self.emit(TimelineEvent::Appended {
            room: self.room().clone(),
            key,
            index,
        });
        true
    }

    /// Update the delivery status of a message; `false` if it is not present.
    pub fn set_status(&self, key: &MessageKey, status: DeliveryStatus) -> bool {
        {
            let mut state = self.lock();
            let Some(message) = state.messages.iter_mut().find(|m| &m.key() == key) else {
                return false;
            };
            if message.status == status {
                return true;
            }
            message.status = status;
        }

        self.emit(TimelineEvent::StatusChanged {
            room: self.room().clone(),
            key: key.clone(),
            status,
        });
        true
    }

    /// Tear the session down.  In-flight loads finish without effect.
    pub fn close(&self) {
        {
            let mut state = self.lock();
            if state.closed {
                return;
            }
            let epoch = state.epoch + 1;
            *state = TimelineState {
                epoch,
                closed: true,
                ..TimelineState::default()
            };
        }
        info!(room = %self.room(), "Closed timeline");
        self.emit(TimelineEvent::Closed {
            room: self.room().clone(),
        });
    }

    /// Snapshot of the messages, newest first.
    pub fn messages(&self) -> Vec<Message> {
        self.lock().messages.clone()
    }

    pub fn get(&self, key: &MessageKey) -> Option<Message> {
        self.lock().messages.iter().find(|m| &m.key() == key).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().messages.is_empty()
    }

    pub fn is_loading(&self) -> bool {
        self.lock().loading
    }

    pub fn is_loading_older(&self) -> bool {
        self.lock().loading_older
    }

    /// True once loaded and no shard has older history left.
    pub fn is_exhausted(&self) -> bool {
        let state = self.lock();
        state.loaded && state.cursors.all_exhausted()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn cursors(&self) -> ShardCursors {
        self.lock().cursors.clone()
    }

    fn lock(&self) -> MutexGuard<'_, TimelineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: TimelineEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn report_failure(&self, error: &SyncError) {
        warn!(room = %self.room(), error = %error, "Timeline load failed");
        self.emit(TimelineEvent::Failed {
            room: self.room().clone(),
            error: error.to_string(),
        });
    }
}

/// Merge an older page into the tail, skipping keys already present.
fn merge_at_tail(state: &mut TimelineState, room: &RoomId, page: Vec<Message>) -> usize {
    let fresh: Vec<Message> = page
        .into_iter()
        .filter(|m| state.keys.insert(m.key()))
        .collect();

    if let (Some(tail), Some(newest)) = (state.messages.last(), fresh.first()) {
        if newest.created_at > tail.created_at {
            warn!(
                room = %room,
                tail = %tail.created_at,
                incoming = %newest.created_at,
                "Older page overlaps the timeline tail; merging into place"
            );
        }
    }

    let added = fresh.len();
    let current = std::mem::take(&mut state.messages);
    state.messages = merge_descending(current, fresh);
    added
}
