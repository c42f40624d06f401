//! The realtime document store contract.
//!
//! The core never talks to a concrete database. It subscribes to three query
//! shapes (all listings, chats containing one user, messages of one chat) as
//! streams of full snapshots, and performs a handful of typed reads and
//! writes. Anything that can push snapshots and honor merge-write semantics
//! can sit behind [`RealtimeStore`]; the crate ships [`MemoryStore`] as a
//! complete in-process implementation.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::VoltioResult;
use crate::models::{Chat, ChatUpdate, Listing, Message, NewMessage, UserProfile};

/// One emission on a subscription stream: the **full current result set**
/// for the query, never a diff — or notice that the stream failed, after
/// which the affected view degrades to stale.
#[derive(Debug, Clone)]
pub enum WatchEvent<T> {
    Snapshot(Vec<T>),
    Lost(String),
}

/// A cancellable subscription to one store query.
///
/// Emissions arrive in store order for this stream; nothing is guaranteed
/// across different streams. Dropping the watch (or calling
/// [`Watch::unsubscribe`]) detaches it from the store; the producer notices
/// on its next send and stops fanning out to it.
#[derive(Debug)]
pub struct Watch<T> {
    updates: mpsc::UnboundedReceiver<WatchEvent<T>>,
}

impl<T> Watch<T> {
    pub fn new(updates: mpsc::UnboundedReceiver<WatchEvent<T>>) -> Self {
        Self { updates }
    }

    /// The next emission, or `None` once the store side has gone away.
    pub async fn next(&mut self) -> Option<WatchEvent<T>> {
        self.updates.recv().await
    }

    /// Explicit teardown. Equivalent to dropping the watch; spelled out so
    /// call sites that must unsubscribe (teardown, identity change) say so.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

/// The store contract the core depends on.
///
/// Writes are plain async calls; `create_chat` carries merge semantics (an
/// existing document is never overwritten wholesale) and `update_chat`
/// applies a field mask. Reads return `None` for absent documents rather
/// than erroring, so callers can treat missing references as unresolved.
#[async_trait]
pub trait RealtimeStore: Send + Sync {
    /// Live query: all listings.
    fn watch_listings(&self) -> Watch<Listing>;

    /// Live query: chats whose `participant_ids` contain `user_id`.
    fn watch_chats_for(&self, user_id: &str) -> Watch<Chat>;

    /// Live query: messages under one chat.
    fn watch_messages(&self, chat_id: &str) -> Watch<Message>;

    async fn read_listing(&self, listing_id: &str) -> VoltioResult<Option<Listing>>;

    async fn read_chat(&self, chat_id: &str) -> VoltioResult<Option<Chat>>;

    async fn read_user(&self, user_id: &str) -> VoltioResult<Option<UserProfile>>;

    /// Merge-write a chat document. If the chat already exists, only the
    /// refreshable display fields (listing title/image, participant info,
    /// `updated_at`) are touched; status, rating flags, unread flags and the
    /// message summary survive as they are.
    async fn create_chat(&self, chat: &Chat) -> VoltioResult<()>;

    /// Apply a field-mask update to an existing chat document.
    async fn update_chat(&self, chat_id: &str, update: ChatUpdate) -> VoltioResult<()>;

    /// Append a message under a chat. The store assigns the document id and
    /// the confirmed timestamp, and returns the stored message.
    async fn append_message(&self, chat_id: &str, message: NewMessage) -> VoltioResult<Message>;

    /// Create or replace a user profile document.
    async fn upsert_user(&self, profile: &UserProfile) -> VoltioResult<()>;
}
