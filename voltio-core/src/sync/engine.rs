use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::models::{Chat, Listing, Message};
use crate::session::{IdentityWatch, SessionContext};
use crate::store::{RealtimeStore, Watch, WatchEvent};

use super::aggregator::AggregatedState;
use super::view::{CollectionView, ViewState};

/// One live query pumped into a watched view by a background task.
struct CollectionCell<T> {
    rx: watch::Receiver<CollectionView<T>>,
    task: JoinHandle<()>,
}

impl<T: Clone + Send + Sync + 'static> CollectionCell<T> {
    fn spawn(mut stream: Watch<T>, label: &'static str) -> Self {
        let (tx, rx) = watch::channel(CollectionView::loading());
        let task = tokio::spawn(async move {
            while let Some(event) = stream.next().await {
                match event {
                    WatchEvent::Snapshot(docs) => {
                        debug!(stream = label, count = docs.len(), "snapshot received");
                        tx.send_replace(CollectionView::live(docs));
                    }
                    WatchEvent::Lost(reason) => {
                        warn!(stream = label, %reason, "subscription lost, view degraded");
                        tx.send_modify(|view| view.state = ViewState::Stale(reason.clone()));
                    }
                }
            }
        });
        Self { rx, task }
    }

    /// Deterministic teardown: stop the pump, dropping its store watch.
    fn cancel(self) {
        self.task.abort();
    }

    fn view(&self) -> CollectionView<T> {
        self.rx.borrow().clone()
    }
}

/// Owns the three live queries and exposes their latest snapshots.
///
/// The listings watch is always on; the catalog is public. The chats watch
/// follows the signed-in identity, and at most one messages watch tracks
/// the currently open chat. Every identity change cancels the user-scoped
/// watches before resubscribing, so a new session never observes the
/// previous user's data.
pub struct SyncEngine {
    store: Arc<dyn RealtimeStore>,
    listings: Option<CollectionCell<Listing>>,
    chats: Option<CollectionCell<Chat>>,
    open_chat: Option<(String, CollectionCell<Message>)>,
    identity: Option<SessionContext>,
}

impl SyncEngine {
    pub fn new(store: Arc<dyn RealtimeStore>) -> Self {
        let listings = CollectionCell::spawn(store.watch_listings(), "listings");
        Self {
            store,
            listings: Some(listings),
            chats: None,
            open_chat: None,
            identity: None,
        }
    }

    pub fn identity(&self) -> Option<&SessionContext> {
        self.identity.as_ref()
    }

    /// Swap the active identity. User-scoped subscriptions are cancelled
    /// first and their views reset, then the chats query is resubscribed
    /// for the new user (if any).
    pub fn set_identity(&mut self, identity: Option<SessionContext>) {
        if let Some(cell) = self.chats.take() {
            cell.cancel();
        }
        if let Some((_, cell)) = self.open_chat.take() {
            cell.cancel();
        }

        self.identity = identity;
        if let Some(session) = &self.identity {
            info!(user_id = %session.user_id, "resubscribing chats for new identity");
            self.chats = Some(CollectionCell::spawn(
                self.store.watch_chats_for(&session.user_id),
                "chats",
            ));
        } else {
            info!("identity cleared, user-scoped subscriptions torn down");
        }
    }

    /// Track the identity feed, resubscribing on every change. Runs until
    /// the identity provider goes away.
    pub async fn follow_identity(&mut self, mut identity: IdentityWatch) {
        loop {
            let current = identity.borrow_and_update().clone();
            self.set_identity(current);
            if identity.changed().await.is_err() {
                break;
            }
        }
    }

    /// Subscribe to the messages of one chat, replacing any previously open
    /// one. Re-opening the already-open chat keeps the existing stream.
    pub fn open_chat(&mut self, chat_id: &str) {
        if let Some((current, _)) = &self.open_chat {
            if current == chat_id {
                return;
            }
        }
        if let Some((_, cell)) = self.open_chat.take() {
            cell.cancel();
        }
        debug!(%chat_id, "subscribing messages for open chat");
        self.open_chat = Some((
            chat_id.to_string(),
            CollectionCell::spawn(self.store.watch_messages(chat_id), "messages"),
        ));
    }

    pub fn close_chat(&mut self) {
        if let Some((chat_id, cell)) = self.open_chat.take() {
            debug!(%chat_id, "unsubscribing messages for closed chat");
            cell.cancel();
        }
    }

    pub fn open_chat_id(&self) -> Option<&str> {
        self.open_chat.as_ref().map(|(id, _)| id.as_str())
    }

    pub fn listings_view(&self) -> CollectionView<Listing> {
        self.listings
            .as_ref()
            .map(CollectionCell::view)
            .unwrap_or_default()
    }

    /// The chats view; empty and live while signed out.
    pub fn chats_view(&self) -> CollectionView<Chat> {
        match &self.chats {
            Some(cell) => cell.view(),
            None => CollectionView::live(Vec::new()),
        }
    }

    /// The open chat's messages view; empty and live when no chat is open.
    pub fn messages_view(&self) -> CollectionView<Message> {
        match &self.open_chat {
            Some((_, cell)) => cell.view(),
            None => CollectionView::live(Vec::new()),
        }
    }

    /// Receiver for the listings view, for callers that await changes.
    pub fn listings_receiver(&self) -> Option<watch::Receiver<CollectionView<Listing>>> {
        self.listings.as_ref().map(|cell| cell.rx.clone())
    }

    pub fn chats_receiver(&self) -> Option<watch::Receiver<CollectionView<Chat>>> {
        self.chats.as_ref().map(|cell| cell.rx.clone())
    }

    pub fn messages_receiver(&self) -> Option<watch::Receiver<CollectionView<Message>>> {
        self.open_chat.as_ref().map(|(_, cell)| cell.rx.clone())
    }

    /// The current aggregated state, cloned out as a plain value.
    pub fn snapshot(&self) -> AggregatedState {
        AggregatedState {
            listings: self.listings_view(),
            chats: self.chats_view(),
            messages: self.messages_view(),
        }
    }

    /// Cancel every subscription, including listings.
    pub fn shutdown(&mut self) {
        if let Some(cell) = self.listings.take() {
            cell.cancel();
        }
        if let Some(cell) = self.chats.take() {
            cell.cancel();
        }
        if let Some((_, cell)) = self.open_chat.take() {
            cell.cancel();
        }
    }
}

impl Drop for SyncEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
