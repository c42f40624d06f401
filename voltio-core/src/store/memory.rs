use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::debug;
use uuid::Uuid;

use crate::error::{VoltioError, VoltioResult};
use crate::models::{Chat, ChatStatus, ChatUpdate, Listing, ListingStatus, Message, NewMessage, UserProfile};

use super::{RealtimeStore, Watch, WatchEvent};

/// In-process implementation of the full [`RealtimeStore`] contract.
///
/// Every mutation fans the affected query's full result set out to its
/// subscribers, in mutation order per stream. Message ids and timestamps are
/// assigned on append; iteration order over the backing maps is stable, so
/// snapshots are deterministic.
///
/// Besides the client-side contract, the store exposes the privileged writes
/// the trusted backend authority performs in production
/// ([`complete_sale`](MemoryStore::complete_sale) and
/// [`rate_seller`](MemoryStore::rate_seller)), so tests and embedded
/// prototypes can exercise the whole pipeline in one process.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    listings: BTreeMap<String, Listing>,
    chats: BTreeMap<String, Chat>,
    // Messages per chat, in arrival order.
    messages: BTreeMap<String, Vec<Message>>,
    users: BTreeMap<String, UserProfile>,
    listing_subs: Vec<UnboundedSender<WatchEvent<Listing>>>,
    chat_subs: Vec<(String, UnboundedSender<WatchEvent<Chat>>)>,
    message_subs: Vec<(String, UnboundedSender<WatchEvent<Message>>)>,
}

impl Inner {
    fn listings_snapshot(&self) -> Vec<Listing> {
        self.listings.values().cloned().collect()
    }

    fn chats_snapshot_for(&self, user_id: &str) -> Vec<Chat> {
        self.chats
            .values()
            .filter(|chat| chat.is_participant(user_id))
            .cloned()
            .collect()
    }

    fn messages_snapshot(&self, chat_id: &str) -> Vec<Message> {
        self.messages.get(chat_id).cloned().unwrap_or_default()
    }

    fn notify_listings(&mut self) {
        let snapshot = self.listings_snapshot();
        self.listing_subs
            .retain(|tx| tx.send(WatchEvent::Snapshot(snapshot.clone())).is_ok());
    }

    fn notify_chats(&mut self) {
        let chats = self.chats.clone();
        self.chat_subs.retain(|(user_id, tx)| {
            let snapshot: Vec<Chat> = chats
                .values()
                .filter(|chat| chat.is_participant(user_id))
                .cloned()
                .collect();
            tx.send(WatchEvent::Snapshot(snapshot)).is_ok()
        });
    }

    fn notify_messages(&mut self, chat_id: &str) {
        let snapshot = self.messages_snapshot(chat_id);
        self.message_subs.retain(|(watched, tx)| {
            if watched != chat_id {
                return true;
            }
            tx.send(WatchEvent::Snapshot(snapshot.clone())).is_ok()
        });
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed or replace a listing, notifying listing subscribers.
    pub fn put_listing(&self, listing: Listing) {
        let mut inner = self.inner.lock().unwrap();
        inner.listings.insert(listing.id.clone(), listing);
        inner.notify_listings();
    }

    /// Seed or replace a user profile.
    pub fn put_user(&self, profile: UserProfile) {
        let mut inner = self.inner.lock().unwrap();
        inner.users.insert(profile.id.clone(), profile);
    }

    /// Number of live subscribers across all streams, after pruning ones
    /// whose watch has been dropped.
    pub fn subscriber_count(&self) -> usize {
        let mut inner = self.inner.lock().unwrap();
        inner.listing_subs.retain(|tx| !tx.is_closed());
        inner.chat_subs.retain(|(_, tx)| !tx.is_closed());
        inner.message_subs.retain(|(_, tx)| !tx.is_closed());
        inner.listing_subs.len() + inner.chat_subs.len() + inner.message_subs.len()
    }

    /// Fail every live subscription, as a store outage would: each stream
    /// emits one terminal [`WatchEvent::Lost`] and then ends.
    pub fn fail_subscriptions(&self, reason: &str) {
        let mut inner = self.inner.lock().unwrap();
        for tx in inner.listing_subs.drain(..) {
            let _ = tx.send(WatchEvent::Lost(reason.to_string()));
        }
        for (_, tx) in inner.chat_subs.drain(..) {
            let _ = tx.send(WatchEvent::Lost(reason.to_string()));
        }
        for (_, tx) in inner.message_subs.drain(..) {
            let _ = tx.send(WatchEvent::Lost(reason.to_string()));
        }
    }

    /// The privileged sale-completion write, as the trusted backend
    /// authority performs it: listing and chat move to Sold together, the
    /// seller's rating of the buyer is recorded, and the buyer's aggregate
    /// absorbs the rating. There is deliberately no duplicate-submission
    /// guard here; the production authority does not have one either.
    pub fn complete_sale(&self, listing_id: &str, chat_id: &str, rating: u8) -> VoltioResult<()> {
        let mut inner = self.inner.lock().unwrap();

        let buyer_id = {
            let chat = inner
                .chats
                .get(chat_id)
                .ok_or_else(|| VoltioError::not_found(format!("chat {}", chat_id)))?;
            chat.buyer_id()
                .ok_or_else(|| VoltioError::not_found(format!("buyer of chat {}", chat_id)))?
                .to_string()
        };
        if !inner.listings.contains_key(listing_id) {
            return Err(VoltioError::not_found(format!("listing {}", listing_id)));
        }

        let listing = inner.listings.get_mut(listing_id).unwrap();
        listing.status = ListingStatus::Sold;
        let chat = inner.chats.get_mut(chat_id).unwrap();
        chat.status = ChatStatus::Sold;
        chat.seller_rated_buyer = true;
        chat.updated_at = Utc::now();
        if let Some(buyer) = inner.users.get_mut(&buyer_id) {
            buyer.apply_rating(rating);
        }

        inner.notify_listings();
        inner.notify_chats();
        Ok(())
    }

    /// The privileged seller-rating write: records the buyer's rating of
    /// the seller and folds it into the seller's aggregate. As with
    /// [`complete_sale`](MemoryStore::complete_sale), duplicate submissions
    /// are not guarded against.
    pub fn rate_seller(&self, chat_id: &str, seller_id: &str, rating: u8) -> VoltioResult<()> {
        let mut inner = self.inner.lock().unwrap();

        let chat = inner
            .chats
            .get_mut(chat_id)
            .ok_or_else(|| VoltioError::not_found(format!("chat {}", chat_id)))?;
        chat.buyer_rated_seller = true;
        chat.updated_at = Utc::now();
        if let Some(seller) = inner.users.get_mut(seller_id) {
            seller.apply_rating(rating);
        }

        inner.notify_chats();
        Ok(())
    }
}

#[async_trait]
impl RealtimeStore for MemoryStore {
    fn watch_listings(&self) -> Watch<Listing> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock().unwrap();
        let _ = tx.send(WatchEvent::Snapshot(inner.listings_snapshot()));
        inner.listing_subs.push(tx);
        Watch::new(rx)
    }

    fn watch_chats_for(&self, user_id: &str) -> Watch<Chat> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock().unwrap();
        let _ = tx.send(WatchEvent::Snapshot(inner.chats_snapshot_for(user_id)));
        inner.chat_subs.push((user_id.to_string(), tx));
        Watch::new(rx)
    }

    fn watch_messages(&self, chat_id: &str) -> Watch<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock().unwrap();
        let _ = tx.send(WatchEvent::Snapshot(inner.messages_snapshot(chat_id)));
        inner.message_subs.push((chat_id.to_string(), tx));
        Watch::new(rx)
    }

    async fn read_listing(&self, listing_id: &str) -> VoltioResult<Option<Listing>> {
        Ok(self.inner.lock().unwrap().listings.get(listing_id).cloned())
    }

    async fn read_chat(&self, chat_id: &str) -> VoltioResult<Option<Chat>> {
        Ok(self.inner.lock().unwrap().chats.get(chat_id).cloned())
    }

    async fn read_user(&self, user_id: &str) -> VoltioResult<Option<UserProfile>> {
        Ok(self.inner.lock().unwrap().users.get(user_id).cloned())
    }

    async fn create_chat(&self, chat: &Chat) -> VoltioResult<()> {
        let mut inner = self.inner.lock().unwrap();
        match inner.chats.entry(chat.id.clone()) {
            Entry::Occupied(mut occupied) => {
                // Merge: refresh display fields only. Status, rating flags,
                // unread flags and the message summary are never reset by a
                // re-open.
                let existing = occupied.get_mut();
                existing.listing_title = chat.listing_title.clone();
                existing.listing_image = chat.listing_image.clone();
                existing.participants_info = chat.participants_info.clone();
                existing.updated_at = chat.updated_at;
            }
            Entry::Vacant(vacant) => {
                debug!(chat_id = %chat.id, "creating chat document");
                vacant.insert(chat.clone());
            }
        }
        inner.notify_chats();
        Ok(())
    }

    async fn update_chat(&self, chat_id: &str, update: ChatUpdate) -> VoltioResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let chat = inner
            .chats
            .get_mut(chat_id)
            .ok_or_else(|| VoltioError::not_found(format!("chat {}", chat_id)))?;

        if let Some(last_message) = update.last_message {
            chat.last_message = Some(last_message);
            chat.updated_at = Utc::now();
        }
        for (user_id, unread) in update.set_unread {
            chat.unread_flags.insert(user_id, unread);
        }
        if let Some(info) = update.refresh_participants {
            chat.participants_info = info;
        }

        inner.notify_chats();
        Ok(())
    }

    async fn append_message(&self, chat_id: &str, message: NewMessage) -> VoltioResult<Message> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.chats.contains_key(chat_id) {
            return Err(VoltioError::not_found(format!("chat {}", chat_id)));
        }

        let stored = Message {
            id: Uuid::new_v4().to_string(),
            chat_id: chat_id.to_string(),
            sender_id: message.sender_id,
            sender_name: message.sender_name,
            text: message.text,
            timestamp: Some(Utc::now()),
        };
        inner
            .messages
            .entry(chat_id.to_string())
            .or_default()
            .push(stored.clone());
        inner.notify_messages(chat_id);
        Ok(stored)
    }

    async fn upsert_user(&self, profile: &UserProfile) -> VoltioResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.users.insert(profile.id.clone(), profile.clone());
        Ok(())
    }
}
