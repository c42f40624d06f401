use crate::models::{sort_for_display, Chat, Listing, Message};

use super::view::CollectionView;

/// A chat joined to the listing it refers to. Only produced once both sides
/// have resolved.
#[derive(Debug)]
pub struct ResolvedChat<'a> {
    pub chat: &'a Chat,
    pub listing: &'a Listing,
}

/// The latest snapshot of each stream, joined on demand.
///
/// Streams arrive independently and in no particular relative order, so
/// every derived view here is a full recomputation over the current
/// snapshots. A chat whose listing has not arrived (or was deleted) is
/// *unresolved* and simply drops out of the joined views until it resolves;
/// no join ever errors on a missing reference.
#[derive(Debug, Clone, Default)]
pub struct AggregatedState {
    pub listings: CollectionView<Listing>,
    pub chats: CollectionView<Chat>,
    pub messages: CollectionView<Message>,
}

impl AggregatedState {
    pub fn find_listing(&self, listing_id: &str) -> Option<&Listing> {
        self.listings.docs.iter().find(|l| l.id == listing_id)
    }

    pub fn find_chat(&self, chat_id: &str) -> Option<&Chat> {
        self.chats.docs.iter().find(|c| c.id == chat_id)
    }

    pub fn listing_for_chat(&self, chat: &Chat) -> Option<&Listing> {
        self.find_listing(&chat.listing_id)
    }

    /// Chats whose listing reference resolves against the current listings
    /// snapshot.
    pub fn resolved_chats(&self) -> Vec<ResolvedChat<'_>> {
        self.chats
            .docs
            .iter()
            .filter_map(|chat| {
                self.listing_for_chat(chat)
                    .map(|listing| ResolvedChat { chat, listing })
            })
            .collect()
    }

    /// The catalog view: listings still open for sale.
    pub fn available_listings(&self) -> Vec<&Listing> {
        self.listings.docs.iter().filter(|l| l.is_available()).collect()
    }

    /// The open chat's messages in display order: timestamp ascending,
    /// unconfirmed writes last.
    pub fn sorted_messages(&self) -> Vec<Message> {
        let mut messages = self.messages.docs.clone();
        sort_for_display(&mut messages);
        messages
    }
}
