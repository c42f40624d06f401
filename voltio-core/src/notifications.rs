//! Notification counters derived from the joined listings/chats state.
//!
//! Pure recomputation over the latest snapshots on every change, never an
//! incremental patch; the streams carry no cross-stream ordering guarantee,
//! so patches would race.

use crate::models::{Chat, Listing};
use crate::sync::AggregatedState;

/// What the header badge shows: the chats awaiting the user's rating and
/// the count of chats with unseen updates.
#[derive(Debug, Clone, Default)]
pub struct NotificationSummary {
    pub pending_ratings: Vec<Chat>,
    pub unread_count: usize,
}

impl NotificationSummary {
    pub fn total(&self) -> usize {
        self.pending_ratings.len() + self.unread_count
    }
}

/// Derive the notification summary for `current_user_id`.
///
/// A chat is a pending rating iff its listing resolves, the user is the
/// buyer (not the listing's seller), the chat is Sold, and the buyer has not
/// yet rated the seller. Chats whose listing has not loaded (or was deleted)
/// never qualify. The unread count is exactly the number of chats whose
/// unread flag for this user is set.
pub fn derive(current_user_id: &str, listings: &[Listing], chats: &[Chat]) -> NotificationSummary {
    let pending_ratings = chats
        .iter()
        .filter(|chat| {
            let listing = match listings.iter().find(|l| l.id == chat.listing_id) {
                Some(listing) => listing,
                None => return false,
            };
            let is_buyer = listing.seller_id != current_user_id;
            is_buyer && chat.is_closed() && !chat.buyer_rated_seller
        })
        .cloned()
        .collect();

    let unread_count = chats
        .iter()
        .filter(|chat| chat.has_unread(current_user_id))
        .count();

    NotificationSummary {
        pending_ratings,
        unread_count,
    }
}

/// Convenience wrapper over the aggregated state.
pub fn derive_from_state(current_user_id: &str, state: &AggregatedState) -> NotificationSummary {
    derive(current_user_id, &state.listings.docs, &state.chats.docs)
}
