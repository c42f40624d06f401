use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Listing;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatStatus {
    Active,
    Sold,
}

impl std::fmt::Display for ChatStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatStatus::Active => write!(f, "Active"),
            ChatStatus::Sold => write!(f, "Sold"),
        }
    }
}

/// Display info for one chat participant, denormalized onto the chat
/// document so the conversation list renders without extra lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantInfo {
    pub name: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// Summary of the most recent message, kept on the chat document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastMessage {
    pub text: String,
    pub sender_id: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// A per-(listing, buyer) conversation thread with transactional status.
///
/// The chat id is a deterministic function of `(listing_id, buyer_id)`, so a
/// buyer can never hold two chats on the same listing. Per-user unread state
/// lives in the explicit `unread_flags` map, indexed by user id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: String,
    pub listing_id: String,
    pub listing_title: String,
    #[serde(default)]
    pub listing_image: Option<String>,
    pub participant_ids: Vec<String>,
    pub participants_info: HashMap<String, ParticipantInfo>,
    pub status: ChatStatus,
    pub buyer_rated_seller: bool,
    pub seller_rated_buyer: bool,
    pub unread_flags: HashMap<String, bool>,
    #[serde(default)]
    pub last_message: Option<LastMessage>,
    pub updated_at: DateTime<Utc>,
}

impl Chat {
    /// The deterministic chat id for a buyer-listing pair.
    pub fn id_for(listing_id: &str, buyer_id: &str) -> String {
        format!("{}_{}", listing_id, buyer_id)
    }

    /// The initial chat document written on first contact: active, unrated,
    /// unread for the seller (so the new conversation surfaces on their
    /// side) and read for the buyer who just opened it.
    pub fn initial(listing: &Listing, buyer_id: &str, buyer_info: ParticipantInfo) -> Self {
        let seller_info = ParticipantInfo {
            name: listing.seller_name.clone(),
            avatar: listing.seller_avatar.clone(),
        };
        Self {
            id: Self::id_for(&listing.id, buyer_id),
            listing_id: listing.id.clone(),
            listing_title: listing.title.clone(),
            listing_image: listing.image_url.clone(),
            participant_ids: vec![buyer_id.to_string(), listing.seller_id.clone()],
            participants_info: HashMap::from([
                (buyer_id.to_string(), buyer_info),
                (listing.seller_id.clone(), seller_info),
            ]),
            status: ChatStatus::Active,
            buyer_rated_seller: false,
            seller_rated_buyer: false,
            unread_flags: HashMap::from([
                (listing.seller_id.clone(), true),
                (buyer_id.to_string(), false),
            ]),
            last_message: None,
            updated_at: Utc::now(),
        }
    }

    /// The buyer's id, recovered from the deterministic id shape
    /// `"<listing_id>_<buyer_id>"`. `None` if the id does not match the
    /// chat's listing, which only happens on corrupt data.
    pub fn buyer_id(&self) -> Option<&str> {
        self.id
            .strip_prefix(&self.listing_id)
            .and_then(|rest| rest.strip_prefix('_'))
            .filter(|rest| !rest.is_empty())
    }

    /// The participant on the other side of the conversation from `user_id`.
    pub fn other_participant(&self, user_id: &str) -> Option<&str> {
        self.participant_ids
            .iter()
            .find(|id| id.as_str() != user_id)
            .map(String::as_str)
    }

    pub fn is_participant(&self, user_id: &str) -> bool {
        self.participant_ids.iter().any(|id| id == user_id)
    }

    /// Whether `user_id` has an unseen update on this chat. Absent map
    /// entries read as `false`.
    pub fn has_unread(&self, user_id: &str) -> bool {
        self.unread_flags.get(user_id).copied().unwrap_or(false)
    }

    /// Sold chats are terminal: the UI disables composing into them.
    pub fn is_closed(&self) -> bool {
        self.status == ChatStatus::Sold
    }
}

/// A field-mask update applied to an existing chat document. Only the fields
/// present are written; everything else on the document is untouched.
#[derive(Debug, Clone, Default)]
pub struct ChatUpdate {
    pub last_message: Option<LastMessage>,
    pub set_unread: Vec<(String, bool)>,
    pub refresh_participants: Option<HashMap<String, ParticipantInfo>>,
}

impl ChatUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_last_message(mut self, last_message: LastMessage) -> Self {
        self.last_message = Some(last_message);
        self
    }

    pub fn with_unread(mut self, user_id: impl Into<String>, unread: bool) -> Self {
        self.set_unread.push((user_id.into(), unread));
        self
    }

    pub fn with_participants(mut self, info: HashMap<String, ParticipantInfo>) -> Self {
        self.refresh_participants = Some(info);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.last_message.is_none()
            && self.set_unread.is_empty()
            && self.refresh_participants.is_none()
    }
}
