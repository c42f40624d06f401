//! Chat session operations: opening a conversation, sending messages,
//! marking read.
//!
//! The chat state machine is Active → Sold, one way, and only the sale
//! completion workflow performs that transition. A Sold chat's composer is
//! disabled at the surface; `Chat::is_closed` is the predicate it uses.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{VoltioError, VoltioResult};
use crate::models::{Chat, ChatUpdate, LastMessage, Listing, Message, NewMessage};
use crate::session::SessionContext;
use crate::store::RealtimeStore;

/// Composer state for an unsent message. The draft is taken optimistically
/// when a send starts and restored verbatim if the send fails, so a
/// transport error never silently drops what the user typed.
#[derive(Debug, Clone, Default)]
pub struct MessageDraft {
    text: String,
}

impl MessageDraft {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    fn take(&mut self) -> String {
        std::mem::take(&mut self.text)
    }

    fn restore(&mut self, text: String) {
        self.text = text;
    }
}

/// Creates/reopens chats, sends messages, and maintains unread flags.
pub struct ChatController {
    store: Arc<dyn RealtimeStore>,
}

impl ChatController {
    pub fn new(store: Arc<dyn RealtimeStore>) -> Self {
        Self { store }
    }

    /// Open the conversation between the signed-in buyer and a listing's
    /// seller, creating the chat document on first contact.
    ///
    /// Idempotent: the id is deterministic per (listing, buyer), and the
    /// write is a merge, so re-invocation never resets message history,
    /// status, or rating flags. A seller cannot open a chat on their own
    /// listing.
    pub async fn open_or_create_chat(
        &self,
        session: &SessionContext,
        listing: &Listing,
    ) -> VoltioResult<Chat> {
        if session.user_id == listing.seller_id {
            return Err(VoltioError::authorization(
                "cannot open a chat on your own listing",
            ));
        }

        let initial = Chat::initial(listing, &session.user_id, session.participant_info());
        debug!(chat_id = %initial.id, listing_id = %listing.id, "opening chat");
        self.store.create_chat(&initial).await?;

        self.store
            .read_chat(&initial.id)
            .await?
            .ok_or_else(|| VoltioError::not_found(format!("chat {}", initial.id)))
    }

    /// Send the draft into a chat. On success the message is appended with
    /// a store-assigned timestamp, the chat summary is refreshed, and the
    /// other participant's unread flag is raised; the sender's own flag is
    /// left untouched. On failure the draft text is restored for retry.
    pub async fn send_message(
        &self,
        session: &SessionContext,
        chat: &Chat,
        draft: &mut MessageDraft,
    ) -> VoltioResult<Message> {
        if draft.is_blank() {
            return Err(VoltioError::validation("message text is empty"));
        }
        if !chat.is_participant(&session.user_id) {
            return Err(VoltioError::authorization(
                "sender is not a participant of this chat",
            ));
        }
        let recipient = chat
            .other_participant(&session.user_id)
            .ok_or_else(|| VoltioError::not_found("chat has no other participant"))?
            .to_string();

        let taken = draft.take();
        let text = taken.trim().to_string();

        let stored = match self
            .store
            .append_message(
                &chat.id,
                NewMessage {
                    sender_id: session.user_id.clone(),
                    sender_name: session.display_name.clone(),
                    text: text.clone(),
                },
            )
            .await
        {
            Ok(stored) => stored,
            Err(err) => {
                warn!(chat_id = %chat.id, %err, "message append failed, restoring draft");
                draft.restore(taken);
                return Err(err);
            }
        };

        let update = ChatUpdate::new()
            .with_last_message(LastMessage {
                text,
                sender_id: session.user_id.clone(),
                timestamp: stored.timestamp,
            })
            .with_unread(recipient, true);
        if let Err(err) = self.store.update_chat(&chat.id, update).await {
            warn!(chat_id = %chat.id, %err, "chat summary update failed, restoring draft");
            draft.restore(taken);
            return Err(err);
        }

        Ok(stored)
    }

    /// Clear the user's unread flag on a chat. Idempotent; clearing an
    /// already-clear flag is a no-op.
    pub async fn mark_read(&self, chat_id: &str, user_id: &str) -> VoltioResult<()> {
        self.store
            .update_chat(chat_id, ChatUpdate::new().with_unread(user_id, false))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ListingStatus;
    use crate::store::MemoryStore;
    use chrono::Utc;

    fn listing(id: &str, seller_id: &str) -> Listing {
        Listing {
            id: id.to_string(),
            seller_id: seller_id.to_string(),
            seller_name: "Marta".to_string(),
            seller_avatar: None,
            title: "Bench PSU 30V 5A".to_string(),
            description: String::new(),
            price: 75.0,
            category: "Power".to_string(),
            condition: "Used".to_string(),
            location: "Neuquen".to_string(),
            image_url: None,
            status: ListingStatus::Available,
            created_at: Utc::now(),
        }
    }

    fn buyer_session(user_id: &str) -> SessionContext {
        SessionContext {
            user_id: user_id.to_string(),
            display_name: "Bruno".to_string(),
            email: "bruno@example.com".to_string(),
            avatar_url: None,
            is_admin: false,
            auth_token: "tok".to_string(),
        }
    }

    #[tokio::test]
    async fn test_seller_cannot_open_own_chat() {
        let store = Arc::new(MemoryStore::new());
        let controller = ChatController::new(store.clone());
        let l = listing("l1", "s1");
        store.put_listing(l.clone());

        let err = controller
            .open_or_create_chat(&buyer_session("s1"), &l)
            .await
            .unwrap_err();
        assert!(err.is_authorization());
        assert!(store.read_chat(&Chat::id_for("l1", "s1")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_blank_draft_is_rejected_without_side_effects() {
        let store = Arc::new(MemoryStore::new());
        let controller = ChatController::new(store.clone());
        let l = listing("l1", "s1");
        store.put_listing(l.clone());

        let chat = controller
            .open_or_create_chat(&buyer_session("b1"), &l)
            .await
            .unwrap();

        let mut draft = MessageDraft::new("   \n\t ");
        let err = controller
            .send_message(&buyer_session("b1"), &chat, &mut draft)
            .await
            .unwrap_err();
        assert!(err.is_validation());
        // The draft is untouched and no summary update happened.
        assert_eq!(draft.text(), "   \n\t ");
        let after = store.read_chat(&chat.id).await.unwrap().unwrap();
        assert!(after.last_message.is_none());
    }

    #[tokio::test]
    async fn test_send_message_trims_and_flags_recipient() {
        let store = Arc::new(MemoryStore::new());
        let controller = ChatController::new(store.clone());
        let l = listing("l1", "s1");
        store.put_listing(l.clone());

        let chat = controller
            .open_or_create_chat(&buyer_session("b1"), &l)
            .await
            .unwrap();

        let mut draft = MessageDraft::new("  Hola  ");
        let stored = controller
            .send_message(&buyer_session("b1"), &chat, &mut draft)
            .await
            .unwrap();

        assert_eq!(stored.text, "Hola");
        assert!(draft.text().is_empty());

        let after = store.read_chat(&chat.id).await.unwrap().unwrap();
        let last = after.last_message.clone().unwrap();
        assert_eq!(last.text, "Hola");
        assert_eq!(last.sender_id, "b1");
        assert!(after.has_unread("s1"));
        assert!(!after.has_unread("b1"));
    }

    #[tokio::test]
    async fn test_failed_send_restores_draft() {
        let store = Arc::new(MemoryStore::new());
        let controller = ChatController::new(store.clone());
        let l = listing("l1", "s1");
        store.put_listing(l.clone());

        let chat = controller
            .open_or_create_chat(&buyer_session("b1"), &l)
            .await
            .unwrap();
        // Sending into a chat the store no longer knows fails in transit.
        let mut ghost = chat.clone();
        ghost.id = "l1_someone-else".to_string();

        let mut draft = MessageDraft::new("sigue en pie?");
        let err = controller
            .send_message(&buyer_session("b1"), &ghost, &mut draft)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(draft.text(), "sigue en pie?");
    }

    #[tokio::test]
    async fn test_mark_read_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let controller = ChatController::new(store.clone());
        let l = listing("l1", "s1");
        store.put_listing(l.clone());

        let chat = controller
            .open_or_create_chat(&buyer_session("b1"), &l)
            .await
            .unwrap();
        assert!(chat.has_unread("s1"));

        controller.mark_read(&chat.id, "s1").await.unwrap();
        controller.mark_read(&chat.id, "s1").await.unwrap();

        let after = store.read_chat(&chat.id).await.unwrap().unwrap();
        assert!(!after.has_unread("s1"));
    }
}
