use std::sync::Arc;

use chrono::Utc;

use voltio_core::models::{Chat, Listing, ListingStatus};
use voltio_core::store::{MemoryStore, RealtimeStore};
use voltio_core::{ChatController, MessageDraft, SessionContext};

fn listing(id: &str, seller_id: &str) -> Listing {
    Listing {
        id: id.to_string(),
        seller_id: seller_id.to_string(),
        seller_name: "Sofia".to_string(),
        seller_avatar: None,
        title: "Raspberry Pi 4 8GB".to_string(),
        description: "Con caja y fuente".to_string(),
        price: 55.0,
        category: "SBC".to_string(),
        condition: "Like new".to_string(),
        location: "Buenos Aires".to_string(),
        image_url: None,
        status: ListingStatus::Available,
        created_at: Utc::now(),
    }
}

fn session(user_id: &str, name: &str) -> SessionContext {
    SessionContext {
        user_id: user_id.to_string(),
        display_name: name.to_string(),
        email: format!("{}@example.com", user_id),
        avatar_url: None,
        is_admin: false,
        auth_token: "tok".to_string(),
    }
}

#[tokio::test]
async fn test_first_contact_creates_active_chat_flagged_for_seller() {
    // Buyer B opens a chat on listing P owned by seller S.
    let store = Arc::new(MemoryStore::new());
    let controller = ChatController::new(store.clone());
    let p = listing("p1", "s");
    store.put_listing(p.clone());

    let chat = controller
        .open_or_create_chat(&session("b", "Bruno"), &p)
        .await
        .unwrap();

    assert_eq!(chat.id, Chat::id_for("p1", "b"));
    assert_eq!(chat.status.to_string(), "Active");
    assert!(chat.has_unread("s"));
    assert!(!chat.has_unread("b"));
    assert_eq!(chat.participants_info["s"].name, "Sofia");
    assert_eq!(chat.participants_info["b"].name, "Bruno");
}

#[tokio::test]
async fn test_reopening_chat_preserves_history_and_flags() {
    let store = Arc::new(MemoryStore::new());
    let controller = ChatController::new(store.clone());
    let p = listing("p1", "s");
    store.put_listing(p.clone());

    let buyer = session("b", "Bruno");
    let chat = controller.open_or_create_chat(&buyer, &p).await.unwrap();

    let mut draft = MessageDraft::new("Hola, sigue disponible?");
    controller.send_message(&buyer, &chat, &mut draft).await.unwrap();
    controller.mark_read(&chat.id, "s").await.unwrap();

    // The buyer navigates back to the listing and opens the chat again.
    let reopened = controller.open_or_create_chat(&buyer, &p).await.unwrap();

    assert_eq!(reopened.id, chat.id);
    let messages = store.read_chat(&chat.id).await.unwrap().unwrap();
    assert_eq!(
        messages.last_message.as_ref().map(|m| m.text.as_str()),
        Some("Hola, sigue disponible?")
    );
    // The seller's read state survived the re-open.
    assert!(!reopened.has_unread("s"));
    assert!(!reopened.buyer_rated_seller);
    assert!(!reopened.seller_rated_buyer);
}

#[tokio::test]
async fn test_send_message_updates_summary_and_recipient_flag() {
    // B sends "Hola" to the chat with S.
    let store = Arc::new(MemoryStore::new());
    let controller = ChatController::new(store.clone());
    let p = listing("p1", "s");
    store.put_listing(p.clone());

    let buyer = session("b", "Bruno");
    let chat = controller.open_or_create_chat(&buyer, &p).await.unwrap();
    controller.mark_read(&chat.id, "s").await.unwrap();

    let mut draft = MessageDraft::new("Hola");
    let stored = controller.send_message(&buyer, &chat, &mut draft).await.unwrap();
    assert!(stored.timestamp.is_some());

    let after = store.read_chat(&chat.id).await.unwrap().unwrap();
    let last = after.last_message.clone().unwrap();
    assert_eq!(last.text, "Hola");
    assert_eq!(last.sender_id, "b");
    assert!(after.has_unread("s"));
    // The sender's own flag is untouched.
    assert!(!after.has_unread("b"));
}

#[tokio::test]
async fn test_empty_message_leaves_no_trace() {
    // Whitespace-only text is rejected with no message record and
    // no chat summary update.
    let store = Arc::new(MemoryStore::new());
    let controller = ChatController::new(store.clone());
    let p = listing("p1", "s");
    store.put_listing(p.clone());

    let buyer = session("b", "Bruno");
    let chat = controller.open_or_create_chat(&buyer, &p).await.unwrap();
    controller.mark_read(&chat.id, "s").await.unwrap();

    let mut draft = MessageDraft::new("   ");
    let err = controller
        .send_message(&buyer, &chat, &mut draft)
        .await
        .unwrap_err();
    assert!(err.is_validation());

    let after = store.read_chat(&chat.id).await.unwrap().unwrap();
    assert!(after.last_message.is_none());
    assert!(!after.has_unread("s"));

    let mut messages = store.watch_messages(&chat.id);
    match messages.next().await {
        Some(voltio_core::WatchEvent::Snapshot(docs)) => assert!(docs.is_empty()),
        _ => panic!("expected an initial snapshot"),
    }
}

#[tokio::test]
async fn test_two_buyers_get_distinct_chats() {
    let store = Arc::new(MemoryStore::new());
    let controller = ChatController::new(store.clone());
    let p = listing("p1", "s");
    store.put_listing(p.clone());

    let first = controller
        .open_or_create_chat(&session("b1", "Bruno"), &p)
        .await
        .unwrap();
    let second = controller
        .open_or_create_chat(&session("b2", "Carla"), &p)
        .await
        .unwrap();

    assert_ne!(first.id, second.id);
    assert_eq!(first.buyer_id(), Some("b1"));
    assert_eq!(second.buyer_id(), Some("b2"));
}
