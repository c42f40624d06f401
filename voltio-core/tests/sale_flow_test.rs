//! End-to-end sale completion: the seller closes the sale through the
//! backend authority, the store of record reflects the transition, and the
//! buyer's notifications pick up the pending rating until they rate back.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use voltio_core::models::{ChatStatus, Listing, ListingStatus, UserProfile};
use voltio_core::store::{MemoryStore, RealtimeStore};
use voltio_core::sync::{AggregatedState, CollectionView};
use voltio_core::workflow::{BackendClient, SaleWorkflow};
use voltio_core::{notifications, BackendConfig, ChatController, MessageDraft, SessionContext};

fn listing(id: &str, seller_id: &str) -> Listing {
    Listing {
        id: id.to_string(),
        seller_id: seller_id.to_string(),
        seller_name: "Sofia".to_string(),
        seller_avatar: None,
        title: "Fuente de laboratorio".to_string(),
        description: String::new(),
        price: 80.0,
        category: "Power".to_string(),
        condition: "Used".to_string(),
        location: "Rosario".to_string(),
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
        auth_token: format!("{}-tok", user_id),
    }
}

async fn state_of(store: &MemoryStore, user_id: &str) -> AggregatedState {
    // Assemble the aggregated view the engine would hold, straight from the
    // store of record.
    let listing = store.read_listing("p1").await.unwrap();
    let chat = store.read_chat("p1_b").await.unwrap();
    AggregatedState {
        listings: CollectionView::live(listing.into_iter().collect()),
        chats: CollectionView::live(
            chat.into_iter().filter(|c| c.is_participant(user_id)).collect(),
        ),
        messages: CollectionView::default(),
    }
}

fn workflow_against(server_uri: &str) -> SaleWorkflow {
    let config = BackendConfig {
        base_url: server_uri.to_string(),
        request_timeout_secs: 5,
    };
    SaleWorkflow::new(BackendClient::new(&config).unwrap())
}

#[tokio::test]
async fn test_full_sale_and_mutual_rating_flow() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/user/complete_sale"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": "ok"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/user/rate_seller"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": "ok"})))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let controller = ChatController::new(store.clone());
    let workflow = workflow_against(&server.uri());

    let seller = session("s", "Sofia");
    let buyer = session("b", "Bruno");
    store.put_listing(listing("p1", "s"));
    store.put_user(UserProfile::new("s", "Sofia", "s@example.com"));
    store.put_user(UserProfile::new("b", "Bruno", "b@example.com"));

    // Negotiation happens over the chat.
    let chat = controller
        .open_or_create_chat(&buyer, &store.read_listing("p1").await.unwrap().unwrap())
        .await
        .unwrap();
    let mut draft = MessageDraft::new("Te lo llevo hoy");
    controller.send_message(&buyer, &chat, &mut draft).await.unwrap();

    // The seller completes the sale and rates the buyer 5.
    let state = state_of(&store, "s").await;
    workflow
        .complete_sale(&seller, &state, "p1", "b", 5, &chat.id)
        .await
        .unwrap();
    // The authority of record applies the transition the workflow requested.
    store.complete_sale("p1", &chat.id, 5).unwrap();

    let sold_listing = store.read_listing("p1").await.unwrap().unwrap();
    let sold_chat = store.read_chat(&chat.id).await.unwrap().unwrap();
    let buyer_profile = store.read_user("b").await.unwrap().unwrap();
    assert_eq!(sold_listing.status, ListingStatus::Sold);
    assert_eq!(sold_chat.status, ChatStatus::Sold);
    assert!(sold_chat.seller_rated_buyer);
    assert_eq!(
        (
            buyer_profile.rating_count,
            buyer_profile.rating_total,
            buyer_profile.rating_avg
        ),
        (1, 5, 5.0)
    );

    // The buyer now owes the seller a rating.
    let state = state_of(&store, "b").await;
    let summary = notifications::derive_from_state("b", &state);
    assert_eq!(summary.pending_ratings.len(), 1);
    assert_eq!(summary.pending_ratings[0].id, chat.id);

    // The buyer rates the seller back with a 4.
    workflow
        .rate_seller(&buyer, &state, &chat.id, "s", 4)
        .await
        .unwrap();
    store.rate_seller(&chat.id, "s", 4).unwrap();

    let rated_chat = store.read_chat(&chat.id).await.unwrap().unwrap();
    let seller_profile = store.read_user("s").await.unwrap().unwrap();
    assert!(rated_chat.buyer_rated_seller);
    assert_eq!(
        (
            seller_profile.rating_count,
            seller_profile.rating_total,
            seller_profile.rating_avg
        ),
        (1, 4, 4.0)
    );

    // The pending rating clears.
    let state = state_of(&store, "b").await;
    let summary = notifications::derive_from_state("b", &state);
    assert!(summary.pending_ratings.is_empty());
}

#[tokio::test]
async fn test_sold_is_terminal() {
    let store = Arc::new(MemoryStore::new());
    let controller = ChatController::new(store.clone());

    let buyer = session("b", "Bruno");
    store.put_listing(listing("p1", "s"));
    store.put_user(UserProfile::new("b", "Bruno", "b@example.com"));

    let chat = controller
        .open_or_create_chat(&buyer, &store.read_listing("p1").await.unwrap().unwrap())
        .await
        .unwrap();
    store.complete_sale("p1", &chat.id, 5).unwrap();

    // Re-opening the chat must not reactivate anything.
    let reopened = controller
        .open_or_create_chat(&buyer, &store.read_listing("p1").await.unwrap().unwrap())
        .await
        .unwrap();
    assert_eq!(reopened.status, ChatStatus::Sold);
    assert!(reopened.seller_rated_buyer);

    let still_sold = store.read_listing("p1").await.unwrap().unwrap();
    assert_eq!(still_sold.status, ListingStatus::Sold);

    // A sold chat reports itself closed; the composer stays disabled.
    assert!(reopened.is_closed());
}
