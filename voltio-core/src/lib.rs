//! Voltio core: the synchronization and sale-workflow heart of a
//! second-hand electronics marketplace.
//!
//! The crate keeps three realtime collections (listings, chats, messages)
//! consistent per connected user, derives notification counters from their
//! join, and drives the sale-completion / mutual-rating state machine.
//! Storage, transport and authentication stay behind the [`store`],
//! [`workflow`] and [`session`] seams.

pub mod chat;
pub mod config;
pub mod error;
pub mod models;
pub mod notifications;
pub mod router;
pub mod session;
pub mod store;
pub mod sync;
pub mod workflow;

pub use chat::{ChatController, MessageDraft};
pub use config::{init_tracing, BackendConfig, ConfigLoadError, CoreConfig, LoggingConfig};
pub use error::{VoltioError, VoltioResult};
pub use models::{
    sort_for_display, Chat, ChatStatus, ChatUpdate, LastMessage, Listing, ListingStatus, Message,
    NewMessage, ParticipantInfo, UserProfile,
};
pub use notifications::{derive, derive_from_state, NotificationSummary};
pub use router::{RouteEvent, Router, Screen};
pub use session::{ensure_profile, identity_channel, IdentityHandle, IdentityWatch, SessionContext};
pub use store::{MemoryStore, RealtimeStore, Watch, WatchEvent};
pub use sync::{AggregatedState, CollectionView, ResolvedChat, SyncEngine, ViewState};
pub use workflow::{BackendClient, ListingPatch, SaleWorkflow};
