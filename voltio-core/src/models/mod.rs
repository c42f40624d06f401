mod chat;
mod listing;
mod message;
mod user;

pub use chat::{Chat, ChatStatus, ChatUpdate, LastMessage, ParticipantInfo};
pub use listing::{Listing, ListingStatus};
pub use message::{sort_for_display, Message, NewMessage};
pub use user::UserProfile;
