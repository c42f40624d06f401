use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One message inside a chat. Immutable once created; the id and timestamp
/// are assigned by the store on write.
///
/// A `None` timestamp marks an in-flight write whose server time has not
/// been confirmed yet; such messages sort after all confirmed ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub chat_id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub text: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// The caller-supplied part of a message; the store fills in id, chat and
/// timestamp on append.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub sender_id: String,
    pub sender_name: String,
    pub text: String,
}

/// Sort messages for display: timestamp ascending, unconfirmed timestamps
/// last. The sort is stable, so ties (and the unconfirmed tail) keep the
/// store's arrival order.
pub fn sort_for_display(messages: &mut [Message]) {
    messages.sort_by_key(|m| (m.timestamp.is_none(), m.timestamp));
}
