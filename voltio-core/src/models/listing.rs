use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListingStatus {
    Available,
    Sold,
}

impl std::fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListingStatus::Available => write!(f, "Available"),
            ListingStatus::Sold => write!(f, "Sold"),
        }
    }
}

/// A sellable component post, owned by one seller.
///
/// `status` only ever moves Available → Sold, and only the trusted backend
/// authority performs that write as part of sale completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: String,
    pub seller_id: String,
    pub seller_name: String,
    #[serde(default)]
    pub seller_avatar: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub condition: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub image_url: Option<String>,
    pub status: ListingStatus,
    pub created_at: DateTime<Utc>,
}

impl Listing {
    pub fn is_available(&self) -> bool {
        self.status == ListingStatus::Available
    }

    pub fn is_sold(&self) -> bool {
        self.status == ListingStatus::Sold
    }
}
