use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user profile document as held by the realtime store.
///
/// The rating aggregate is mutated only by the trusted backend authority;
/// the core reads it and, on first sign-in, bootstraps the zeroed document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub display_name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub rating_count: u32,
    pub rating_total: u32,
    pub rating_avg: f64,
}

impl UserProfile {
    /// A fresh profile with a zeroed rating aggregate, as written on first
    /// sign-in when no document exists yet.
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            email: email.into(),
            created_at: Utc::now(),
            rating_count: 0,
            rating_total: 0,
            rating_avg: 0.0,
        }
    }

    /// Fold one rating into the aggregate. `rating_avg` is always
    /// `rating_total / rating_count`, 0 while the count is 0.
    pub fn apply_rating(&mut self, rating: u8) {
        self.rating_count += 1;
        self.rating_total += u32::from(rating);
        self.rating_avg = f64::from(self.rating_total) / f64::from(self.rating_count);
    }
}
