//! Sale completion and rating workflow.
//!
//! Two one-directional actions, not a two-phase commit: the seller completes
//! the sale (rating the buyer in the same stroke), and the buyer rates the
//! seller afterwards. The core validates and authorizes before any write,
//! then forwards to the trusted backend authority, which owns the actual
//! cross-entity mutation. The HTTP status of the response is the sole
//! success signal; the `{success}`/`{error}` body is carried through.
//!
//! Neither action is guarded against duplicate submission here or in the
//! authority; the surface disables the triggering control instead. See
//! DESIGN.md.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::BackendConfig;
use crate::error::{VoltioError, VoltioResult};
use crate::session::SessionContext;
use crate::sync::AggregatedState;

/// Bearer-authenticated client for the trusted backend authority.
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Default, Deserialize)]
struct BackendEnvelope {
    success: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompleteSaleBody<'a> {
    product_id: &'a str,
    buyer_id: &'a str,
    rating: u8,
    chat_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RateSellerBody<'a> {
    chat_id: &'a str,
    seller_id: &'a str,
    rating: u8,
}

/// Editable listing fields, forwarded to the authority as-is. Absent fields
/// are left untouched server-side.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl BackendClient {
    pub fn new(config: &BackendConfig) -> VoltioResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn post<B: Serialize>(
        &self,
        token: &str,
        path: &str,
        body: Option<&B>,
    ) -> VoltioResult<String> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", token));
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let envelope: BackendEnvelope = response.json().await.unwrap_or_default();

        if status.is_success() {
            Ok(envelope.success.unwrap_or_default())
        } else {
            let message = envelope
                .error
                .unwrap_or_else(|| format!("backend request to {} failed", path));
            warn!(%path, status = status.as_u16(), %message, "backend authority rejected request");
            Err(VoltioError::from_backend_status(status.as_u16(), message))
        }
    }
}

/// Client-side orchestration of the sale/rating actions.
pub struct SaleWorkflow {
    backend: BackendClient,
}

impl SaleWorkflow {
    pub fn new(backend: BackendClient) -> Self {
        Self { backend }
    }

    fn check_rating(rating: u8) -> VoltioResult<()> {
        if (1..=5).contains(&rating) {
            Ok(())
        } else {
            Err(VoltioError::validation(format!(
                "rating must be between 1 and 5, got {}",
                rating
            )))
        }
    }

    /// Complete the sale of a listing through its chat: the listing and
    /// chat move to Sold together and the buyer's aggregate absorbs the
    /// seller's rating. Caller must be the listing's seller.
    pub async fn complete_sale(
        &self,
        session: &SessionContext,
        state: &AggregatedState,
        listing_id: &str,
        buyer_id: &str,
        rating: u8,
        chat_id: &str,
    ) -> VoltioResult<String> {
        Self::check_rating(rating)?;
        let listing = state
            .find_listing(listing_id)
            .ok_or_else(|| VoltioError::not_found(format!("listing {}", listing_id)))?;
        state
            .find_chat(chat_id)
            .ok_or_else(|| VoltioError::not_found(format!("chat {}", chat_id)))?;
        if listing.seller_id != session.user_id {
            return Err(VoltioError::authorization(
                "only the seller can complete a sale",
            ));
        }

        info!(%listing_id, %chat_id, rating, "completing sale");
        self.backend
            .post(
                &session.auth_token,
                "/user/complete_sale",
                Some(&CompleteSaleBody {
                    product_id: listing_id,
                    buyer_id,
                    rating,
                    chat_id,
                }),
            )
            .await
    }

    /// Rate the seller after a completed sale. Caller must be the chat's
    /// buyer.
    pub async fn rate_seller(
        &self,
        session: &SessionContext,
        state: &AggregatedState,
        chat_id: &str,
        seller_id: &str,
        rating: u8,
    ) -> VoltioResult<String> {
        Self::check_rating(rating)?;
        let chat = state
            .find_chat(chat_id)
            .ok_or_else(|| VoltioError::not_found(format!("chat {}", chat_id)))?;
        if chat.buyer_id() != Some(session.user_id.as_str()) {
            return Err(VoltioError::authorization(
                "only the buyer can rate the seller",
            ));
        }

        info!(%chat_id, rating, "rating seller");
        self.backend
            .post(
                &session.auth_token,
                "/user/rate_seller",
                Some(&RateSellerBody {
                    chat_id,
                    seller_id,
                    rating,
                }),
            )
            .await
    }

    /// Edit a listing's fields through the authority. Owner-only.
    pub async fn update_listing(
        &self,
        session: &SessionContext,
        state: &AggregatedState,
        listing_id: &str,
        patch: &ListingPatch,
    ) -> VoltioResult<String> {
        let listing = state
            .find_listing(listing_id)
            .ok_or_else(|| VoltioError::not_found(format!("listing {}", listing_id)))?;
        if listing.seller_id != session.user_id {
            return Err(VoltioError::authorization(
                "only the owner can update a listing",
            ));
        }

        info!(%listing_id, "updating listing");
        self.backend
            .post(
                &session.auth_token,
                &format!("/user/update_product/{}", listing_id),
                Some(patch),
            )
            .await
    }

    /// Remove a listing through the authority: sellers delete their own,
    /// holders of the elevated claim may delete any. Checked client-side
    /// before the request goes out.
    pub async fn delete_listing(
        &self,
        session: &SessionContext,
        state: &AggregatedState,
        listing_id: &str,
    ) -> VoltioResult<String> {
        let listing = state
            .find_listing(listing_id)
            .ok_or_else(|| VoltioError::not_found(format!("listing {}", listing_id)))?;

        let path = if listing.seller_id == session.user_id {
            format!("/user/delete_product/{}", listing_id)
        } else if session.is_admin {
            format!("/admin/delete_product/{}", listing_id)
        } else {
            return Err(VoltioError::authorization(
                "only the owner or an admin can delete a listing",
            ));
        };

        info!(%listing_id, "deleting listing");
        self.backend
            .post::<()>(&session.auth_token, &path, None)
            .await
    }
}
