//! Session identity.
//!
//! The identity provider is a collaborator; the core only consumes a watched
//! `Option<SessionContext>` value with a defined lifecycle: created on login,
//! torn down on logout. Nothing in the crate holds ambient session state.

use tokio::sync::watch;
use tracing::info;

use crate::error::VoltioResult;
use crate::models::{ParticipantInfo, UserProfile};
use crate::store::RealtimeStore;

/// The authenticated identity for one session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionContext {
    pub user_id: String,
    pub display_name: String,
    pub email: String,
    pub avatar_url: Option<String>,
    /// Elevated-privilege claim from the identity provider.
    pub is_admin: bool,
    /// Bearer token presented to the trusted backend authority.
    pub auth_token: String,
}

impl SessionContext {
    /// The participant-info shape this user contributes to chat documents.
    pub fn participant_info(&self) -> ParticipantInfo {
        ParticipantInfo {
            name: self.display_name.clone(),
            avatar: self.avatar_url.clone(),
        }
    }
}

/// Receiving side of the identity feed; the subscription layer reacts to
/// every change by cancelling and resubscribing its user-scoped streams.
pub type IdentityWatch = watch::Receiver<Option<SessionContext>>;

/// Sending side of the identity feed, owned by whatever wraps the identity
/// provider.
#[derive(Debug)]
pub struct IdentityHandle {
    tx: watch::Sender<Option<SessionContext>>,
}

impl IdentityHandle {
    pub fn sign_in(&self, session: SessionContext) {
        info!(user_id = %session.user_id, "identity changed: signed in");
        self.tx.send_replace(Some(session));
    }

    pub fn sign_out(&self) {
        info!("identity changed: signed out");
        self.tx.send_replace(None);
    }

    pub fn subscribe(&self) -> IdentityWatch {
        self.tx.subscribe()
    }
}

/// A fresh identity feed, starting signed out.
pub fn identity_channel() -> (IdentityHandle, IdentityWatch) {
    let (tx, rx) = watch::channel(None);
    (IdentityHandle { tx }, rx)
}

/// Make sure the signed-in user has a profile document, creating the
/// zeroed-aggregate one on first sign-in. Idempotent: an existing profile
/// (and its rating aggregate) is returned untouched.
pub async fn ensure_profile(
    store: &dyn RealtimeStore,
    session: &SessionContext,
) -> VoltioResult<UserProfile> {
    if let Some(existing) = store.read_user(&session.user_id).await? {
        return Ok(existing);
    }

    info!(user_id = %session.user_id, "bootstrapping user profile");
    let profile = UserProfile::new(
        session.user_id.clone(),
        session.display_name.clone(),
        session.email.clone(),
    );
    store.upsert_user(&profile).await?;
    Ok(profile)
}
