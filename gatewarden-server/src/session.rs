//! One verification attempt, end to end.
//!
//! exchange → profile fetch → grant persistence → detached side effects.
//! Only the two provider round-trips can fail the attempt. Once the grant
//! is stored the caller always gets a summary; the role grant and the audit
//! emission run as detached tasks with their own error handling and are
//! never awaited by the request path.

use std::sync::Arc;

use crate::discord::oauth::{ExchangeError, ProfileError};
use crate::server::SharedState;
use crate::store::AccessGrant;

/// What a successful verification returns to the front end. The access and
/// refresh secrets never cross this boundary.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ProfileSummary {
    pub user_id: String,
    pub display_name: String,
    pub avatar_url: String,
    pub email: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("code exchange failed: {0}")]
    Exchange(#[from] ExchangeError),
    #[error("profile fetch failed: {0}")]
    Profile(#[from] ProfileError),
}

impl VerifyError {
    /// The message shown to the visitor. The detailed cause is logged
    /// server-side only.
    pub fn user_message(&self) -> &'static str {
        match self {
            VerifyError::Exchange(_) => {
                "The sign-in code was rejected. Codes are single-use; please start over."
            }
            VerifyError::Profile(_) => {
                "Your profile could not be fetched from Discord. Please try again."
            }
        }
    }
}

/// Run one verification for a one-time authorization code.
pub async fn verify(state: &Arc<SharedState>, code: &str) -> Result<ProfileSummary, VerifyError> {
    let tokens = state.oauth.exchange_code(code).await?;
    let identity = state.oauth.fetch_profile(&tokens.access_token).await?;

    state.store.put(AccessGrant {
        user_id: identity.user_id.clone(),
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        expires_at: tokens.expires_at,
    });
    tracing::info!(
        user = %identity.user_id,
        name = %identity.display_name,
        grants = state.store.len(),
        "identity verified, grant stored"
    );

    // The attempt has succeeded at this point. Neither side effect may
    // block the response or surface a failure to the visitor.
    {
        let state = Arc::clone(state);
        let user_id = identity.user_id.clone();
        tokio::spawn(async move {
            if let Err(e) = state.guild.grant_role(&user_id).await {
                tracing::warn!(user = %user_id, error = %e, "verified-role grant failed");
            }
        });
    }
    if state.audit.is_some() {
        let state = Arc::clone(state);
        let identity = identity.clone();
        tokio::spawn(async move {
            if let Some(ref audit) = state.audit {
                audit.emit(&identity).await;
            }
        });
    }

    Ok(ProfileSummary {
        user_id: identity.user_id,
        display_name: identity.display_name,
        avatar_url: identity.avatar_url,
        email: identity.email,
    })
}
