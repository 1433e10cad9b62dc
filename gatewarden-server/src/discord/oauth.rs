//! OAuth2 code exchange and profile fetch.
//!
//! The exchange consumes a one-time authorization code: Discord invalidates
//! the code whether or not we succeed, so a failed exchange must never be
//! retried with the same code. The resulting grant carries an absolute
//! expiry computed here from the provider's `expires_in`.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Tokens returned by a successful code exchange. The user id is not known
/// yet at this point; it comes from the profile fetch.
#[derive(Debug, Clone)]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Canonical profile of a verified user, with the avatar URL already
/// derived. Handed to the caller and to the audit sink; never stored.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: String,
    pub display_name: String,
    pub discriminator: Option<String>,
    pub email: Option<String>,
    pub avatar_url: String,
    pub email_verified: bool,
}

/// Client for the endpoints authorized by the user's own grant.
pub struct OauthClient {
    http: reqwest::Client,
    api_base: String,
    cdn_base: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

#[derive(Deserialize)]
struct WireTokens {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
}

#[derive(Deserialize)]
struct WireUser {
    id: String,
    username: String,
    global_name: Option<String>,
    discriminator: Option<String>,
    email: Option<String>,
    avatar: Option<String>,
    verified: Option<bool>,
}

impl OauthClient {
    pub fn new(
        http: reqwest::Client,
        api_base: String,
        cdn_base: String,
        client_id: String,
        client_secret: String,
        redirect_uri: String,
    ) -> Self {
        OauthClient {
            http,
            api_base,
            cdn_base,
            client_id,
            client_secret,
            redirect_uri,
        }
    }

    /// Exchange a one-time authorization code for a token set.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenSet, ExchangeError> {
        let url = format!("{}/oauth2/token", self.api_base);
        let resp = self
            .http
            .post(&url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.redirect_uri.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ExchangeError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            // Surface Discord's own description when it sent one
            // ({"error": "invalid_grant", "error_description": "..."}).
            let reason = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| {
                    v["error_description"]
                        .as_str()
                        .or(v["error"].as_str())
                        .map(String::from)
                })
                .unwrap_or_else(|| format!("status {status}: {body}"));
            return Err(ExchangeError::Rejected(reason));
        }

        let tokens: WireTokens = resp
            .json()
            .await
            .map_err(|e| ExchangeError::Malformed(e.to_string()))?;

        // expires_in is provider-controlled; an out-of-range value is a
        // malformed response, not a panic.
        let expires_at = chrono::Duration::try_seconds(tokens.expires_in)
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .ok_or_else(|| {
                ExchangeError::Malformed(format!("expires_in out of range: {}", tokens.expires_in))
            })?;

        Ok(TokenSet {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_at,
        })
    }

    /// Fetch the canonical profile for an access token.
    pub async fn fetch_profile(&self, access_token: &str) -> Result<Identity, ProfileError> {
        let url = format!("{}/users/@me", self.api_base);
        let resp = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| ProfileError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ProfileError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let user: WireUser = resp
            .json()
            .await
            .map_err(|e| ProfileError::Malformed(e.to_string()))?;

        let avatar_url = avatar_url(
            &self.cdn_base,
            &user.id,
            user.avatar.as_deref(),
            user.discriminator.as_deref(),
        );

        Ok(Identity {
            display_name: user.global_name.unwrap_or_else(|| user.username.clone()),
            user_id: user.id,
            discriminator: user.discriminator,
            email: user.email,
            avatar_url,
            email_verified: user.verified.unwrap_or(false),
        })
    }
}

/// Derive the avatar URL for a profile.
///
/// With an uploaded avatar the CDN path embeds both the user id and the
/// asset hash. Without one, Discord serves a default avatar indexed by
/// `discriminator % 5`; accounts without a numeric discriminator get
/// index 0.
pub fn avatar_url(
    cdn_base: &str,
    user_id: &str,
    avatar: Option<&str>,
    discriminator: Option<&str>,
) -> String {
    match avatar {
        Some(hash) => format!("{cdn_base}/avatars/{user_id}/{hash}.png"),
        None => {
            let index = discriminator
                .and_then(|d| d.parse::<u32>().ok())
                .map(|d| d % 5)
                .unwrap_or(0);
            format!("{cdn_base}/embed/avatars/{index}.png")
        }
    }
}

// ── Errors ─────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    /// The provider rejected the code: bad, expired, or already used.
    /// Permanent for this code; do not retry the exchange.
    #[error("provider rejected the code: {0}")]
    Rejected(String),
    #[error("token endpoint request failed: {0}")]
    Network(String),
    #[error("malformed token response: {0}")]
    Malformed(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("profile endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("profile request failed: {0}")]
    Network(String),
    #[error("malformed profile response: {0}")]
    Malformed(String),
}
