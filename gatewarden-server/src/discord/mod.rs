//! Discord REST integration, split by credential:
//!
//! - `oauth`: flows authorized by the *user's* grant (code exchange,
//!   profile fetch)
//! - `guild`: privileged mutations authorized by the *bot* credential
//!   (role grant, member insert)
//!
//! Base URLs are plain config fields so tests can point both clients at a
//! local mock provider.

pub mod guild;
pub mod oauth;

pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";
pub const DEFAULT_CDN_BASE: &str = "https://cdn.discordapp.com";
pub const DEFAULT_AUTHORIZE_URL: &str = "https://discord.com/oauth2/authorize";

/// Failure causes for the privileged guild mutations. Both `grant_role` and
/// `add_member` map non-success statuses through the single [`classify`]
/// function below, so the taxonomy cannot drift between call sites.
#[derive(Debug, thiserror::Error)]
pub enum GuildApiError {
    /// 404: the user never joined the guild (or already left).
    #[error("user is not a member of the guild")]
    NotAMember,
    /// 403: the bot credential lacks the required permission.
    #[error("bot is not permitted to perform this action")]
    Forbidden,
    /// 401: the bot credential itself was rejected.
    #[error("bot credential rejected")]
    Unauthorized,
    /// 422: the provider refused the user's access token. Distinct from
    /// local expiry: the token looked fresh to us but Discord disagreed
    /// (revoked authorization, deauthorized app).
    #[error("stored access grant rejected by provider")]
    GrantRejected,
    #[error("unexpected provider response ({status}): {body}")]
    Other { status: u16, body: String },
    /// Transport-level failure, including the per-request timeout.
    #[error("request failed: {0}")]
    Network(String),
}

/// Map a non-success status to the closed cause taxonomy.
pub(crate) fn classify(status: u16, body: String) -> GuildApiError {
    match status {
        401 => GuildApiError::Unauthorized,
        403 => GuildApiError::Forbidden,
        404 => GuildApiError::NotAMember,
        422 => GuildApiError::GrantRejected,
        _ => GuildApiError::Other { status, body },
    }
}

/// Build a reqwest client with the bounded per-request timeout every
/// outbound call uses. One attempt per call, no retries; a timeout surfaces
/// as `Network` and is handled like any other per-call failure.
pub(crate) fn http_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_maps_documented_statuses() {
        assert!(matches!(
            classify(401, String::new()),
            GuildApiError::Unauthorized
        ));
        assert!(matches!(
            classify(403, String::new()),
            GuildApiError::Forbidden
        ));
        assert!(matches!(
            classify(404, String::new()),
            GuildApiError::NotAMember
        ));
        assert!(matches!(
            classify(422, String::new()),
            GuildApiError::GrantRejected
        ));
    }

    #[test]
    fn classify_keeps_status_and_body_for_the_rest() {
        match classify(500, "upstream exploded".into()) {
            GuildApiError::Other { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "upstream exploded");
            }
            other => panic!("expected Other, got {other:?}"),
        }
    }
}
