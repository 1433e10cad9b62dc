//! Verification audit trail, delivered to a Discord-compatible webhook.
//!
//! Strictly best-effort: `emit` never returns an error and the session
//! spawns it detached, so a dead webhook can never fail or slow down a
//! verification.

use crate::discord::oauth::Identity;

pub struct AuditWebhook {
    http: reqwest::Client,
    url: String,
}

impl AuditWebhook {
    pub fn new(http: reqwest::Client, url: String) -> Self {
        AuditWebhook { http, url }
    }

    /// Post one embed describing a completed verification.
    pub async fn emit(&self, identity: &Identity) {
        let email = match (identity.email.as_deref(), identity.email_verified) {
            (Some(e), true) => e.to_string(),
            (Some(e), false) => format!("{e} (unverified)"),
            (None, _) => "not shared".to_string(),
        };
        let payload = serde_json::json!({
            "embeds": [{
                "title": "User verified",
                "thumbnail": { "url": identity.avatar_url },
                "fields": [
                    { "name": "User", "value": identity.display_name, "inline": true },
                    { "name": "Id", "value": identity.user_id, "inline": true },
                    { "name": "Email", "value": email, "inline": true },
                ],
                "footer": { "text": "gatewarden" },
            }],
        });

        match self.http.post(&self.url).json(&payload).send().await {
            Ok(r) if r.status().is_success() => {}
            Ok(r) => {
                tracing::warn!(status = %r.status(), user = %identity.user_id, "audit webhook rejected the embed");
            }
            Err(e) => {
                tracing::warn!(error = %e, user = %identity.user_id, "audit webhook request failed");
            }
        }
    }
}
