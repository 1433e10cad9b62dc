//! Privileged guild mutations, authorized by the bot credential.
//!
//! Both operations are single-attempt PUTs. Discord makes them idempotent
//! on its side: re-granting a role a member already has is a 204 no-op, and
//! inserting a member who is already present is the documented 204 outcome.

use super::{GuildApiError, classify};

/// Outcome of a member insert. Both variants are success: the provider
/// distinguishes "created" (201) from "was already there" (204).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmitOutcome {
    Added,
    AlreadyMember,
}

/// Client for the guild-member endpoints.
pub struct GuildClient {
    http: reqwest::Client,
    api_base: String,
    bot_token: String,
    guild_id: String,
    verified_role_id: String,
}

impl GuildClient {
    pub fn new(
        http: reqwest::Client,
        api_base: String,
        bot_token: String,
        guild_id: String,
        verified_role_id: String,
    ) -> Self {
        GuildClient {
            http,
            api_base,
            bot_token,
            guild_id,
            verified_role_id,
        }
    }

    fn auth_header(&self) -> String {
        format!("Bot {}", self.bot_token)
    }

    /// Set the verified role on a guild member.
    pub async fn grant_role(&self, user_id: &str) -> Result<(), GuildApiError> {
        let url = format!(
            "{}/guilds/{}/members/{}/roles/{}",
            self.api_base, self.guild_id, user_id, self.verified_role_id
        );
        let resp = self
            .http
            .put(&url)
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map_err(|e| GuildApiError::Network(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        Err(classify(status.as_u16(), body))
    }

    /// Insert a user into the guild using their own access grant.
    pub async fn add_member(
        &self,
        user_id: &str,
        access_token: &str,
    ) -> Result<AdmitOutcome, GuildApiError> {
        let url = format!(
            "{}/guilds/{}/members/{}",
            self.api_base, self.guild_id, user_id
        );
        let resp = self
            .http
            .put(&url)
            .header("Authorization", self.auth_header())
            .json(&serde_json::json!({ "access_token": access_token }))
            .send()
            .await
            .map_err(|e| GuildApiError::Network(e.to_string()))?;

        let status = resp.status();
        match status.as_u16() {
            201 => Ok(AdmitOutcome::Added),
            204 => Ok(AdmitOutcome::AlreadyMember),
            code => {
                let body = resp.text().await.unwrap_or_default();
                Err(classify(code, body))
            }
        }
    }
}
