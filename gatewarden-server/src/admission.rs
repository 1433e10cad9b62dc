//! Operator-triggered bulk admission: the "pull".
//!
//! Walks a snapshot of every stored grant and re-inserts each user into the
//! guild with their own access token. Items are fully isolated: an expired
//! grant or a provider rejection becomes one `failed` entry and the batch
//! keeps going. The run returns only after every id has been attempted.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::Serialize;

use crate::discord::guild::AdmitOutcome;
use crate::server::SharedState;

/// How many member inserts run against the provider at once. Bounded so a
/// large pull stays under the provider's rate limits; `buffered` keeps the
/// result order matching the snapshot order.
const PULL_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, Serialize)]
pub struct PullError {
    pub user_id: String,
    pub message: String,
}

/// Complete result of one pull. `errors` always carries every failure;
/// capping is purely a display concern, see [`AdmissionSummary::render`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct AdmissionSummary {
    pub total: usize,
    pub added: usize,
    pub already_member: usize,
    pub failed: usize,
    pub errors: Vec<PullError>,
}

impl AdmissionSummary {
    /// Human-readable summary with the error list capped at `max_errors`.
    /// Counts stay exact regardless of the cap.
    pub fn render(&self, max_errors: usize) -> String {
        if self.total == 0 {
            return "No verified users stored yet; nothing to pull.".to_string();
        }
        let mut out = format!(
            "Pulled {} verified users: {} added, {} already present, {} failed.",
            self.total, self.added, self.already_member, self.failed
        );
        for err in self.errors.iter().take(max_errors) {
            out.push_str(&format!("\n- {}: {}", err.user_id, err.message));
        }
        let hidden = self.errors.len().saturating_sub(max_errors);
        if hidden > 0 {
            out.push_str(&format!("\n… and {hidden} more"));
        }
        out
    }
}

enum ItemOutcome {
    Added,
    AlreadyMember,
    Failed(PullError),
}

/// Run one pull over every stored grant.
pub async fn run(state: &Arc<SharedState>) -> AdmissionSummary {
    let ids = state.store.user_ids();
    if ids.is_empty() {
        tracing::info!("pull requested with no stored grants");
        return AdmissionSummary::default();
    }

    let total = ids.len();
    tracing::info!(total, "pull started");

    // One clock reading for the whole batch keeps the expiry decision
    // consistent across items.
    let now = Utc::now();
    let outcomes: Vec<ItemOutcome> = futures::stream::iter(ids)
        .map(|user_id| {
            let state = Arc::clone(state);
            async move { admit_one(&state, user_id, now).await }
        })
        .buffered(PULL_CONCURRENCY)
        .collect()
        .await;

    let mut summary = AdmissionSummary {
        total,
        ..Default::default()
    };
    for outcome in outcomes {
        match outcome {
            ItemOutcome::Added => summary.added += 1,
            ItemOutcome::AlreadyMember => summary.already_member += 1,
            ItemOutcome::Failed(err) => {
                summary.failed += 1;
                summary.errors.push(err);
            }
        }
    }

    tracing::info!(
        total = summary.total,
        added = summary.added,
        already_member = summary.already_member,
        failed = summary.failed,
        "pull finished"
    );
    summary
}

async fn admit_one(state: &SharedState, user_id: String, now: DateTime<Utc>) -> ItemOutcome {
    let Some(grant) = state.store.get(&user_id) else {
        return ItemOutcome::Failed(PullError {
            user_id,
            message: "no stored grant".to_string(),
        });
    };

    // Local check first: an expired grant never produces network traffic.
    if grant.is_expired(now) {
        return ItemOutcome::Failed(PullError {
            user_id,
            message: format!("grant expired at {}", grant.expires_at.to_rfc3339()),
        });
    }

    match state.guild.add_member(&user_id, &grant.access_token).await {
        Ok(AdmitOutcome::Added) => ItemOutcome::Added,
        Ok(AdmitOutcome::AlreadyMember) => ItemOutcome::AlreadyMember,
        Err(e) => {
            tracing::warn!(user = %user_id, error = %e, "member insert failed");
            ItemOutcome::Failed(PullError {
                user_id,
                message: e.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary_with_errors(n: usize) -> AdmissionSummary {
        AdmissionSummary {
            total: n + 2,
            added: 1,
            already_member: 1,
            failed: n,
            errors: (0..n)
                .map(|i| PullError {
                    user_id: format!("u{i}"),
                    message: "grant expired at 2026-01-01T00:00:00+00:00".to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn render_caps_displayed_errors_but_not_counts() {
        let summary = summary_with_errors(12);
        let text = summary.render(10);
        assert!(text.contains("12 failed"));
        assert!(text.contains("… and 2 more"));
        assert_eq!(text.matches("\n- ").count(), 10);
        // The underlying data is untouched.
        assert_eq!(summary.errors.len(), 12);
    }

    #[test]
    fn render_empty_store_is_a_dedicated_message() {
        let summary = AdmissionSummary::default();
        assert_eq!(
            summary.render(10),
            "No verified users stored yet; nothing to pull."
        );
    }

    #[test]
    fn counters_satisfy_the_total_invariant() {
        let summary = summary_with_errors(3);
        assert_eq!(
            summary.total,
            summary.added + summary.already_member + summary.failed
        );
    }
}
