//! In-memory store of access grants, keyed by Discord user id.
//!
//! One grant per user: re-verifying replaces the previous grant wholesale.
//! Grants live for the lifetime of the process; there is deliberately no
//! persistence and no eviction. The pull operation checks `expires_at`
//! before using a grant; expired entries stay in the map so the summary can
//! name them instead of silently shrinking.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;

/// The reusable credential pair obtained from one successful verification.
#[derive(Debug, Clone)]
pub struct AccessGrant {
    pub user_id: String,
    pub access_token: String,
    pub refresh_token: String,
    /// Absolute expiry of `access_token`, computed from the provider's
    /// `expires_in` at exchange time.
    pub expires_at: DateTime<Utc>,
}

impl AccessGrant {
    /// A grant is usable only strictly before its expiry.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Process-wide grant map. `put`/`get` are atomic per key; the lock is never
/// held across an await point.
pub struct GrantStore {
    grants: Mutex<HashMap<String, AccessGrant>>,
}

impl GrantStore {
    pub fn new() -> Self {
        GrantStore {
            grants: Mutex::new(HashMap::new()),
        }
    }

    /// Unconditional upsert keyed by `grant.user_id`.
    pub fn put(&self, grant: AccessGrant) {
        self.grants.lock().insert(grant.user_id.clone(), grant);
    }

    pub fn get(&self, user_id: &str) -> Option<AccessGrant> {
        self.grants.lock().get(user_id).cloned()
    }

    /// Snapshot of every stored user id at call time. Puts that race a pull
    /// may or may not appear; the snapshot itself never changes under the
    /// caller.
    pub fn user_ids(&self) -> Vec<String> {
        self.grants.lock().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.grants.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.lock().is_empty()
    }
}

impl Default for GrantStore {
    fn default() -> Self {
        Self::new()
    }
}
