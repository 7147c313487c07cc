//! Authentication-related models

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Issued session credential, rotated over its lifetime
///
/// Only the SHA-256 hash of the token is stored. `prev_auth_token` is non-empty
/// only between a rotation and the next successful use of the new token, so
/// requests in flight with the old value keep working.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAuthToken {
    pub id: i64,
    pub user_id: i64,
    #[serde(skip_serializing)]
    pub auth_token: String,
    #[serde(skip_serializing)]
    pub prev_auth_token: String,
    pub user_agent: String,
    pub client_ip: String,
    pub auth_token_seen: bool,
    pub seen_at: i64,
    pub rotated_at: i64,
    pub created_at: i64,
    pub updated_at: i64,
    /// Plain token value, held only in memory right after issue or rotation
    #[serde(skip)]
    pub unhashed_token: String,
}

impl UserAuthToken {
    /// Replace the current token, keeping the old hash valid until the new one is seen
    pub fn rotate(&mut self, new_unhashed: &str, now: i64) {
        self.prev_auth_token = std::mem::replace(&mut self.auth_token, hash_token(new_unhashed));
        self.unhashed_token = new_unhashed.to_string();
        self.auth_token_seen = false;
        self.rotated_at = now;
        self.updated_at = now;
    }

    /// Record a successful use of the current token
    pub fn mark_seen(&mut self, now: i64) {
        self.auth_token_seen = true;
        self.seen_at = now;
        self.updated_at = now;
        self.prev_auth_token.clear();
    }

    /// True when a use of `unhashed` should be persisted as "seen"
    pub fn needs_seen_update(&self, unhashed: &str) -> bool {
        hash_token(unhashed) == self.auth_token
            && (!self.auth_token_seen || !self.prev_auth_token.is_empty())
    }
}

/// Hex-encoded SHA-256 of a token
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}
