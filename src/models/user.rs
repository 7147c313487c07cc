//! Identity of the user attached to a request

use serde::Serialize;

use super::{HelpFlags1, RoleType};

/// Authenticated identity and permission set of the current request
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedInUser {
    pub user_id: i64,
    pub org_id: i64,
    pub org_name: String,
    pub org_role: RoleType,
    pub login: String,
    pub name: String,
    pub email: String,
    pub is_server_admin: bool,
    pub is_anonymous: bool,
    pub help_flags1: HelpFlags1,
    /// Unix seconds
    pub last_seen_at: i64,
}

impl SignedInUser {
    /// Identity used for requests without credentials when anonymous access is enabled
    pub fn anonymous(org_id: i64, org_name: &str, org_role: RoleType) -> Self {
        Self {
            org_id,
            org_name: org_name.to_string(),
            org_role,
            is_anonymous: true,
            ..Default::default()
        }
    }
}
