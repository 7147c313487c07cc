use serde::Serialize;

use super::{HelpFlags1, SignedInUser};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// API status
    pub status: String,
    pub version: String,
    /// Whether the database answered a ping
    pub database: bool,
}

/// Signed-in user as returned by `GET /api/user`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    #[serde(flatten)]
    pub user: SignedInUser,
    pub is_signed_in: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HelpFlagsResponse {
    pub message: String,
    pub help_flags1: HelpFlags1,
}
