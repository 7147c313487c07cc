use serde::{Deserialize, Serialize};

/// Organization role of a user, ordered from least to most privileged
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub enum RoleType {
    #[default]
    Viewer,
    Editor,
    Admin,
}

impl RoleType {
    /// True when `self` grants at least the privileges of `other`
    pub fn includes(self, other: RoleType) -> bool {
        self >= other
    }
}

impl std::fmt::Display for RoleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoleType::Viewer => write!(f, "Viewer"),
            RoleType::Editor => write!(f, "Editor"),
            RoleType::Admin => write!(f, "Admin"),
        }
    }
}

impl std::str::FromStr for RoleType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "viewer" => Ok(RoleType::Viewer),
            "editor" => Ok(RoleType::Editor),
            "admin" => Ok(RoleType::Admin),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}
