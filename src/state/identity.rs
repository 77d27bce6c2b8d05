use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Platform-wide role carried in the bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum SystemRole {
    Admin,
    #[default]
    User,
    /// Accepted in tokens but grants nothing beyond [`SystemRole::User`].
    Moderator,
}

/// Authenticated identity resolved from the request credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Uuid,
    pub role: SystemRole,
}

impl Caller {
    pub fn new(user_id: Uuid, role: SystemRole) -> Self {
        Self { user_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == SystemRole::Admin
    }
}
