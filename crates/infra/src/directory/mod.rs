//! Directory storage: user accounts, permissions, roles, assignments and the
//! menu tree, served to the engine through the `gatehouse-auth` store traits.

pub mod in_memory;

use serde::{Deserialize, Serialize};

use gatehouse_core::{Entity, Lifecycle, RecordStatus, UserId};

pub use in_memory::InMemoryDirectory;

/// A user account as far as authorization cares: identity and lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    pub id: UserId,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub status: RecordStatus,
}

impl UserAccount {
    pub fn active(id: UserId) -> Self {
        Self {
            id,
            username: None,
            status: RecordStatus::Active,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_status(mut self, status: RecordStatus) -> Self {
        self.status = status;
        self
    }
}

impl Entity for UserAccount {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Lifecycle for UserAccount {
    fn status(&self) -> RecordStatus {
        self.status
    }
}
