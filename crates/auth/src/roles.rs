//! Roles and the two join records that connect them to permissions and users.

use serde::{Deserialize, Serialize};

use gatehouse_core::{
    BranchId, Entity, Lifecycle, PermissionId, RecordStatus, RoleId, TenantId, UserId,
};

/// A named, tenant-scoped bundle of permissions.
///
/// `code` and `name` are unique within `tenant_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: RoleId,
    #[serde(rename = "companyId")]
    pub tenant_id: TenantId,
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_system: bool,
    #[serde(default)]
    pub status: RecordStatus,
}

impl Role {
    pub fn new(tenant_id: TenantId, code: impl Into<String>) -> Self {
        let code = code.into();
        Self {
            id: RoleId::new(),
            tenant_id,
            name: code.clone(),
            code,
            description: None,
            is_system: false,
            status: RecordStatus::Active,
        }
    }

    pub fn with_status(mut self, status: RecordStatus) -> Self {
        self.status = status;
        self
    }
}

impl Entity for Role {
    type Id = RoleId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Lifecycle for Role {
    fn status(&self) -> RecordStatus {
        self.status
    }
}

/// Role ↔ Permission link.
///
/// At most one active link exists per (role, permission) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RolePermission {
    pub role_id: RoleId,
    pub permission_id: PermissionId,
    #[serde(default)]
    pub status: RecordStatus,
}

impl RolePermission {
    pub fn active(role_id: RoleId, permission_id: PermissionId) -> Self {
        Self {
            role_id,
            permission_id,
            status: RecordStatus::Active,
        }
    }
}

impl Lifecycle for RolePermission {
    fn status(&self) -> RecordStatus {
        self.status
    }
}

/// User ↔ Role assignment, optionally scoped to a branch.
///
/// `branch_id` is carried as metadata; effective permissions are computed
/// across all of a user's active assignments regardless of branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRole {
    pub user_id: UserId,
    pub role_id: RoleId,
    #[serde(default)]
    pub branch_id: Option<BranchId>,
    #[serde(default)]
    pub status: RecordStatus,
}

impl UserRole {
    pub fn active(user_id: UserId, role_id: RoleId) -> Self {
        Self {
            user_id,
            role_id,
            branch_id: None,
            status: RecordStatus::Active,
        }
    }

    pub fn in_branch(mut self, branch_id: BranchId) -> Self {
        self.branch_id = Some(branch_id);
        self
    }
}

impl Lifecycle for UserRole {
    fn status(&self) -> RecordStatus {
        self.status
    }
}
