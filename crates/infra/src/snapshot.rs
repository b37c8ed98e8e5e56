//! JSON directory snapshots.
//!
//! A snapshot is the whole directory in one document: the arrays `users`,
//! `permissions`, `roles`, `rolePermissions`, `userRoles` and `menuItems`,
//! using camelCase field names and integer statuses. Missing arrays are empty.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use gatehouse_auth::{MenuItem, Permission, Role, RolePermission, StoreError, UserRole};
use gatehouse_core::{Lifecycle, PermissionId, RoleId};

use crate::directory::{InMemoryDirectory, UserAccount};

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to read snapshot {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed snapshot: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("inconsistent snapshot: {0}")]
    Invalid(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectorySnapshot {
    #[serde(default)]
    pub users: Vec<UserAccount>,
    #[serde(default)]
    pub permissions: Vec<Permission>,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub role_permissions: Vec<RolePermission>,
    #[serde(default)]
    pub user_roles: Vec<UserRole>,
    #[serde(default)]
    pub menu_items: Vec<MenuItem>,
}

impl DirectorySnapshot {
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let snapshot: Self = serde_json::from_str(json)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let snapshot = Self::from_json(&json)?;
        tracing::info!(
            path = %path.display(),
            users = snapshot.users.len(),
            permissions = snapshot.permissions.len(),
            roles = snapshot.roles.len(),
            menu_items = snapshot.menu_items.len(),
            "loaded directory snapshot"
        );
        Ok(snapshot)
    }

    /// Check the referential rules the write side normally guarantees.
    ///
    /// - Non-deleted permission codes are unique.
    /// - Every link and assignment references a known role (and permission).
    pub fn validate(&self) -> Result<(), SnapshotError> {
        let mut codes = HashSet::new();
        for permission in self.permissions.iter().filter(|p| !p.status().is_deleted()) {
            if !codes.insert(permission.code.as_str()) {
                return Err(SnapshotError::Invalid(format!(
                    "duplicate permission code '{}'",
                    permission.code
                )));
            }
        }

        let permission_ids: HashSet<PermissionId> = self.permissions.iter().map(|p| p.id).collect();
        let role_ids: HashSet<RoleId> = self.roles.iter().map(|r| r.id).collect();

        for link in &self.role_permissions {
            if !role_ids.contains(&link.role_id) {
                return Err(SnapshotError::Invalid(format!(
                    "role permission references unknown role {}",
                    link.role_id
                )));
            }
            if !permission_ids.contains(&link.permission_id) {
                return Err(SnapshotError::Invalid(format!(
                    "role permission references unknown permission {}",
                    link.permission_id
                )));
            }
        }

        for assignment in &self.user_roles {
            if !role_ids.contains(&assignment.role_id) {
                return Err(SnapshotError::Invalid(format!(
                    "user role references unknown role {}",
                    assignment.role_id
                )));
            }
        }

        Ok(())
    }

    /// Load every record into a fresh in-memory directory.
    pub fn into_directory(self) -> Result<InMemoryDirectory, SnapshotError> {
        let directory = InMemoryDirectory::new();
        for user in self.users {
            directory.upsert_user(user)?;
        }
        for permission in self.permissions {
            directory.upsert_permission(permission)?;
        }
        for role in self.roles {
            directory.upsert_role(role)?;
        }
        for link in self.role_permissions {
            directory.link(link)?;
        }
        for assignment in self.user_roles {
            directory.assign(assignment)?;
        }
        for item in self.menu_items {
            directory.upsert_menu_item(item)?;
        }
        Ok(directory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatehouse_auth::{AssignmentStore, MenuStore, PermissionStore};
    use gatehouse_core::RecordStatus;

    const SNAPSHOT: &str = r#"{
        "users": [{ "id": "0192f1d4-7b36-7c4e-9a51-3a0c2b1d0001", "username": "ana", "status": 1 }],
        "permissions": [
            { "id": "0192f1d4-7b36-7c4e-9a51-3a0c2b1d0101", "code": "reports.view", "type": "PAGE", "route": "/reports" },
            { "id": "0192f1d4-7b36-7c4e-9a51-3a0c2b1d0102", "code": "reports.export", "type": "ACTION",
              "resource": "reports", "action": "export", "status": -1 }
        ],
        "roles": [{ "id": "0192f1d4-7b36-7c4e-9a51-3a0c2b1d0201",
                    "companyId": "0192f1d4-7b36-7c4e-9a51-3a0c2b1d0301", "code": "viewer" }],
        "rolePermissions": [
            { "roleId": "0192f1d4-7b36-7c4e-9a51-3a0c2b1d0201", "permissionId": "0192f1d4-7b36-7c4e-9a51-3a0c2b1d0101" }
        ],
        "userRoles": [
            { "userId": "0192f1d4-7b36-7c4e-9a51-3a0c2b1d0001", "roleId": "0192f1d4-7b36-7c4e-9a51-3a0c2b1d0201", "status": 1 }
        ],
        "menuItems": [{ "menuId": "reports", "label": "Reports", "route": "/reports", "order": 1 }]
    }"#;

    #[test]
    fn parses_and_loads_a_snapshot() {
        let snapshot = DirectorySnapshot::from_json(SNAPSHOT).unwrap();
        assert_eq!(snapshot.permissions[1].status, RecordStatus::Deleted);
        assert_eq!(snapshot.roles[0].status, RecordStatus::Active);

        let dir = snapshot.into_directory().unwrap();
        let user = "0192f1d4-7b36-7c4e-9a51-3a0c2b1d0001".parse().unwrap();
        assert_eq!(dir.user_status(user).unwrap(), Some(RecordStatus::Active));
        assert_eq!(dir.user_roles(user).unwrap().len(), 1);
        assert!(dir.active_permission_by_route("/reports").unwrap().is_some());
        assert!(dir.active_permission_by_code("reports.export").unwrap().is_none());
        assert_eq!(dir.active_menu_items().unwrap().len(), 1);
    }

    #[test]
    fn missing_arrays_default_to_empty() {
        let snapshot = DirectorySnapshot::from_json("{}").unwrap();
        assert_eq!(snapshot, DirectorySnapshot::default());
    }

    #[test]
    fn rejects_unknown_status_codes() {
        let json = r#"{ "users": [{ "id": "0192f1d4-7b36-7c4e-9a51-3a0c2b1d0001", "status": 7 }] }"#;
        assert!(matches!(DirectorySnapshot::from_json(json), Err(SnapshotError::Parse(_))));
    }

    #[test]
    fn rejects_duplicate_live_codes() {
        let mut snapshot = DirectorySnapshot::default();
        snapshot.permissions.push(Permission::page("reports.view", "/a"));
        snapshot.permissions.push(Permission::page("reports.view", "/b"));
        assert!(matches!(snapshot.validate(), Err(SnapshotError::Invalid(_))));

        snapshot.permissions[1].status = RecordStatus::Deleted;
        assert!(snapshot.validate().is_ok());
    }

    #[test]
    fn rejects_dangling_links() {
        let mut snapshot = DirectorySnapshot::default();
        snapshot
            .role_permissions
            .push(RolePermission::active(RoleId::new(), PermissionId::new()));
        assert!(matches!(snapshot.validate(), Err(SnapshotError::Invalid(_))));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = DirectorySnapshot::from_path("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, SnapshotError::Io { .. }));
    }
}
