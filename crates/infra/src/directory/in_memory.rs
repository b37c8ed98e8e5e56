use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use gatehouse_auth::{
    AssignmentStore, MenuItem, MenuStore, Permission, PermissionStore, Role, RolePermission,
    StoreError, StoreResult, UserRole,
};
use gatehouse_core::{Entity, Lifecycle, PermissionId, RecordStatus, RoleId, UserId};

use super::UserAccount;

#[derive(Debug, Default)]
struct DirectoryState {
    users: HashMap<UserId, UserAccount>,
    permissions: Vec<Permission>,
    roles: HashMap<RoleId, Role>,
    role_permissions: Vec<RolePermission>,
    user_roles: Vec<UserRole>,
    menu_items: Vec<MenuItem>,
}

/// In-memory directory for tests, dev and the CLI.
///
/// Records keep insertion order, so lookups that can match several rows
/// (e.g. two permissions sharing a route) are deterministic. Upserts replace
/// in place by entity id; join records are unique per key.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    inner: RwLock<DirectoryState>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, DirectoryState>> {
        self.inner
            .read()
            .map_err(|_| StoreError::LockPoisoned("in-memory directory"))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, DirectoryState>> {
        self.inner
            .write()
            .map_err(|_| StoreError::LockPoisoned("in-memory directory"))
    }

    // ── Write side ──────────────────────────────────────────────────────────

    pub fn upsert_user(&self, user: UserAccount) -> StoreResult<()> {
        self.write()?.users.insert(user.id, user);
        Ok(())
    }

    pub fn upsert_permission(&self, permission: Permission) -> StoreResult<()> {
        upsert_by_id(&mut self.write()?.permissions, permission);
        Ok(())
    }

    pub fn upsert_role(&self, role: Role) -> StoreResult<()> {
        self.write()?.roles.insert(role.id, role);
        Ok(())
    }

    pub fn upsert_menu_item(&self, item: MenuItem) -> StoreResult<()> {
        upsert_by_id(&mut self.write()?.menu_items, item);
        Ok(())
    }

    /// Store a role-permission link, replacing any link for the same pair.
    pub fn link(&self, link: RolePermission) -> StoreResult<()> {
        let mut state = self.write()?;
        match state
            .role_permissions
            .iter_mut()
            .find(|l| l.role_id == link.role_id && l.permission_id == link.permission_id)
        {
            Some(existing) => *existing = link,
            None => state.role_permissions.push(link),
        }
        Ok(())
    }

    /// Actively grant `permission_id` to `role_id`.
    pub fn grant(&self, role_id: RoleId, permission_id: PermissionId) -> StoreResult<()> {
        self.link(RolePermission::active(role_id, permission_id))
    }

    /// Store a user-role assignment, replacing any assignment with the same
    /// user, role and branch.
    pub fn assign(&self, assignment: UserRole) -> StoreResult<()> {
        let mut state = self.write()?;
        match state.user_roles.iter_mut().find(|a| {
            a.user_id == assignment.user_id
                && a.role_id == assignment.role_id
                && a.branch_id == assignment.branch_id
        }) {
            Some(existing) => *existing = assignment,
            None => state.user_roles.push(assignment),
        }
        Ok(())
    }

    /// Change a permission's lifecycle status. Returns `false` if unknown.
    pub fn set_permission_status(
        &self,
        id: PermissionId,
        status: RecordStatus,
    ) -> StoreResult<bool> {
        let mut state = self.write()?;
        Ok(match state.permissions.iter_mut().find(|p| p.id == id) {
            Some(permission) => {
                permission.status = status;
                true
            }
            None => false,
        })
    }

    /// Change a role's lifecycle status. Returns `false` if unknown.
    pub fn set_role_status(&self, id: RoleId, status: RecordStatus) -> StoreResult<bool> {
        let mut state = self.write()?;
        Ok(match state.roles.get_mut(&id) {
            Some(role) => {
                role.status = status;
                true
            }
            None => false,
        })
    }

    /// Change a user account's lifecycle status. Returns `false` if unknown.
    pub fn set_user_status(&self, id: UserId, status: RecordStatus) -> StoreResult<bool> {
        let mut state = self.write()?;
        Ok(match state.users.get_mut(&id) {
            Some(user) => {
                user.status = status;
                true
            }
            None => false,
        })
    }

    // ── Lookups used by tooling ─────────────────────────────────────────────

    /// Any permission with this code, regardless of status.
    pub fn permission_by_code(&self, code: &str) -> StoreResult<Option<Permission>> {
        Ok(self
            .read()?
            .permissions
            .iter()
            .find(|p| p.code.as_str() == code)
            .cloned())
    }

    /// Roles whose code matches, across every tenant.
    pub fn roles_by_code(&self, code: &str) -> StoreResult<Vec<Role>> {
        let state = self.read()?;
        let mut roles: Vec<Role> = state
            .roles
            .values()
            .filter(|r| r.code == code)
            .cloned()
            .collect();
        roles.sort_by_key(|r| *r.id.as_uuid());
        Ok(roles)
    }

    #[cfg(test)]
    pub(crate) fn poison(&self) {
        let _ = std::thread::scope(|scope| {
            scope
                .spawn(|| {
                    let _guard = self.inner.write();
                    panic!("poisoning the directory lock");
                })
                .join()
        });
    }
}

fn upsert_by_id<T: Entity>(records: &mut Vec<T>, record: T) {
    match records.iter_mut().find(|r| r.id() == record.id()) {
        Some(existing) => *existing = record,
        None => records.push(record),
    }
}

impl PermissionStore for InMemoryDirectory {
    fn permission(&self, id: PermissionId) -> StoreResult<Option<Permission>> {
        Ok(self.read()?.permissions.iter().find(|p| p.id == id).cloned())
    }

    fn active_permission_by_code(&self, code: &str) -> StoreResult<Option<Permission>> {
        Ok(self
            .read()?
            .permissions
            .iter()
            .find(|p| p.is_active() && p.code.as_str() == code)
            .cloned())
    }

    fn active_permission_by_route(&self, route: &str) -> StoreResult<Option<Permission>> {
        Ok(self
            .read()?
            .permissions
            .iter()
            .find(|p| p.is_active() && p.route.as_deref() == Some(route))
            .cloned())
    }
}

impl AssignmentStore for InMemoryDirectory {
    fn user_status(&self, user_id: UserId) -> StoreResult<Option<RecordStatus>> {
        Ok(self.read()?.users.get(&user_id).map(|u| u.status))
    }

    fn user_roles(&self, user_id: UserId) -> StoreResult<Vec<UserRole>> {
        Ok(self
            .read()?
            .user_roles
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect())
    }

    fn role(&self, role_id: RoleId) -> StoreResult<Option<Role>> {
        Ok(self.read()?.roles.get(&role_id).cloned())
    }

    fn role_permissions(&self, role_id: RoleId) -> StoreResult<Vec<RolePermission>> {
        Ok(self
            .read()?
            .role_permissions
            .iter()
            .filter(|l| l.role_id == role_id)
            .cloned()
            .collect())
    }
}

impl MenuStore for InMemoryDirectory {
    fn active_menu_items(&self) -> StoreResult<Vec<MenuItem>> {
        let mut items: Vec<MenuItem> = self
            .read()?
            .menu_items
            .iter()
            .filter(|m| m.is_active())
            .cloned()
            .collect();
        items.sort_by_key(|m| m.order);
        Ok(items)
    }

    fn active_menu_item_by_route(&self, route: &str) -> StoreResult<Option<MenuItem>> {
        Ok(self
            .read()?
            .menu_items
            .iter()
            .find(|m| m.is_active() && m.route.as_deref() == Some(route))
            .cloned())
    }
}
