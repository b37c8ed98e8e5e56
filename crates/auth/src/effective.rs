//! Effective permission aggregation.
//!
//! A user's effective set is the union, deduplicated by permission id, of every
//! ACTIVE permission reachable through an ACTIVE assignment to an ACTIVE role
//! over an ACTIVE role-permission link. It is derived on demand and never
//! persisted.

use std::collections::HashSet;

use serde::Serialize;

use gatehouse_core::{Lifecycle, PermissionId, RoleId, UserId};

use crate::permissions::{Permission, PermissionCode, matches};
use crate::roles::Role;
use crate::store::{AssignmentStore, PermissionStore, StoreResult};

/// Deduplicated, insertion-ordered set of permissions held by a subject.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EffectivePermissions {
    permissions: Vec<Permission>,
    #[serde(skip)]
    seen: HashSet<PermissionId>,
}

impl EffectivePermissions {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Insert a permission unless one with the same id is already present.
    ///
    /// Returns whether it was added.
    pub fn insert(&mut self, permission: Permission) -> bool {
        if !self.seen.insert(permission.id) {
            return false;
        }
        self.permissions.push(permission);
        true
    }

    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Permission> {
        self.permissions.iter()
    }

    pub fn codes(&self) -> impl Iterator<Item = &PermissionCode> {
        self.permissions.iter().map(|p| &p.code)
    }

    pub fn contains(&self, id: PermissionId) -> bool {
        self.seen.contains(&id)
    }

    /// The first held permission whose code satisfies `required`.
    pub fn satisfying(&self, required: &str) -> Option<&Permission> {
        self.permissions
            .iter()
            .find(|p| matches(p.code.as_str(), required))
    }

    pub fn grants(&self, required: &str) -> bool {
        self.satisfying(required).is_some()
    }

    /// True if any required code is satisfied (false for an empty list).
    pub fn grants_any<S: AsRef<str>>(&self, required: &[S]) -> bool {
        required.iter().any(|code| self.grants(code.as_ref()))
    }

    /// True if every required code is satisfied (true for an empty list).
    pub fn grants_all<S: AsRef<str>>(&self, required: &[S]) -> bool {
        required.iter().all(|code| self.grants(code.as_ref()))
    }

    pub fn into_vec(self) -> Vec<Permission> {
        self.permissions
    }
}

impl FromIterator<Permission> for EffectivePermissions {
    fn from_iter<T: IntoIterator<Item = Permission>>(iter: T) -> Self {
        let mut set = Self::empty();
        for permission in iter {
            set.insert(permission);
        }
        set
    }
}

/// Compute a user's effective permissions.
///
/// An unknown user, an inactive account, or a user without active assignments
/// yields an empty set. Store failures propagate.
pub fn effective_permissions<A, P>(
    assignments: &A,
    permissions: &P,
    user_id: UserId,
) -> StoreResult<EffectivePermissions>
where
    A: AssignmentStore + ?Sized,
    P: PermissionStore + ?Sized,
{
    let mut effective = EffectivePermissions::empty();

    match assignments.user_status(user_id)? {
        Some(status) if status.is_active() => {}
        Some(status) => {
            tracing::debug!(%user_id, %status, "user account not active; no effective permissions");
            return Ok(effective);
        }
        None => {
            tracing::debug!(%user_id, "unknown user; no effective permissions");
            return Ok(effective);
        }
    }

    let mut visited: HashSet<RoleId> = HashSet::new();
    for assignment in assignments.user_roles(user_id)? {
        if !assignment.is_active() || !visited.insert(assignment.role_id) {
            continue;
        }
        let Some(role) = active_role(assignments, assignment.role_id)? else {
            continue;
        };
        collect_role_permissions(assignments, permissions, &role, &mut effective)?;
    }

    tracing::debug!(%user_id, count = effective.len(), "computed effective permissions");
    Ok(effective)
}

/// Active permissions granted by one role; empty if the role is unknown or
/// not active.
pub fn role_permissions<A, P>(
    assignments: &A,
    permissions: &P,
    role_id: RoleId,
) -> StoreResult<EffectivePermissions>
where
    A: AssignmentStore + ?Sized,
    P: PermissionStore + ?Sized,
{
    let mut effective = EffectivePermissions::empty();
    if let Some(role) = active_role(assignments, role_id)? {
        collect_role_permissions(assignments, permissions, &role, &mut effective)?;
    }
    Ok(effective)
}

/// The role with this id, if it exists and is ACTIVE.
pub fn active_role<A>(assignments: &A, role_id: RoleId) -> StoreResult<Option<Role>>
where
    A: AssignmentStore + ?Sized,
{
    Ok(assignments.role(role_id)?.filter(|r| r.is_active()))
}

fn collect_role_permissions<A, P>(
    assignments: &A,
    permissions: &P,
    role: &Role,
    into: &mut EffectivePermissions,
) -> StoreResult<()>
where
    A: AssignmentStore + ?Sized,
    P: PermissionStore + ?Sized,
{
    for link in assignments.role_permissions(role.id)? {
        if !link.is_active() {
            continue;
        }
        match permissions.permission(link.permission_id)? {
            Some(permission) if permission.is_active() => {
                into.insert(permission);
            }
            Some(permission) => {
                tracing::debug!(
                    role = %role.code,
                    code = %permission.code,
                    status = %permission.status,
                    "skipping non-active permission linked to role"
                );
            }
            None => {
                tracing::warn!(
                    role = %role.code,
                    permission_id = %link.permission_id,
                    "role links a permission that does not exist"
                );
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::PermissionKind;

    #[test]
    fn dedups_by_id_and_keeps_first() {
        let a = Permission::new("reports.view", PermissionKind::Page);
        let dup = a.clone();
        let b = Permission::new("reports.export", PermissionKind::Action);
        let set: EffectivePermissions = vec![a.clone(), b, dup].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert_eq!(set.iter().next().map(|p| p.id), Some(a.id));
    }

    #[test]
    fn same_code_different_ids_are_distinct_records() {
        let a = Permission::new("reports.view", PermissionKind::Page);
        let b = Permission::new("reports.view", PermissionKind::Page);
        let set: EffectivePermissions = vec![a, b].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn any_and_all_over_required_codes() {
        let set: EffectivePermissions =
            std::iter::once(Permission::new("reports.view", PermissionKind::Page)).collect();
        let required = ["reports.view", "reports.export"];
        assert!(set.grants_any(&required));
        assert!(!set.grants_all(&required));
        assert!(set.grants_all::<&str>(&[]));
        assert!(!set.grants_any::<&str>(&[]));
    }

    #[test]
    fn wildcard_satisfies_and_is_reported() {
        let set: EffectivePermissions =
            std::iter::once(Permission::new("security.*", PermissionKind::Page)).collect();
        let by = set.satisfying("security.users.view").unwrap();
        assert_eq!(by.code.as_str(), "security.*");
        assert!(!set.grants("reports.view"));
    }
}
