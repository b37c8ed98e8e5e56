//! Read-side store contracts the engine consumes.
//!
//! The engine never writes through these traits. Implementations must return
//! `Err` when the backing store cannot answer; returning an empty result in
//! that case would turn an outage into "no permissions" (or, for wildcard-heavy
//! roles, into a silently different decision).

use std::sync::Arc;

use thiserror::Error;

use gatehouse_core::{PermissionId, RecordStatus, RoleId, UserId};

use crate::menu::MenuItem;
use crate::permissions::Permission;
use crate::roles::{Role, RolePermission, UserRole};

/// Store failure: the engine cannot decide.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store lock poisoned: {0}")]
    LockPoisoned(&'static str),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Permission records.
pub trait PermissionStore: Send + Sync {
    /// Fetch by id regardless of status.
    fn permission(&self, id: PermissionId) -> StoreResult<Option<Permission>>;

    /// The ACTIVE permission with this code.
    fn active_permission_by_code(&self, code: &str) -> StoreResult<Option<Permission>>;

    /// The ACTIVE permission whose `route` equals `route`.
    fn active_permission_by_route(&self, route: &str) -> StoreResult<Option<Permission>>;
}

/// Roles, user accounts and the two join relations.
pub trait AssignmentStore: Send + Sync {
    /// Lifecycle status of the user's account; `None` if the user is unknown.
    fn user_status(&self, user_id: UserId) -> StoreResult<Option<RecordStatus>>;

    /// All of the user's role assignments, any status, in stored order.
    fn user_roles(&self, user_id: UserId) -> StoreResult<Vec<UserRole>>;

    /// Fetch a role by id regardless of status.
    fn role(&self, role_id: RoleId) -> StoreResult<Option<Role>>;

    /// All permission links of a role, any status, in stored order.
    fn role_permissions(&self, role_id: RoleId) -> StoreResult<Vec<RolePermission>>;
}

/// Menu tree nodes.
pub trait MenuStore: Send + Sync {
    /// Every ACTIVE menu item, ordered by `order`.
    fn active_menu_items(&self) -> StoreResult<Vec<MenuItem>>;

    /// The ACTIVE menu item whose own `route` equals `route`.
    fn active_menu_item_by_route(&self, route: &str) -> StoreResult<Option<MenuItem>>;
}

impl<S> PermissionStore for Arc<S>
where
    S: PermissionStore + ?Sized,
{
    fn permission(&self, id: PermissionId) -> StoreResult<Option<Permission>> {
        (**self).permission(id)
    }

    fn active_permission_by_code(&self, code: &str) -> StoreResult<Option<Permission>> {
        (**self).active_permission_by_code(code)
    }

    fn active_permission_by_route(&self, route: &str) -> StoreResult<Option<Permission>> {
        (**self).active_permission_by_route(route)
    }
}

impl<S> AssignmentStore for Arc<S>
where
    S: AssignmentStore + ?Sized,
{
    fn user_status(&self, user_id: UserId) -> StoreResult<Option<RecordStatus>> {
        (**self).user_status(user_id)
    }

    fn user_roles(&self, user_id: UserId) -> StoreResult<Vec<UserRole>> {
        (**self).user_roles(user_id)
    }

    fn role(&self, role_id: RoleId) -> StoreResult<Option<Role>> {
        (**self).role(role_id)
    }

    fn role_permissions(&self, role_id: RoleId) -> StoreResult<Vec<RolePermission>> {
        (**self).role_permissions(role_id)
    }
}

impl<S> MenuStore for Arc<S>
where
    S: MenuStore + ?Sized,
{
    fn active_menu_items(&self) -> StoreResult<Vec<MenuItem>> {
        (**self).active_menu_items()
    }

    fn active_menu_item_by_route(&self, route: &str) -> StoreResult<Option<MenuItem>> {
        (**self).active_menu_item_by_route(route)
    }
}
