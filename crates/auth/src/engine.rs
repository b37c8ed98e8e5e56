//! Access engine: the in-process entry point used by the request
//! authorization layer and the navigation endpoint.

use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use gatehouse_core::{Lifecycle, RoleId, UserId};

use crate::authorize::{
    AuthorizationExplanation, AuthzError, PermissionRequirement, RequiresPermissions, enforce,
    explain_authorization,
};
use crate::cache::PermissionCache;
use crate::effective::{self, EffectivePermissions};
use crate::menu::MenuTree;
use crate::navigation::{UserMenu, filter_menu, load_node_gates};
use crate::principal::Caller;
use crate::route::{self, ResolvedRoute, RouteDecision};
use crate::store::{AssignmentStore, MenuStore, PermissionStore, StoreResult};

/// Read-only authorization engine over the three directory stores.
///
/// Holds no mutable state of its own apart from the optional permission
/// cache; every decision reads the stores afresh, so concurrent use across
/// requests needs no coordination.
pub struct AccessEngine {
    permissions: Arc<dyn PermissionStore>,
    assignments: Arc<dyn AssignmentStore>,
    menu: Arc<dyn MenuStore>,
    cache: Option<PermissionCache>,
}

impl AccessEngine {
    pub fn new(
        permissions: Arc<dyn PermissionStore>,
        assignments: Arc<dyn AssignmentStore>,
        menu: Arc<dyn MenuStore>,
    ) -> Self {
        Self {
            permissions,
            assignments,
            menu,
            cache: None,
        }
    }

    /// Build an engine over a single store implementing all three contracts.
    pub fn from_directory<D>(directory: Arc<D>) -> Self
    where
        D: PermissionStore + AssignmentStore + MenuStore + 'static,
    {
        Self::new(directory.clone(), directory.clone(), directory)
    }

    /// Cache effective permission sets for `ttl`.
    ///
    /// Callers that mutate roles, permissions or assignments must then call
    /// [`AccessEngine::invalidate_user`] / [`AccessEngine::invalidate_all`].
    pub fn with_permission_cache(mut self, ttl: std::time::Duration) -> Self {
        self.cache = Some(PermissionCache::new(ttl));
        self
    }

    pub fn invalidate_user(&self, user_id: UserId) {
        if let Some(cache) = &self.cache {
            cache.invalidate_user(user_id);
        }
    }

    pub fn invalidate_all(&self) {
        if let Some(cache) = &self.cache {
            cache.invalidate_all();
        }
    }

    // ── Aggregation ─────────────────────────────────────────────────────────

    /// The user's effective permission set (empty for unknown users).
    pub fn effective_permissions(&self, user_id: UserId) -> StoreResult<EffectivePermissions> {
        if let Some(cache) = &self.cache {
            let now = Utc::now();
            if let Some(hit) = cache.get(user_id, now) {
                return Ok(hit);
            }
            let generation = cache.generation();
            let computed =
                effective::effective_permissions(&*self.assignments, &*self.permissions, user_id)?;
            cache.insert(user_id, computed.clone(), now, generation);
            return Ok(computed);
        }
        effective::effective_permissions(&*self.assignments, &*self.permissions, user_id)
    }

    /// Active permissions of one role (empty if the role is unknown or inactive).
    pub fn role_permissions(&self, role_id: RoleId) -> StoreResult<EffectivePermissions> {
        effective::role_permissions(&*self.assignments, &*self.permissions, role_id)
    }

    // ── Point checks ────────────────────────────────────────────────────────

    pub fn has_permission(&self, user_id: UserId, code: &str) -> StoreResult<bool> {
        Ok(self.effective_permissions(user_id)?.grants(code))
    }

    pub fn has_any<S: AsRef<str>>(&self, user_id: UserId, codes: &[S]) -> StoreResult<bool> {
        Ok(self.effective_permissions(user_id)?.grants_any(codes))
    }

    pub fn has_all<S: AsRef<str>>(&self, user_id: UserId, codes: &[S]) -> StoreResult<bool> {
        Ok(self.effective_permissions(user_id)?.grants_all(codes))
    }

    /// Whether the user may perform `action` on `resource` (code `resource.action`).
    pub fn can_execute_action(
        &self,
        user_id: UserId,
        resource: &str,
        action: &str,
    ) -> StoreResult<bool> {
        self.has_permission(user_id, &format!("{resource}.{action}"))
    }

    // ── Routes ──────────────────────────────────────────────────────────────

    /// The permission guarding an already-normalized route, if any.
    pub fn resolve_permission_for_route(&self, route: &str) -> StoreResult<Option<ResolvedRoute>> {
        route::resolve_permission_for_route(&*self.permissions, &*self.menu, route)
    }

    /// Decide access to an already-normalized route (see
    /// [`route::normalize_route`]).
    #[instrument(skip(self), err)]
    pub fn check_route(&self, user_id: Option<UserId>, route: &str) -> StoreResult<RouteDecision> {
        let route_owned = route.to_string();
        let Some(resolved) = self.resolve_permission_for_route(route)? else {
            tracing::debug!("route not guarded by any known permission");
            return Ok(RouteDecision::Unknown { route: route_owned });
        };

        let permission = resolved.permission;
        let code = permission.code.clone();
        tracing::debug!(code = %code, source = ?resolved.source, "route resolved");

        if !permission.is_active() {
            return Ok(RouteDecision::Inactive { route: route_owned, code });
        }
        if permission.is_public {
            return Ok(RouteDecision::Public { route: route_owned, code });
        }
        let Some(user_id) = user_id else {
            return Ok(RouteDecision::Unauthenticated { route: route_owned, code });
        };

        let effective = self.effective_permissions(user_id)?;
        match effective.satisfying(code.as_str()) {
            Some(held) => Ok(RouteDecision::Granted {
                route: route_owned,
                granted_by: held.code.clone(),
                code,
            }),
            None => {
                tracing::warn!(%user_id, route, code = %code, "route access denied");
                Ok(RouteDecision::Denied { route: route_owned, code })
            }
        }
    }

    pub fn can_access_route(&self, user_id: Option<UserId>, route: &str) -> StoreResult<bool> {
        Ok(self.check_route(user_id, route)?.is_allowed())
    }

    // ── Navigation ──────────────────────────────────────────────────────────

    /// The private menu the user may see.
    #[instrument(skip(self), err)]
    pub fn build_menu_for_user(&self, user_id: UserId) -> StoreResult<UserMenu> {
        let effective = self.effective_permissions(user_id)?;
        if effective.is_empty() {
            tracing::info!(%user_id, "user has no effective permissions; returning empty menu");
            return Ok(UserMenu::no_permissions());
        }
        self.menu_for(&effective)
    }

    /// The private menu a role grants; `None` if the role is unknown or not
    /// active.
    #[instrument(skip(self), err)]
    pub fn build_menu_for_role(&self, role_id: RoleId) -> StoreResult<Option<UserMenu>> {
        let Some(role) = effective::active_role(&*self.assignments, role_id)? else {
            return Ok(None);
        };
        let granted = self.role_permissions(role.id)?;
        if granted.is_empty() {
            tracing::info!(
                role = %role.code,
                "role has no active permissions; returning empty menu"
            );
            return Ok(Some(UserMenu::no_permissions()));
        }
        self.menu_for(&granted).map(Some)
    }

    fn menu_for(&self, effective: &EffectivePermissions) -> StoreResult<UserMenu> {
        let tree = MenuTree::from_items(self.menu.active_menu_items()?);
        let gates = load_node_gates(&*self.permissions, &tree)?;
        let menu = filter_menu(&tree, &gates, effective);
        tracing::debug!(nodes = tree.len(), visible = menu.len(), "menu filtered");
        Ok(UserMenu {
            menu,
            has_no_permissions: false,
        })
    }

    // ── Enforcement ─────────────────────────────────────────────────────────

    /// Enforce a request's declared requirement.
    pub fn authorize(
        &self,
        caller: Option<&Caller>,
        route: Option<&str>,
        requirement: &PermissionRequirement,
    ) -> Result<(), AuthzError> {
        enforce(requirement, caller, route, |user_id| self.effective_permissions(user_id))
    }

    /// Enforce the requirement a request type declares for itself.
    pub fn authorize_request<R: RequiresPermissions>(
        &self,
        caller: Option<&Caller>,
        route: Option<&str>,
        request: &R,
    ) -> Result<(), AuthzError> {
        self.authorize(caller, route, &request.required_permissions())
    }

    /// Explain the decision [`AccessEngine::authorize`] would make.
    pub fn explain(
        &self,
        caller: Option<&Caller>,
        route: Option<&str>,
        requirement: &PermissionRequirement,
    ) -> StoreResult<AuthorizationExplanation> {
        let effective = match caller {
            Some(caller) if !requirement.is_empty() => {
                Some(self.effective_permissions(caller.user_id)?)
            }
            _ => None,
        };
        Ok(explain_authorization(requirement, effective.as_ref(), route))
    }
}

impl core::fmt::Debug for AccessEngine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AccessEngine")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatehouse_core::{PermissionId, RecordStatus};

    use crate::menu::MenuItem;
    use crate::permissions::Permission;
    use crate::roles::{Role, RolePermission, UserRole};
    use crate::store::StoreError;

    /// A directory whose backend is down.
    struct Offline;

    impl PermissionStore for Offline {
        fn permission(&self, _: PermissionId) -> StoreResult<Option<Permission>> {
            Err(StoreError::unavailable("offline"))
        }
        fn active_permission_by_code(&self, _: &str) -> StoreResult<Option<Permission>> {
            Err(StoreError::unavailable("offline"))
        }
        fn active_permission_by_route(&self, _: &str) -> StoreResult<Option<Permission>> {
            Err(StoreError::unavailable("offline"))
        }
    }

    impl AssignmentStore for Offline {
        fn user_status(&self, _: UserId) -> StoreResult<Option<RecordStatus>> {
            Err(StoreError::unavailable("offline"))
        }
        fn user_roles(&self, _: UserId) -> StoreResult<Vec<UserRole>> {
            Err(StoreError::unavailable("offline"))
        }
        fn role(&self, _: RoleId) -> StoreResult<Option<Role>> {
            Err(StoreError::unavailable("offline"))
        }
        fn role_permissions(&self, _: RoleId) -> StoreResult<Vec<RolePermission>> {
            Err(StoreError::unavailable("offline"))
        }
    }

    impl MenuStore for Offline {
        fn active_menu_items(&self) -> StoreResult<Vec<MenuItem>> {
            Err(StoreError::unavailable("offline"))
        }
        fn active_menu_item_by_route(&self, _: &str) -> StoreResult<Option<MenuItem>> {
            Err(StoreError::unavailable("offline"))
        }
    }

    /// A reachable but empty directory.
    struct Empty;

    impl PermissionStore for Empty {
        fn permission(&self, _: PermissionId) -> StoreResult<Option<Permission>> {
            Ok(None)
        }
        fn active_permission_by_code(&self, _: &str) -> StoreResult<Option<Permission>> {
            Ok(None)
        }
        fn active_permission_by_route(&self, _: &str) -> StoreResult<Option<Permission>> {
            Ok(None)
        }
    }

    impl AssignmentStore for Empty {
        fn user_status(&self, _: UserId) -> StoreResult<Option<RecordStatus>> {
            Ok(None)
        }
        fn user_roles(&self, _: UserId) -> StoreResult<Vec<UserRole>> {
            Ok(Vec::new())
        }
        fn role(&self, _: RoleId) -> StoreResult<Option<Role>> {
            Ok(None)
        }
        fn role_permissions(&self, _: RoleId) -> StoreResult<Vec<RolePermission>> {
            Ok(Vec::new())
        }
    }

    impl MenuStore for Empty {
        fn active_menu_items(&self) -> StoreResult<Vec<MenuItem>> {
            Ok(Vec::new())
        }
        fn active_menu_item_by_route(&self, _: &str) -> StoreResult<Option<MenuItem>> {
            Ok(None)
        }
    }

    #[test]
    fn store_failures_are_not_denials() {
        let engine = AccessEngine::from_directory(Arc::new(Offline));
        let user = UserId::new();

        assert!(engine.check_route(Some(user), "/reports").is_err());
        assert!(engine.build_menu_for_user(user).is_err());
        assert!(engine.has_permission(user, "reports.view").is_err());

        let err = engine
            .authorize(
                Some(&Caller::new(user)),
                Some("/reports"),
                &PermissionRequirement::any(["reports.view"]),
            )
            .unwrap_err();
        assert!(matches!(err, AuthzError::Store(_)));
    }

    #[test]
    fn empty_requirement_never_touches_the_store() {
        let engine = AccessEngine::from_directory(Arc::new(Offline));
        assert!(engine.authorize(None, None, &PermissionRequirement::none()).is_ok());
    }

    #[test]
    fn empty_directory_yields_unknown_route_and_empty_menu() {
        let engine = AccessEngine::from_directory(Arc::new(Empty));
        let user = UserId::new();

        let decision = engine.check_route(Some(user), "/nowhere").unwrap();
        assert_eq!(decision, RouteDecision::Unknown { route: "/nowhere".into() });
        assert!(!decision.is_allowed());

        let menu = engine.build_menu_for_user(user).unwrap();
        assert!(menu.has_no_permissions);
        assert!(menu.menu.is_empty());

        assert_eq!(engine.build_menu_for_role(RoleId::new()).unwrap(), None);
    }

    #[test]
    fn unknown_caller_is_forbidden_not_unauthenticated() {
        let engine = AccessEngine::from_directory(Arc::new(Empty));
        let err = engine
            .authorize(
                Some(&Caller::new(UserId::new())),
                None,
                &PermissionRequirement::all(["a.b"]),
            )
            .unwrap_err();
        assert!(matches!(err, AuthzError::Forbidden(_)));

        let err = engine.authorize(None, None, &PermissionRequirement::all(["a.b"])).unwrap_err();
        assert!(matches!(err, AuthzError::Unauthenticated { .. }));
    }
}
