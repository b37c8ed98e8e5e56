//! Route normalization and route → permission resolution.

use std::borrow::Cow;

use serde::Serialize;

use crate::menu::{MenuTree, RouteBinding};
use crate::permissions::{Permission, PermissionCode};
use crate::store::{MenuStore, PermissionStore, StoreResult};

/// Normalize a frontend route before resolution.
///
/// Trims whitespace, strips an `http://`/`https://` scheme and authority, cuts
/// at the first literal `?` or `#`, then percent-decodes what is left (keeping
/// the raw text if decoding fails) and leaves exactly one leading `/`. Encoded
/// delimiters such as `%3F` stay part of the path. Empty input yields `/`.
pub fn normalize_route(raw: &str) -> String {
    let mut path = raw.trim();
    if let Some(rest) = strip_scheme(path) {
        path = rest
            .find(['/', '?', '#'])
            .map(|idx| &rest[idx..])
            .unwrap_or("");
    }
    if let Some(idx) = path.find(['?', '#']) {
        path = &path[..idx];
    }

    let decoded = urlencoding::decode(path).unwrap_or(Cow::Borrowed(path));
    format!("/{}", decoded.trim_start_matches('/'))
}

fn strip_scheme(s: &str) -> Option<&str> {
    ["http://", "https://"].into_iter().find_map(|scheme| {
        let head = s.get(..scheme.len())?;
        head.eq_ignore_ascii_case(scheme).then(|| &s[scheme.len()..])
    })
}

/// Where a route's guarding permission was found.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteSource {
    /// A permission record whose own `route` matches.
    PermissionRoute,
    /// A menu item whose `route` matches and which is bound to a permission.
    MenuItem,
    /// A nested column/submenu link or descendant node of the menu tree.
    MenuTree,
}

/// A route's guarding permission and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRoute {
    pub permission: Permission,
    pub source: RouteSource,
}

/// Find the permission guarding a normalized route.
///
/// First hit wins: a permission bound directly to the route, then an active
/// menu item with that route and a bound permission, then a depth-first
/// search of the active menu tree. `Ok(None)` means the route is unknown to
/// the directory, which is not the same as denied.
pub fn resolve_permission_for_route<P, M>(
    permissions: &P,
    menu: &M,
    route: &str,
) -> StoreResult<Option<ResolvedRoute>>
where
    P: PermissionStore + ?Sized,
    M: MenuStore + ?Sized,
{
    if let Some(permission) = permissions.active_permission_by_route(route)? {
        return Ok(Some(ResolvedRoute {
            permission,
            source: RouteSource::PermissionRoute,
        }));
    }

    if let Some(item) = menu.active_menu_item_by_route(route)? {
        if let Some(permission_id) = item.permission_id {
            if let Some(permission) = permissions.permission(permission_id)? {
                return Ok(Some(ResolvedRoute {
                    permission,
                    source: RouteSource::MenuItem,
                }));
            }
        }
    }

    let tree = MenuTree::from_items(menu.active_menu_items()?);
    let permission = match tree.find_route_binding(route) {
        Some(RouteBinding::Permission(id)) => permissions.permission(id)?,
        Some(RouteBinding::Code(code)) => permissions.active_permission_by_code(code.as_str())?,
        None => None,
    };

    Ok(permission.map(|permission| ResolvedRoute {
        permission,
        source: RouteSource::MenuTree,
    }))
}

/// Outcome of a route access check.
///
/// Only `Public` and `Granted` allow access. `Unknown` (nothing guards the
/// route) is kept apart from `Denied` (guarded, caller lacks the code) and
/// `Unauthenticated` (guarded, no caller).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum RouteDecision {
    Unknown {
        route: String,
    },
    Inactive {
        route: String,
        code: PermissionCode,
    },
    Public {
        route: String,
        code: PermissionCode,
    },
    Unauthenticated {
        route: String,
        code: PermissionCode,
    },
    Granted {
        route: String,
        code: PermissionCode,
        granted_by: PermissionCode,
    },
    Denied {
        route: String,
        code: PermissionCode,
    },
}

impl RouteDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RouteDecision::Public { .. } | RouteDecision::Granted { .. })
    }

    pub fn route(&self) -> &str {
        match self {
            RouteDecision::Unknown { route }
            | RouteDecision::Inactive { route, .. }
            | RouteDecision::Public { route, .. }
            | RouteDecision::Unauthenticated { route, .. }
            | RouteDecision::Granted { route, .. }
            | RouteDecision::Denied { route, .. } => route,
        }
    }
}
