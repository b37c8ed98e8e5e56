//! `gatehouse-auth` — authorization & access-resolution engine.
//!
//! This crate is intentionally decoupled from HTTP and storage: it reads the
//! directory through the traits in [`store`] and returns decisions.

pub mod authorize;
pub mod cache;
pub mod effective;
pub mod engine;
pub mod menu;
pub mod navigation;
pub mod permissions;
pub mod principal;
pub mod roles;
pub mod route;
pub mod store;

pub use authorize::{
    AuthorizationExplanation, AuthzError, Denial, MatchPolicy, PermissionRequirement,
    RequiresPermissions, enforce, explain_authorization,
};
pub use cache::PermissionCache;
pub use effective::EffectivePermissions;
pub use engine::AccessEngine;
pub use menu::{MenuEntry, MenuGroup, MenuItem, MenuLink, MenuTree};
pub use navigation::{MenuColumn, MenuLinkView, MenuNode, UserMenu};
pub use permissions::{Permission, PermissionCode, PermissionKind, matches};
pub use principal::Caller;
pub use roles::{Role, RolePermission, UserRole};
pub use route::{ResolvedRoute, RouteDecision, RouteSource, normalize_route};
pub use store::{AssignmentStore, MenuStore, PermissionStore, StoreError, StoreResult};
