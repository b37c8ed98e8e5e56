//! Permission-filtered navigation menu.
//!
//! Public nodes never appear here: the presentation layer lists those itself.
//! A private node without a bound permission is shown to every authenticated
//! user; a node bound to a permission is shown only when the permission is
//! ACTIVE and its code is satisfied by the subject's effective set.

use std::collections::HashMap;

use serde::Serialize;

use gatehouse_core::{Lifecycle, MenuId, PermissionId};

use crate::effective::EffectivePermissions;
use crate::menu::{MenuItem, MenuLink, MenuTree};
use crate::permissions::Permission;
use crate::store::{PermissionStore, StoreResult};

/// Filtered menu plus the "no permissions" signal.
///
/// `has_no_permissions` is set exactly when the subject's effective set is
/// empty, so callers can tell a misconfigured account from a legitimately
/// small menu.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserMenu {
    pub menu: Vec<MenuNode>,
    pub has_no_permissions: bool,
}

impl UserMenu {
    pub fn no_permissions() -> Self {
        Self {
            menu: Vec::new(),
            has_no_permissions: true,
        }
    }
}

/// A visible top-level menu node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuNode {
    pub id: MenuId,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<MenuColumn>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub submenu: Vec<MenuLinkView>,
}

/// A column that kept at least one visible link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuColumn {
    pub title: String,
    pub items: Vec<MenuLinkView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuLinkView {
    pub id: MenuId,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl From<&MenuLink> for MenuLinkView {
    fn from(link: &MenuLink) -> Self {
        Self {
            id: link.id.clone(),
            label: link.label.clone(),
            route: link.route.clone(),
            description: link.description.clone(),
        }
    }
}

/// Permissions bound to menu nodes, keyed by id.
pub type NodeGates = HashMap<PermissionId, Permission>;

/// Load every permission referenced by a node of `tree`.
///
/// Ids that resolve to nothing are left out; a node bound to a missing
/// permission is then hidden.
pub fn load_node_gates<P>(permissions: &P, tree: &MenuTree) -> StoreResult<NodeGates>
where
    P: PermissionStore + ?Sized,
{
    let mut gates = NodeGates::new();
    for id in tree.iter().filter_map(|item| item.permission_id) {
        if gates.contains_key(&id) {
            continue;
        }
        if let Some(permission) = permissions.permission(id)? {
            gates.insert(id, permission);
        }
    }
    Ok(gates)
}

/// Prune `tree` to what `effective` may see.
pub fn filter_menu(
    tree: &MenuTree,
    gates: &NodeGates,
    effective: &EffectivePermissions,
) -> Vec<MenuNode> {
    let filter = MenuFilter {
        tree,
        gates,
        effective,
    };
    tree.roots()
        .filter(|item| filter.node_visible(item))
        .map(|item| filter.render(item))
        .collect()
}

struct MenuFilter<'a> {
    tree: &'a MenuTree,
    gates: &'a NodeGates,
    effective: &'a EffectivePermissions,
}

impl MenuFilter<'_> {
    fn node_visible(&self, item: &MenuItem) -> bool {
        if item.is_public {
            return false;
        }
        let Some(permission_id) = item.permission_id else {
            return true;
        };
        match self.gates.get(&permission_id) {
            Some(permission) if permission.is_active() => {
                self.effective.grants(permission.code.as_str())
            }
            _ => false,
        }
    }

    fn link_visible(&self, link: &MenuLink) -> bool {
        link.permission
            .as_ref()
            .is_none_or(|code| self.effective.grants(code.as_str()))
    }

    fn render(&self, item: &MenuItem) -> MenuNode {
        let columns = item
            .columns()
            .filter_map(|group| {
                let items: Vec<MenuLinkView> = group
                    .items
                    .iter()
                    .filter(|link| self.link_visible(link))
                    .map(MenuLinkView::from)
                    .collect();
                (!items.is_empty()).then(|| MenuColumn {
                    title: group.title.clone(),
                    items,
                })
            })
            .collect();

        // Visible children are projected into the submenu and replace the
        // node's own submenu links. Deeper descendants are not projected.
        let children: Vec<MenuLinkView> = self
            .tree
            .children(&item.menu_id)
            .filter(|child| self.node_visible(child))
            .map(|child| MenuLinkView {
                id: child.menu_id.clone(),
                label: child.label.clone(),
                route: child.route.clone(),
                description: child.description.clone(),
            })
            .collect();

        let submenu = if children.is_empty() {
            item.submenu()
                .filter(|link| self.link_visible(link))
                .map(MenuLinkView::from)
                .collect()
        } else {
            children
        };

        MenuNode {
            id: item.menu_id.clone(),
            label: item.label.clone(),
            route: item.route.clone(),
            icon: item.icon.clone(),
            columns,
            submenu,
        }
    }
}
