//! Navigation menu records and the arena they are loaded into.
//!
//! A [`MenuItem`] is a node of the navigation tree. Its nested shapes are a
//! single tagged list of [`MenuEntry`] values: a `Link` is a leaf (route plus
//! optional gating permission code), a `Group` is a titled column of links.
//! Parent/child structure is held by [`MenuTree`], a flat map from
//! [`MenuId`] to node with children referenced by id.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use gatehouse_core::{Entity, Lifecycle, MenuId, PermissionId, RecordStatus};

use crate::permissions::PermissionCode;

/// Leaf link inside a menu node (a column item or a submenu entry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuLink {
    pub id: MenuId,
    pub label: String,
    #[serde(default)]
    pub route: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Denormalized code of the permission gating this link, if any.
    #[serde(default)]
    pub permission: Option<PermissionCode>,
}

impl MenuLink {
    pub fn new(id: impl Into<MenuId>, label: impl Into<String>, route: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            route: Some(route.into()),
            description: None,
            permission: None,
        }
    }

    pub fn gated_by(mut self, code: impl Into<PermissionCode>) -> Self {
        self.permission = Some(code.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Titled column of links (multi-column menus).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuGroup {
    pub title: String,
    #[serde(default)]
    pub items: Vec<MenuLink>,
}

/// Nested shape of a menu node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum MenuEntry {
    /// Flat submenu link.
    Link(MenuLink),
    /// Column of links.
    Group(MenuGroup),
}

/// A navigation tree node as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub menu_id: MenuId,
    pub label: String,
    #[serde(default)]
    pub route: Option<String>,
    /// Back-reference to the parent node, if any.
    #[serde(default)]
    pub parent: Option<MenuId>,
    #[serde(default)]
    pub permission_id: Option<PermissionId>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub status: RecordStatus,
    #[serde(default)]
    pub entries: Vec<MenuEntry>,
}

impl MenuItem {
    pub fn new(menu_id: impl Into<MenuId>, label: impl Into<String>) -> Self {
        Self {
            menu_id: menu_id.into(),
            label: label.into(),
            route: None,
            parent: None,
            permission_id: None,
            icon: None,
            description: None,
            is_public: false,
            order: 0,
            status: RecordStatus::Active,
            entries: Vec::new(),
        }
    }

    pub fn with_route(mut self, route: impl Into<String>) -> Self {
        self.route = Some(route.into());
        self
    }

    pub fn with_parent(mut self, parent: impl Into<MenuId>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn gated_by(mut self, permission_id: PermissionId) -> Self {
        self.permission_id = Some(permission_id);
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn with_status(mut self, status: RecordStatus) -> Self {
        self.status = status;
        self
    }

    pub fn public(mut self) -> Self {
        self.is_public = true;
        self
    }

    pub fn with_link(mut self, link: MenuLink) -> Self {
        self.entries.push(MenuEntry::Link(link));
        self
    }

    pub fn with_column(mut self, title: impl Into<String>, items: Vec<MenuLink>) -> Self {
        self.entries.push(MenuEntry::Group(MenuGroup {
            title: title.into(),
            items,
        }));
        self
    }

    /// Column groups, in source order.
    pub fn columns(&self) -> impl Iterator<Item = &MenuGroup> {
        self.entries.iter().filter_map(|e| match e {
            MenuEntry::Group(g) => Some(g),
            MenuEntry::Link(_) => None,
        })
    }

    /// Flat submenu links, in source order.
    pub fn submenu(&self) -> impl Iterator<Item = &MenuLink> {
        self.entries.iter().filter_map(|e| match e {
            MenuEntry::Link(l) => Some(l),
            MenuEntry::Group(_) => None,
        })
    }
}

impl Entity for MenuItem {
    type Id = MenuId;

    fn id(&self) -> &Self::Id {
        &self.menu_id
    }
}

impl Lifecycle for MenuItem {
    fn status(&self) -> RecordStatus {
        self.status
    }
}

/// What a route search found at a menu node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteBinding<'a> {
    /// A node bound to a permission record.
    Permission(PermissionId),
    /// A leaf link carrying a denormalized permission code.
    Code(&'a PermissionCode),
}

/// Arena of active menu nodes.
///
/// # Invariants
/// - Only active items are held.
/// - Roots are the items without a parent; an item whose parent is not in the
///   arena is unreachable (it is hidden together with its missing parent).
/// - Each node has at most one parent, so traversal from the roots visits
///   every reachable node exactly once and cannot loop.
/// - Roots and each child list are ordered by `order`, ties in source order.
#[derive(Debug, Clone, Default)]
pub struct MenuTree {
    nodes: HashMap<MenuId, MenuItem>,
    roots: Vec<MenuId>,
    children: HashMap<MenuId, Vec<MenuId>>,
}

impl MenuTree {
    pub fn from_items(items: impl IntoIterator<Item = MenuItem>) -> Self {
        let mut items: Vec<MenuItem> = items.into_iter().filter(|i| i.is_active()).collect();
        items.sort_by_key(|i| i.order);

        let mut tree = MenuTree::default();
        let mut ordered = Vec::with_capacity(items.len());
        for item in items {
            if tree.nodes.contains_key(&item.menu_id) {
                tracing::warn!(menu_id = %item.menu_id, "duplicate menu id; keeping first");
                continue;
            }
            ordered.push((item.menu_id.clone(), item.parent.clone()));
            tree.nodes.insert(item.menu_id.clone(), item);
        }

        for (id, parent) in ordered {
            match parent {
                None => tree.roots.push(id),
                Some(parent) if tree.nodes.contains_key(&parent) => {
                    tree.children.entry(parent).or_default().push(id);
                }
                Some(parent) => {
                    tracing::debug!(
                        menu_id = %id,
                        parent = %parent,
                        "menu item parent not active; skipping subtree"
                    );
                }
            }
        }

        tree
    }

    pub fn get(&self, id: &MenuId) -> Option<&MenuItem> {
        self.nodes.get(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every node held, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &MenuItem> {
        self.nodes.values()
    }

    /// Top-level nodes in display order.
    pub fn roots(&self) -> impl Iterator<Item = &MenuItem> {
        self.roots.iter().filter_map(|id| self.nodes.get(id))
    }

    /// Immediate children of `id` in display order.
    pub fn children(&self, id: &MenuId) -> impl Iterator<Item = &MenuItem> {
        self.children
            .get(id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.nodes.get(id))
    }

    /// Depth-first search for the first node bound to a permission whose
    /// route equals `route`.
    ///
    /// Per node the order is: the node itself, its column links, its submenu
    /// links, then its children.
    pub fn find_route_binding(&self, route: &str) -> Option<RouteBinding<'_>> {
        self.roots().find_map(|root| self.search_node(root, route))
    }

    fn search_node<'a>(&'a self, node: &'a MenuItem, route: &str) -> Option<RouteBinding<'a>> {
        if node.route.as_deref() == Some(route) {
            if let Some(id) = node.permission_id {
                return Some(RouteBinding::Permission(id));
            }
        }

        let link_binding = |link: &'a MenuLink| match (&link.route, &link.permission) {
            (Some(r), Some(code)) if r == route => Some(RouteBinding::Code(code)),
            _ => None,
        };

        if let Some(found) = node
            .columns()
            .flat_map(|g| g.items.iter())
            .find_map(link_binding)
        {
            return Some(found);
        }
        if let Some(found) = node.submenu().find_map(link_binding) {
            return Some(found);
        }

        self.children(&node.menu_id)
            .find_map(|child| self.search_node(child, route))
    }
}
