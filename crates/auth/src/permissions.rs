//! Permission records and the code matcher.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use gatehouse_core::{Entity, Lifecycle, MenuId, PermissionId, RecordStatus};

/// Permission code (e.g. `"users.create"`, or the wildcard form `"security.*"`).
///
/// Codes are dot-segmented by convention, but matching is purely textual: see
/// [`matches`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionCode(Cow<'static, str>);

impl PermissionCode {
    pub fn new(code: impl Into<Cow<'static, str>>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.wildcard_prefix().is_some()
    }

    /// The literal prefix before the first `*`, if this is a usable wildcard.
    ///
    /// A bare `"*"` has an empty prefix and therefore grants nothing beyond an
    /// exact `"*"` requirement.
    pub fn wildcard_prefix(&self) -> Option<&str> {
        wildcard_prefix(self.as_str())
    }

    /// Whether holding this code satisfies `required`.
    pub fn grants(&self, required: &str) -> bool {
        matches(self.as_str(), required)
    }
}

impl core::fmt::Display for PermissionCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PermissionCode {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl From<&'static str> for PermissionCode {
    fn from(value: &'static str) -> Self {
        Self::new(value)
    }
}

impl From<String> for PermissionCode {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

fn wildcard_prefix(code: &str) -> Option<&str> {
    let (prefix, _) = code.split_once('*')?;
    (!prefix.is_empty()).then_some(prefix)
}

/// Decide whether a granted code satisfies a required code.
///
/// Exact equality always matches. A granted code containing `*` matches any
/// required code starting with the text before its first `*`, provided that
/// text is non-empty.
///
/// The prefix test is literal, not segment-aware: `"user*"` matches
/// `"users2.view"`.
pub fn matches(granted: &str, required: &str) -> bool {
    if granted == required {
        return true;
    }
    match wildcard_prefix(granted) {
        Some(prefix) => required.starts_with(prefix),
        None => false,
    }
}

/// Kind of permission.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PermissionKind {
    /// Access to a page/route.
    #[default]
    Page,
    /// An action inside a page (create, edit, delete, ...).
    Action,
}

/// A grantable capability.
///
/// # Invariants
/// - `code` is globally unique and immutable once referenced by a role.
/// - `is_system` permissions are protected from deletion/rename by the
///   write-side services; the engine only reads them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    pub id: PermissionId,
    pub code: PermissionCode,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: PermissionKind,
    #[serde(default)]
    pub resource: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub route: Option<String>,
    #[serde(default)]
    pub menu_id: Option<MenuId>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub status: RecordStatus,
    #[serde(default)]
    pub is_system: bool,
}

impl Permission {
    /// A private, active permission with the given code.
    pub fn new(code: impl Into<PermissionCode>, kind: PermissionKind) -> Self {
        let code = code.into();
        Self {
            id: PermissionId::new(),
            name: code.as_str().to_string(),
            code,
            kind,
            resource: None,
            action: None,
            route: None,
            menu_id: None,
            description: None,
            is_public: false,
            status: RecordStatus::Active,
            is_system: false,
        }
    }

    /// A PAGE permission guarding `route`.
    pub fn page(code: impl Into<PermissionCode>, route: impl Into<String>) -> Self {
        Self {
            route: Some(route.into()),
            ..Self::new(code, PermissionKind::Page)
        }
    }

    /// An ACTION permission with code `"{resource}.{action}"`.
    pub fn action(resource: impl Into<String>, action: impl Into<String>) -> Self {
        let resource = resource.into();
        let action = action.into();
        Self {
            resource: Some(resource.clone()),
            action: Some(action.clone()),
            ..Self::new(format!("{resource}.{action}"), PermissionKind::Action)
        }
    }

    pub fn public(mut self) -> Self {
        self.is_public = true;
        self
    }

    pub fn with_id(mut self, id: PermissionId) -> Self {
        self.id = id;
        self
    }

    pub fn with_status(mut self, status: RecordStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_menu_id(mut self, menu_id: impl Into<MenuId>) -> Self {
        self.menu_id = Some(menu_id.into());
        self
    }
}

impl Entity for Permission {
    type Id = PermissionId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Lifecycle for Permission {
    fn status(&self) -> RecordStatus {
        self.status
    }
}
