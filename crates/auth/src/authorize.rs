//! Access enforcement for requests annotated with required permissions.
//!
//! The transport layer resolves the caller and the request's
//! [`PermissionRequirement`]; this module turns them into an allow/deny
//! decision. No IO happens here: effective permissions are supplied by the
//! caller of [`enforce`] (normally the engine).

use core::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use gatehouse_core::UserId;

use crate::effective::EffectivePermissions;
use crate::permissions::PermissionCode;
use crate::principal::Caller;
use crate::store::{StoreError, StoreResult};

/// Whether all or any of the required codes must be satisfied.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    #[default]
    Any,
    All,
}

impl MatchPolicy {
    pub fn from_require_all(require_all: bool) -> Self {
        if require_all { MatchPolicy::All } else { MatchPolicy::Any }
    }
}

impl fmt::Display for MatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchPolicy::Any => f.write_str("any"),
            MatchPolicy::All => f.write_str("all"),
        }
    }
}

/// Permission codes a request declares, plus the all/any policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRequirement {
    pub codes: Vec<PermissionCode>,
    #[serde(default)]
    pub policy: MatchPolicy,
}

impl PermissionRequirement {
    /// No codes: every caller, even anonymous, is allowed.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn any<I, C>(codes: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<PermissionCode>,
    {
        Self {
            codes: codes.into_iter().map(Into::into).collect(),
            policy: MatchPolicy::Any,
        }
    }

    pub fn all<I, C>(codes: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<PermissionCode>,
    {
        Self {
            codes: codes.into_iter().map(Into::into).collect(),
            policy: MatchPolicy::All,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn is_satisfied_by(&self, effective: &EffectivePermissions) -> bool {
        match self.policy {
            MatchPolicy::All => effective.grants_all(&self.codes),
            MatchPolicy::Any => effective.grants_any(&self.codes),
        }
    }

    /// Required codes not satisfied by `effective`.
    pub fn missing(&self, effective: &EffectivePermissions) -> Vec<PermissionCode> {
        self.codes
            .iter()
            .filter(|code| !effective.grants(code.as_str()))
            .cloned()
            .collect()
    }
}

/// Request-side authorization contract.
///
/// Implement this on request types that require permissions; the
/// authorization layer enforces it before dispatch.
pub trait RequiresPermissions {
    fn required_permissions(&self) -> PermissionRequirement;
}

/// Context of a denied request, for audit logs and error rendering.
///
/// Carries only the request's own requirement and which of its codes the
/// caller lacked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Denial {
    pub route: Option<String>,
    pub required: Vec<PermissionCode>,
    pub policy: MatchPolicy,
    pub missing: Vec<PermissionCode>,
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let missing: Vec<&str> = self.missing.iter().map(|c| c.as_str()).collect();
        write!(f, "missing {} of [{}]", self.policy, missing.join(", "))?;
        if let Some(route) = &self.route {
            write!(f, " on {route}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("authentication required")]
    Unauthenticated { route: Option<String> },

    #[error("forbidden: {0}")]
    Forbidden(Denial),

    /// The decision could not be made; fail the request.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Enforce `requirement` for `caller`.
///
/// - No required codes: allow, whoever the caller is.
/// - No caller: [`AuthzError::Unauthenticated`].
/// - Otherwise load the caller's effective permissions and apply the policy.
pub fn enforce<F>(
    requirement: &PermissionRequirement,
    caller: Option<&Caller>,
    route: Option<&str>,
    load_effective: F,
) -> Result<(), AuthzError>
where
    F: FnOnce(UserId) -> StoreResult<EffectivePermissions>,
{
    if requirement.is_empty() {
        return Ok(());
    }

    let Some(caller) = caller else {
        tracing::warn!(route = route.unwrap_or("-"), "unauthenticated request to guarded resource");
        return Err(AuthzError::Unauthenticated {
            route: route.map(str::to_string),
        });
    };

    let effective = load_effective(caller.user_id)?;
    if requirement.is_satisfied_by(&effective) {
        return Ok(());
    }

    let denial = Denial {
        route: route.map(str::to_string),
        required: requirement.codes.clone(),
        policy: requirement.policy,
        missing: requirement.missing(&effective),
    };
    tracing::warn!(
        user_id = %caller.user_id,
        branch_id = ?caller.branch_id,
        route = route.unwrap_or("-"),
        policy = %requirement.policy,
        missing = ?denial.missing,
        "access denied"
    );
    Err(AuthzError::Forbidden(denial))
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation (Audit Trail)
// ─────────────────────────────────────────────────────────────────────────────

/// Detailed explanation of an authorization decision.
///
/// Answers "why was this request allowed/denied?" for the caller in question.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    pub route: Option<String>,
    pub policy: MatchPolicy,
    pub granted: bool,
    pub reason: String,
    /// One entry per required code.
    pub checks: Vec<RequirementCheck>,
    /// The caller's effective codes, sorted.
    pub effective_permissions: Vec<String>,
    pub denial_reason: Option<DenialReason>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequirementCheck {
    pub required: PermissionCode,
    /// The held code that satisfied it (possibly a wildcard).
    pub satisfied_by: Option<PermissionCode>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DenialReason {
    pub kind: DenialKind,
    pub message: String,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    Unauthenticated,
    MissingPermission,
}

/// Explain the decision [`enforce`] would make.
///
/// `effective` is `None` for an anonymous caller.
pub fn explain_authorization(
    requirement: &PermissionRequirement,
    effective: Option<&EffectivePermissions>,
    route: Option<&str>,
) -> AuthorizationExplanation {
    let route_owned = route.map(str::to_string);

    if requirement.is_empty() {
        return AuthorizationExplanation {
            route: route_owned,
            policy: requirement.policy,
            granted: true,
            reason: "No permissions are required".to_string(),
            checks: Vec::new(),
            effective_permissions: effective.map(sorted_codes).unwrap_or_default(),
            denial_reason: None,
        };
    }

    let Some(effective) = effective else {
        return AuthorizationExplanation {
            route: route_owned,
            policy: requirement.policy,
            granted: false,
            reason: "No authenticated caller".to_string(),
            checks: requirement
                .codes
                .iter()
                .map(|code| RequirementCheck {
                    required: code.clone(),
                    satisfied_by: None,
                })
                .collect(),
            effective_permissions: Vec::new(),
            denial_reason: Some(DenialReason {
                kind: DenialKind::Unauthenticated,
                message: "The resource requires an authenticated caller".to_string(),
                suggestions: vec!["Authenticate and retry the request".to_string()],
            }),
        };
    };

    let checks: Vec<RequirementCheck> = requirement
        .codes
        .iter()
        .map(|code| RequirementCheck {
            required: code.clone(),
            satisfied_by: effective.satisfying(code.as_str()).map(|p| p.code.clone()),
        })
        .collect();
    let granted = requirement.is_satisfied_by(effective);

    if granted {
        let reasons: Vec<String> = checks
            .iter()
            .filter_map(|c| {
                c.satisfied_by
                    .as_ref()
                    .map(|by| format!("'{}' via '{}'", c.required, by))
            })
            .collect();
        return AuthorizationExplanation {
            route: route_owned,
            policy: requirement.policy,
            granted,
            reason: format!(
                "Caller satisfies {} of the required permissions: {}",
                requirement.policy,
                reasons.join(", ")
            ),
            checks,
            effective_permissions: sorted_codes(effective),
            denial_reason: None,
        };
    }

    let missing = requirement.missing(effective);
    let suggestions = missing
        .iter()
        .map(|code| format!("Assign a role that grants the '{}' permission", code))
        .chain(
            effective.is_empty().then(|| {
                "The caller has no effective permissions; check role assignments".to_string()
            }),
        )
        .collect();

    AuthorizationExplanation {
        route: route_owned,
        policy: requirement.policy,
        granted,
        reason: format!(
            "Caller does not satisfy {} of the required permissions",
            requirement.policy
        ),
        checks,
        effective_permissions: sorted_codes(effective),
        denial_reason: Some(DenialReason {
            kind: DenialKind::MissingPermission,
            message: format!(
                "Missing required permission(s): {}",
                missing.iter().map(|c| c.as_str()).collect::<Vec<_>>().join(", ")
            ),
            suggestions,
        }),
    }
}

fn sorted_codes(effective: &EffectivePermissions) -> Vec<String> {
    let mut codes: Vec<String> = effective.codes().map(|c| c.to_string()).collect();
    codes.sort();
    codes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::{Permission, PermissionKind};

    fn held(codes: &[&'static str]) -> EffectivePermissions {
        codes
            .iter()
            .map(|c| Permission::new(*c, PermissionKind::Action))
            .collect()
    }

    #[test]
    fn empty_requirement_allows_anonymous() {
        let result = enforce(&PermissionRequirement::none(), None, None, |_| {
            panic!("must not load permissions")
        });
        assert!(result.is_ok());
    }

    #[test]
    fn anonymous_caller_is_unauthenticated_not_forbidden() {
        let req = PermissionRequirement::any(["users.view"]);
        let err = enforce(&req, None, Some("/security/users"), |_| Ok(held(&[]))).unwrap_err();
        assert_eq!(
            err,
            AuthzError::Unauthenticated {
                route: Some("/security/users".to_string())
            }
        );
    }

    #[test]
    fn any_and_all_policies() {
        let caller = Caller::new(UserId::new());
        let codes = ["reports.view", "reports.export"];

        let any = PermissionRequirement::any(codes);
        assert!(enforce(&any, Some(&caller), None, |_| Ok(held(&["reports.view"]))).is_ok());

        let all = PermissionRequirement::all(codes);
        let err = enforce(&all, Some(&caller), Some("/reports"), |_| Ok(held(&["reports.view"])))
            .unwrap_err();
        match err {
            AuthzError::Forbidden(denial) => {
                assert_eq!(denial.policy, MatchPolicy::All);
                assert_eq!(denial.missing, vec![PermissionCode::new("reports.export")]);
                assert_eq!(denial.route.as_deref(), Some("/reports"));
                assert_eq!(denial.to_string(), "missing all of [reports.export] on /reports");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn store_failure_is_not_a_denial() {
        let caller = Caller::new(UserId::new());
        let req = PermissionRequirement::any(["reports.view"]);
        let err = enforce(&req, Some(&caller), None, |_| {
            Err(StoreError::unavailable("connection reset"))
        })
        .unwrap_err();
        assert!(matches!(err, AuthzError::Store(_)));
    }

    #[test]
    fn require_all_flag_maps_to_policy() {
        assert_eq!(MatchPolicy::from_require_all(true), MatchPolicy::All);
        assert_eq!(MatchPolicy::from_require_all(false), MatchPolicy::Any);
    }

    #[test]
    fn explanation_reports_wildcard_source() {
        let req = PermissionRequirement::all(["security.users.view"]);
        let effective = held(&["security.*", "reports.view"]);
        let explanation = explain_authorization(&req, Some(&effective), None);
        assert!(explanation.granted);
        assert_eq!(
            explanation.checks[0].satisfied_by.as_ref().map(|c| c.as_str()),
            Some("security.*")
        );
        assert_eq!(explanation.effective_permissions, vec!["reports.view", "security.*"]);
    }

    #[test]
    fn explanation_lists_missing_codes() {
        let req = PermissionRequirement::all(["a.view", "b.view"]);
        let effective = held(&["a.view"]);
        let explanation = explain_authorization(&req, Some(&effective), Some("/x"));
        assert!(!explanation.granted);
        let reason = explanation.denial_reason.unwrap();
        assert_eq!(reason.kind, DenialKind::MissingPermission);
        assert_eq!(reason.message, "Missing required permission(s): b.view");
        assert_eq!(reason.suggestions.len(), 1);
    }

    #[test]
    fn explanation_for_anonymous_caller() {
        let req = PermissionRequirement::any(["a.view"]);
        let explanation = explain_authorization(&req, None, None);
        assert!(!explanation.granted);
        assert_eq!(explanation.denial_reason.unwrap().kind, DenialKind::Unauthenticated);
    }
}
