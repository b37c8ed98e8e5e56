use anyhow::{Result, anyhow, bail};
use serde_json::{Value, json};

use gatehouse_auth::{AccessEngine, Caller, MatchPolicy, PermissionRequirement, normalize_route};
use gatehouse_core::RoleId;
use gatehouse_infra::InMemoryDirectory;

use crate::Command;

/// What a subcommand printed and whether the decision allowed access.
#[derive(Debug)]
pub struct Outcome {
    pub output: Value,
    pub allowed: bool,
}

impl Outcome {
    fn allowed(output: Value) -> Self {
        Self { output, allowed: true }
    }

    fn decided(output: Value, allowed: bool) -> Self {
        Self { output, allowed }
    }
}

pub fn run(
    engine: &AccessEngine,
    directory: &InMemoryDirectory,
    command: Command,
) -> Result<Outcome> {
    match command {
        Command::Permissions { user } => {
            let effective = engine.effective_permissions(user)?;
            Ok(Outcome::allowed(serde_json::to_value(effective.into_vec())?))
        }
        Command::Check { user, all, codes } => {
            let policy = MatchPolicy::from_require_all(all);
            let granted = match policy {
                MatchPolicy::All => engine.has_all(user, &codes)?,
                MatchPolicy::Any => engine.has_any(user, &codes)?,
            };
            Ok(Outcome::decided(
                json!({ "user": user, "policy": policy, "codes": codes, "granted": granted }),
                granted,
            ))
        }
        Command::Route { user, route } => {
            let route = normalize_route(&route);
            let decision = engine.check_route(user, &route)?;
            let allowed = decision.is_allowed();
            Ok(Outcome::decided(serde_json::to_value(decision)?, allowed))
        }
        Command::Menu { user } => {
            let menu = engine.build_menu_for_user(user)?;
            Ok(Outcome::allowed(serde_json::to_value(menu)?))
        }
        Command::RoleMenu { role } => {
            let role_id = resolve_role(directory, &role)?;
            let menu = engine
                .build_menu_for_role(role_id)?
                .ok_or_else(|| anyhow!("role '{role}' is not active"))?;
            Ok(Outcome::allowed(serde_json::to_value(menu)?))
        }
        Command::Authorize { user, route, all, codes } => {
            let requirement = if all {
                PermissionRequirement::all(codes)
            } else {
                PermissionRequirement::any(codes)
            };
            let route = route.map(|r| normalize_route(&r));
            let caller = user.map(Caller::from);
            let explanation = engine.explain(caller.as_ref(), route.as_deref(), &requirement)?;
            let allowed = explanation.granted;
            Ok(Outcome::decided(serde_json::to_value(explanation)?, allowed))
        }
    }
}

/// A role given by id, or by code when exactly one role carries it.
fn resolve_role(directory: &InMemoryDirectory, role: &str) -> Result<RoleId> {
    if let Ok(id) = role.parse::<RoleId>() {
        return Ok(id);
    }
    let mut matches = directory.roles_by_code(role)?;
    match matches.len() {
        0 => bail!("no role with id or code '{role}'"),
        1 => Ok(matches.remove(0).id),
        n => bail!("role code '{role}' is ambiguous across {n} companies; pass the role id"),
    }
}
