//! `gatehouse`: evaluate authorization decisions against a directory snapshot.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use gatehouse_auth::AccessEngine;
use gatehouse_core::UserId;
use gatehouse_infra::{DirectorySnapshot, GatehouseConfig, InMemoryDirectory};
use gatehouse_observability::LogFormat;

mod commands;

#[derive(Debug, Parser)]
#[command(
    name = "gatehouse",
    version,
    about = "Resolve permissions, route access and menus from a directory snapshot",
    long_about = None
)]
struct Cli {
    /// Directory snapshot (JSON). Overrides GATEHOUSE_SNAPSHOT.
    #[arg(long, global = true, value_name = "PATH")]
    snapshot: Option<PathBuf>,

    /// Cache effective permissions for this many seconds (0 disables).
    /// Overrides GATEHOUSE_PERMISSION_CACHE_TTL_SECS.
    #[arg(long, global = true, value_name = "SECS")]
    cache_ttl: Option<u64>,

    /// Log output format. Overrides GATEHOUSE_LOG_FORMAT.
    #[arg(long, global = true, value_name = "FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List a user's effective permissions.
    Permissions {
        #[arg(long)]
        user: UserId,
    },
    /// Check whether a user holds permission codes.
    Check {
        #[arg(long)]
        user: UserId,
        /// Require every code instead of any one.
        #[arg(long)]
        all: bool,
        #[arg(required = true, value_name = "CODE")]
        codes: Vec<String>,
    },
    /// Decide access to a route (normalized first).
    Route {
        /// Omit for an anonymous caller.
        #[arg(long)]
        user: Option<UserId>,
        route: String,
    },
    /// Build the menu a user may see.
    Menu {
        #[arg(long)]
        user: UserId,
    },
    /// Build the menu a role grants (role id or code).
    RoleMenu {
        #[arg(long)]
        role: String,
    },
    /// Enforce a permission requirement and explain the decision.
    Authorize {
        /// Omit for an anonymous caller.
        #[arg(long)]
        user: Option<UserId>,
        #[arg(long)]
        route: Option<String>,
        /// Require every code instead of any one.
        #[arg(long)]
        all: bool,
        #[arg(value_name = "CODE")]
        codes: Vec<String>,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let mut config = GatehouseConfig::from_env().context("invalid environment configuration")?;
    if let Some(path) = cli.snapshot.clone() {
        config.snapshot_path = Some(path);
    }
    if let Some(secs) = cli.cache_ttl {
        config.permission_cache_ttl = (secs > 0).then(|| std::time::Duration::from_secs(secs));
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }

    gatehouse_observability::init_with(config.log_format);

    let directory = Arc::new(load_directory(&config)?);
    let mut engine = AccessEngine::from_directory(directory.clone());
    if let Some(ttl) = config.permission_cache_ttl {
        engine = engine.with_permission_cache(ttl);
    }

    let outcome = commands::run(&engine, &directory, cli.command)?;
    println!("{}", serde_json::to_string_pretty(&outcome.output)?);
    Ok(if outcome.allowed {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    })
}

fn load_directory(config: &GatehouseConfig) -> Result<InMemoryDirectory> {
    let Some(path) = &config.snapshot_path else {
        tracing::warn!("no snapshot configured; starting from an empty directory");
        return Ok(InMemoryDirectory::new());
    };
    let snapshot = DirectorySnapshot::from_path(path)
        .with_context(|| format!("loading snapshot {}", path.display()))?;
    Ok(snapshot.into_directory()?)
}
