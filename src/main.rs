//! CLI entry point for `redgrant`.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use redgrant::catalog::memory::MemoryCatalog;
use redgrant::catalog::Warehouse;
use redgrant::generator::names::normalize_identifier;
use redgrant::generator::statement::format_plan;
use redgrant::model::{Principal, PrincipalKind};
use redgrant::output::{formatter, report};
use redgrant::reconcile::ReconciliationContext;
use redgrant::request::form::{parse_submission, SubmissionKeys};
use redgrant::request::DesiredState;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser)]
#[command(
    name = "redgrant",
    about = "Reconcile Redshift privileges, memberships, and user attributes against a desired state"
)]
struct Cli {
    /// Principal to reconcile
    #[arg(long)]
    principal: String,

    /// Kind of principal: user, group, or role
    #[arg(long, default_value = "user")]
    kind: PrincipalKind,

    /// Desired state as a flat JSON form submission
    #[arg(long)]
    desired: PathBuf,

    /// Offline catalog snapshot (JSON)
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Live warehouse connection URL
    #[cfg(feature = "postgres")]
    #[arg(long, env = "REDGRANT_DATABASE_URL", conflicts_with = "snapshot")]
    db_url: Option<String>,

    /// Per-statement timeout against a live warehouse, in seconds
    #[cfg(feature = "postgres")]
    #[arg(long, default_value_t = 30)]
    statement_timeout: u64,

    /// Submission field holding group names
    #[arg(long, default_value = "groups")]
    groups_key: String,

    /// Submission field holding role names
    #[arg(long, default_value = "roles")]
    roles_key: String,

    /// Submission field holding user names
    #[arg(long, default_value = "users")]
    users_key: String,

    /// Output directory
    #[arg(long, default_value = "redgrant-output")]
    output_dir: PathBuf,

    /// Load every schema inventory before resolving object kinds
    #[arg(long)]
    preload_inventory: bool,

    /// Print the statements that would run without executing them
    #[arg(long)]
    dry_run: bool,

    /// Write the offline catalog back after the pass
    #[arg(long, requires = "snapshot")]
    write_snapshot: Option<PathBuf>,

    /// Print the pass result as JSON instead of a summary line
    #[arg(long)]
    json: bool,

    /// Print verbose diagnostics
    #[arg(long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .with_filter(filter),
        )
        .init();
}

fn load_desired(cli: &Cli) -> Result<DesiredState, String> {
    let body = std::fs::read_to_string(&cli.desired)
        .map_err(|e| format!("Error reading {}: {e}", cli.desired.display()))?;
    let json: serde_json::Value =
        serde_json::from_str(&body).map_err(|e| format!("Invalid desired state JSON: {e}"))?;
    let keys = SubmissionKeys {
        groups: cli.groups_key.clone(),
        roles: cli.roles_key.clone(),
        users: cli.users_key.clone(),
    };
    parse_submission(&json, &keys).map_err(|e| format!("Invalid desired state: {e}"))
}

/// Exit code of a pass and whether it ran statements against the warehouse.
struct PassOutcome {
    code: i32,
    applied: bool,
}

impl PassOutcome {
    fn aborted() -> Self {
        Self {
            code: 2,
            applied: false,
        }
    }
}

/// Run one pass and report how the process should exit.
fn run_pass<W: Warehouse + ?Sized>(
    cli: &Cli,
    warehouse: &mut W,
    principal: &Principal,
    desired: &DesiredState,
) -> PassOutcome {
    let mut context = ReconciliationContext::new(warehouse);
    if cli.preload_inventory {
        if let Err(e) = context.preload_inventory() {
            eprintln!("Error loading schema inventories: {e}");
            return PassOutcome::aborted();
        }
    }

    if cli.dry_run {
        return match context.plan(principal, desired) {
            Ok(statements) => {
                if !statements.is_empty() {
                    println!("{}", format_plan(&statements));
                }
                PassOutcome {
                    code: 0,
                    applied: false,
                }
            }
            Err(e) => {
                eprintln!("Reconciliation aborted: {e}");
                PassOutcome::aborted()
            }
        };
    }

    let result = match context.reconcile(principal, desired) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Reconciliation aborted: {e}");
            return PassOutcome::aborted();
        }
    };
    let applied = !result.executed.is_empty() || !result.failed.is_empty();

    if cli.json {
        match serde_json::to_string_pretty(&result) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error encoding result: {e}");
                return PassOutcome { code: 2, applied };
            }
        }
    } else {
        let summary = report::summarize(&result);
        println!("{}: {}", summary.level, summary.message);
    }

    if let Err(e) = formatter::write_output(&cli.output_dir, &principal.name, principal, &result) {
        eprintln!("Error writing output: {e}");
        return PassOutcome { code: 2, applied };
    }

    let code = if result.has_failures() { 1 } else { 0 };
    PassOutcome { code, applied }
}

/// Run against a live warehouse when `--db-url` is set.
#[cfg(feature = "postgres")]
fn run_live(cli: &Cli, principal: &Principal, desired: &DesiredState) -> Option<i32> {
    let url = cli.db_url.as_deref()?;
    let timeout = std::time::Duration::from_secs(cli.statement_timeout);
    match redgrant::catalog::postgres::PgCatalog::connect(url, timeout) {
        Ok(mut warehouse) => Some(run_pass(cli, &mut warehouse, principal, desired).code),
        Err(e) => {
            eprintln!("{e}");
            Some(2)
        }
    }
}

#[cfg(not(feature = "postgres"))]
fn run_live(_cli: &Cli, _principal: &Principal, _desired: &DesiredState) -> Option<i32> {
    None
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let principal = Principal {
        name: normalize_identifier(&cli.principal),
        kind: cli.kind,
    };
    if principal.name.is_empty() {
        eprintln!("Principal name must not be empty");
        process::exit(2);
    }
    if !cli.dry_run {
        if let Err(e) = formatter::validate_output_name(&principal.name) {
            eprintln!("{e}");
            process::exit(2);
        }
    }

    let desired = match load_desired(&cli) {
        Ok(desired) => desired,
        Err(e) => {
            eprintln!("{e}");
            process::exit(2);
        }
    };

    if let Some(code) = run_live(&cli, &principal, &desired) {
        process::exit(code);
    }

    let Some(snapshot_path) = &cli.snapshot else {
        eprintln!("No catalog source: pass --snapshot or, with the postgres feature, --db-url");
        process::exit(2);
    };
    let mut catalog = match std::fs::read_to_string(snapshot_path)
        .map_err(|e| format!("Error reading {}: {e}", snapshot_path.display()))
        .and_then(|json| MemoryCatalog::from_json(&json).map_err(|e| e.to_string()))
    {
        Ok(catalog) => catalog,
        Err(e) => {
            eprintln!("{e}");
            process::exit(2);
        }
    };

    let outcome = run_pass(&cli, &mut catalog, &principal, &desired);

    if outcome.applied || (outcome.code != 2 && !cli.dry_run) {
        if let Some(path) = &cli.write_snapshot {
            let written = catalog
                .to_json()
                .map_err(|e| e.to_string())
                .and_then(|json| std::fs::write(path, json).map_err(|e| e.to_string()));
            if let Err(e) = written {
                eprintln!("Error writing snapshot {}: {e}", path.display());
                process::exit(2);
            }
        }
    }

    process::exit(outcome.code);
}
