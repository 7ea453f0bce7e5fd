//! CLI subcommands — init, validate, plan, apply.

use crate::core::{executor, parser, planner, resolver, types};
use crate::pkg::{Provider, ShellBackend};
use clap::Subcommand;
use std::path::{Path, PathBuf};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a directory with a starter policy document
    Init {
        /// Directory to initialize (default: current)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Validate a policy document without touching the package database
    Validate {
        /// Path to the policy document
        #[arg(short, long, default_value = "policy.sls")]
        file: PathBuf,
    },

    /// Show what an apply would do (queries live state, changes nothing)
    Plan {
        /// Path to the policy document
        #[arg(short, long, default_value = "policy.sls")]
        file: PathBuf,

        /// Package provider (zypper, apt)
        #[arg(long, default_value = "zypper")]
        provider: String,

        /// Treat require edges as conditional gates on pre-run state
        #[arg(long)]
        gate: bool,
    },

    /// Converge the system to the policy's dispositions
    Apply {
        /// Path to the policy document
        #[arg(short, long, default_value = "policy.sls")]
        file: PathBuf,

        /// Package provider (zypper, apt)
        #[arg(long, default_value = "zypper")]
        provider: String,

        /// Treat require edges as conditional gates on pre-run state
        #[arg(long)]
        gate: bool,

        /// Plan only — perform no package operations
        #[arg(long)]
        dry_run: bool,

        /// Directory for the run event log
        #[arg(long, default_value = "state")]
        state_dir: PathBuf,

        /// Disable the JSONL event log
        #[arg(long)]
        no_trace: bool,
    },
}

/// Dispatch a CLI command.
pub fn dispatch(cmd: Commands) -> Result<(), String> {
    match cmd {
        Commands::Init { path } => cmd_init(&path),
        Commands::Validate { file } => cmd_validate(&file),
        Commands::Plan {
            file,
            provider,
            gate,
        } => cmd_plan(&file, &provider, gate),
        Commands::Apply {
            file,
            provider,
            gate,
            dry_run,
            state_dir,
            no_trace,
        } => cmd_apply(&file, &provider, gate, dry_run, &state_dir, no_trace),
    }
}

const STARTER_POLICY: &str = "\
# Managed package dispositions.
example-package:
  pkg.installed:
    - retry:
        attempts: 3
        interval: 15
";

fn cmd_init(path: &Path) -> Result<(), String> {
    let policy_path = path.join("policy.sls");
    if policy_path.exists() {
        return Err(format!("{} already exists", policy_path.display()));
    }

    let state_dir = path.join("state");
    std::fs::create_dir_all(&state_dir)
        .map_err(|e| format!("cannot create state dir: {}", e))?;
    std::fs::write(&policy_path, STARTER_POLICY)
        .map_err(|e| format!("cannot write {}: {}", policy_path.display(), e))?;

    println!("Initialized policy project at {}", path.display());
    println!("  Created: {}", policy_path.display());
    println!("  Created: {}/", state_dir.display());
    Ok(())
}

fn cmd_validate(file: &Path) -> Result<(), String> {
    let (policy, _) = parse_and_validate(file)?;
    println!("OK: {} ({} declarations)", file.display(), policy.len());
    Ok(())
}

/// Parse and validate a policy file, returning the document and its raw text.
fn parse_and_validate(file: &Path) -> Result<(types::PolicyDoc, String), String> {
    let text = std::fs::read_to_string(file)
        .map_err(|e| format!("failed to read {}: {}", file.display(), e))?;
    let policy = parser::parse_policy(&text)?;
    let errors = parser::validate_policy(&policy);
    if errors.is_empty() {
        return Ok((policy, text));
    }
    for e in &errors {
        eprintln!("  ERROR: {}", e);
    }
    Err(format!("{} validation error(s)", errors.len()))
}

fn backend_for(provider: &str) -> Result<ShellBackend, String> {
    Ok(ShellBackend::new(Provider::from_name(provider)?))
}

fn require_mode(gate: bool) -> types::RequireMode {
    if gate {
        types::RequireMode::Gate
    } else {
        types::RequireMode::Ordering
    }
}

fn cmd_plan(file: &Path, provider: &str, gate: bool) -> Result<(), String> {
    let (policy, _) = parse_and_validate(file)?;
    let backend = backend_for(provider)?;
    let order = resolver::execution_order(&policy)?;
    let snapshot = planner::take_snapshot(&policy, &backend)?;
    let plan = planner::plan(&policy, &order, &snapshot, require_mode(gate));

    print_plan(file, &plan);
    Ok(())
}

/// Display a plan to stdout.
fn print_plan(file: &Path, plan: &types::ExecutionPlan) {
    println!(
        "Planning: {} ({} declarations)",
        file.display(),
        plan.steps.len()
    );
    println!();
    for step in &plan.steps {
        println!("  {} {}", plan_symbol(step.action), step.description);
    }
    println!();
    println!(
        "Plan: {} to install, {} to remove, {} unchanged, {} gated.",
        plan.to_install, plan.to_remove, plan.unchanged, plan.gated
    );
}

fn plan_symbol(action: types::PlanAction) -> char {
    match action {
        types::PlanAction::Install => '+',
        types::PlanAction::Remove => '-',
        types::PlanAction::NoOp => ' ',
        types::PlanAction::Gated => '~',
    }
}

fn cmd_apply(
    file: &Path,
    provider: &str,
    gate: bool,
    dry_run: bool,
    state_dir: &Path,
    no_trace: bool,
) -> Result<(), String> {
    let (policy, text) = parse_and_validate(file)?;
    let backend = backend_for(provider)?;

    let cfg = executor::ApplyConfig {
        policy: &policy,
        policy_text: &text,
        backend: &backend,
        state_dir,
        require_mode: require_mode(gate),
        dry_run,
        trace: !no_trace,
    };
    let report = executor::apply(&cfg)?;

    if dry_run {
        println!(
            "Dry run — no operations performed ({} unchanged, {} gated).",
            report.unchanged, report.skipped
        );
        return Ok(());
    }

    for result in &report.results {
        match result.outcome {
            types::StateOutcome::Failed => println!(
                "  {} {} after {} attempt(s): {}",
                result.outcome,
                result.id,
                result.attempts,
                result.error.as_deref().unwrap_or("unknown error")
            ),
            _ => println!(
                "  {} {} ({:.1}s)",
                result.outcome, result.id, result.duration_seconds
            ),
        }
    }

    println!();
    if report.failed > 0 {
        println!(
            "Apply completed with errors: {} changed, {} unchanged, {} skipped, {} FAILED",
            report.changed, report.unchanged, report.skipped, report.failed
        );
        return Err(format!("{} declaration(s) failed", report.failed));
    }

    println!(
        "Apply complete: {} changed, {} unchanged, {} skipped ({:.1}s).",
        report.changed,
        report.unchanged,
        report.skipped,
        report.total_duration.as_secs_f64()
    );
    Ok(())
}
