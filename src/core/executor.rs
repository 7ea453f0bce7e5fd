//! Apply loop — converge declarations in require order with per-state retry.
//!
//! snapshot → plan → for each step: requisite check → operation with retry →
//! events. The package database is the only state the engine mutates; run
//! history goes to the JSONL trace log.

use super::planner;
use super::resolver;
use super::types::{
    ApplyReport, Declaration, Disposition, PlanAction, PlannedStep, PolicyDoc, RequireMode,
    RunEvent, StateOutcome, StateResult,
};
use crate::pkg::PackageBackend;
use crate::trace::{eventlog, hasher};
use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, Instant};

/// Configuration for an apply run.
pub struct ApplyConfig<'a> {
    pub policy: &'a PolicyDoc,
    /// Original document text; its fingerprint ties trace entries to an exact
    /// policy revision.
    pub policy_text: &'a str,
    pub backend: &'a dyn PackageBackend,
    pub state_dir: &'a Path,
    pub require_mode: RequireMode,
    pub dry_run: bool,
    pub trace: bool,
}

/// Execute the apply loop.
pub fn apply(cfg: &ApplyConfig) -> Result<ApplyReport, String> {
    let start = Instant::now();

    let order = resolver::execution_order(cfg.policy)?;
    let snapshot = planner::take_snapshot(cfg.policy, cfg.backend)?;
    let plan = planner::plan(cfg.policy, &order, &snapshot, cfg.require_mode);

    if cfg.dry_run {
        return Ok(ApplyReport {
            changed: 0,
            unchanged: plan.unchanged,
            failed: 0,
            skipped: plan.gated,
            results: Vec::new(),
            total_duration: start.elapsed(),
        });
    }

    let run_id = eventlog::generate_run_id();
    log_event(
        cfg,
        RunEvent::ApplyStarted {
            run_id: run_id.clone(),
            policy_hash: hasher::hash_string(cfg.policy_text),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
        },
    );

    let mut outcomes: HashMap<String, StateOutcome> = HashMap::new();
    let mut results = Vec::new();
    let mut changed = 0u32;
    let mut unchanged = 0u32;
    let mut failed = 0u32;
    let mut skipped = 0u32;

    for step in &plan.steps {
        let result = run_step(cfg, step, &outcomes);
        match result.outcome {
            StateOutcome::Changed => changed += 1,
            StateOutcome::Unchanged => unchanged += 1,
            StateOutcome::Failed => failed += 1,
            StateOutcome::Skipped => skipped += 1,
        }
        outcomes.insert(step.id.clone(), result.outcome);
        results.push(result);
    }

    log_event(
        cfg,
        RunEvent::ApplyCompleted {
            run_id,
            changed,
            unchanged,
            failed,
            skipped,
            total_seconds: start.elapsed().as_secs_f64(),
        },
    );

    Ok(ApplyReport {
        changed,
        unchanged,
        failed,
        skipped,
        results,
        total_duration: start.elapsed(),
    })
}

/// Execute one planned step against the backend.
fn run_step(
    cfg: &ApplyConfig,
    step: &PlannedStep,
    outcomes: &HashMap<String, StateOutcome>,
) -> StateResult {
    let step_start = Instant::now();

    match step.action {
        PlanAction::NoOp => {
            log_event(
                cfg,
                RunEvent::StateUnchanged {
                    id: step.id.clone(),
                },
            );
            finish(step, StateOutcome::Unchanged, 0, None, step_start)
        }
        PlanAction::Gated => {
            log_event(
                cfg,
                RunEvent::StateSkipped {
                    id: step.id.clone(),
                    reason: "required target absent before run".to_string(),
                },
            );
            finish(step, StateOutcome::Skipped, 0, None, step_start)
        }
        PlanAction::Install | PlanAction::Remove => {
            let Some(decl) = cfg.policy.get(&step.id) else {
                return finish(step, StateOutcome::Skipped, 0, None, step_start);
            };

            // A failed prerequisite fails its dependents without running them.
            // A skipped prerequisite does not block: its target's pre-run
            // state already drove the dependent's own gating.
            if let Some(blocker) = decl
                .require
                .iter()
                .find(|req| outcomes.get(req.target()) == Some(&StateOutcome::Failed))
            {
                let error = format!("requisite failed: {}", blocker.target());
                log_event(
                    cfg,
                    RunEvent::StateFailed {
                        id: step.id.clone(),
                        attempts: 0,
                        error: error.clone(),
                    },
                );
                return finish(step, StateOutcome::Failed, 0, Some(error), step_start);
            }

            log_event(
                cfg,
                RunEvent::StateStarted {
                    id: step.id.clone(),
                    action: step.action.to_string(),
                },
            );

            match converge_with_retry(cfg, &step.id, decl) {
                Ok(attempts) => {
                    log_event(
                        cfg,
                        RunEvent::StateChanged {
                            id: step.id.clone(),
                            attempts,
                            duration_seconds: step_start.elapsed().as_secs_f64(),
                        },
                    );
                    finish(step, StateOutcome::Changed, attempts, None, step_start)
                }
                Err((attempts, error)) => {
                    log_event(
                        cfg,
                        RunEvent::StateFailed {
                            id: step.id.clone(),
                            attempts,
                            error: error.clone(),
                        },
                    );
                    finish(step, StateOutcome::Failed, attempts, Some(error), step_start)
                }
            }
        }
    }
}

/// Run one declaration's operation, retrying per its retry policy.
/// Returns the number of attempts used, or the attempt count and last error
/// once the policy is exhausted.
fn converge_with_retry(
    cfg: &ApplyConfig,
    id: &str,
    decl: &Declaration,
) -> Result<u32, (u32, String)> {
    let attempts = decl.retry.attempts.max(1);
    let mut last_error = String::new();

    for attempt in 1..=attempts {
        let outcome = match decl.disposition {
            Disposition::Installed => cfg.backend.install(id),
            Disposition::Removed => cfg.backend.remove(id),
        };
        match outcome {
            Ok(()) => return Ok(attempt),
            Err(error) => {
                log_event(
                    cfg,
                    RunEvent::AttemptFailed {
                        id: id.to_string(),
                        attempt,
                        attempts,
                        error: error.clone(),
                    },
                );
                last_error = error;
                if attempt < attempts && decl.retry.interval > 0 {
                    std::thread::sleep(Duration::from_secs(decl.retry.interval));
                }
            }
        }
    }

    Err((attempts, last_error))
}

fn finish(
    step: &PlannedStep,
    outcome: StateOutcome,
    attempts: u32,
    error: Option<String>,
    started: Instant,
) -> StateResult {
    StateResult {
        id: step.id.clone(),
        action: step.action,
        outcome,
        attempts,
        error,
        duration_seconds: started.elapsed().as_secs_f64(),
    }
}

fn log_event(cfg: &ApplyConfig, event: RunEvent) {
    if cfg.trace {
        let _ = eventlog::append_event(cfg.state_dir, event);
    }
}
