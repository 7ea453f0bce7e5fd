//! Plan generation — diff desired dispositions against a pre-run snapshot.
//!
//! The snapshot is taken once, before any operation runs. It drives both
//! idempotence (already-converged targets plan to NO-OP) and require gating
//! (`RequireMode::Gate` consults the same pre-run state, so gating never
//! observes the run's own changes).

use super::types::{
    Declaration, Disposition, ExecutionPlan, PlanAction, PlannedStep, PolicyDoc, RequireMode,
};
use crate::pkg::PackageBackend;
use std::collections::BTreeMap;

/// Pre-run presence snapshot of every declaration target.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    packages: BTreeMap<String, bool>,
}

impl Snapshot {
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, bool)>,
        S: Into<String>,
    {
        Self {
            packages: entries
                .into_iter()
                .map(|(id, present)| (id.into(), present))
                .collect(),
        }
    }

    /// Whether the target was installed when the snapshot was taken.
    /// Unknown targets read as absent.
    pub fn installed(&self, target: &str) -> bool {
        self.packages.get(target).copied().unwrap_or(false)
    }
}

/// Query the backend once per declaration target.
pub fn take_snapshot(
    policy: &PolicyDoc,
    backend: &dyn PackageBackend,
) -> Result<Snapshot, String> {
    let mut packages = BTreeMap::new();
    for id in policy.declarations.keys() {
        packages.insert(id.clone(), backend.installed(id)?);
    }
    Ok(Snapshot { packages })
}

/// Generate an execution plan from a policy, an execution order, and the
/// pre-run snapshot.
pub fn plan(
    policy: &PolicyDoc,
    order: &[String],
    snapshot: &Snapshot,
    mode: RequireMode,
) -> ExecutionPlan {
    let mut steps = Vec::with_capacity(order.len());
    let mut to_install = 0u32;
    let mut to_remove = 0u32;
    let mut unchanged = 0u32;
    let mut gated = 0u32;

    for id in order {
        let Some(decl) = policy.get(id) else {
            continue;
        };

        let action = determine_action(id, decl, snapshot, mode);
        match action {
            PlanAction::Install => to_install += 1,
            PlanAction::Remove => to_remove += 1,
            PlanAction::NoOp => unchanged += 1,
            PlanAction::Gated => gated += 1,
        }

        steps.push(PlannedStep {
            id: id.clone(),
            action,
            description: describe_step(id, decl, action, snapshot),
        });
    }

    ExecutionPlan {
        steps,
        to_install,
        to_remove,
        unchanged,
        gated,
    }
}

fn determine_action(
    id: &str,
    decl: &Declaration,
    snapshot: &Snapshot,
    mode: RequireMode,
) -> PlanAction {
    if mode == RequireMode::Gate && gate_blocker(decl, snapshot).is_some() {
        return PlanAction::Gated;
    }

    match (decl.disposition, snapshot.installed(id)) {
        (Disposition::Installed, false) => PlanAction::Install,
        (Disposition::Installed, true) => PlanAction::NoOp,
        (Disposition::Removed, true) => PlanAction::Remove,
        (Disposition::Removed, false) => PlanAction::NoOp,
    }
}

/// First required target that was absent pre-run, if any.
fn gate_blocker<'a>(decl: &'a Declaration, snapshot: &Snapshot) -> Option<&'a str> {
    decl.require
        .iter()
        .map(|req| req.target())
        .find(|target| !snapshot.installed(target))
}

fn describe_step(id: &str, decl: &Declaration, action: PlanAction, snapshot: &Snapshot) -> String {
    match action {
        PlanAction::Install => format!("{}: install", id),
        PlanAction::Remove => format!("{}: remove", id),
        PlanAction::NoOp => format!("{}: no changes", id),
        PlanAction::Gated => {
            let target = gate_blocker(decl, snapshot).unwrap_or("?");
            format!("{}: skipped ('{}' absent before run)", id, target)
        }
    }
}
