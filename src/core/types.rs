//! Schema types for policy documents, plans, apply reports, and run events.
//!
//! A policy document is an ordered map of state declarations. Each declaration
//! names one package target, the disposition it must converge to, and its
//! retry/require modifiers. Types that cross the YAML or JSONL boundary derive
//! Serialize/Deserialize.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Declarations
// ============================================================================

/// Desired end-state for a package target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    Installed,
    Removed,
}

impl Disposition {
    /// The state function key that selects this disposition in a document.
    pub fn function_key(&self) -> &'static str {
        match self {
            Self::Installed => "pkg.installed",
            Self::Removed => "pkg.removed",
        }
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Installed => write!(f, "installed"),
            Self::Removed => write!(f, "removed"),
        }
    }
}

/// Retry policy for a declaration's operation.
///
/// `attempts` counts total tries: attempts=3 means the operation runs at most
/// three times, with `interval` seconds between consecutive tries. Retries are
/// local to one declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryPolicy {
    /// Maximum attempts, must be >= 1.
    pub attempts: u32,

    /// Seconds between attempts.
    #[serde(default)]
    pub interval: u64,
}

impl Default for RetryPolicy {
    /// A declaration without a `retry` modifier gets a single attempt.
    fn default() -> Self {
        Self {
            attempts: 1,
            interval: 0,
        }
    }
}

/// A requisite reference — type tag plus the target declaration's id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Requisite {
    /// Reference to another pkg declaration.
    Pkg(String),
}

impl Requisite {
    /// Id of the declaration this requisite points at.
    pub fn target(&self) -> &str {
        match self {
            Self::Pkg(id) => id,
        }
    }
}

/// A single state declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub disposition: Disposition,
    pub retry: RetryPolicy,
    pub require: Vec<Requisite>,
}

/// A parsed policy document — declaration id to declaration, in document
/// order. The id names the package target. Document order carries no meaning
/// beyond explicit require edges.
#[derive(Debug, Clone, Default)]
pub struct PolicyDoc {
    pub declarations: IndexMap<String, Declaration>,
}

impl PolicyDoc {
    pub fn get(&self, id: &str) -> Option<&Declaration> {
        self.declarations.get(id)
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}

// ============================================================================
// Require semantics
// ============================================================================

/// How require edges are interpreted during planning.
///
/// `Ordering` runs the prerequisite first and always runs the dependent —
/// the conventional reading of a require edge. `Gate` additionally skips the
/// dependent when a required target was absent from the system before the run
/// started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequireMode {
    #[default]
    Ordering,
    Gate,
}

// ============================================================================
// Plan
// ============================================================================

/// Action planned for a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanAction {
    Install,
    Remove,
    NoOp,
    /// Skipped under `RequireMode::Gate`: a required target was absent before
    /// the run.
    Gated,
}

impl fmt::Display for PlanAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Install => write!(f, "INSTALL"),
            Self::Remove => write!(f, "REMOVE"),
            Self::NoOp => write!(f, "NO-OP"),
            Self::Gated => write!(f, "GATED"),
        }
    }
}

/// A single planned step.
#[derive(Debug, Clone)]
pub struct PlannedStep {
    pub id: String,
    pub action: PlanAction,
    pub description: String,
}

/// Full execution plan, steps in require order.
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    pub steps: Vec<PlannedStep>,
    pub to_install: u32,
    pub to_remove: u32,
    pub unchanged: u32,
    pub gated: u32,
}

impl ExecutionPlan {
    /// Number of package operations the plan would perform.
    pub fn operations(&self) -> u32 {
        self.to_install + self.to_remove
    }
}

// ============================================================================
// Apply results
// ============================================================================

/// Outcome of executing one declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateOutcome {
    Changed,
    Unchanged,
    Failed,
    Skipped,
}

impl fmt::Display for StateOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Changed => write!(f, "CHANGED"),
            Self::Unchanged => write!(f, "UNCHANGED"),
            Self::Failed => write!(f, "FAILED"),
            Self::Skipped => write!(f, "SKIPPED"),
        }
    }
}

/// Per-declaration execution record.
#[derive(Debug, Clone)]
pub struct StateResult {
    pub id: String,
    pub action: PlanAction,
    pub outcome: StateOutcome,
    /// Attempts actually used. Zero when no operation ran.
    pub attempts: u32,
    pub error: Option<String>,
    pub duration_seconds: f64,
}

/// Result of one apply run.
#[derive(Debug, Clone)]
pub struct ApplyReport {
    pub changed: u32,
    pub unchanged: u32,
    pub failed: u32,
    pub skipped: u32,
    pub results: Vec<StateResult>,
    pub total_duration: std::time::Duration,
}

impl ApplyReport {
    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

// ============================================================================
// Run events
// ============================================================================

/// Run event for the JSONL trace log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    ApplyStarted {
        run_id: String,
        policy_hash: String,
        engine_version: String,
    },
    StateStarted {
        id: String,
        action: String,
    },
    AttemptFailed {
        id: String,
        attempt: u32,
        attempts: u32,
        error: String,
    },
    StateChanged {
        id: String,
        attempts: u32,
        duration_seconds: f64,
    },
    StateUnchanged {
        id: String,
    },
    StateSkipped {
        id: String,
        reason: String,
    },
    StateFailed {
        id: String,
        attempts: u32,
        error: String,
    },
    ApplyCompleted {
        run_id: String,
        changed: u32,
        unchanged: u32,
        failed: u32,
        skipped: u32,
        total_seconds: f64,
    },
}

/// Timestamped event wrapper as written to the log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimestampedEvent {
    pub ts: String,
    #[serde(flatten)]
    pub event: RunEvent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disposition_function_keys() {
        assert_eq!(Disposition::Installed.function_key(), "pkg.installed");
        assert_eq!(Disposition::Removed.function_key(), "pkg.removed");
    }

    #[test]
    fn test_disposition_display() {
        assert_eq!(Disposition::Installed.to_string(), "installed");
        assert_eq!(Disposition::Removed.to_string(), "removed");
    }

    #[test]
    fn test_retry_policy_parse() {
        let r: RetryPolicy = serde_yaml_ng::from_str("attempts: 3\ninterval: 15").unwrap();
        assert_eq!(r.attempts, 3);
        assert_eq!(r.interval, 15);
    }

    #[test]
    fn test_retry_policy_interval_defaults_to_zero() {
        let r: RetryPolicy = serde_yaml_ng::from_str("attempts: 2").unwrap();
        assert_eq!(r.attempts, 2);
        assert_eq!(r.interval, 0);
    }

    #[test]
    fn test_retry_policy_rejects_unknown_keys() {
        let r: Result<RetryPolicy, _> = serde_yaml_ng::from_str("attempts: 2\nsplay: 5");
        assert!(r.is_err());
    }

    #[test]
    fn test_retry_policy_default_single_attempt() {
        let r = RetryPolicy::default();
        assert_eq!(r.attempts, 1);
        assert_eq!(r.interval, 0);
    }

    #[test]
    fn test_requisite_parse() {
        let req: Requisite = serde_yaml_ng::from_str("pkg: kernel-default-base").unwrap();
        assert_eq!(req, Requisite::Pkg("kernel-default-base".to_string()));
        assert_eq!(req.target(), "kernel-default-base");
    }

    #[test]
    fn test_requisite_rejects_unknown_tag() {
        let req: Result<Requisite, _> = serde_yaml_ng::from_str("service: nginx");
        assert!(req.is_err());
    }

    #[test]
    fn test_plan_action_display() {
        assert_eq!(PlanAction::Install.to_string(), "INSTALL");
        assert_eq!(PlanAction::Remove.to_string(), "REMOVE");
        assert_eq!(PlanAction::NoOp.to_string(), "NO-OP");
        assert_eq!(PlanAction::Gated.to_string(), "GATED");
    }

    #[test]
    fn test_state_outcome_display() {
        assert_eq!(StateOutcome::Changed.to_string(), "CHANGED");
        assert_eq!(StateOutcome::Skipped.to_string(), "SKIPPED");
    }

    #[test]
    fn test_require_mode_default_is_ordering() {
        assert_eq!(RequireMode::default(), RequireMode::Ordering);
    }

    #[test]
    fn test_execution_plan_operations() {
        let plan = ExecutionPlan {
            steps: vec![],
            to_install: 2,
            to_remove: 1,
            unchanged: 4,
            gated: 1,
        };
        assert_eq!(plan.operations(), 3);
    }

    #[test]
    fn test_apply_report_success() {
        let ok = ApplyReport {
            changed: 1,
            unchanged: 2,
            failed: 0,
            skipped: 0,
            results: vec![],
            total_duration: std::time::Duration::from_secs(1),
        };
        assert!(ok.success());
        let bad = ApplyReport { failed: 1, ..ok };
        assert!(!bad.success());
    }

    #[test]
    fn test_run_event_serde_tag() {
        let event = RunEvent::ApplyStarted {
            run_id: "r-abc".to_string(),
            policy_hash: "blake3:deadbeef".to_string(),
            engine_version: "0.3.1".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event\":\"apply_started\""));
        assert!(json.contains("\"run_id\":\"r-abc\""));
    }

    #[test]
    fn test_timestamped_event_flattens() {
        let te = TimestampedEvent {
            ts: "2026-08-07T10:00:00Z".to_string(),
            event: RunEvent::StateUnchanged {
                id: "iscsi-formula".to_string(),
            },
        };
        let json = serde_json::to_string(&te).unwrap();
        assert!(json.contains("\"ts\":\"2026-08-07T10:00:00Z\""));
        assert!(json.contains("\"event\":\"state_unchanged\""));
        let back: TimestampedEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.ts, te.ts);
    }
}
