//! SLS-style policy parsing and validation.
//!
//! A document is a mapping of declaration ids to a single state function key
//! (`pkg.installed` or `pkg.removed`) whose value is a list of modifier
//! mappings. Recognized modifiers: `retry`, `require`. Anything else is
//! rejected at parse time; cross-declaration invariants are checked by
//! `validate_policy`.

use super::types::{Declaration, Disposition, PolicyDoc, Requisite, RetryPolicy};
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;

/// Validation error.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// A modifier entry as it appears under a state function key.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum RawModifier {
    Retry(RetryPolicy),
    Require(Vec<Requisite>),
}

/// Raw document shape: id -> state function key -> modifier list.
type RawDoc = IndexMap<String, IndexMap<String, Vec<RawModifier>>>;

/// Parse a policy document from disk.
pub fn parse_policy_file(path: &Path) -> Result<PolicyDoc, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
    parse_policy(&content)
}

/// Parse a policy document from a string.
pub fn parse_policy(yaml: &str) -> Result<PolicyDoc, String> {
    let raw: RawDoc =
        serde_yaml_ng::from_str(yaml).map_err(|e| format!("YAML parse error: {}", e))?;
    lower(raw)
}

/// Lower the raw document shape into typed declarations.
fn lower(raw: RawDoc) -> Result<PolicyDoc, String> {
    let mut declarations = IndexMap::new();

    for (id, body) in raw {
        if body.len() != 1 {
            return Err(format!(
                "declaration '{}' must have exactly one state function, found {}",
                id,
                body.len()
            ));
        }
        let Some((function, modifiers)) = body.into_iter().next() else {
            return Err(format!("declaration '{}' has no state function", id));
        };

        let disposition = match function.as_str() {
            "pkg.installed" => Disposition::Installed,
            "pkg.removed" => Disposition::Removed,
            other => {
                return Err(format!(
                    "declaration '{}': unsupported state function '{}'",
                    id, other
                ))
            }
        };

        let mut retry: Option<RetryPolicy> = None;
        let mut require: Option<Vec<Requisite>> = None;
        for modifier in modifiers {
            match modifier {
                RawModifier::Retry(r) => {
                    if retry.replace(r).is_some() {
                        return Err(format!("declaration '{}': duplicate retry modifier", id));
                    }
                }
                RawModifier::Require(r) => {
                    if require.replace(r).is_some() {
                        return Err(format!("declaration '{}': duplicate require modifier", id));
                    }
                }
            }
        }

        declarations.insert(
            id,
            Declaration {
                disposition,
                retry: retry.unwrap_or_default(),
                require: require.unwrap_or_default(),
            },
        );
    }

    Ok(PolicyDoc { declarations })
}

/// Validate a parsed policy. Returns a list of errors (empty = valid).
pub fn validate_policy(policy: &PolicyDoc) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    for (id, decl) in &policy.declarations {
        if decl.retry.attempts == 0 {
            errors.push(ValidationError {
                message: format!("declaration '{}': retry attempts must be >= 1", id),
            });
        }

        for req in &decl.require {
            let target = req.target();
            if !policy.declarations.contains_key(target) {
                errors.push(ValidationError {
                    message: format!(
                        "declaration '{}' requires unknown declaration '{}'",
                        id, target
                    ),
                });
            }
            if target == id {
                errors.push(ValidationError {
                    message: format!("declaration '{}' requires itself", id),
                });
            }
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    const ISCSI_POLICY: &str = include_str!("../../policies/iscsi_initiator.sls");

    #[test]
    fn test_parse_shipped_policy() {
        let policy = parse_policy(ISCSI_POLICY).unwrap();
        assert_eq!(policy.len(), 3);
        assert!(validate_policy(&policy).is_empty());

        let ids: Vec<_> = policy.declarations.keys().collect();
        assert_eq!(
            ids,
            vec!["iscsi-formula", "kernel-default-base", "kernel-default"]
        );
    }

    #[test]
    fn test_shipped_policy_retry_attributes() {
        let policy = parse_policy(ISCSI_POLICY).unwrap();
        for (id, decl) in &policy.declarations {
            assert_eq!(decl.retry.attempts, 3, "attempts for '{}'", id);
            assert_eq!(decl.retry.interval, 15, "interval for '{}'", id);
        }
    }

    #[test]
    fn test_shipped_policy_dispositions() {
        let policy = parse_policy(ISCSI_POLICY).unwrap();
        assert_eq!(
            policy.get("iscsi-formula").unwrap().disposition,
            Disposition::Installed
        );
        assert_eq!(
            policy.get("kernel-default-base").unwrap().disposition,
            Disposition::Removed
        );
        assert_eq!(
            policy.get("kernel-default").unwrap().disposition,
            Disposition::Installed
        );
    }

    #[test]
    fn test_shipped_policy_require_edge() {
        let policy = parse_policy(ISCSI_POLICY).unwrap();
        let kernel = policy.get("kernel-default").unwrap();
        assert_eq!(
            kernel.require,
            vec![Requisite::Pkg("kernel-default-base".to_string())]
        );
        assert!(policy.get("iscsi-formula").unwrap().require.is_empty());
        assert!(policy.get("kernel-default-base").unwrap().require.is_empty());
    }

    #[test]
    fn test_parse_minimal_declaration() {
        let policy = parse_policy("curl:\n  pkg.installed: []\n").unwrap();
        let decl = policy.get("curl").unwrap();
        assert_eq!(decl.disposition, Disposition::Installed);
        assert_eq!(decl.retry, RetryPolicy::default());
        assert!(decl.require.is_empty());
    }

    #[test]
    fn test_parse_unsupported_state_function() {
        let result = parse_policy("nginx:\n  service.running: []\n");
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("unsupported state function"));
    }

    #[test]
    fn test_parse_two_state_functions() {
        let yaml = "curl:\n  pkg.installed: []\n  pkg.removed: []\n";
        let result = parse_policy(yaml);
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("exactly one state function"));
    }

    #[test]
    fn test_parse_duplicate_retry_modifier() {
        let yaml = "curl:\n  pkg.installed:\n    - retry:\n        attempts: 2\n    - retry:\n        attempts: 3\n";
        let result = parse_policy(yaml);
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("duplicate retry"));
    }

    #[test]
    fn test_parse_unknown_modifier() {
        let yaml = "curl:\n  pkg.installed:\n    - watch:\n        - pkg: wget\n";
        assert!(parse_policy(yaml).is_err());
    }

    #[test]
    fn test_parse_duplicate_declaration_id() {
        let yaml = "curl:\n  pkg.installed: []\ncurl:\n  pkg.removed: []\n";
        assert!(parse_policy(yaml).is_err());
    }

    #[test]
    fn test_parse_empty_document() {
        let policy = parse_policy("{}").unwrap();
        assert!(policy.is_empty());
    }

    #[test]
    fn test_validate_zero_attempts() {
        let yaml = "curl:\n  pkg.installed:\n    - retry:\n        attempts: 0\n";
        let policy = parse_policy(yaml).unwrap();
        let errors = validate_policy(&policy);
        assert!(errors.iter().any(|e| e.message.contains(">= 1")));
    }

    #[test]
    fn test_validate_unknown_require_target() {
        let yaml = "curl:\n  pkg.installed:\n    - require:\n        - pkg: ghost\n";
        let policy = parse_policy(yaml).unwrap();
        let errors = validate_policy(&policy);
        assert!(errors
            .iter()
            .any(|e| e.message.contains("unknown declaration 'ghost'")));
    }

    #[test]
    fn test_validate_self_require() {
        let yaml = "curl:\n  pkg.installed:\n    - require:\n        - pkg: curl\n";
        let policy = parse_policy(yaml).unwrap();
        let errors = validate_policy(&policy);
        assert!(errors.iter().any(|e| e.message.contains("requires itself")));
    }

    #[test]
    fn test_parse_policy_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.sls");
        std::fs::write(&path, "wget:\n  pkg.removed: []\n").unwrap();
        let policy = parse_policy_file(&path).unwrap();
        assert_eq!(
            policy.get("wget").unwrap().disposition,
            Disposition::Removed
        );
    }

    #[test]
    fn test_parse_policy_file_missing() {
        let result = parse_policy_file(Path::new("/nonexistent/policy.sls"));
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("failed to read"));
    }

    #[test]
    fn test_parse_invalid_yaml() {
        assert!(parse_policy("not: [valid: yaml: {{").is_err());
    }
}
