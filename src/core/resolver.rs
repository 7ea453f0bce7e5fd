//! Require-edge DAG construction and execution ordering.
//!
//! Builds a dependency graph from explicit `require` edges and computes a
//! topological order using Kahn's algorithm with alphabetical tie-breaking,
//! so unrelated declarations always run in a deterministic order.

use super::types::PolicyDoc;
use std::collections::{HashMap, VecDeque};

/// Compute the execution order for a policy's declarations.
///
/// Prerequisites always precede their dependents. Unknown require targets and
/// require cycles are errors naming the offending declarations.
pub fn execution_order(policy: &PolicyDoc) -> Result<Vec<String>, String> {
    let ids: Vec<String> = policy.declarations.keys().cloned().collect();
    let mut in_degree: HashMap<String, usize> = HashMap::new();
    let mut dependents: HashMap<String, Vec<String>> = HashMap::new();

    for id in &ids {
        in_degree.insert(id.clone(), 0);
        dependents.insert(id.clone(), Vec::new());
    }

    for (id, decl) in &policy.declarations {
        for req in &decl.require {
            let prereq = req.target();
            let Some(edges) = dependents.get_mut(prereq) else {
                return Err(format!(
                    "declaration '{}' requires unknown declaration '{}'",
                    id, prereq
                ));
            };
            edges.push(id.clone());
            if let Some(degree) = in_degree.get_mut(id) {
                *degree += 1;
            }
        }
    }

    // Kahn's algorithm; ready sets sorted for determinism.
    let mut queue: VecDeque<String> = VecDeque::new();
    let mut ready: Vec<String> = in_degree
        .iter()
        .filter(|(_, &d)| d == 0)
        .map(|(id, _)| id.clone())
        .collect();
    ready.sort();
    queue.extend(ready);

    let mut order = Vec::with_capacity(ids.len());
    while let Some(current) = queue.pop_front() {
        let mut next_ready = Vec::new();
        if let Some(deps) = dependents.get(&current) {
            for dependent in deps {
                if let Some(degree) = in_degree.get_mut(dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        next_ready.push(dependent.clone());
                    }
                }
            }
        }
        next_ready.sort();
        queue.extend(next_ready);
        order.push(current);
    }

    if order.len() != ids.len() {
        let mut stuck: Vec<&str> = ids
            .iter()
            .filter(|id| !order.contains(id))
            .map(String::as_str)
            .collect();
        stuck.sort_unstable();
        return Err(format!(
            "require cycle detected involving: {}",
            stuck.join(", ")
        ));
    }

    Ok(order)
}
