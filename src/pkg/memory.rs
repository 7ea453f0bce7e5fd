//! In-memory package database for tests and demos.
//!
//! Tracks an installed set, records every operation, and can be told to fail
//! the next N operations on a package to exercise retry paths.

use super::PackageBackend;
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Default)]
pub struct MemoryBackend {
    installed: RefCell<BTreeSet<String>>,
    fail_next: RefCell<HashMap<String, u32>>,
    ops: RefCell<Vec<String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend with the given packages pre-installed.
    pub fn with_installed<I, S>(packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let backend = Self::default();
        backend
            .installed
            .borrow_mut()
            .extend(packages.into_iter().map(Into::into));
        backend
    }

    /// Fail the next `count` install/remove operations on `pkg`.
    pub fn fail_next_ops(&self, pkg: &str, count: u32) {
        self.fail_next.borrow_mut().insert(pkg.to_string(), count);
    }

    /// Every install/remove performed, in order, as "install pkg" / "remove pkg".
    pub fn ops(&self) -> Vec<String> {
        self.ops.borrow().clone()
    }

    fn take_failure(&self, pkg: &str) -> bool {
        let mut fail_next = self.fail_next.borrow_mut();
        match fail_next.get_mut(pkg) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }
}

impl PackageBackend for MemoryBackend {
    fn installed(&self, pkg: &str) -> Result<bool, String> {
        Ok(self.installed.borrow().contains(pkg))
    }

    fn install(&self, pkg: &str) -> Result<(), String> {
        if self.take_failure(pkg) {
            return Err(format!("'{}': transient install failure", pkg));
        }
        self.ops.borrow_mut().push(format!("install {}", pkg));
        self.installed.borrow_mut().insert(pkg.to_string());
        Ok(())
    }

    fn remove(&self, pkg: &str) -> Result<(), String> {
        if self.take_failure(pkg) {
            return Err(format!("'{}': transient remove failure", pkg));
        }
        self.ops.borrow_mut().push(format!("remove {}", pkg));
        self.installed.borrow_mut().remove(pkg);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_and_query() {
        let backend = MemoryBackend::new();
        assert!(!backend.installed("curl").unwrap());
        backend.install("curl").unwrap();
        assert!(backend.installed("curl").unwrap());
    }

    #[test]
    fn test_with_installed() {
        let backend = MemoryBackend::with_installed(["curl", "wget"]);
        assert!(backend.installed("curl").unwrap());
        assert!(backend.installed("wget").unwrap());
        assert!(!backend.installed("zsh").unwrap());
    }

    #[test]
    fn test_remove() {
        let backend = MemoryBackend::with_installed(["curl"]);
        backend.remove("curl").unwrap();
        assert!(!backend.installed("curl").unwrap());
        assert_eq!(backend.ops(), vec!["remove curl"]);
    }

    #[test]
    fn test_forced_failures_then_success() {
        let backend = MemoryBackend::new();
        backend.fail_next_ops("curl", 2);
        assert!(backend.install("curl").is_err());
        assert!(backend.install("curl").is_err());
        backend.install("curl").unwrap();
        assert!(backend.installed("curl").unwrap());
        // Failed attempts do not reach the package database.
        assert_eq!(backend.ops(), vec!["install curl"]);
    }
}
