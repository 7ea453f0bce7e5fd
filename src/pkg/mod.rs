//! Package backends — the engine's only window onto the package database.
//!
//! The package database is externally owned, process-wide state; backends
//! query and mutate it without keeping any local copy. `ShellBackend`
//! generates idempotent provider scripts and runs them through the transport;
//! `MemoryBackend` is an in-memory stand-in for tests.

pub mod apt;
pub mod memory;
pub mod zypper;

use crate::transport;

/// Live package database access for one declaration target at a time.
pub trait PackageBackend {
    /// Whether the package is currently installed.
    fn installed(&self, pkg: &str) -> Result<bool, String>;

    /// Converge the package to installed. Idempotent.
    fn install(&self, pkg: &str) -> Result<(), String>;

    /// Converge the package to removed. Idempotent.
    fn remove(&self, pkg: &str) -> Result<(), String>;
}

/// Supported package providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Zypper,
    Apt,
}

impl Provider {
    pub fn from_name(name: &str) -> Result<Self, String> {
        match name {
            "zypper" => Ok(Self::Zypper),
            "apt" => Ok(Self::Apt),
            other => Err(format!(
                "unsupported provider '{}' (expected zypper or apt)",
                other
            )),
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Zypper => write!(f, "zypper"),
            Self::Apt => write!(f, "apt"),
        }
    }
}

/// Backend that drives the real package manager through generated scripts.
#[derive(Debug, Clone)]
pub struct ShellBackend {
    provider: Provider,
}

impl ShellBackend {
    pub fn new(provider: Provider) -> Self {
        Self { provider }
    }
}

impl PackageBackend for ShellBackend {
    fn installed(&self, pkg: &str) -> Result<bool, String> {
        let script = match self.provider {
            Provider::Zypper => zypper::check_script(pkg),
            Provider::Apt => apt::check_script(pkg),
        };
        let out = transport::exec_script(&script)?;
        // Check scripts always exit 0 and report presence on stdout.
        let line = out.stdout.trim();
        if line.starts_with("installed:") {
            Ok(true)
        } else if line.starts_with("missing:") {
            Ok(false)
        } else {
            Err(format!(
                "unexpected check output for '{}': {}",
                pkg,
                if line.is_empty() {
                    out.stderr.trim()
                } else {
                    line
                }
            ))
        }
    }

    fn install(&self, pkg: &str) -> Result<(), String> {
        let script = match self.provider {
            Provider::Zypper => zypper::install_script(pkg),
            Provider::Apt => apt::install_script(pkg),
        };
        run_converge(&script, pkg)
    }

    fn remove(&self, pkg: &str) -> Result<(), String> {
        let script = match self.provider {
            Provider::Zypper => zypper::remove_script(pkg),
            Provider::Apt => apt::remove_script(pkg),
        };
        run_converge(&script, pkg)
    }
}

fn run_converge(script: &str, pkg: &str) -> Result<(), String> {
    let out = transport::exec_script(script)?;
    if out.success() {
        Ok(())
    } else {
        Err(format!(
            "'{}': exit code {}: {}",
            pkg,
            out.exit_code,
            out.stderr.trim()
        ))
    }
}
