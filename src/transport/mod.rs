//! Local script execution.
//!
//! Generated package scripts run through `bash` (not sh/dash) because they
//! use `set -o pipefail`.

use std::process::Command;

/// Output from executing a script.
#[derive(Debug, Clone)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Execute a shell script on the local system.
pub fn exec_script(script: &str) -> Result<ExecOutput, String> {
    let output = Command::new("bash")
        .arg("-c")
        .arg(script)
        .output()
        .map_err(|e| format!("failed to spawn bash: {}", e))?;

    Ok(ExecOutput {
        // Processes killed by a signal carry no exit code.
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exec_echo() {
        let out = exec_script("echo hello").unwrap();
        assert!(out.success());
        assert_eq!(out.stdout.trim(), "hello");
    }

    #[test]
    fn test_exec_nonzero_exit() {
        let out = exec_script("exit 42").unwrap();
        assert!(!out.success());
        assert_eq!(out.exit_code, 42);
    }

    #[test]
    fn test_exec_stderr_captured() {
        let out = exec_script("echo oops >&2").unwrap();
        assert!(out.success());
        assert!(out.stderr.contains("oops"));
    }

    #[test]
    fn test_exec_multiline() {
        let out = exec_script("echo one\necho two").unwrap();
        let lines: Vec<_> = out.stdout.lines().collect();
        assert_eq!(lines, vec!["one", "two"]);
    }

    #[test]
    fn test_exec_pipefail() {
        let out = exec_script("set -euo pipefail\nfalse | true").unwrap();
        assert!(!out.success(), "pipefail should surface the failing stage");
    }

    #[test]
    fn test_exec_signal_killed() {
        let out = exec_script("kill -9 $$").unwrap();
        assert_eq!(out.exit_code, -1);
    }
}
