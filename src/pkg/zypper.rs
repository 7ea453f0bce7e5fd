//! zypper/rpm script generation (SUSE hosts).
//!
//! All package names are single-quoted. Apply scripts are idempotent and end
//! with a postcondition check where one is observable.

/// Shell to report whether a package is installed. Always exits 0.
pub fn check_script(pkg: &str) -> String {
    format!(
        "rpm -q '{pkg}' >/dev/null 2>&1 && echo 'installed:{pkg}' || echo 'missing:{pkg}'"
    )
}

/// Shell to converge a package to installed.
pub fn install_script(pkg: &str) -> String {
    format!(
        "set -euo pipefail\n\
         if ! rpm -q '{pkg}' >/dev/null 2>&1; then\n\
           zypper --non-interactive install --auto-agree-with-licenses '{pkg}'\n\
         fi\n\
         # Postcondition: package installed\n\
         rpm -q '{pkg}' >/dev/null 2>&1"
    )
}

/// Shell to converge a package to removed.
pub fn remove_script(pkg: &str) -> String {
    format!(
        "set -euo pipefail\n\
         if rpm -q '{pkg}' >/dev/null 2>&1; then\n\
           zypper --non-interactive remove '{pkg}'\n\
         fi\n\
         # Postcondition: package absent\n\
         ! rpm -q '{pkg}' >/dev/null 2>&1"
    )
}
