//! dpkg/apt-get script generation (Debian-family hosts).

/// Shell to report whether a package is installed. Always exits 0.
pub fn check_script(pkg: &str) -> String {
    format!(
        "dpkg -l '{pkg}' >/dev/null 2>&1 && echo 'installed:{pkg}' || echo 'missing:{pkg}'"
    )
}

/// Shell to converge a package to installed.
pub fn install_script(pkg: &str) -> String {
    format!(
        "set -euo pipefail\n\
         if ! dpkg -l '{pkg}' >/dev/null 2>&1; then\n\
           apt-get update -qq\n\
           DEBIAN_FRONTEND=noninteractive apt-get install -y -qq '{pkg}'\n\
         fi\n\
         # Postcondition: package installed\n\
         dpkg -l '{pkg}' >/dev/null 2>&1"
    )
}

/// Shell to converge a package to removed.
pub fn remove_script(pkg: &str) -> String {
    format!(
        "set -euo pipefail\n\
         if dpkg -l '{pkg}' >/dev/null 2>&1; then\n\
           DEBIAN_FRONTEND=noninteractive apt-get remove -y -qq '{pkg}'\n\
         fi"
    )
}
