//! Version information for the service, populated at build time.
//!
//! Environment display format:
//! - PR: `pr:{number}` (number passed via `PR_NUMBER` at build time)
//! - Prod (stable): `stable:{version}`
//! - Nightly: `nightly:{date}`
//! - Local/Test: `main:{commit}`

/// Environment a service instance runs in, decided at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeEnv {
    /// Local development
    Local,
    /// Production
    Prod,
    /// Shared test deployment
    Test,
    /// Pull request preview
    Pr,
    /// Nightly build
    Nightly,
}

/// Get the build date in RFC3339 format
pub fn build_date() -> &'static str {
    env!("BUILD_DATE")
}

/// Get the git commit hash (short)
pub fn build_commit() -> &'static str {
    env!("BUILD_COMMIT")
}

/// Get the package version
pub fn build_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// First ten characters of an RFC3339 date, i.e. `YYYY-MM-DD`.
fn date_part(date: &str) -> &str {
    if date.len() >= 10 && date.is_ascii() {
        &date[..10]
    } else {
        date
    }
}

/// Format the version string for an environment chosen at runtime.
///
/// Used for the `x-service-version` header of the health endpoint.
pub fn format_version_for_runtime_env(env: RuntimeEnv) -> String {
    match env {
        RuntimeEnv::Pr => {
            let pr_number = option_env!("PR_NUMBER").unwrap_or("unknown");
            format!("pr:{pr_number}")
        }
        RuntimeEnv::Nightly => format!("nightly:{}", date_part(build_date())),
        RuntimeEnv::Test | RuntimeEnv::Local => format!("main:{}", build_commit()),
        RuntimeEnv::Prod => format!("stable:{}", build_version()),
    }
}
