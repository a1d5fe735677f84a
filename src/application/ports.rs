//! Port trait definitions for the application layer.
//!
//! Ports are the narrow contracts the orchestrator drives external
//! collaborators through, so its control flow is testable without a real
//! service manager, git, or npm. This file imports only from `crate::domain`.

use std::path::Path;

use anyhow::Result;

/// OS service-manager operations, one unit at a time.
///
/// The production implementation shells out to `systemctl`; tests record
/// calls instead. `stop_unit` failures are ignored by the caller — stopping
/// a unit that was never installed is expected to fail.
#[allow(async_fn_in_trait)]
pub trait ServiceManager {
    /// Stop a named unit.
    async fn stop_unit(&self, unit: &str) -> Result<()>;
    /// Copy a rendered unit descriptor into the service-manager directory.
    async fn install_unit(&self, descriptor: &Path) -> Result<()>;
    /// Reload the manager so new/changed descriptors are recognized.
    async fn reload_manager(&self) -> Result<()>;
    /// Start a named unit.
    async fn start_unit(&self, unit: &str) -> Result<()>;
}

/// Source-control clone of the companion repository.
#[allow(async_fn_in_trait)]
pub trait RepoCloner {
    /// Clone `url` into `dest` and check out `branch`.
    async fn clone_repo(&self, url: &str, branch: &str, dest: &Path) -> Result<()>;
}

/// Working-directory-scoped build steps for the companion client.
#[allow(async_fn_in_trait)]
pub trait BuildRunner {
    /// Run one build step (e.g. `npm install`) inside `dir`.
    async fn run_build_step(&self, dir: &Path, program: &str, args: &[&str]) -> Result<()>;
}

/// Readiness check for the agent's local API.
///
/// Replaces a fixed settle delay: the client unit must not start before the
/// agent's API endpoint is reachable.
#[allow(async_fn_in_trait)]
pub trait ReadinessProbe {
    /// Block until the agent API answers, or fail after a bounded number
    /// of attempts.
    async fn wait_ready(&self) -> Result<()>;
}

/// Progress reporting, decoupled from the terminal. Sync — no async needed.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
}
