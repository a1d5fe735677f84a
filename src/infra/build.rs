//! npm build adapter for the vanity client.

use std::path::Path;

use anyhow::{Context, Result};

use crate::application::ports::BuildRunner;
use crate::command_runner::{
    ensure_success, CommandRunner, TokioCommandRunner, DEFAULT_BUILD_TIMEOUT,
};

/// Build steps run inside the clone's `cli/` directory, in order.
pub const BUILD_STEPS: &[(&str, &[&str])] = &[
    ("npm", &["install"]),
    ("npm", &["run", "prebuild"]),
    ("npm", &["run", "db:setup"]),
];

pub struct NpmBuildRunner<R: CommandRunner> {
    runner: R,
}

impl<R: CommandRunner> NpmBuildRunner<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }
}

impl NpmBuildRunner<TokioCommandRunner> {
    #[must_use]
    pub fn default_runner() -> Self {
        Self::new(TokioCommandRunner::new(DEFAULT_BUILD_TIMEOUT))
    }
}

impl<R: CommandRunner> BuildRunner for NpmBuildRunner<R> {
    async fn run_build_step(&self, dir: &Path, program: &str, args: &[&str]) -> Result<()> {
        let output = self
            .runner
            .run_in_dir(program, args, dir)
            .await
            .with_context(|| format!("failed to run {program}"))?;
        ensure_success(&output, &format!("{program} {}", args.join(" ")))
    }
}

/// Copy the generator's public key next to the client so it can verify
/// produced addresses. The key is expected at `<base>/generated.pub`.
///
/// # Errors
///
/// Fails if the key is missing or the copy fails.
pub fn copy_public_key(base_dir: &Path, cli_dir: &Path) -> Result<()> {
    let source = base_dir.join("generated.pub");
    let dest = cli_dir.join("generated.pub");
    std::fs::copy(&source, &dest)
        .with_context(|| format!("copying {} to {}", source.display(), dest.display()))?;
    Ok(())
}
