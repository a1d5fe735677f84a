//! Git clone adapter for the vanity client repository.

use std::path::Path;

use anyhow::{Context, Result};

use crate::application::ports::RepoCloner;
use crate::command_runner::{
    ensure_success, CommandRunner, TokioCommandRunner, DEFAULT_BUILD_TIMEOUT,
};

pub const REPO_URL_SSH: &str = "git@github.com:Unoperate/golem-vanity.market.git";
pub const REPO_URL_HTTPS: &str = "https://github.com/Unoperate/golem-vanity.market.git";
pub const REPO_BRANCH: &str = "scx1332/vanity-runner";

/// SSH remotes are the norm on Linux hosts; Windows setups rarely have a
/// deploy key configured, so they go over HTTPS.
#[must_use]
pub fn repo_url() -> &'static str {
    if cfg!(windows) {
        REPO_URL_HTTPS
    } else {
        REPO_URL_SSH
    }
}

pub struct GitCloner<R: CommandRunner> {
    runner: R,
}

impl<R: CommandRunner> GitCloner<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }
}

impl GitCloner<TokioCommandRunner> {
    #[must_use]
    pub fn default_runner() -> Self {
        Self::new(TokioCommandRunner::new(DEFAULT_BUILD_TIMEOUT))
    }
}

impl<R: CommandRunner> RepoCloner for GitCloner<R> {
    async fn clone_repo(&self, url: &str, branch: &str, dest: &Path) -> Result<()> {
        let dest_str = dest.to_string_lossy();
        let output = self
            .runner
            .run("git", &["clone", url, &dest_str])
            .await
            .context("failed to run git clone")?;
        ensure_success(&output, &format!("cloning {url}"))?;

        let output = self
            .runner
            .run_in_dir("git", &["checkout", branch], dest)
            .await
            .context("failed to run git checkout")?;
        ensure_success(&output, &format!("checking out {branch}"))
    }
}
