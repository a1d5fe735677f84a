//! The provisioning workflow.
//!
//! Strictly sequential: every stage's output is a precondition for the
//! next. Any stage failure is fatal and terminates the run; earlier
//! filesystem changes are not rolled back — recovery is a re-run with
//! `--overwrite`.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::application::ports::{
    BuildRunner, ProgressReporter, ReadinessProbe, RepoCloner, ServiceManager,
};
use crate::domain::{ProvisionConfig, ProvisionError};
use crate::infra::{build, envfile, fetch, git, render};

/// Pause between deleting an existing node tree and recreating it, to let
/// the filesystem settle after `remove_dir_all`.
const SETTLE_AFTER_REMOVE: Duration = Duration::from_secs(1);

/// Which optional stages this run executes.
#[derive(Debug, Clone, Copy, Default)]
pub struct StageFlags {
    pub overwrite: bool,
    pub clone_repo: bool,
    pub prepare_yagna: bool,
    pub install_services: bool,
}

/// Machine-readable result of a completed run. The app key is deliberately
/// absent — it lives only in the generated env files.
#[derive(Debug, Serialize)]
pub struct ProvisionSummary {
    pub node_name: String,
    pub service_dir: String,
    pub rendered: Vec<String>,
    pub repo_cloned: bool,
    pub yagna_prepared: bool,
    /// True when an operator-edited client env file was found and left
    /// untouched; surfaced here because `--json` suppresses the warning.
    pub client_env_skipped: bool,
    pub services_installed: bool,
}

/// Drives the end-to-end sequence over injected collaborator ports.
pub struct Provisioner<'a, M, C, B, P> {
    cfg: &'a ProvisionConfig,
    flags: StageFlags,
    services: &'a M,
    cloner: &'a C,
    builder: &'a B,
    probe: &'a P,
    reporter: &'a dyn ProgressReporter,
    quiet: bool,
}

impl<'a, M, C, B, P> Provisioner<'a, M, C, B, P>
where
    M: ServiceManager,
    C: RepoCloner,
    B: BuildRunner,
    P: ReadinessProbe,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        cfg: &'a ProvisionConfig,
        flags: StageFlags,
        services: &'a M,
        cloner: &'a C,
        builder: &'a B,
        probe: &'a P,
        reporter: &'a dyn ProgressReporter,
        quiet: bool,
    ) -> Self {
        Self {
            cfg,
            flags,
            services,
            cloner,
            builder,
            probe,
            reporter,
            quiet,
        }
    }

    /// Execute all requested stages in order.
    ///
    /// # Errors
    ///
    /// Fails fast on the first stage error; see module docs for the
    /// no-rollback policy.
    pub async fn run(&self) -> Result<ProvisionSummary> {
        if self.flags.install_services {
            self.stop_existing_units().await;
        }

        self.prepare_directory_layout().await?;

        self.reporter.step("rendering templates");
        let rendered = render::render_tree(&self.cfg.template_root(), self.cfg)?;
        self.reporter
            .success(&format!("rendered {} file(s)", rendered.len()));

        if self.flags.clone_repo {
            self.clone_companion_repo().await?;
        }

        let mut client_env_skipped = false;
        if self.flags.prepare_yagna {
            client_env_skipped = self.prepare_yagna().await?;
        }

        if self.flags.clone_repo {
            self.build_client().await?;
        }

        if self.flags.install_services {
            self.install_and_start_services().await?;
        }

        Ok(ProvisionSummary {
            node_name: self.cfg.identity.node_name.clone(),
            service_dir: self.cfg.service_base_dir().display().to_string(),
            rendered: rendered
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
            repo_cloned: self.flags.clone_repo,
            yagna_prepared: self.flags.prepare_yagna,
            client_env_skipped,
            services_installed: self.flags.install_services,
        })
    }

    /// Best-effort stop of both units before the tree they run from is
    /// touched. Stopping a unit that was never installed fails; that is
    /// expected and ignored.
    async fn stop_existing_units(&self) {
        let vanity = self.cfg.identity.vanity_service_name();
        let yagna = self.cfg.identity.yagna_service_name();
        self.reporter
            .step(&format!("stopping existing services: {vanity}, {yagna}"));
        let _ = self.services.stop_unit(&vanity).await;
        let _ = self.services.stop_unit(&yagna).await;
    }

    async fn prepare_directory_layout(&self) -> Result<()> {
        let base = self.cfg.service_base_dir();
        if base.exists() {
            if !self.flags.overwrite {
                return Err(ProvisionError::ServiceDirExists(base.display().to_string()).into());
            }
            self.reporter
                .warn(&format!("replacing existing service directory {}", base.display()));
            std::fs::remove_dir_all(&base)
                .with_context(|| format!("removing {}", base.display()))?;
            tokio::time::sleep(SETTLE_AFTER_REMOVE).await;
        }
        std::fs::create_dir_all(&base).with_context(|| format!("creating {}", base.display()))?;
        let units = self.cfg.unit_dir();
        std::fs::create_dir_all(&units)
            .with_context(|| format!("creating {}", units.display()))?;
        Ok(())
    }

    async fn clone_companion_repo(&self) -> Result<()> {
        let dest = self.cfg.clone_dir();
        self.reporter
            .step(&format!("cloning {} into {}", git::repo_url(), dest.display()));
        self.cloner
            .clone_repo(git::repo_url(), git::REPO_BRANCH, &dest)
            .await?;
        self.reporter.success("repository cloned");
        Ok(())
    }

    /// Fetch + unpack the pinned release, then write both env files. The
    /// client env references paths that exist only after the unpack, so
    /// this ordering binds. Returns whether the client env write was
    /// skipped because the file pre-existed.
    async fn prepare_yagna(&self) -> Result<bool> {
        let platform = fetch::Platform::detect()?;
        self.reporter
            .step(&format!("fetching yagna release {}", fetch::YAGNA_VERSION));
        // The download/unpack is blocking I/O that can run for minutes;
        // keep it off the runtime's worker threads.
        let cfg = self.cfg.clone();
        let quiet = self.quiet;
        tokio::task::spawn_blocking(move || fetch::prepare_release(&cfg, platform, quiet))
            .await
            .context("release preparation task failed")??;
        envfile::write_node_env(self.cfg)?;
        let skipped = matches!(
            envfile::write_client_env(self.cfg, self.reporter)?,
            envfile::ClientEnvOutcome::Skipped(_)
        );
        self.reporter.success("yagna release prepared");
        Ok(skipped)
    }

    async fn build_client(&self) -> Result<()> {
        let cli_dir = self.cfg.cli_dir();
        for (program, args) in build::BUILD_STEPS {
            self.reporter
                .step(&format!("running {} {}", program, args.join(" ")));
            self.builder.run_build_step(&cli_dir, program, args).await?;
        }
        build::copy_public_key(self.cfg.base_dir(), &cli_dir)?;
        self.reporter.success("client dependencies installed");
        Ok(())
    }

    async fn install_and_start_services(&self) -> Result<()> {
        for descriptor in self.rendered_unit_files()? {
            self.reporter
                .step(&format!("installing {}", descriptor.display()));
            self.services.install_unit(&descriptor).await?;
        }
        self.services.reload_manager().await?;

        let yagna = self.cfg.identity.yagna_service_name();
        self.reporter.step(&format!("starting {yagna}"));
        self.services.start_unit(&yagna).await?;

        // The client declares a runtime dependency on the agent's local
        // endpoint; wait until the API answers before starting it.
        self.probe.wait_ready().await?;

        let vanity = self.cfg.identity.vanity_service_name();
        self.reporter.step(&format!("starting {vanity}"));
        self.services.start_unit(&vanity).await?;
        self.reporter.success("services installed and started");
        Ok(())
    }

    /// Rendered `*.service` descriptors, sorted for a deterministic
    /// install order.
    fn rendered_unit_files(&self) -> Result<Vec<PathBuf>> {
        let unit_dir = self.cfg.unit_dir();
        let mut units = Vec::new();
        let entries = std::fs::read_dir(&unit_dir)
            .with_context(|| format!("reading {}", unit_dir.display()))?;
        for entry in entries {
            let path = entry
                .with_context(|| format!("reading {}", unit_dir.display()))?
                .path();
            if path.extension().is_some_and(|e| e == "service") {
                units.push(path);
            }
        }
        units.sort();
        Ok(units)
    }
}
