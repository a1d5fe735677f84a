//! CLI argument parsing with clap derive

use anyhow::{Context, Result};
use clap::Parser;

use crate::appkey::AppKey;
use crate::application::provision::{Provisioner, StageFlags};
use crate::domain::{NodeIdentity, PortAllocation, ProvisionConfig};
use crate::infra::{build::NpmBuildRunner, git::GitCloner, systemd};
use crate::output::{OutputContext, TerminalReporter};

const DEFAULT_YAGNA_ID: &str = "0x555566e762ce208cceb69cae859f7a0673725d44";

/// Provision a yagna node and its vanity client on this host
#[derive(Debug, Parser)]
#[command(name = "node-provision", version)]
pub struct Cli {
    /// Name of the node; used to derive service names and directories
    #[arg(long)]
    pub node_name: String,

    /// Replace the node's service directory if it already exists
    #[arg(long)]
    pub overwrite: bool,

    /// Install and start the systemd units after rendering
    #[arg(long)]
    pub install_services: bool,

    /// Clone the vanity client repository and build it
    #[arg(long)]
    pub clone_repo: bool,

    /// Download and unpack the pinned yagna release and write env files
    #[arg(long)]
    pub prepare_yagna: bool,

    /// UDP port the yagna net layer binds to
    #[arg(long, default_value_t = 11600)]
    pub udp_port: u16,

    /// Port for the yagna REST API
    #[arg(long, default_value_t = 9000)]
    pub api_port: u16,

    /// Port for the client's status server
    #[arg(long, default_value_t = 7877)]
    pub status_port: u16,

    /// Identity secret for yagna autoconfiguration; empty generates a fresh one
    #[arg(long, default_value = "")]
    pub private_key: String,

    /// Ethereum address the client bills against
    #[arg(long, default_value = DEFAULT_YAGNA_ID)]
    pub yagna_id: String,

    /// Output the run summary in JSON format
    #[arg(long)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR")]
    pub no_color: bool,
}

impl Cli {
    /// Execute the provisioning run.
    ///
    /// # Errors
    ///
    /// Returns an error if any provisioning stage fails.
    pub async fn run(self) -> Result<()> {
        let quiet = self.quiet || self.json;
        let ctx = OutputContext::new(self.no_color, quiet);

        let identity = NodeIdentity::new(&self.node_name, &self.private_key, &self.yagna_id)?;
        let ports = PortAllocation {
            api_port: self.api_port,
            status_port: self.status_port,
            udp_port: self.udp_port,
        };
        let base_dir = std::env::current_dir().context("resolving current directory")?;
        let cfg = ProvisionConfig::new(identity, ports, AppKey::generate(), base_dir);
        let flags = StageFlags {
            overwrite: self.overwrite,
            clone_repo: self.clone_repo,
            prepare_yagna: self.prepare_yagna,
            install_services: self.install_services,
        };

        ctx.header(&format!("provisioning node {}", cfg.identity.node_name));

        let services = systemd::SystemdManager::default_runner();
        let cloner = GitCloner::default_runner();
        let builder = NpmBuildRunner::default_runner();
        let probe = systemd::HttpReadinessProbe::new(&cfg.api_url());
        let reporter = TerminalReporter::new(&ctx);

        let summary = Provisioner::new(
            &cfg, flags, &services, &cloner, &builder, &probe, &reporter, quiet,
        )
        .run()
        .await?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&summary).context("serializing summary")?
            );
        } else {
            ctx.success(&format!(
                "node {} provisioned under {}",
                summary.node_name, summary.service_dir
            ));
        }
        Ok(())
    }
}
