//! Environment file writers for the two services.
//!
//! Both files are derived from the same `ProvisionConfig`, so they always
//! agree on ports and the app key. The node-side file is wholly owned by
//! this tool and overwritten every run; the client-side file may carry
//! operator-edited values and is therefore write-once.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::application::ports::ProgressReporter;
use crate::domain::ProvisionConfig;

/// Write the agent's `.env` under the unpack location. Truncate-and-replace.
///
/// # Errors
///
/// Fails if the file cannot be written.
pub fn write_node_env(cfg: &ProvisionConfig) -> Result<PathBuf> {
    let yagna_root = cfg.yagna_root();
    let content = format!(
        "# Node info\n\
         NODE_NAME={node_name}\n\
         YAGNA_AUTOCONF_APPKEY={app_key}\n\
         YAGNA_APPKEY={app_key}\n\
         YAGNA_AUTOCONF_ID_SECRET={private_key}\n\
         \n\
         YAGNA_DATADIR=yagnadir\n\
         YAGNA_API_URL=http://127.0.0.1:{api_port}\n\
         GSB_URL=unix:{yagna_root}/yagna.sock\n\
         \n\
         YA_NET_BIND_URL=udp://0.0.0.0:{udp_port}\n\
         YAGNA_API_ALLOW_ORIGIN=*\n",
        node_name = cfg.identity.node_name,
        app_key = cfg.app_key.as_str(),
        private_key = cfg.identity.private_key,
        api_port = cfg.ports.api_port,
        yagna_root = yagna_root.display(),
        udp_port = cfg.ports.udp_port,
    );

    let path = yagna_root.join(".env");
    std::fs::write(&path, content).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

/// Result of a client env write attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEnvOutcome {
    Written(PathBuf),
    /// The file pre-existed and its bytes were left untouched.
    Skipped(PathBuf),
}

impl ClientEnvOutcome {
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::Written(p) | Self::Skipped(p) => p,
        }
    }
}

/// Write the client's `.env` inside the clone's `cli/` directory.
///
/// Write-once: if the file already exists it is left byte-for-byte
/// untouched and a warning is emitted — operator edits must survive
/// re-runs. The skip is also reported through the returned outcome so a
/// quiet or JSON run can still surface it.
///
/// # Errors
///
/// Fails if the directory or file cannot be written.
pub fn write_client_env(
    cfg: &ProvisionConfig,
    reporter: &dyn ProgressReporter,
) -> Result<ClientEnvOutcome> {
    let cli_dir = cfg.cli_dir();
    let path = cli_dir.join(".env");
    if path.exists() {
        reporter.warn(&format!(
            "client env file already exists, keeping it: {}",
            path.display()
        ));
        return Ok(ClientEnvOutcome::Skipped(path));
    }

    let content = format!(
        "YAGNA_APPKEY={app_key}\n\
         YAGNA_API_URL=http://127.0.0.1:{api_port}\n\
         YAGNA_API_BASEPATH=http://127.0.0.1:{api_port}\n\
         STATUS_SERVER=http://0.0.0.0:{status_port}\n\
         EFFICIENCY_LOWER_THRESHOLD=1.0\n\
         SPEED_LOWER_THRESHOLD=1000000\n\
         SPEED_ESTIMATION_TIMEFRAME=600\n\
         MINIMUM_CPU_CORES=8\n\
         GOLEM_PINO_LOG_LEVEL=info\n\
         YAGNA_ID={yagna_id}\n",
        app_key = cfg.app_key.as_str(),
        api_port = cfg.ports.api_port,
        status_port = cfg.ports.status_port,
        yagna_id = cfg.identity.yagna_id,
    );

    std::fs::create_dir_all(&cli_dir)
        .with_context(|| format!("creating {}", cli_dir.display()))?;
    std::fs::write(&path, content).with_context(|| format!("writing {}", path.display()))?;
    Ok(ClientEnvOutcome::Written(path))
}
