//! Node identity, port allocation, and the resolved provisioning config.
//!
//! `ProvisionConfig` is built exactly once per run from CLI input and the
//! freshly generated app key, then passed by reference into every stage.
//! Nothing is re-derived mid-run, so all generated files agree on one set
//! of names, ports, and the key by construction.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::appkey::AppKey;
use crate::domain::error::ProvisionError;

/// Identity of the node being provisioned. Immutable after construction.
#[derive(Debug, Clone)]
pub struct NodeIdentity {
    pub node_name: String,
    /// Optional secret used as `YAGNA_AUTOCONF_ID_SECRET`; empty when the
    /// agent should generate its own identity.
    pub private_key: String,
    /// Funding address written into the client env file.
    pub yagna_id: String,
}

impl NodeIdentity {
    /// Validate the node name and build the identity.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::InvalidNodeName`] if the name is empty,
    /// starts/ends with `-`, or contains anything outside `[a-z0-9-]`.
    /// The name is spliced into unit names and filesystem paths, so the
    /// character set is deliberately narrow.
    pub fn new(node_name: &str, private_key: &str, yagna_id: &str) -> Result<Self> {
        validate_node_name(node_name)?;
        Ok(Self {
            node_name: node_name.to_string(),
            private_key: private_key.to_string(),
            yagna_id: yagna_id.to_string(),
        })
    }

    /// Name of the network-agent systemd unit: `yagna-<node_name>`.
    #[must_use]
    pub fn yagna_service_name(&self) -> String {
        format!("yagna-{}", self.node_name)
    }

    /// Name of the vanity-client systemd unit: `vanity-<node_name>`.
    #[must_use]
    pub fn vanity_service_name(&self) -> String {
        format!("vanity-{}", self.node_name)
    }
}

/// Validates a node name against `^[a-z0-9]([a-z0-9-]*[a-z0-9])?$`.
///
/// # Errors
///
/// Returns an error if the name does not match.
pub fn validate_node_name(name: &str) -> Result<()> {
    let bytes = name.as_bytes();
    let interior_ok = name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    let ends_ok = !bytes.is_empty() && bytes[0] != b'-' && bytes[bytes.len() - 1] != b'-';
    if interior_ok && ends_ok {
        Ok(())
    } else {
        Err(ProvisionError::InvalidNodeName(name.to_string()).into())
    }
}

/// TCP/UDP ports for one node. Uniqueness across nodes sharing a host is
/// the caller's responsibility; nothing here checks that a port is free.
#[derive(Debug, Clone, Copy)]
pub struct PortAllocation {
    pub api_port: u16,
    pub status_port: u16,
    pub udp_port: u16,
}

impl Default for PortAllocation {
    fn default() -> Self {
        Self {
            api_port: 9000,
            status_port: 7877,
            udp_port: 11600,
        }
    }
}

/// Everything a provisioning stage needs, resolved up front.
#[derive(Debug, Clone)]
pub struct ProvisionConfig {
    pub identity: NodeIdentity,
    pub ports: PortAllocation,
    pub app_key: AppKey,
    base_dir: PathBuf,
}

impl ProvisionConfig {
    #[must_use]
    pub fn new(
        identity: NodeIdentity,
        ports: PortAllocation,
        app_key: AppKey,
        base_dir: PathBuf,
    ) -> Self {
        Self {
            identity,
            ports,
            app_key,
            base_dir,
        }
    }

    /// Directory the provisioner was invoked from.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Template root: `<base>/templates`.
    #[must_use]
    pub fn template_root(&self) -> PathBuf {
        self.base_dir.join("templates")
    }

    /// Node root: `<base>/services/<node_name>`.
    #[must_use]
    pub fn service_base_dir(&self) -> PathBuf {
        self.base_dir.join("services").join(&self.identity.node_name)
    }

    /// Where rendered unit descriptors go: `<node root>/services`.
    #[must_use]
    pub fn unit_dir(&self) -> PathBuf {
        self.service_base_dir().join("services")
    }

    /// Unpack location for the yagna release: `<node root>/yagna`.
    #[must_use]
    pub fn yagna_root(&self) -> PathBuf {
        self.service_base_dir().join("yagna")
    }

    /// Checkout location for the companion repository.
    #[must_use]
    pub fn clone_dir(&self) -> PathBuf {
        self.service_base_dir().join("golem-vanity.market")
    }

    /// The client application inside the clone.
    #[must_use]
    pub fn cli_dir(&self) -> PathBuf {
        self.clone_dir().join("cli")
    }

    /// Local API endpoint of the agent.
    #[must_use]
    pub fn api_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.ports.api_port)
    }
}
