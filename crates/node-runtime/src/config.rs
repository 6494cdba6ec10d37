//! # Runtime Configuration
//!
//! TOML-backed configuration for the node binary. Wraps the shared
//! [`NetworkConfig`] with runtime-only knobs (identity, listen address,
//! bootstrap list). Every field defaults, so a missing file still boots a
//! working node.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use shared_types::NetworkConfig;

/// Identity of the local node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NodeIdentity {
    /// Stable peer identifier announced to the mesh.
    pub peer_id: String,
    /// Multiaddress this node listens on.
    pub listen_addr: String,
}

impl Default for NodeIdentity {
    fn default() -> Self {
        Self {
            peer_id: "dmesh-local".into(),
            listen_addr: "/memory/1".into(),
        }
    }
}

/// Top-level configuration for the node runtime.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Local identity.
    pub node: NodeIdentity,
    /// Multiaddresses dialed at startup.
    pub bootstrap: Vec<String>,
    /// Networking core knobs shared with the subsystems.
    pub network: NetworkConfig,
}

impl RuntimeConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Load configuration, falling back to defaults when the file is absent
    /// or malformed.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "using default configuration");
                Self::default()
            }
        }
    }
}
