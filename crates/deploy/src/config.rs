//! Deployment manifest and target resolution.
//!
//! The manifest (`Caravel.toml`) is the single configuration source for a
//! run: network definitions, the development-network list, contract entries
//! and verifier credentials. It is loaded once at process start and resolved
//! into typed [`DeploymentTarget`]s; nothing downstream re-derives network
//! classification ad hoc.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use alloy_core::primitives::Bytes;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ConfigError;

/// The default name for the caravel manifest file.
pub const MANIFEST_FILENAME: &str = "Caravel.toml";

fn default_confirmations() -> i64 {
    1
}

fn default_confirmation_timeout_secs() -> u64 {
    300
}

fn default_poll_interval_secs() -> u64 {
    2
}

/// Raw per-network manifest entry.
///
/// `required_confirmations` is kept signed here so a negative value in the
/// manifest surfaces as a [`ConfigError`] instead of a deserialization
/// failure with no context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkEntry {
    /// JSON-RPC endpoint of the network.
    pub rpc_url: String,
    /// Confirmations to wait for before a deployment is considered final.
    #[serde(default = "default_confirmations")]
    pub required_confirmations: i64,
    /// Upper bound on the confirmation wait, in seconds.
    #[serde(default = "default_confirmation_timeout_secs")]
    pub confirmation_timeout_secs: u64,
    /// Initial interval between confirmation polls, in seconds.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

/// A contract entry in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractSpec {
    /// Deployment name, the idempotency key together with the network.
    pub name: String,
    /// Path to the compiled creation bytecode (hex, `0x`-prefixed or not).
    pub bytecode_path: PathBuf,
    /// Ordered constructor arguments.
    #[serde(default)]
    pub args: Vec<serde_json::Value>,
    /// Free-form tags used by the CLI to select contracts for a run.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ContractSpec {
    /// Load the creation bytecode from `bytecode_path`.
    pub fn load_bytecode(&self) -> Result<Bytes> {
        let raw = std::fs::read_to_string(&self.bytecode_path).context(format!(
            "Failed to read bytecode for '{}' from {}",
            self.name,
            self.bytecode_path.display()
        ))?;
        let hex_str = raw.trim().trim_start_matches("0x");
        let bytes = hex::decode(hex_str).context(format!(
            "Bytecode for '{}' is not valid hex",
            self.name
        ))?;
        Ok(Bytes::from(bytes))
    }

    /// Whether this contract matches any of the given tags.
    ///
    /// An empty filter matches everything.
    pub fn matches_tags(&self, tags: &[String]) -> bool {
        tags.is_empty() || self.tags.iter().any(|t| tags.contains(t))
    }
}

/// Explicit verifier configuration.
///
/// Credential presence is decided here, at configuration-load time, rather
/// than by ambient environment lookups inside the verifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifierConfig {
    /// Verification service endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    /// Verification service credential. Absent means verification is skipped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl VerifierConfig {
    /// Whether a usable credential is configured.
    pub fn has_credential(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }
}

/// The deployment manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Networks considered development environments (never verified).
    #[serde(default)]
    pub development_networks: Vec<String>,
    /// Network definitions, keyed by network name.
    #[serde(default)]
    pub networks: BTreeMap<String, NetworkEntry>,
    /// Contracts to deploy, in manifest order.
    #[serde(default)]
    pub contracts: Vec<ContractSpec>,
    /// Verifier endpoint and credential.
    #[serde(default)]
    pub verifier: VerifierConfig,
    /// Directory for deployment records. Defaults to `./deployments`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records_dir: Option<PathBuf>,
}

impl Manifest {
    /// Save the manifest to a TOML file.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).context("Failed to serialize manifest to TOML")?;
        std::fs::write(path, content)
            .context(format!("Failed to write manifest to {}", path.display()))?;
        tracing::info!(path = %path.display(), "Manifest saved");
        Ok(())
    }

    /// Load the manifest from a TOML file or a directory containing one.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(anyhow::anyhow!(
                "Manifest file or directory not found: {}",
                path.display()
            ));
        }

        let manifest_path = if path.is_dir() {
            path.join(MANIFEST_FILENAME)
        } else {
            path.to_path_buf()
        };

        let content = std::fs::read_to_string(&manifest_path)
            .context(format!("Failed to read manifest from {}", path.display()))?;
        let manifest: Self =
            toml::from_str(&content).context("Failed to parse manifest as TOML")?;
        tracing::info!(path = %manifest_path.display(), "Manifest loaded");
        Ok(manifest)
    }

    /// Resolve one network by name into a typed [`DeploymentTarget`].
    pub fn resolve_target(&self, network_name: &str) -> Result<DeploymentTarget, ConfigError> {
        let entry = self
            .networks
            .get(network_name)
            .ok_or_else(|| ConfigError::UnknownNetwork(network_name.to_string()))?;

        let required_confirmations =
            u64::try_from(entry.required_confirmations).map_err(|_| {
                ConfigError::NegativeConfirmations {
                    network: network_name.to_string(),
                    value: entry.required_confirmations,
                }
            })?;

        let rpc_url = Url::parse(&entry.rpc_url).map_err(|_| ConfigError::InvalidRpcUrl {
            network: network_name.to_string(),
            url: entry.rpc_url.clone(),
        })?;

        Ok(DeploymentTarget {
            network_name: network_name.to_string(),
            rpc_url,
            is_development: self
                .development_networks
                .iter()
                .any(|n| n == network_name),
            required_confirmations,
            confirmation_timeout: Duration::from_secs(entry.confirmation_timeout_secs),
            poll_interval: Duration::from_secs(entry.poll_interval_secs),
        })
    }

    /// Resolve every configured network.
    pub fn resolve_all_targets(&self) -> Result<Vec<DeploymentTarget>, ConfigError> {
        self.networks
            .keys()
            .map(|name| self.resolve_target(name))
            .collect()
    }

    /// Contracts matching the given tag filter, in manifest order.
    pub fn contracts_for_tags(&self, tags: &[String]) -> Vec<&ContractSpec> {
        self.contracts
            .iter()
            .filter(|c| c.matches_tags(tags))
            .collect()
    }

    /// Directory where deployment records are persisted.
    pub fn records_dir(&self) -> PathBuf {
        self.records_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("deployments"))
    }
}

/// A fully resolved deployment target. Immutable after resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentTarget {
    /// Network name, part of the record-store key.
    pub network_name: String,
    /// JSON-RPC endpoint.
    pub rpc_url: Url,
    /// Development targets are never submitted for verification.
    pub is_development: bool,
    /// Confirmations required before a record is written.
    pub required_confirmations: u64,
    /// Upper bound on the confirmation wait.
    pub confirmation_timeout: Duration,
    /// Initial confirmation poll interval.
    pub poll_interval: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest_with(network: &str, entry: NetworkEntry) -> Manifest {
        let mut networks = BTreeMap::new();
        networks.insert(network.to_string(), entry);
        Manifest {
            development_networks: vec!["hardhat".to_string(), "localhost".to_string()],
            networks,
            ..Default::default()
        }
    }

    fn mainnet_entry() -> NetworkEntry {
        NetworkEntry {
            rpc_url: "http://localhost:8545".to_string(),
            required_confirmations: 6,
            confirmation_timeout_secs: 300,
            poll_interval_secs: 2,
        }
    }

    #[test]
    fn test_resolve_target() {
        let manifest = manifest_with("mainnet", mainnet_entry());
        let target = manifest.resolve_target("mainnet").unwrap();

        assert_eq!(target.network_name, "mainnet");
        assert!(!target.is_development);
        assert_eq!(target.required_confirmations, 6);
        assert_eq!(target.confirmation_timeout, Duration::from_secs(300));
    }

    #[test]
    fn test_resolve_development_flag() {
        let manifest = manifest_with("hardhat", mainnet_entry());
        let target = manifest.resolve_target("hardhat").unwrap();
        assert!(target.is_development);
    }

    #[test]
    fn test_resolve_unknown_network() {
        let manifest = manifest_with("mainnet", mainnet_entry());
        assert_eq!(
            manifest.resolve_target("goerli"),
            Err(ConfigError::UnknownNetwork("goerli".to_string()))
        );
    }

    #[test]
    fn test_resolve_negative_confirmations() {
        let mut entry = mainnet_entry();
        entry.required_confirmations = -1;
        let manifest = manifest_with("mainnet", entry);

        assert_eq!(
            manifest.resolve_target("mainnet"),
            Err(ConfigError::NegativeConfirmations {
                network: "mainnet".to_string(),
                value: -1,
            })
        );
    }

    #[test]
    fn test_resolve_invalid_rpc_url() {
        let mut entry = mainnet_entry();
        entry.rpc_url = "not a url".to_string();
        let manifest = manifest_with("mainnet", entry);

        assert!(matches!(
            manifest.resolve_target("mainnet"),
            Err(ConfigError::InvalidRpcUrl { .. })
        ));
    }

    #[test]
    fn test_manifest_toml_roundtrip() {
        let manifest = manifest_with("mainnet", mainnet_entry());
        let toml_str = toml::to_string_pretty(&manifest).unwrap();
        let parsed: Manifest = toml::from_str(&toml_str).unwrap();
        assert_eq!(manifest, parsed);
    }

    #[test]
    fn test_manifest_defaults_from_minimal_toml() {
        let manifest: Manifest = toml::from_str(
            r#"
            development_networks = ["hardhat"]

            [networks.sepolia]
            rpc_url = "https://rpc.sepolia.org"
            "#,
        )
        .unwrap();

        let entry = &manifest.networks["sepolia"];
        assert_eq!(entry.required_confirmations, 1);
        assert_eq!(entry.confirmation_timeout_secs, 300);
        assert_eq!(entry.poll_interval_secs, 2);
    }

    #[test]
    fn test_contract_tag_filter() {
        let token = ContractSpec {
            name: "TokenContract".to_string(),
            bytecode_path: PathBuf::from("artifacts/OurToken.bin"),
            args: vec![serde_json::json!(1000000)],
            tags: vec!["all".to_string(), "token".to_string()],
        };

        assert!(token.matches_tags(&[]));
        assert!(token.matches_tags(&["token".to_string()]));
        assert!(!token.matches_tags(&["governance".to_string()]));
    }

    #[test]
    fn test_credential_presence() {
        assert!(!VerifierConfig::default().has_credential());
        assert!(
            !VerifierConfig {
                api_key: Some(String::new()),
                ..Default::default()
            }
            .has_credential()
        );
        assert!(
            VerifierConfig {
                api_key: Some("key".to_string()),
                ..Default::default()
            }
            .has_credential()
        );
    }

    #[test]
    fn test_manifest_save_and_load() {
        let temp_dir = tempdir::TempDir::new("caravel-test").expect("Failed to create temp dir");
        let path = temp_dir.path().join(MANIFEST_FILENAME);

        let manifest = manifest_with("mainnet", mainnet_entry());
        manifest.save_to_file(&path).unwrap();

        let loaded = Manifest::load_from_file(&path).unwrap();
        assert_eq!(manifest, loaded);

        // Loading by directory resolves the default filename.
        let loaded = Manifest::load_from_file(temp_dir.path()).unwrap();
        assert_eq!(manifest, loaded);
    }
}
