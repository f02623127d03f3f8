//! Error taxonomy for deployment runs.
//!
//! [`ConfigError`] aborts before any transaction is submitted.
//! [`DeployError`] is fatal for the target it occurred on. Verification
//! failures are deliberately not part of this taxonomy: they are carried in
//! [`crate::VerificationResult::Failed`] and never fail a deployment.

use std::time::Duration;

use thiserror::Error;

/// Static configuration problems, detected before any chain interaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The requested network is not defined in the manifest.
    #[error("network '{0}' is not defined in the manifest")]
    UnknownNetwork(String),

    /// The manifest carries a negative confirmation count.
    #[error("network '{network}': required_confirmations must be >= 0, got {value}")]
    NegativeConfirmations { network: String, value: i64 },

    /// A contract entry references no deployable bytecode.
    #[error("contract '{0}': empty bytecode artifact")]
    EmptyBytecode(String),

    /// The manifest RPC URL could not be parsed.
    #[error("network '{network}': invalid rpc_url '{url}'")]
    InvalidRpcUrl { network: String, url: String },
}

/// Failures of a single deployment target.
#[derive(Debug, Error)]
pub enum DeployError {
    /// Bad static configuration. Fatal, aborts before any transaction.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The creation transaction was rejected or reverted.
    #[error("deployment of '{contract}' failed: {reason}")]
    DeploymentFailed {
        contract: String,
        #[source]
        reason: anyhow::Error,
    },

    /// No chain client could be constructed for a target.
    #[error("failed to connect to network '{network}': {reason}")]
    ConnectionFailed {
        network: String,
        #[source]
        reason: anyhow::Error,
    },

    /// The required confirmation count was not observed within the window.
    /// Recoverable by operator retry.
    #[error(
        "timed out after {waited:?} waiting for {required} confirmations of {tx_hash}"
    )]
    ConfirmationTimeout {
        tx_hash: String,
        required: u64,
        waited: Duration,
    },
}

impl DeployError {
    /// Wrap an underlying chain-client failure for the given contract.
    pub fn deployment_failed(contract: impl Into<String>, reason: anyhow::Error) -> Self {
        Self::DeploymentFailed {
            contract: contract.into(),
            reason,
        }
    }
}
