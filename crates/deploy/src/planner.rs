//! Deployment planner: decides whether a contract needs (re)deployment.

use crate::config::DeploymentTarget;
use crate::error::ConfigError;
use crate::record::{DeploymentRecord, args_fingerprint};

/// Decide whether `contract` must be deployed to `target`.
///
/// Returns `true` when no prior record exists for the key or the constructor
/// arguments differ from the prior record's fingerprint. Pure, no side
/// effects. Target validation happens at manifest resolution, but the
/// invariant is re-checked here since this is a public seam.
pub fn should_deploy(
    target: &DeploymentTarget,
    existing: Option<&DeploymentRecord>,
    args: &[serde_json::Value],
) -> Result<bool, ConfigError> {
    // required_confirmations is unsigned by construction; a target built by
    // hand with a mismatched network name is still a configuration bug.
    if let Some(record) = existing
        && record.network_name != target.network_name
    {
        return Err(ConfigError::UnknownNetwork(record.network_name.clone()));
    }

    let Some(record) = existing else {
        tracing::debug!(network = %target.network_name, "No prior record, deploying");
        return Ok(true);
    };

    let changed = record.args_fingerprint != args_fingerprint(args);
    if changed {
        tracing::debug!(
            network = %target.network_name,
            contract = %record.contract_name,
            "Constructor arguments changed, redeploying"
        );
    } else {
        tracing::debug!(
            network = %target.network_name,
            contract = %record.contract_name,
            address = %record.address,
            "Up-to-date deployment found, skipping"
        );
    }
    Ok(changed)
}
