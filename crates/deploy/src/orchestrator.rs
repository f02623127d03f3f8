//! Orchestrator: plan, deploy and verify contracts per target.
//!
//! Per target the lifecycle is sequential (verification needs a confirmed
//! address); independent targets run concurrently and share nothing but the
//! append-only record store.

use alloy_core::primitives::Address;
use serde::{Deserialize, Serialize};

use crate::chain::ChainClient;
use crate::config::{DeploymentTarget, Manifest};
use crate::error::{ConfigError, DeployError};
use crate::executor::Executor;
use crate::planner;
use crate::store::RecordStore;
use crate::verifier::{VerificationResult, VerificationService, Verifier};

/// Per-target deployment lifecycle state.
///
/// `Deployed` is terminal for development targets and credential-less runs;
/// `Verified` and `VerificationFailed` are the verification terminals.
/// `VerificationFailed` never fails the run.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "kebab-case")]
pub enum DeployState {
    NotDeployed,
    Deploying,
    Deployed,
    Verifying,
    Verified,
    VerificationFailed,
}

/// Outcome of one contract on one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractReport {
    pub contract_name: String,
    pub network_name: String,
    pub address: Address,
    pub tx_hash: String,
    /// True when the planner reused an up-to-date prior deployment.
    pub reused: bool,
    pub state: DeployState,
    pub verification: VerificationResult,
}

/// Drives the plan → deploy → verify pipeline for the manifest's contracts.
pub struct Orchestrator<V> {
    manifest: Manifest,
    store: RecordStore,
    verifier: Verifier<V>,
}

impl<V: VerificationService> Orchestrator<V> {
    pub fn new(manifest: Manifest, store: RecordStore, verifier: Verifier<V>) -> Self {
        Self {
            manifest,
            store,
            verifier,
        }
    }

    /// The manifest this orchestrator was built from.
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// The shared record store.
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Run every tagged contract against one target, sequentially.
    ///
    /// `force_deploy` bypasses the planner and always redeploys.
    pub async fn run_target<C: ChainClient>(
        &self,
        chain: &C,
        target: &DeploymentTarget,
        tags: &[String],
        force_deploy: bool,
    ) -> Result<Vec<ContractReport>, DeployError> {
        let executor = Executor::new(chain);
        let contracts = self.manifest.contracts_for_tags(tags);

        tracing::info!(
            network = %target.network_name,
            contracts = contracts.len(),
            "Starting deployment run..."
        );

        let mut reports = Vec::with_capacity(contracts.len());
        for contract in contracts {
            let report = self
                .run_contract(&executor, target, contract, force_deploy)
                .await?;
            reports.push(report);
        }

        Ok(reports)
    }

    async fn run_contract<C: ChainClient>(
        &self,
        executor: &Executor<&C>,
        target: &DeploymentTarget,
        contract: &crate::config::ContractSpec,
        force_deploy: bool,
    ) -> Result<ContractReport, DeployError> {
        tracing::debug!(
            contract = %contract.name,
            state = %DeployState::NotDeployed,
            "State transition"
        );
        let existing = self.store.latest(&contract.name, &target.network_name);

        let needs_deploy = force_deploy
            || planner::should_deploy(target, existing.as_ref(), &contract.args)?;

        let (record, reused) = if needs_deploy {
            tracing::debug!(
                contract = %contract.name,
                state = %DeployState::Deploying,
                "State transition"
            );

            let bytecode = contract
                .load_bytecode()
                .map_err(|e| DeployError::deployment_failed(&contract.name, e))?;
            if bytecode.is_empty() {
                return Err(ConfigError::EmptyBytecode(contract.name.clone()).into());
            }

            let record = executor
                .deploy(&contract.name, &bytecode, &contract.args, target)
                .await?;
            self.store
                .append(record.clone())
                .map_err(|e| DeployError::deployment_failed(&contract.name, e))?;
            (record, false)
        } else {
            let record = existing.expect("planner returned false without a prior record");
            tracing::info!(
                contract = %contract.name,
                network = %target.network_name,
                address = %record.address,
                "Reusing existing deployment"
            );
            (record, true)
        };

        tracing::debug!(
            contract = %contract.name,
            state = %DeployState::Deployed,
            "State transition"
        );

        // Verification is attempted for reused records too: the service
        // reports already-verified contracts as success, so this is
        // idempotent.
        if self.verifier.attempts_verification(target) {
            tracing::debug!(
                contract = %contract.name,
                state = %DeployState::Verifying,
                "State transition"
            );
        }
        let verification = self.verifier.verify(&record, target).await;

        let state = match &verification {
            VerificationResult::Skipped => DeployState::Deployed,
            VerificationResult::Verified => DeployState::Verified,
            VerificationResult::Failed(reason) => {
                tracing::warn!(
                    contract = %contract.name,
                    address = %record.address,
                    reason = %reason,
                    "Verification failed; deployment stands"
                );
                DeployState::VerificationFailed
            }
        };

        Ok(ContractReport {
            contract_name: record.contract_name.clone(),
            network_name: record.network_name.clone(),
            address: record.address,
            tx_hash: record.tx_hash.clone(),
            reused,
            state,
            verification,
        })
    }

    /// Run every configured target concurrently.
    ///
    /// `connect` builds a chain client per target. All targets run to
    /// completion; the first per-target failure is then reported, after
    /// successful targets have already appended their records.
    pub async fn run_all<C, F>(
        &self,
        connect: F,
        tags: &[String],
        force_deploy: bool,
    ) -> Result<Vec<ContractReport>, DeployError>
    where
        C: ChainClient,
        F: Fn(&DeploymentTarget) -> anyhow::Result<C>,
    {
        let targets = self.manifest.resolve_all_targets()?;

        let runs = targets.iter().map(|target| {
            let connect = &connect;
            async move {
                let chain = connect(target).map_err(|e| DeployError::ConnectionFailed {
                    network: target.network_name.clone(),
                    reason: e,
                })?;
                self.run_target(&chain, target, tags, force_deploy).await
            }
        });

        let mut reports = Vec::new();
        let mut first_error = None;
        for (target, result) in targets.iter().zip(futures::future::join_all(runs).await) {
            match result {
                Ok(mut r) => reports.append(&mut r),
                Err(e) => {
                    tracing::error!(
                        network = %target.network_name,
                        error = %e,
                        "Target run failed"
                    );
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(reports),
        }
    }
}
