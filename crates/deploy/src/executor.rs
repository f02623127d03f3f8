//! Deployment executor: submits creation transactions and waits for
//! confirmations.

use std::time::Duration;

use alloy_core::primitives::Bytes;
use anyhow::Context;
use serde_json::Value;

use crate::chain::{ChainClient, CreationReceipt};
use crate::config::DeploymentTarget;
use crate::error::DeployError;
use crate::record::DeploymentRecord;

/// Cap on the confirmation poll interval once backoff has grown it.
const MAX_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Submits creation transactions and blocks until they are confirmed.
pub struct Executor<C> {
    chain: C,
}

impl<C: ChainClient> Executor<C> {
    pub fn new(chain: C) -> Self {
        Self { chain }
    }

    /// Deploy `contract_name` to `target` and wait for the target's required
    /// confirmation count.
    ///
    /// The confirmation wait polls with exponential backoff and is bounded by
    /// the target's `confirmation_timeout`; an elapsed window fails with
    /// [`DeployError::ConfirmationTimeout`]. The wait is an ordinary future,
    /// so dropping it (e.g. when the run is aborted) cancels the wait.
    pub async fn deploy(
        &self,
        contract_name: &str,
        bytecode: &Bytes,
        args: &[Value],
        target: &DeploymentTarget,
    ) -> Result<DeploymentRecord, DeployError> {
        tracing::info!(
            contract = %contract_name,
            network = %target.network_name,
            required_confirmations = target.required_confirmations,
            "Submitting creation transaction..."
        );

        let tx_hash = self
            .chain
            .submit_contract_creation(bytecode, args)
            .await
            .map_err(|e| DeployError::deployment_failed(contract_name, e))?;

        let receipt = tokio::time::timeout(
            target.confirmation_timeout,
            self.wait_for_confirmations(contract_name, &tx_hash, target),
        )
        .await
        .map_err(|_| DeployError::ConfirmationTimeout {
            tx_hash: tx_hash.clone(),
            required: target.required_confirmations,
            waited: target.confirmation_timeout,
        })??;

        let record = DeploymentRecord::new(
            contract_name,
            &target.network_name,
            receipt.address,
            args.to_vec(),
            tx_hash,
            receipt.block_number,
        );

        tracing::info!(
            event = "deployed",
            contract = %contract_name,
            network = %target.network_name,
            address = %record.address,
            tx_hash = %record.tx_hash,
            confirmed_block = record.confirmed_block,
            "Contract deployed"
        );

        Ok(record)
    }

    /// Poll until `required_confirmations` are observed, backing off between
    /// polls. Chain-client errors propagate; they are never swallowed.
    async fn wait_for_confirmations(
        &self,
        contract_name: &str,
        tx_hash: &str,
        target: &DeploymentTarget,
    ) -> Result<CreationReceipt, DeployError> {
        let mut interval = target.poll_interval.max(Duration::from_millis(100));

        loop {
            let confirmations = self
                .chain
                .get_confirmations(tx_hash)
                .await
                .map_err(|e| DeployError::deployment_failed(contract_name, e))?;

            if confirmations > 0 {
                let receipt = self
                    .chain
                    .creation_receipt(tx_hash)
                    .await
                    .and_then(|r| r.context("Confirmed transaction has no receipt"))
                    .map_err(|e| DeployError::deployment_failed(contract_name, e))?;

                if !receipt.success {
                    return Err(DeployError::deployment_failed(
                        contract_name,
                        anyhow::anyhow!("creation transaction {} reverted", tx_hash),
                    ));
                }

                if confirmations >= target.required_confirmations {
                    return Ok(receipt);
                }
            }

            tracing::debug!(
                tx_hash = %tx_hash,
                confirmations,
                required = target.required_confirmations,
                next_poll = ?interval,
                "Waiting for confirmations..."
            );

            tokio::time::sleep(interval).await;
            interval = (interval * 2).min(MAX_POLL_INTERVAL);
        }
    }
}
