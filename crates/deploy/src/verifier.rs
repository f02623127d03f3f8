//! Contract verification against a block-explorer service.

use std::time::Duration;

use anyhow::{Context, Result};
use backon::{ExponentialBuilder, Retryable};
use serde_json::Value;

use crate::config::{DeploymentTarget, VerifierConfig};
use crate::record::{DeploymentRecord, VerificationRequest};

/// Default Etherscan-style verification endpoint.
pub const DEFAULT_VERIFIER_API_URL: &str = "https://api.etherscan.io/api";

/// Retries after the initial submission attempt (3 attempts total).
/// Explorers commonly reject submissions made right after deployment, before
/// block propagation completes.
const VERIFY_RETRIES: usize = 2;

/// Outcome of a verification run for one deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationResult {
    /// Verification was not attempted: development target or no credential.
    Skipped,
    /// The service accepted the contract (or had already verified it).
    Verified,
    /// The service permanently rejected the submission. Non-fatal; the
    /// deployment itself stands.
    Failed(String),
}

/// A single submission's outcome as reported by the service.
///
/// Transient transport failures are `Err` at the trait boundary and subject
/// to retry; these variants are terminal answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted,
    AlreadyVerified,
    Rejected(String),
}

/// External verification service seam.
pub trait VerificationService: Send + Sync {
    /// Submit one verification request with the given credential.
    fn submit_verification(
        &self,
        request: &VerificationRequest,
        credential: &str,
    ) -> impl Future<Output = Result<SubmitOutcome>> + Send;
}

/// Gates, retries and reports verification submissions.
///
/// Credential presence comes from the explicit [`VerifierConfig`] handed in
/// at construction time, never from ambient environment lookups.
pub struct Verifier<V> {
    service: V,
    config: VerifierConfig,
}

impl<V: VerificationService> Verifier<V> {
    pub fn new(service: V, config: VerifierConfig) -> Self {
        Self { service, config }
    }

    /// Whether [`verify`](Self::verify) will actually submit for this target,
    /// rather than short-circuit to [`VerificationResult::Skipped`].
    pub fn attempts_verification(&self, target: &DeploymentTarget) -> bool {
        !target.is_development && self.config.has_credential()
    }

    /// Verify a confirmed deployment, if the target policy allows it.
    ///
    /// Never fails the deployment: every outcome, including permanent
    /// rejection, is folded into [`VerificationResult`].
    pub async fn verify(
        &self,
        record: &DeploymentRecord,
        target: &DeploymentTarget,
    ) -> VerificationResult {
        if target.is_development {
            tracing::debug!(
                network = %target.network_name,
                contract = %record.contract_name,
                "Development network, skipping verification"
            );
            return VerificationResult::Skipped;
        }

        if !self.config.has_credential() {
            tracing::debug!(
                network = %target.network_name,
                contract = %record.contract_name,
                "No verification credential configured, skipping verification"
            );
            return VerificationResult::Skipped;
        }
        let credential = self.config.api_key.as_deref().unwrap_or_default();

        tracing::info!(
            contract = %record.contract_name,
            address = %record.address,
            network = %target.network_name,
            "Submitting contract for verification..."
        );

        let request = record.verification_request();
        let outcome = (|| async { self.service.submit_verification(&request, credential).await })
            .retry(ExponentialBuilder::default().with_max_times(VERIFY_RETRIES))
            .notify(|err: &anyhow::Error, dur: Duration| {
                tracing::warn!(
                    error = %err,
                    retry_in = ?dur,
                    "Verification submission failed, retrying..."
                );
            })
            .await;

        match outcome {
            Ok(SubmitOutcome::Accepted) => {
                tracing::info!(address = %record.address, "Contract verified");
                VerificationResult::Verified
            }
            Ok(SubmitOutcome::AlreadyVerified) => {
                tracing::info!(address = %record.address, "Contract already verified");
                VerificationResult::Verified
            }
            Ok(SubmitOutcome::Rejected(reason)) => {
                tracing::warn!(
                    address = %record.address,
                    reason = %reason,
                    "Verification rejected"
                );
                VerificationResult::Failed(reason)
            }
            Err(err) => {
                tracing::warn!(
                    address = %record.address,
                    error = %err,
                    "Verification gave up after retries"
                );
                VerificationResult::Failed(err.to_string())
            }
        }
    }
}

/// Etherscan-style verification API client.
pub struct EtherscanVerifier {
    client: reqwest::Client,
    api_url: String,
}

impl EtherscanVerifier {
    pub fn new(api_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: crate::rpc::create_client()?,
            api_url: api_url.into(),
        })
    }
}

impl VerificationService for EtherscanVerifier {
    async fn submit_verification(
        &self,
        request: &VerificationRequest,
        credential: &str,
    ) -> Result<SubmitOutcome> {
        let address = request.address.to_string();
        let encoded_args = request.encoded_args()?;

        // "constructorArguements" is the field name the Etherscan API expects.
        let params = [
            ("module", "contract"),
            ("action", "verifysourcecode"),
            ("apikey", credential),
            ("contractaddress", address.as_str()),
            ("constructorArguements", encoded_args.as_str()),
        ];

        let response: Value = self
            .client
            .post(&self.api_url)
            .form(&params)
            .send()
            .await
            .context("Failed to reach verification service")?
            .json()
            .await
            .context("Failed to parse verification response")?;

        let status = response["status"].as_str().unwrap_or_default();
        let result = response["result"].as_str().unwrap_or_default().to_string();

        if status == "1" {
            Ok(SubmitOutcome::Accepted)
        } else if result.to_lowercase().contains("already verified") {
            Ok(SubmitOutcome::AlreadyVerified)
        } else {
            Ok(SubmitOutcome::Rejected(result))
        }
    }
}
