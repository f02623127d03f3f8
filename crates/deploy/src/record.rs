//! Deployment records and constructor-argument fingerprints.

use alloy_core::primitives::Address;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Compute a deterministic fingerprint of an ordered constructor-argument
/// sequence.
///
/// The arguments are serialized to JSON before hashing so the same sequence
/// always produces the same fingerprint. The fingerprint, not the raw
/// arguments, is what the planner compares for idempotency.
pub fn args_fingerprint(args: &[serde_json::Value]) -> String {
    let json = serde_json::to_string(args)
        .expect("constructor argument serialization should never fail");

    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    hex::encode(hasher.finalize())
}

/// The outcome of one confirmed contract deployment.
///
/// Records are written only after the executor has observed the target's
/// required confirmation count, so `address` is always populated. They are
/// never mutated, only superseded by appending a new record for the same
/// `(contract_name, network_name)` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    /// Deployment name of the contract.
    pub contract_name: String,
    /// Network the contract was deployed to.
    pub network_name: String,
    /// Address of the deployed contract.
    pub address: Address,
    /// Ordered constructor arguments used for the deployment.
    pub constructor_args: Vec<serde_json::Value>,
    /// Fingerprint of `constructor_args`, compared by the planner.
    pub args_fingerprint: String,
    /// Hash of the creation transaction.
    pub tx_hash: String,
    /// Block number at which the required confirmations were observed.
    pub confirmed_block: u64,
    /// Unix timestamp of record creation.
    pub deployed_at: u64,
}

impl DeploymentRecord {
    /// Build a record for a confirmed deployment.
    pub fn new(
        contract_name: impl Into<String>,
        network_name: impl Into<String>,
        address: Address,
        constructor_args: Vec<serde_json::Value>,
        tx_hash: impl Into<String>,
        confirmed_block: u64,
    ) -> Self {
        let args_fingerprint = args_fingerprint(&constructor_args);
        Self {
            contract_name: contract_name.into(),
            network_name: network_name.into(),
            address,
            constructor_args,
            args_fingerprint,
            tx_hash: tx_hash.into(),
            confirmed_block,
            deployed_at: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("System time should be after Unix epoch")
                .as_secs(),
        }
    }

    /// Derive the one-shot verification request for this record.
    pub fn verification_request(&self) -> VerificationRequest {
        VerificationRequest {
            address: self.address,
            constructor_args: self.constructor_args.clone(),
        }
    }
}

/// A one-shot request submitted to the verification service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationRequest {
    /// Address of the deployed contract.
    pub address: Address,
    /// Ordered constructor arguments, as used at deployment time.
    pub constructor_args: Vec<serde_json::Value>,
}

impl VerificationRequest {
    /// ABI-encode the constructor arguments for the verification API.
    ///
    /// The explorer compares this field against the tail of the recorded
    /// creation calldata, so the encoding must be the exact one used at
    /// submission time. Cannot fail for a record's own arguments: they were
    /// already encoded once when the deployment was submitted.
    pub fn encoded_args(&self) -> Result<String> {
        crate::chain::encode_constructor_args(&self.constructor_args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> DeploymentRecord {
        DeploymentRecord::new(
            "TokenContract",
            "mainnet",
            Address::repeat_byte(0x11),
            vec![serde_json::json!(1000000)],
            "0xdeadbeef",
            1_234_567,
        )
    }

    #[test]
    fn test_fingerprint_determinism() {
        let args = vec![serde_json::json!(1000000), serde_json::json!("owner")];
        let fp1 = args_fingerprint(&args);
        let fp2 = args_fingerprint(&args);

        assert_eq!(fp1, fp2, "Fingerprint should be deterministic");
        assert_eq!(fp1.len(), 64, "SHA-256 fingerprint should be 64 hex characters");
    }

    #[test]
    fn test_fingerprint_changes_with_value() {
        let fp1 = args_fingerprint(&[serde_json::json!(1000000)]);
        let fp2 = args_fingerprint(&[serde_json::json!(2000000)]);
        assert_ne!(fp1, fp2);
    }

    #[test]
    fn test_fingerprint_is_order_sensitive() {
        let fp1 = args_fingerprint(&[serde_json::json!(1), serde_json::json!(2)]);
        let fp2 = args_fingerprint(&[serde_json::json!(2), serde_json::json!(1)]);
        assert_ne!(fp1, fp2, "Constructor arguments are an ordered sequence");
    }

    #[test]
    fn test_record_carries_args_fingerprint() {
        let record = sample_record();
        assert_eq!(
            record.args_fingerprint,
            args_fingerprint(&record.constructor_args)
        );
        assert!(record.deployed_at > 0);
    }

    #[test]
    fn test_verification_request_derivation() {
        let record = sample_record();
        let request = record.verification_request();

        assert_eq!(request.address, record.address);
        assert_eq!(request.constructor_args, record.constructor_args);
    }

    #[test]
    fn test_encoded_args_match_creation_calldata_tail() {
        let record = sample_record();
        let encoded = record.verification_request().encoded_args().unwrap();

        // The same encoding the chain client appends to the creation
        // bytecode, never a re-serialization of the raw argument values.
        assert_eq!(
            encoded,
            crate::chain::encode_constructor_args(&record.constructor_args).unwrap()
        );
        assert_eq!(
            encoded,
            "00000000000000000000000000000000000000000000000000000000000f4240"
        );
    }

    #[test]
    fn test_record_json_roundtrip() {
        let record = sample_record();
        let json = serde_json::to_string(&record).unwrap();
        let parsed: DeploymentRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record, parsed);
    }
}
