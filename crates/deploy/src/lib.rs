//! caravel-deploy - Contract deployment orchestration library.
//!
//! This crate provides idempotent, verifiable contract deployment: a planner
//! that skips up-to-date deployments, an executor that waits for a
//! configurable confirmation count, and a verifier that submits confirmed
//! contracts to a block-explorer service.

mod chain;
mod config;
mod error;
mod executor;
mod orchestrator;
mod planner;
mod record;
pub mod rpc;
mod store;
mod verifier;

pub use chain::{ChainClient, CreationReceipt, HttpChainClient, encode_constructor_args};
pub use config::{
    ContractSpec, DeploymentTarget, MANIFEST_FILENAME, Manifest, NetworkEntry, VerifierConfig,
};
pub use error::{ConfigError, DeployError};
pub use executor::Executor;
pub use orchestrator::{ContractReport, DeployState, Orchestrator};
pub use planner::should_deploy;
pub use record::{DeploymentRecord, VerificationRequest, args_fingerprint};
pub use store::RecordStore;
pub use verifier::{
    DEFAULT_VERIFIER_API_URL, EtherscanVerifier, SubmitOutcome, VerificationResult,
    VerificationService, Verifier,
};
