//! Chain-client seam: transaction submission and confirmation queries.

use alloy_core::primitives::{Address, Bytes};
use anyhow::{Context, Result};
use serde_json::Value;
use url::Url;

use crate::rpc;

/// Receipt data for a confirmed creation transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreationReceipt {
    /// Address of the created contract.
    pub address: Address,
    /// Block the transaction was included in.
    pub block_number: u64,
    /// Whether the creation succeeded (false means reverted constructor).
    pub success: bool,
}

/// External collaborator that submits transactions and reports confirmations.
///
/// The executor is generic over this trait so tests can drive it with a
/// scripted in-memory chain.
pub trait ChainClient: Send + Sync {
    /// Submit a contract-creation transaction, returning its hash.
    fn submit_contract_creation(
        &self,
        bytecode: &Bytes,
        args: &[Value],
    ) -> impl Future<Output = Result<String>> + Send;

    /// Number of confirmations observed for a transaction. Zero until the
    /// transaction is included in a block.
    fn get_confirmations(&self, tx_hash: &str) -> impl Future<Output = Result<u64>> + Send;

    /// The creation receipt, once the transaction has been included.
    fn creation_receipt(
        &self,
        tx_hash: &str,
    ) -> impl Future<Output = Result<Option<CreationReceipt>>> + Send;
}

impl<T: ChainClient> ChainClient for &T {
    async fn submit_contract_creation(&self, bytecode: &Bytes, args: &[Value]) -> Result<String> {
        (**self).submit_contract_creation(bytecode, args).await
    }

    async fn get_confirmations(&self, tx_hash: &str) -> Result<u64> {
        (**self).get_confirmations(tx_hash).await
    }

    async fn creation_receipt(&self, tx_hash: &str) -> Result<Option<CreationReceipt>> {
        (**self).creation_receipt(tx_hash).await
    }
}

/// JSON-RPC chain client for Ethereum-compatible endpoints.
pub struct HttpChainClient {
    client: reqwest::Client,
    url: String,
}

impl HttpChainClient {
    /// Create a client for the given RPC endpoint.
    pub fn new(rpc_url: &Url) -> Result<Self> {
        Ok(Self {
            client: rpc::create_client()?,
            url: rpc_url.to_string(),
        })
    }

    /// The unlocked account used as transaction sender (account index 0).
    async fn sender_account(&self) -> Result<String> {
        let accounts: Vec<String> =
            rpc::json_rpc_call(&self.client, &self.url, "eth_accounts", vec![])
                .await
                .context("Failed to list accounts")?;
        accounts
            .into_iter()
            .next()
            .context("RPC endpoint exposes no unlocked accounts")
    }

    async fn current_block(&self) -> Result<u64> {
        let result: String =
            rpc::json_rpc_call(&self.client, &self.url, "eth_blockNumber", vec![]).await?;
        rpc::parse_hex_u64(&result)
    }

    async fn raw_receipt(&self, tx_hash: &str) -> Result<Option<Value>> {
        let receipt: Value = rpc::json_rpc_call(
            &self.client,
            &self.url,
            "eth_getTransactionReceipt",
            vec![serde_json::json!(tx_hash)],
        )
        .await?;

        Ok((!receipt.is_null()).then_some(receipt))
    }
}

impl ChainClient for HttpChainClient {
    async fn submit_contract_creation(&self, bytecode: &Bytes, args: &[Value]) -> Result<String> {
        let from = self.sender_account().await?;
        let calldata = format!("0x{}{}", hex::encode(bytecode), encode_constructor_args(args)?);

        let tx_hash: String = rpc::json_rpc_call(
            &self.client,
            &self.url,
            "eth_sendTransaction",
            vec![serde_json::json!({
                "from": from,
                "data": calldata,
            })],
        )
        .await
        .context("Failed to send creation transaction")?;

        tracing::debug!(tx_hash = %tx_hash, "Creation transaction submitted");
        Ok(tx_hash)
    }

    async fn get_confirmations(&self, tx_hash: &str) -> Result<u64> {
        let Some(receipt) = self.raw_receipt(tx_hash).await? else {
            return Ok(0);
        };

        let included_block = receipt["blockNumber"]
            .as_str()
            .context("Receipt has no blockNumber")
            .and_then(rpc::parse_hex_u64)?;
        let current = self.current_block().await?;

        // Inclusion itself counts as the first confirmation.
        Ok(current.saturating_sub(included_block) + 1)
    }

    async fn creation_receipt(&self, tx_hash: &str) -> Result<Option<CreationReceipt>> {
        let Some(receipt) = self.raw_receipt(tx_hash).await? else {
            return Ok(None);
        };

        let address = receipt["contractAddress"]
            .as_str()
            .context("Receipt has no contractAddress")?
            .parse::<Address>()
            .context("Receipt contractAddress is not a valid address")?;
        let block_number = receipt["blockNumber"]
            .as_str()
            .context("Receipt has no blockNumber")
            .and_then(rpc::parse_hex_u64)?;
        let success = match receipt["status"].as_str() {
            Some(status) => rpc::parse_hex_u64(status)? == 1,
            // Pre-Byzantium endpoints omit status; treat inclusion as success.
            None => true,
        };

        Ok(Some(CreationReceipt {
            address,
            block_number,
            success,
        }))
    }
}

/// ABI-encode constructor arguments as 32-byte words.
///
/// Only word-sized scalars (unsigned integers and booleans) are supported;
/// dynamic types would require the full ABI from the compiler, which is out
/// of scope for the orchestrator.
pub fn encode_constructor_args(args: &[Value]) -> Result<String> {
    let mut encoded = String::with_capacity(args.len() * 64);
    for arg in args {
        match arg {
            Value::Number(n) => {
                let v = n
                    .as_u64()
                    .with_context(|| format!("Unsupported numeric constructor argument: {}", n))?;
                encoded.push_str(&format!("{:064x}", v));
            }
            Value::Bool(b) => {
                encoded.push_str(&format!("{:064x}", u64::from(*b)));
            }
            other => anyhow::bail!("Unsupported constructor argument type: {}", other),
        }
    }
    Ok(encoded)
}
