//! Append-only deployment-record store.
//!
//! Records are keyed by `(contract_name, network_name)` and partitioned per
//! network, so concurrent runs against independent targets never contend on
//! the same partition file. Appends take the write lock for the whole
//! append-and-persist step, which is what keeps concurrent appends from
//! losing updates.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use anyhow::{Context, Result};

use crate::record::DeploymentRecord;

/// Process-wide deployment-record store.
pub struct RecordStore {
    /// Per-network record partitions, each append-only.
    partitions: RwLock<BTreeMap<String, Vec<DeploymentRecord>>>,
    /// Persistence root. `None` keeps the store in memory (tests).
    dir: Option<PathBuf>,
}

impl RecordStore {
    /// Open a store rooted at `dir`, loading any existing partition files.
    ///
    /// The directory is created if it does not exist. Each partition is a
    /// `<network>.json` file holding that network's records in append order.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).context(format!(
            "Failed to create records directory {}",
            dir.display()
        ))?;

        let mut partitions = BTreeMap::new();
        for entry in std::fs::read_dir(&dir)
            .context(format!("Failed to read records directory {}", dir.display()))?
        {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(network) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let records = Self::load_partition(&path)?;
            tracing::debug!(network, count = records.len(), "Loaded record partition");
            partitions.insert(network.to_string(), records);
        }

        Ok(Self {
            partitions: RwLock::new(partitions),
            dir: Some(dir),
        })
    }

    /// Create a store with no persistence.
    pub fn in_memory() -> Self {
        Self {
            partitions: RwLock::new(BTreeMap::new()),
            dir: None,
        }
    }

    fn load_partition(path: &Path) -> Result<Vec<DeploymentRecord>> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read record partition {}", path.display()))?;
        serde_json::from_str(&content)
            .context(format!("Failed to parse record partition {}", path.display()))
    }

    /// Append a record to its network partition and persist the partition.
    pub fn append(&self, record: DeploymentRecord) -> Result<()> {
        let mut partitions = self
            .partitions
            .write()
            .expect("record store lock poisoned");

        let network = record.network_name.clone();
        let partition = partitions.entry(network.clone()).or_default();
        partition.push(record);

        if let Some(ref dir) = self.dir {
            let path = dir.join(format!("{}.json", network));
            let json = serde_json::to_string_pretty(partition)
                .context("Failed to serialize record partition")?;
            std::fs::write(&path, json).context(format!(
                "Failed to write record partition to {}",
                path.display()
            ))?;
        }

        Ok(())
    }

    /// The most recent record for a `(contract_name, network_name)` key.
    pub fn latest(&self, contract_name: &str, network_name: &str) -> Option<DeploymentRecord> {
        let partitions = self
            .partitions
            .read()
            .expect("record store lock poisoned");

        partitions.get(network_name).and_then(|records| {
            records
                .iter()
                .rev()
                .find(|r| r.contract_name == contract_name)
                .cloned()
        })
    }

    /// All records for one network, in append order.
    pub fn records_for_network(&self, network_name: &str) -> Vec<DeploymentRecord> {
        let partitions = self
            .partitions
            .read()
            .expect("record store lock poisoned");
        partitions.get(network_name).cloned().unwrap_or_default()
    }

    /// Total record count across all partitions.
    pub fn len(&self) -> usize {
        let partitions = self
            .partitions
            .read()
            .expect("record store lock poisoned");
        partitions.values().map(Vec::len).sum()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use alloy_core::primitives::Address;
    use tempdir::TempDir;

    use super::*;

    fn record(contract: &str, network: &str, nonce: u8) -> DeploymentRecord {
        DeploymentRecord::new(
            contract,
            network,
            Address::repeat_byte(nonce),
            vec![serde_json::json!(nonce)],
            format!("0x{:02x}", nonce),
            nonce as u64,
        )
    }

    #[test]
    fn test_latest_returns_most_recent() {
        let store = RecordStore::in_memory();
        store.append(record("TokenContract", "mainnet", 1)).unwrap();
        store.append(record("TokenContract", "mainnet", 2)).unwrap();

        let latest = store.latest("TokenContract", "mainnet").unwrap();
        assert_eq!(latest.address, Address::repeat_byte(2));
    }

    #[test]
    fn test_partitions_are_network_isolated() {
        let store = RecordStore::in_memory();
        store.append(record("TokenContract", "mainnet", 1)).unwrap();
        store.append(record("TokenContract", "sepolia", 2)).unwrap();

        assert_eq!(
            store.latest("TokenContract", "mainnet").unwrap().address,
            Address::repeat_byte(1)
        );
        assert_eq!(
            store.latest("TokenContract", "sepolia").unwrap().address,
            Address::repeat_byte(2)
        );
        assert!(store.latest("TokenContract", "hardhat").is_none());
    }

    #[test]
    fn test_save_and_reload() {
        let temp_dir = TempDir::new("caravel-store").expect("Failed to create temp dir");

        let store = RecordStore::open(temp_dir.path()).unwrap();
        store.append(record("TokenContract", "mainnet", 1)).unwrap();
        store.append(record("Registry", "mainnet", 2)).unwrap();
        drop(store);

        let reopened = RecordStore::open(temp_dir.path()).unwrap();
        assert_eq!(reopened.len(), 2);
        assert_eq!(
            reopened.latest("Registry", "mainnet").unwrap().address,
            Address::repeat_byte(2)
        );
    }

    #[test]
    fn test_open_rejects_corrupted_partition() {
        let temp_dir = TempDir::new("caravel-store").expect("Failed to create temp dir");
        std::fs::write(temp_dir.path().join("mainnet.json"), "{ invalid json }").unwrap();

        assert!(RecordStore::open(temp_dir.path()).is_err());
    }

    #[tokio::test]
    async fn test_concurrent_appends_lose_nothing() {
        let store = Arc::new(RecordStore::in_memory());

        let mut handles = Vec::new();
        for i in 0..8u8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                for j in 0..16u8 {
                    let network = format!("net-{}", i);
                    store
                        .append(record("TokenContract", &network, j))
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.len(), 8 * 16);
        for i in 0..8u8 {
            assert_eq!(
                store.records_for_network(&format!("net-{}", i)).len(),
                16
            );
        }
    }
}
