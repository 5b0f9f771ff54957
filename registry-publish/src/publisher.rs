//! `Publisher` and `TransferBatcher` — external collaborators (spec §6).
//! Only the interfaces the core drives are in scope; actually publishing
//! to an aggregate store, and actually signing/broadcasting transfers, are
//! explicit Non-goals. The implementations here just log.

use std::collections::HashMap;

use async_trait::async_trait;
use registry_common::Address;
use serde::Serialize;
use tracing::info;

use crate::snapshot_payload::PublishedSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DistributionStatus {
    Calculation,
    Simulation,
    Distribution,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    Pending,
    Failed,
}

/// One batch's outcome, appended to `DistributionPost::targets` by the
/// integrator after calling [`TransferBatcher::batch`].
#[derive(Debug, Clone, Serialize)]
pub struct TransferRecord {
    pub success: bool,
    pub status: TransferStatus,
    pub tx: Option<String>,
    pub chain: String,
    pub sender: Address,
    pub targets: HashMap<Address, f64>,
    pub total: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DistributionPost {
    pub incentive: String,
    pub status: DistributionStatus,
    pub start_height: u64,
    pub end_height: u64,
    pub rewards: HashMap<Address, f64>,
    pub targets: Vec<TransferRecord>,
}

#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish_snapshot(&self, snapshot: &PublishedSnapshot, channel: &str) -> anyhow::Result<()>;
    async fn publish_distribution(&self, post: &DistributionPost, channel: &str) -> anyhow::Result<()>;
}

#[async_trait]
pub trait TransferBatcher: Send + Sync {
    /// Splits `rewards` into groups of at most `batch_size` and returns one
    /// [`TransferRecord`] per batch. The integrator MUST NOT retry a failed
    /// batch automatically (spec §7).
    async fn batch(
        &self,
        sender: &Address,
        chain: &str,
        rewards: &HashMap<Address, f64>,
        batch_size: usize,
    ) -> anyhow::Result<Vec<TransferRecord>>;
}

/// Logs instead of actually publishing. Used by `run`/`distribute` in
/// `calculation`/`simulation` mode and as the default until a real
/// aggregate-store client is wired in.
pub struct LoggingPublisher;

#[async_trait]
impl Publisher for LoggingPublisher {
    async fn publish_snapshot(&self, snapshot: &PublishedSnapshot, channel: &str) -> anyhow::Result<()> {
        info!(
            channel,
            height = snapshot.height,
            nodes = snapshot.nodes.len(),
            resource_nodes = snapshot.resource_nodes.len(),
            "publish_snapshot"
        );
        Ok(())
    }

    async fn publish_distribution(&self, post: &DistributionPost, channel: &str) -> anyhow::Result<()> {
        info!(
            channel,
            status = ?post.status,
            start_height = post.start_height,
            end_height = post.end_height,
            recipients = post.rewards.len(),
            "publish_distribution"
        );
        Ok(())
    }
}

/// Prepares batches and records them as `pending` without signing or
/// broadcasting anything (spec §1 Non-goals).
pub struct NoopTransferBatcher;

#[async_trait]
impl TransferBatcher for NoopTransferBatcher {
    async fn batch(
        &self,
        sender: &Address,
        chain: &str,
        rewards: &HashMap<Address, f64>,
        batch_size: usize,
    ) -> anyhow::Result<Vec<TransferRecord>> {
        let mut entries: Vec<(&Address, &f64)> = rewards.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));

        let mut records = Vec::new();
        for chunk in entries.chunks(batch_size.max(1)) {
            let targets: HashMap<Address, f64> = chunk.iter().map(|(a, v)| ((*a).clone(), **v)).collect();
            let total: f64 = targets.values().sum();
            records.push(TransferRecord {
                success: true,
                status: TransferStatus::Pending,
                tx: None,
                chain: chain.to_string(),
                sender: sender.clone(),
                targets,
                total,
            });
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn batches_respect_batch_size() {
        let batcher = NoopTransferBatcher;
        let mut rewards = HashMap::new();
        for i in 0..5 {
            rewards.insert(format!("addr{i}"), 1.0);
        }
        let batches = batcher.batch(&"sender".to_string(), "eth", &rewards, 2).await.unwrap();
        assert_eq!(batches.len(), 3);
        assert!(batches.iter().all(|b| b.targets.len() <= 2));
        assert!(batches.iter().all(|b| matches!(b.status, TransferStatus::Pending)));
    }
}
