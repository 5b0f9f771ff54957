//! Ingester interfaces (spec §6, out of scope for the core — specified
//! only as the traits the core consumes). Each ingester MUST emit its
//! output in strictly non-decreasing height order (spec §5); concurrent
//! I/O fan-out inside an implementation is fine as long as it resequences
//! before yielding.

use async_trait::async_trait;
use registry_common::event::{BalanceUpdate, Event};

use crate::window::{SeenWindow, DEFAULT_SEEN_WINDOW_CAPACITY};

/// A per-chain balance ingester (on-chain transfer-log follower, an
/// indexer follower, …). `poll` returns zero or more complete
/// per-platform balance snapshots at heights greater than `since_height`.
#[async_trait]
pub trait BalanceIngester: Send {
    fn platform(&self) -> &str;
    async fn poll(&mut self, since_height: u64) -> anyhow::Result<Vec<BalanceUpdate>>;
}

/// The signed-message feed: yields lifecycle, amend and score-report
/// events keyed by confirmation height. A shallow reorg can make the
/// upstream feed re-emit a message it already delivered; implementations
/// are expected to suppress repeats with a [`SeenWindow`] keyed by message
/// hash, the way [`ReplayMessageIngester`] does.
///
/// [`SeenWindow`]: crate::window::SeenWindow
#[async_trait]
pub trait MessageIngester: Send {
    async fn poll(&mut self, since_height: u64) -> anyhow::Result<Vec<Event>>;
}

/// A fixed, pre-ordered in-memory ingester, useful for tests and for the
/// `distribute` command replaying an archived event log rather than
/// following a live chain.
pub struct ReplayBalanceIngester {
    platform: String,
    events: std::vec::IntoIter<BalanceUpdate>,
}

impl ReplayBalanceIngester {
    pub fn new(platform: impl Into<String>, mut events: Vec<BalanceUpdate>) -> Self {
        events.sort_by_key(|e| e.height);
        Self {
            platform: platform.into(),
            events: events.into_iter(),
        }
    }
}

#[async_trait]
impl BalanceIngester for ReplayBalanceIngester {
    fn platform(&self) -> &str {
        &self.platform
    }

    async fn poll(&mut self, since_height: u64) -> anyhow::Result<Vec<BalanceUpdate>> {
        let mut out = Vec::new();
        while let Some(update) = self.events.as_slice().first() {
            if update.height <= since_height {
                self.events.next();
                continue;
            }
            break;
        }
        for update in self.events.by_ref() {
            out.push(update);
        }
        Ok(out)
    }
}

/// A fixed, pre-ordered in-memory message ingester, mirroring
/// `ReplayBalanceIngester`. Applies the same reorg-protection seen-hash
/// window a live feed would need, so a log containing a re-emitted hash
/// (the replayed equivalent of a shallow reorg re-announcing a message)
/// is not handed to the merge twice.
pub struct ReplayMessageIngester {
    events: std::vec::IntoIter<Event>,
    seen: SeenWindow,
}

impl ReplayMessageIngester {
    pub fn new(mut events: Vec<Event>) -> Self {
        events.sort_by_key(|e| e.height());
        Self {
            events: events.into_iter(),
            seen: SeenWindow::new(DEFAULT_SEEN_WINDOW_CAPACITY),
        }
    }
}

#[async_trait]
impl MessageIngester for ReplayMessageIngester {
    async fn poll(&mut self, _since_height: u64) -> anyhow::Result<Vec<Event>> {
        let mut out = Vec::new();
        for event in self.events.by_ref() {
            if let Some(hash) = event.hash() {
                if self.seen.contains(hash) {
                    continue;
                }
                self.seen.insert(hash.to_string());
            }
            out.push(event);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};

    fn update(height: u64, address: &str, balance: u128) -> BalanceUpdate {
        let mut balances = HashMap::new();
        balances.insert(address.to_string(), balance);
        let mut changed = HashSet::new();
        changed.insert(address.to_string());
        BalanceUpdate {
            platform: "eth".to_string(),
            height,
            balances,
            changed_addresses: changed,
        }
    }

    #[tokio::test]
    async fn replay_balance_ingester_only_yields_new_heights() {
        let mut ingester = ReplayBalanceIngester::new("eth", vec![update(1, "a", 1), update(2, "a", 2), update(3, "a", 3)]);
        let first = ingester.poll(1).await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].height, 2);
    }

    fn drop_node(hash: &str, height: u64) -> Event {
        Event::Lifecycle(registry_common::event::LifecycleMessage {
            hash: hash.to_string(),
            height,
            sender: "owner".to_string(),
            target: Some("node-hash".to_string()),
            action: registry_common::event::LifecycleAction::DropNode,
        })
    }

    #[tokio::test]
    async fn replay_message_ingester_suppresses_reemitted_hash() {
        let mut ingester = ReplayMessageIngester::new(vec![drop_node("m1", 1), drop_node("m1", 2)]);
        let events = ingester.poll(0).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].height(), 1);
    }
}
