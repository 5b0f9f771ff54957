//! Event stream contracts (spec §6).
//!
//! Four independent streams feed the state machine: balance updates,
//! lifecycle messages (node/stake mutations), amendments to node metadata,
//! and score reports. Each carries a `height` used by the merge and by the
//! watermark bookkeeping in `registry_state`. This module is the decoded,
//! typed schema implementers are expected to define for the source's
//! duck-typed `{type, ref?, content: {...}}` payloads — messages that don't
//! fit it are malformed and dropped before they ever reach an `Event`.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::types::{Address, Amount};

/// A complete balance snapshot for one platform at `height`, as reported by
/// a balance ingester (e.g. an ETH or a non-ETH watcher). `balances` is the
/// full address→balance map for that platform; `changed_addresses` is the
/// subset the state machine actually needs to re-evaluate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceUpdate {
    pub platform: String,
    pub height: u64,
    pub balances: HashMap<Address, Amount>,
    pub changed_addresses: HashSet<Address>,
}

/// The lifecycle action carried by a `LifecycleMessage`. Actions other than
/// the two `Create*` variants operate on `LifecycleMessage::target`, which
/// plays the role of the source's generic `ref`: the resource-node hash for
/// `Link`/`Unlink`, the core-or-resource hash for `DropNode`, the core-node
/// hash for `Stake`/`StakeSplit`/`Unstake`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum LifecycleAction {
    CreateNode { content: Box<CreateNodeContent> },
    CreateResourceNode { content: Box<CreateResourceNodeContent> },
    Link,
    Unlink,
    DropNode,
    Stake,
    StakeSplit,
    Unstake,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CreateNodeContent {
    pub manager: Option<Address>,
    pub reward: Option<Address>,
    pub locked: Option<bool>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub multiaddress: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub picture: String,
    #[serde(default)]
    pub banner: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub registration_url: String,
    #[serde(default)]
    pub terms_and_conditions: String,
    #[serde(default)]
    pub stream_reward: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CreateResourceNodeContent {
    /// Precondition: must be present (non-empty).
    #[serde(rename = "type", default)]
    pub node_type: String,
    pub manager: Option<Address>,
    pub reward: Option<Address>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub multiaddress: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub picture: String,
    #[serde(default)]
    pub banner: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub registration_url: String,
    #[serde(default)]
    pub terms_and_conditions: String,
    #[serde(default)]
    pub stream_reward: String,
}

/// A node-or-resource-node mutation. `sender` is the address that signed
/// the underlying message, checked against `owner`/`authorized`/`manager`
/// at dispatch time; `target` is the `ref` the action applies to (absent
/// for the two `Create*` actions, which mint a fresh hash instead).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleMessage {
    pub hash: String,
    pub height: u64,
    pub sender: Address,
    pub target: Option<String>,
    pub action: LifecycleAction,
}

/// Metadata-only update to an existing core or resource node. Any field
/// left `None` is left unchanged; see spec §4.3 for per-field defaulting
/// rules applied once the amend is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AmendMessage {
    pub hash: String,
    pub height: u64,
    pub sender: Address,
    pub target: String,
    pub name: Option<String>,
    pub multiaddress: Option<String>,
    pub address: Option<String>,
    pub picture: Option<String>,
    pub banner: Option<String>,
    pub description: Option<String>,
    pub registration_url: Option<String>,
    pub terms_and_conditions: Option<String>,
    pub reward: Option<Address>,
    pub stream_reward: Option<String>,
    pub manager: Option<Address>,
    pub authorized: Option<Vec<Address>>,
    pub locked: Option<bool>,
}

/// A score report for a single core or resource node, from a scores sender.
/// The upstream payload groups many nodes per message; the ingester is
/// expected to fan that out into one `ScoreReport` per `node_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub height: u64,
    pub sender: Address,
    pub target: String,
    pub score: f64,
    pub performance: f64,
    pub decentralization: f64,
}

/// The merged, height-ordered event stream consumed by `registry_state`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    Balance(BalanceUpdate),
    Lifecycle(LifecycleMessage),
    Amend(AmendMessage),
    Score(ScoreReport),
}

impl Event {
    pub fn height(&self) -> u64 {
        match self {
            Event::Balance(e) => e.height,
            Event::Lifecycle(e) => e.height,
            Event::Amend(e) => e.height,
            Event::Score(e) => e.height,
        }
    }

    /// The signed-message hash, for the two variants that carry one.
    /// `Balance`/`Score` have no message identity to dedup on.
    pub fn hash(&self) -> Option<&str> {
        match self {
            Event::Lifecycle(e) => Some(&e.hash),
            Event::Amend(e) => Some(&e.hash),
            Event::Balance(_) | Event::Score(_) => None,
        }
    }
}
