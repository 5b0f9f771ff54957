//! Core type definitions for the node registry

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// An opaque, case-sensitive account identifier. Canonicalization (if any)
/// is the caller's responsibility — the registry never mutates addresses.
pub type Address = String;

/// A balance, stake, or reward amount expressed in the smallest token unit
/// (`10^decimals`). Never negative in practice; kept unsigned so arithmetic
/// mistakes that would go negative fail loudly instead of wrapping.
pub type Amount = u128;

/// Derived activity status of a core node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Active,
    Waiting,
}

/// Derived link status of a resource node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceNodeStatus {
    Linked,
    Waiting,
}

/// A core node (CCN): an operator-run node that requires its owner to hold
/// at least `node_threshold` tokens, and becomes `active` once it has
/// aggregated at least `activation_threshold` of total delegated stake.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreNode {
    /// Identifier of the message that created this node.
    pub hash: String,
    pub owner: Address,
    pub reward: Address,
    pub manager: Option<Address>,

    pub name: String,
    pub multiaddress: String,
    pub address: String,
    pub picture: String,
    pub banner: String,
    pub description: String,
    pub registration_url: String,
    pub terms_and_conditions: String,
    pub stream_reward: String,

    pub locked: bool,
    pub authorized: BTreeSet<Address>,

    /// Per-staker stake contribution, in smallest token unit.
    pub stakers: std::collections::BTreeMap<Address, Amount>,
    /// Invariant: always equal to `stakers.values().sum()` (I4).
    pub total_staked: Amount,
    pub status: NodeStatus,

    /// Linked resource-node hashes, insertion-ordered, bounded by `MAX_LINKED`.
    pub resource_nodes: Vec<String>,

    /// Fixed at creation: true iff the node was created before `bonus_start_height`.
    pub has_bonus: bool,

    pub score: f64,
    pub performance: f64,
    pub decentralization: f64,
    pub inactive_since: Option<u64>,

    pub created_at: i64,
}

impl CoreNode {
    pub fn recompute_total_staked(&mut self) {
        self.total_staked = self.stakers.values().sum();
    }
}

/// A resource node (CRN): a compute node linked to at most one core node,
/// eligible for rewards only while linked and scored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceNode {
    pub hash: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub owner: Address,
    pub manager: Address,
    pub reward: Address,

    pub name: String,
    pub multiaddress: String,
    pub address: String,
    pub picture: String,
    pub banner: String,
    pub description: String,
    pub registration_url: String,
    pub terms_and_conditions: String,
    pub stream_reward: String,

    pub locked: bool,
    pub authorized: BTreeSet<Address>,

    /// Parent core-node hash, or `None` while unlinked.
    pub parent: Option<String>,
    pub status: ResourceNodeStatus,

    pub score: f64,
    pub performance: f64,
    pub decentralization: f64,
    pub inactive_since: Option<u64>,

    pub created_at: i64,
}
