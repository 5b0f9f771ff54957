//! The publish-boundary transform (spec §4.5): balances and stakes cross
//! from integer smallest-unit to floating human units exactly once, here.

use registry_common::{Amount, CoreNode, ResourceNode};
use registry_state::Snapshot;
use serde::Serialize;

fn to_human(amount: Amount, unit: Amount) -> f64 {
    amount as f64 / unit as f64
}

#[derive(Debug, Clone, Serialize)]
pub struct PublishedCoreNode {
    pub hash: String,
    pub owner: String,
    pub reward: String,
    pub manager: Option<String>,
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
    pub authorized: Vec<String>,
    pub stakers: std::collections::BTreeMap<String, f64>,
    pub total_staked: f64,
    pub status: registry_common::NodeStatus,
    pub resource_nodes: Vec<String>,
    pub has_bonus: bool,
    pub score: f64,
    pub performance: f64,
    pub decentralization: f64,
    pub inactive_since: Option<u64>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublishedResourceNode {
    pub hash: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub owner: String,
    pub manager: String,
    pub reward: String,
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
    pub authorized: Vec<String>,
    pub parent: Option<String>,
    pub status: registry_common::ResourceNodeStatus,
    pub score: f64,
    pub performance: f64,
    pub decentralization: f64,
    pub inactive_since: Option<u64>,
    pub created_at: i64,
}

/// The contractual `{nodes, resource_nodes}` publish payload.
#[derive(Debug, Clone, Serialize)]
pub struct PublishedSnapshot {
    pub height: u64,
    pub nodes: Vec<PublishedCoreNode>,
    pub resource_nodes: Vec<PublishedResourceNode>,
}

impl PublishedSnapshot {
    pub fn from_snapshot(snapshot: &Snapshot, decimals: u32) -> Self {
        let unit = 10u128.pow(decimals);
        Self {
            height: snapshot.height,
            nodes: snapshot.core_nodes.iter().map(|n| publish_core_node(n, unit)).collect(),
            resource_nodes: snapshot.resource_nodes.iter().map(publish_resource_node).collect(),
        }
    }
}

fn publish_core_node(node: &CoreNode, unit: Amount) -> PublishedCoreNode {
    PublishedCoreNode {
        hash: node.hash.clone(),
        owner: node.owner.clone(),
        reward: node.reward.clone(),
        manager: node.manager.clone(),
        name: node.name.clone(),
        multiaddress: node.multiaddress.clone(),
        address: node.address.clone(),
        picture: node.picture.clone(),
        banner: node.banner.clone(),
        description: node.description.clone(),
        registration_url: node.registration_url.clone(),
        terms_and_conditions: node.terms_and_conditions.clone(),
        stream_reward: node.stream_reward.clone(),
        locked: node.locked,
        authorized: node.authorized.iter().cloned().collect(),
        stakers: node.stakers.iter().map(|(a, v)| (a.clone(), to_human(*v, unit))).collect(),
        total_staked: to_human(node.total_staked, unit),
        status: node.status,
        resource_nodes: node.resource_nodes.clone(),
        has_bonus: node.has_bonus,
        score: node.score,
        performance: node.performance,
        decentralization: node.decentralization,
        inactive_since: node.inactive_since,
        created_at: node.created_at,
    }
}

fn publish_resource_node(node: &ResourceNode) -> PublishedResourceNode {
    PublishedResourceNode {
        hash: node.hash.clone(),
        node_type: node.node_type.clone(),
        owner: node.owner.clone(),
        manager: node.manager.clone(),
        reward: node.reward.clone(),
        name: node.name.clone(),
        multiaddress: node.multiaddress.clone(),
        address: node.address.clone(),
        picture: node.picture.clone(),
        banner: node.banner.clone(),
        description: node.description.clone(),
        registration_url: node.registration_url.clone(),
        terms_and_conditions: node.terms_and_conditions.clone(),
        stream_reward: node.stream_reward.clone(),
        locked: node.locked,
        authorized: node.authorized.iter().cloned().collect(),
        parent: node.parent.clone(),
        status: node.status,
        score: node.score,
        performance: node.performance,
        decentralization: node.decentralization,
        inactive_since: node.inactive_since,
        created_at: node.created_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn divides_staked_amounts_by_unit() {
        let mut node = test_core_node();
        node.total_staked = 1_500_000_000_000_000_000;
        node.stakers.insert("a".to_string(), 1_500_000_000_000_000_000);
        let snapshot = Snapshot { height: 1, core_nodes: vec![node], resource_nodes: vec![] };

        let published = PublishedSnapshot::from_snapshot(&snapshot, 18);
        assert_eq!(published.nodes[0].total_staked, 1.5);
        assert_eq!(published.nodes[0].stakers["a"], 1.5);
    }

    fn test_core_node() -> CoreNode {
        CoreNode {
            hash: "h".to_string(),
            owner: "owner".to_string(),
            reward: "owner".to_string(),
            manager: None,
            name: String::new(),
            multiaddress: String::new(),
            address: String::new(),
            picture: String::new(),
            banner: String::new(),
            description: String::new(),
            registration_url: String::new(),
            terms_and_conditions: String::new(),
            stream_reward: String::new(),
            locked: false,
            authorized: Default::default(),
            stakers: Default::default(),
            total_staked: 0,
            status: registry_common::NodeStatus::Waiting,
            resource_nodes: Vec::new(),
            has_bonus: false,
            score: 0.0,
            performance: 0.0,
            decentralization: 0.0,
            inactive_since: None,
            created_at: 0,
        }
    }
}
