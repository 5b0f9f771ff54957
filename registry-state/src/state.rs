//! The in-memory state machine (spec §3, §4.3).
//!
//! `RegistryState` owns every core node, resource node and index described
//! in §3 and applies one `Event` at a time via [`RegistryState::apply`].
//! Precondition failures are silent no-ops: `apply` returns `None` and
//! nothing is mutated. This mirrors the teacher's `State::handle_tx_certs`
//! dispatch shape (one `match` per event kind, one method per action) but
//! the preconditions here are part of the domain, not infrastructure.

use std::collections::{HashMap, HashSet};

use registry_common::event::{
    AmendMessage, BalanceUpdate, CreateNodeContent, CreateResourceNodeContent, Event,
    LifecycleAction, LifecycleMessage, ScoreReport,
};
use registry_common::math::{hostname_from_multiaddress, url_host};
use registry_common::{Address, Amount, CoreNode, NodeStatus, RegistryConfig, ResourceNode, ResourceNodeStatus};
use tracing::debug;

use crate::snapshot::Snapshot;

/// Score reports within this many heights of the previous one for the same
/// node are smoothed (element-wise max) rather than overwritten.
const SCORE_SMOOTHING_WINDOW: u64 = 10;
/// Below this score a node is considered inactive (spec §4.3 ScoreReport).
const INACTIVITY_SCORE_THRESHOLD: f64 = 0.01;

pub struct RegistryState {
    pub config: RegistryConfig,

    core_nodes: HashMap<String, CoreNode>,
    resource_nodes: HashMap<String, ResourceNode>,
    address_to_owned_node: HashMap<Address, String>,
    /// Insertion-ordered, deduplicated per spec §4.3.
    address_to_stakes: HashMap<Address, Vec<String>>,
    balances: HashMap<Address, Amount>,
    platform_balances: HashMap<String, HashMap<Address, Amount>>,

    pub last_checked_height: u64,
    pub last_balance_height_eth: u64,
    pub last_balance_height_others: u64,
    pub last_message_height: u64,
    pub last_score_height: u64,
}

impl RegistryState {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            config,
            core_nodes: HashMap::new(),
            resource_nodes: HashMap::new(),
            address_to_owned_node: HashMap::new(),
            address_to_stakes: HashMap::new(),
            balances: HashMap::new(),
            platform_balances: HashMap::new(),
            last_checked_height: 0,
            last_balance_height_eth: 0,
            last_balance_height_others: 0,
            last_message_height: 0,
            last_score_height: 0,
        }
    }

    pub fn core_nodes(&self) -> &HashMap<String, CoreNode> {
        &self.core_nodes
    }

    pub fn resource_nodes(&self) -> &HashMap<String, ResourceNode> {
        &self.resource_nodes
    }

    pub fn balance(&self, address: &str) -> Amount {
        *self.balances.get(address).unwrap_or(&0)
    }

    pub fn stakes_of(&self, address: &str) -> &[String] {
        self.address_to_stakes.get(address).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Applies one event, returning the resulting snapshot iff the event
    /// actually mutated state (spec §4.3 "snapshot emission").
    pub fn apply(&mut self, event: &Event) -> Option<Snapshot> {
        self.last_checked_height = self.last_checked_height.max(event.height());

        let mutated = match event {
            Event::Balance(update) => self.apply_balance_update(update),
            Event::Lifecycle(message) => {
                let mutated = self.apply_lifecycle_message(message);
                self.last_message_height = self.last_message_height.max(message.height);
                mutated
            }
            Event::Amend(amend) => {
                let mutated = self.apply_amend_message(amend);
                self.last_message_height = self.last_message_height.max(amend.height);
                mutated
            }
            Event::Score(report) => self.apply_score_report(report),
        };

        if mutated {
            Some(self.snapshot_at(event.height()))
        } else {
            None
        }
    }

    /// Builds a snapshot of the current state tagged with an arbitrary
    /// height, without requiring a mutating event. Used by the reward
    /// integrator to close out the final segment of a pass.
    pub fn snapshot_at(&self, height: u64) -> Snapshot {
        Snapshot {
            height,
            core_nodes: self.core_nodes.values().cloned().collect(),
            resource_nodes: self.resource_nodes.values().cloned().collect(),
        }
    }

    // ---- 4.2 aggregated balance view + 4.3 BalanceUpdate ----

    fn apply_balance_update(&mut self, update: &BalanceUpdate) -> bool {
        self.platform_balances.insert(update.platform.clone(), update.balances.clone());

        if update.platform == "eth" {
            self.last_balance_height_eth = self.last_balance_height_eth.max(update.height);
        } else {
            self.last_balance_height_others = self.last_balance_height_others.max(update.height);
        }

        let mut mutated = false;
        for address in &update.changed_addresses {
            let recomputed: Amount = self
                .platform_balances
                .values()
                .filter_map(|m| m.get(address))
                .sum();
            self.balances.insert(address.clone(), recomputed);
        }
        for address in &update.changed_addresses {
            mutated |= self.apply_balance_consequence(address);
        }
        mutated
    }

    fn apply_balance_consequence(&mut self, address: &str) -> bool {
        let balance = self.balance(address);
        if let Some(owned) = self.address_to_owned_node.get(address).cloned() {
            if balance < self.config.node_threshold {
                self.drop_core(&owned);
                return true;
            }
            return false;
        }
        let stakes = self.address_to_stakes.get(address).cloned().unwrap_or_default();
        if stakes.is_empty() {
            return false;
        }
        if balance < self.config.staking_threshold {
            self.remove_all_stakes(address);
            return true;
        }
        for hash in &stakes {
            self.update_node_stats(hash);
        }
        true
    }

    // ---- 4.3 LifecycleMessage ----

    fn apply_lifecycle_message(&mut self, message: &LifecycleMessage) -> bool {
        match &message.action {
            LifecycleAction::CreateNode { content } => self.handle_create_node(message, content),
            LifecycleAction::CreateResourceNode { content } => {
                self.handle_create_resource_node(message, content)
            }
            LifecycleAction::Link => self.handle_link(message),
            LifecycleAction::Unlink => self.handle_unlink(message),
            LifecycleAction::DropNode => self.handle_drop_node(message),
            LifecycleAction::Stake => self.handle_stake(message),
            LifecycleAction::StakeSplit => self.handle_stake_split(message),
            LifecycleAction::Unstake => self.handle_unstake(message),
        }
    }

    fn handle_create_node(&mut self, message: &LifecycleMessage, content: &CreateNodeContent) -> bool {
        let sender = &message.sender;
        if self.address_to_owned_node.contains_key(sender) {
            debug!(sender, "create-node rejected: sender already owns a node");
            return false;
        }
        if self.balance(sender) < self.config.node_threshold {
            debug!(sender, "create-node rejected: balance below node_threshold");
            return false;
        }

        if !self.address_to_stakes.get(sender).map(|s| s.is_empty()).unwrap_or(true) {
            self.remove_all_stakes(sender);
        }

        let multiaddress = self.validate_multiaddress(&content.multiaddress, None);
        let node = CoreNode {
            hash: message.hash.clone(),
            owner: sender.clone(),
            reward: content.reward.clone().unwrap_or_else(|| sender.clone()),
            manager: Some(content.manager.clone().unwrap_or_default()),
            name: content.name.clone(),
            multiaddress,
            address: content.address.clone(),
            picture: content.picture.clone(),
            banner: content.banner.clone(),
            description: content.description.clone(),
            registration_url: content.registration_url.clone(),
            terms_and_conditions: content.terms_and_conditions.clone(),
            stream_reward: content.stream_reward.clone(),
            locked: content.locked.unwrap_or(false),
            authorized: Default::default(),
            stakers: Default::default(),
            total_staked: 0,
            status: NodeStatus::Waiting,
            resource_nodes: Vec::new(),
            has_bonus: message.height < self.config.bonus_start_height,
            score: 0.0,
            performance: 0.0,
            decentralization: 0.0,
            inactive_since: None,
            created_at: message.height as i64,
        };
        self.address_to_owned_node.insert(sender.clone(), node.hash.clone());
        self.core_nodes.insert(node.hash.clone(), node);
        true
    }

    fn handle_create_resource_node(
        &mut self,
        message: &LifecycleMessage,
        content: &CreateResourceNodeContent,
    ) -> bool {
        if content.node_type.is_empty() {
            debug!("create-resource-node rejected: missing type");
            return false;
        }
        let sender = &message.sender;
        let address = self.validate_resource_address(&content.address, None);
        let node = ResourceNode {
            hash: message.hash.clone(),
            node_type: content.node_type.clone(),
            owner: sender.clone(),
            manager: content.manager.clone().unwrap_or_else(|| sender.clone()),
            reward: content.reward.clone().unwrap_or_else(|| sender.clone()),
            name: content.name.clone(),
            multiaddress: content.multiaddress.clone(),
            address,
            picture: content.picture.clone(),
            banner: content.banner.clone(),
            description: content.description.clone(),
            registration_url: content.registration_url.clone(),
            terms_and_conditions: content.terms_and_conditions.clone(),
            stream_reward: content.stream_reward.clone(),
            locked: false,
            authorized: Default::default(),
            parent: None,
            status: ResourceNodeStatus::Waiting,
            score: 0.0,
            performance: 0.0,
            decentralization: 0.0,
            inactive_since: None,
            created_at: message.height as i64,
        };
        self.resource_nodes.insert(node.hash.clone(), node);
        true
    }

    fn handle_link(&mut self, message: &LifecycleMessage) -> bool {
        let Some(target) = &message.target else { return false };
        let Some(parent_hash) = self.address_to_owned_node.get(&message.sender).cloned() else {
            return false;
        };
        let Some(parent) = self.core_nodes.get(&parent_hash) else { return false };
        if parent.resource_nodes.len() >= self.config.node_max_linked {
            return false;
        }
        if parent.resource_nodes.contains(target) {
            return false;
        }
        let Some(resource) = self.resource_nodes.get(target) else { return false };
        if resource.parent.is_some() || resource.locked {
            return false;
        }

        self.core_nodes.get_mut(&parent_hash).unwrap().resource_nodes.push(target.clone());
        {
            let resource = self.resource_nodes.get_mut(target).unwrap();
            resource.parent = Some(parent_hash.clone());
            resource.status = ResourceNodeStatus::Linked;
        }
        self.update_node_stats(&parent_hash);
        true
    }

    fn handle_unlink(&mut self, message: &LifecycleMessage) -> bool {
        let Some(target) = &message.target else { return false };
        let Some(resource) = self.resource_nodes.get(target) else { return false };
        let Some(parent_hash) = resource.parent.clone() else { return false };
        let authorized = message.sender == resource.owner
            || self
                .core_nodes
                .get(&parent_hash)
                .map(|n| n.owner == message.sender)
                .unwrap_or(false);
        if !authorized {
            return false;
        }

        if let Some(parent) = self.core_nodes.get_mut(&parent_hash) {
            parent.resource_nodes.retain(|h| h != target);
        }
        if let Some(resource) = self.resource_nodes.get_mut(target) {
            resource.parent = None;
            resource.status = ResourceNodeStatus::Waiting;
        }
        self.update_node_stats(&parent_hash);
        true
    }

    fn handle_drop_node(&mut self, message: &LifecycleMessage) -> bool {
        let Some(target) = &message.target else { return false };
        if let Some(owner) = self.core_nodes.get(target).map(|n| n.owner.clone()) {
            if owner == message.sender {
                self.drop_core(target);
                return true;
            }
            return false;
        }
        if let Some(owner) = self.resource_nodes.get(target).map(|n| n.owner.clone()) {
            if owner == message.sender {
                self.drop_resource(target);
                return true;
            }
        }
        false
    }

    fn handle_stake(&mut self, message: &LifecycleMessage) -> bool {
        let Some(target) = &message.target else { return false };
        let sender = &message.sender;
        if self.balance(sender) < self.config.staking_threshold {
            return false;
        }
        let Some(node) = self.core_nodes.get(target) else { return false };
        if self.address_to_owned_node.contains_key(sender) {
            return false;
        }
        if node.locked && !node.authorized.contains(sender) {
            return false;
        }

        if !self.address_to_stakes.get(sender).map(|s| s.is_empty()).unwrap_or(true) {
            self.remove_all_stakes(sender);
        }
        self.address_to_stakes.insert(sender.clone(), vec![target.clone()]);
        let balance = self.balance(sender);
        self.core_nodes.get_mut(target).unwrap().stakers.insert(sender.clone(), balance);
        self.update_node_stats(target);
        true
    }

    fn handle_stake_split(&mut self, message: &LifecycleMessage) -> bool {
        let Some(target) = &message.target else { return false };
        let sender = &message.sender;
        if self.balance(sender) < self.config.staking_threshold {
            return false;
        }
        if self.address_to_owned_node.contains_key(sender) {
            return false;
        }
        let Some(node) = self.core_nodes.get(target) else { return false };
        if node.locked && !node.authorized.contains(sender) {
            return false;
        }
        let existing = self.address_to_stakes.entry(sender.clone()).or_default();
        if existing.contains(target) {
            return false;
        }
        existing.push(target.clone());
        let targets = existing.clone();
        for hash in &targets {
            self.update_node_stats(hash);
        }
        true
    }

    fn handle_unstake(&mut self, message: &LifecycleMessage) -> bool {
        let Some(target) = &message.target else { return false };
        let sender = &message.sender;
        let staking_here = self
            .address_to_stakes
            .get(sender)
            .map(|s| s.contains(target))
            .unwrap_or(false);
        if !staking_here {
            return false;
        }
        self.remove_one_stake(sender, target);
        true
    }

    // ---- 4.3 AmendMessage ----

    fn apply_amend_message(&mut self, amend: &AmendMessage) -> bool {
        if self.core_nodes.contains_key(&amend.target) {
            return self.amend_core_node(amend);
        }
        if self.resource_nodes.contains_key(&amend.target) {
            return self.amend_resource_node(amend);
        }
        false
    }

    fn amend_core_node(&mut self, amend: &AmendMessage) -> bool {
        let authorized = {
            let node = self.core_nodes.get(&amend.target).unwrap();
            node.owner == amend.sender || node.manager.as_deref() == Some(amend.sender.as_str())
        };
        if !authorized {
            return false;
        }

        let multiaddress = amend
            .multiaddress
            .as_ref()
            .map(|m| self.validate_multiaddress(m, Some(&amend.target)));

        let node = self.core_nodes.get_mut(&amend.target).unwrap();
        if let Some(v) = &amend.name {
            node.name = v.clone();
        }
        if let Some(v) = multiaddress {
            node.multiaddress = v;
        }
        if let Some(v) = &amend.address {
            node.address = v.clone();
        }
        if let Some(v) = &amend.picture {
            node.picture = v.clone();
        }
        if let Some(v) = &amend.banner {
            node.banner = v.clone();
        }
        if let Some(v) = &amend.description {
            node.description = v.clone();
        }
        if let Some(v) = &amend.registration_url {
            node.registration_url = v.clone();
        }
        if let Some(v) = &amend.terms_and_conditions {
            node.terms_and_conditions = v.clone();
        }
        if let Some(v) = &amend.stream_reward {
            node.stream_reward = v.clone();
        }
        node.reward = amend.reward.clone().unwrap_or_else(|| node.reward.clone());
        node.manager = amend.manager.clone().or_else(|| node.manager.clone());
        if let Some(v) = &amend.authorized {
            node.authorized = v.iter().cloned().collect();
        }
        if let Some(v) = amend.locked {
            node.locked = v;
        }
        true
    }

    fn amend_resource_node(&mut self, amend: &AmendMessage) -> bool {
        let authorized = {
            let node = self.resource_nodes.get(&amend.target).unwrap();
            node.owner == amend.sender || node.manager == amend.sender
        };
        if !authorized {
            return false;
        }

        let address = amend
            .address
            .as_ref()
            .map(|a| self.validate_resource_address(a, Some(&amend.target)));

        let node = self.resource_nodes.get_mut(&amend.target).unwrap();
        if let Some(v) = &amend.name {
            node.name = v.clone();
        }
        if let Some(v) = &amend.multiaddress {
            node.multiaddress = v.clone();
        }
        if let Some(v) = address {
            node.address = v;
        }
        if let Some(v) = &amend.picture {
            node.picture = v.clone();
        }
        if let Some(v) = &amend.banner {
            node.banner = v.clone();
        }
        if let Some(v) = &amend.description {
            node.description = v.clone();
        }
        if let Some(v) = &amend.registration_url {
            node.registration_url = v.clone();
        }
        if let Some(v) = &amend.terms_and_conditions {
            node.terms_and_conditions = v.clone();
        }
        if let Some(v) = &amend.stream_reward {
            node.stream_reward = v.clone();
        }
        node.reward = amend.reward.clone().unwrap_or_else(|| node.reward.clone());
        node.manager = amend.manager.clone().unwrap_or_else(|| node.manager.clone());
        if let Some(v) = &amend.authorized {
            node.authorized = v.iter().cloned().collect();
        }
        if let Some(v) = amend.locked {
            node.locked = v;
        }
        true
    }

    // ---- 4.3 ScoreReport ----

    fn apply_score_report(&mut self, report: &ScoreReport) -> bool {
        // Off-by-one preserved verbatim from the source: `last_score_height >
        // height - 10`, evaluated against the one shared watermark before
        // any node in this (or a same-height sibling) report updates it, not
        // a per-node watermark. Two nodes scored within the same 10-height
        // window therefore both smooth against this single global gate.
        let smoothing_active =
            self.last_score_height as i64 > report.height as i64 - SCORE_SMOOTHING_WINDOW as i64;

        let applied = if let Some(node) = self.core_nodes.get_mut(&report.target) {
            let (score, performance) =
                Self::smooth_score(smoothing_active, node.score, node.performance, report.score, report.performance);
            node.score = score;
            node.performance = performance;
            node.decentralization = report.decentralization;
            Self::apply_inactivity(&mut node.inactive_since, report.height, score);
            true
        } else if let Some(node) = self.resource_nodes.get_mut(&report.target) {
            let (score, performance) =
                Self::smooth_score(smoothing_active, node.score, node.performance, report.score, report.performance);
            node.score = score;
            node.performance = performance;
            node.decentralization = report.decentralization;
            let inactive_since = node.inactive_since;
            Self::apply_inactivity(&mut node.inactive_since, report.height, score);
            self.evict_if_inactive(&report.target, inactive_since);
            true
        } else {
            false
        };

        self.last_score_height = self.last_score_height.max(report.height);
        applied
    }

    /// Keeps the higher of the incoming and current score/performance when
    /// the shared smoothing window is active, otherwise overwrites outright.
    fn smooth_score(smoothing_active: bool, current_score: f64, current_performance: f64, score: f64, performance: f64) -> (f64, f64) {
        if smoothing_active {
            (score.max(current_score), performance.max(current_performance))
        } else {
            (score, performance)
        }
    }

    fn apply_inactivity(inactive_since: &mut Option<u64>, height: u64, score: f64) {
        if score < INACTIVITY_SCORE_THRESHOLD {
            if inactive_since.is_none() {
                *inactive_since = Some(height);
            }
        } else {
            *inactive_since = None;
        }
    }

    fn evict_if_inactive(&mut self, hash: &str, _previous_inactive_since: Option<u64>) {
        let Some(node) = self.resource_nodes.get(hash) else { return };
        if node.parent.is_some() {
            return;
        }
        let Some(inactive_since) = node.inactive_since else { return };
        let height = self.last_checked_height;
        if height <= self.config.crn_inactivity_cutoff_height {
            return;
        }
        let threshold = self.config.crn_inactivity_threshold_days * self.config.blocks_per_day;
        if height - inactive_since > threshold {
            self.drop_resource(hash);
        }
    }

    // ---- 4.3 derived operations D1-D4, update_node_stats ----

    fn drop_core(&mut self, hash: &str) {
        let Some(node) = self.core_nodes.remove(hash) else { return };
        self.address_to_owned_node.remove(&node.owner);

        for staker in node.stakers.keys() {
            let mut now_empty = false;
            if let Some(stakes) = self.address_to_stakes.get_mut(staker) {
                stakes.retain(|h| h != hash);
                now_empty = stakes.is_empty();
            }
            if now_empty {
                self.address_to_stakes.remove(staker);
            }
        }
        let affected: HashSet<String> = node
            .stakers
            .keys()
            .flat_map(|a| self.address_to_stakes.get(a).cloned().unwrap_or_default())
            .collect();
        for other in affected {
            self.update_node_stats(&other);
        }

        for resource_hash in &node.resource_nodes {
            if let Some(resource) = self.resource_nodes.get_mut(resource_hash) {
                resource.parent = None;
                resource.status = ResourceNodeStatus::Waiting;
            }
        }
    }

    fn remove_all_stakes(&mut self, address: &str) {
        let Some(stakes) = self.address_to_stakes.remove(address) else { return };
        for hash in &stakes {
            if let Some(node) = self.core_nodes.get_mut(hash) {
                node.stakers.remove(address);
            }
            self.update_node_stats(hash);
        }
    }

    fn drop_resource(&mut self, hash: &str) {
        let Some(node) = self.resource_nodes.remove(hash) else { return };
        if let Some(parent_hash) = node.parent {
            if let Some(parent) = self.core_nodes.get_mut(&parent_hash) {
                parent.resource_nodes.retain(|h| h != hash);
            }
            self.update_node_stats(&parent_hash);
        }
    }

    fn remove_one_stake(&mut self, address: &str, hash: &str) {
        let mut now_empty = false;
        if let Some(stakes) = self.address_to_stakes.get_mut(address) {
            stakes.retain(|h| h != hash);
            now_empty = stakes.is_empty();
        }
        if now_empty {
            self.address_to_stakes.remove(address);
        }
        if let Some(node) = self.core_nodes.get_mut(hash) {
            node.stakers.remove(address);
        }
        self.update_node_stats(hash);
        let remaining = self.address_to_stakes.get(address).cloned().unwrap_or_default();
        for other in remaining {
            self.update_node_stats(&other);
        }
    }

    fn update_node_stats(&mut self, hash: &str) {
        let stakers: Vec<Address> = match self.core_nodes.get(hash) {
            Some(node) => node.stakers.keys().cloned().collect(),
            None => return,
        };
        for staker in &stakers {
            let split_count = self.address_to_stakes.get(staker).map(|s| s.len()).unwrap_or(1).max(1);
            let share = self.balance(staker) / split_count as Amount;
            self.core_nodes.get_mut(hash).unwrap().stakers.insert(staker.clone(), share);
        }
        let node = self.core_nodes.get_mut(hash).unwrap();
        node.recompute_total_staked();
        node.status = if node.total_staked + self.config.unit() >= self.config.activation_threshold {
            NodeStatus::Active
        } else {
            NodeStatus::Waiting
        };
    }

    // ---- 4.3 validation V1/V2 ----

    fn validate_multiaddress(&self, multiaddress: &str, exclude: Option<&str>) -> String {
        let Some(host) = hostname_from_multiaddress(multiaddress) else {
            return multiaddress.to_string();
        };
        let conflict = self.core_nodes.iter().any(|(hash, node)| {
            Some(hash.as_str()) != exclude
                && hostname_from_multiaddress(&node.multiaddress).as_deref() == Some(host.as_str())
        });
        if conflict {
            String::new()
        } else {
            multiaddress.to_string()
        }
    }

    fn validate_resource_address(&self, address: &str, exclude: Option<&str>) -> String {
        let Some(host) = url_host(address) else {
            return address.to_string();
        };
        let conflict = self.resource_nodes.iter().any(|(hash, node)| {
            Some(hash.as_str()) != exclude && url_host(&node.address).as_deref() == Some(host.as_str())
        });
        if conflict {
            String::new()
        } else {
            address.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RegistryConfig {
        let mut cfg = RegistryConfig::default();
        cfg.decimals = 0;
        cfg.node_threshold = 200_000;
        cfg.staking_threshold = 1;
        cfg.activation_threshold = 100_000;
        cfg.node_max_linked = 3;
        cfg
    }

    fn balance_event(height: u64, address: &str, balance: Amount) -> Event {
        let mut balances = HashMap::new();
        balances.insert(address.to_string(), balance);
        let mut changed = HashSet::new();
        changed.insert(address.to_string());
        Event::Balance(BalanceUpdate {
            platform: "eth".to_string(),
            height,
            balances,
            changed_addresses: changed,
        })
    }

    fn create_node_event(height: u64, hash: &str, sender: &str) -> Event {
        Event::Lifecycle(LifecycleMessage {
            hash: hash.to_string(),
            height,
            sender: sender.to_string(),
            target: None,
            action: LifecycleAction::CreateNode {
                content: Box::new(CreateNodeContent::default()),
            },
        })
    }

    fn stake_split_event(height: u64, hash: &str, sender: &str, target: &str) -> Event {
        Event::Lifecycle(LifecycleMessage {
            hash: hash.to_string(),
            height,
            sender: sender.to_string(),
            target: Some(target.to_string()),
            action: LifecycleAction::StakeSplit,
        })
    }

    #[test]
    fn s1_create_then_fall_below_threshold() {
        let mut state = RegistryState::new(config());
        state.apply(&balance_event(1, "A", 200_000));
        assert!(state.apply(&create_node_event(2, "h1", "A")).is_some());
        assert!(state.address_to_owned_node.contains_key("A"));

        state.apply(&balance_event(3, "A", 199_999));
        assert!(!state.address_to_owned_node.contains_key("A"));
        assert!(!state.core_nodes.contains_key("h1"));
    }

    #[test]
    fn s2_stake_split_equal_division() {
        let mut state = RegistryState::new(config());
        state.apply(&balance_event(1, "owner1", 200_000));
        state.apply(&create_node_event(2, "h1", "owner1"));
        state.apply(&balance_event(3, "owner2", 200_000));
        state.apply(&create_node_event(4, "h2", "owner2"));
        state.apply(&balance_event(5, "B", 30_000));

        state.apply(&stake_split_event(6, "m1", "B", "h1"));
        state.apply(&stake_split_event(7, "m2", "B", "h2"));

        assert_eq!(state.core_nodes["h1"].stakers["B"], 15_000);
        assert_eq!(state.core_nodes["h2"].stakers["B"], 15_000);
        assert!(state.core_nodes["h1"].total_staked >= 15_000);
        assert!(state.core_nodes["h2"].total_staked >= 15_000);
    }

    #[test]
    fn s3_link_limit() {
        let mut state = RegistryState::new(config());
        state.apply(&balance_event(1, "owner", 200_000));
        state.apply(&create_node_event(2, "core", "owner"));

        for i in 0..4 {
            let hash = format!("crn{i}");
            state.apply(&Event::Lifecycle(LifecycleMessage {
                hash: hash.clone(),
                height: 3 + i as u64,
                sender: "manager".to_string(),
                target: None,
                action: LifecycleAction::CreateResourceNode {
                    content: Box::new(CreateResourceNodeContent {
                        node_type: "compute".to_string(),
                        ..Default::default()
                    }),
                },
            }));
            state.apply(&Event::Lifecycle(LifecycleMessage {
                hash: format!("link{i}"),
                height: 10 + i as u64,
                sender: "owner".to_string(),
                target: Some(hash),
                action: LifecycleAction::Link,
            }));
        }

        assert_eq!(state.core_nodes["core"].resource_nodes.len(), 3);
    }

    #[test]
    fn s4_score_smoothing_with_off_by_one_window() {
        let mut state = RegistryState::new(config());
        state.apply(&balance_event(1, "owner", 200_000));
        state.apply(&create_node_event(2, "h1", "owner"));

        state.apply(&Event::Score(ScoreReport {
            height: 10,
            sender: "scorer".to_string(),
            target: "h1".to_string(),
            score: 0.4,
            performance: 0.4,
            decentralization: 0.1,
        }));
        state.apply(&Event::Score(ScoreReport {
            height: 15,
            sender: "scorer".to_string(),
            target: "h1".to_string(),
            score: 0.7,
            performance: 0.7,
            decentralization: 0.1,
        }));
        assert_eq!(state.core_nodes["h1"].score, 0.7);

        state.apply(&Event::Score(ScoreReport {
            height: 35,
            sender: "scorer".to_string(),
            target: "h1".to_string(),
            score: 0.5,
            performance: 0.5,
            decentralization: 0.1,
        }));
        assert_eq!(state.core_nodes["h1"].score, 0.5);
    }

    #[test]
    fn score_smoothing_window_is_shared_across_nodes() {
        // last_score_height is one watermark for the whole state, not a
        // per-node one: an unrelated node's report can put a second node's
        // later, lower report inside the smoothing window.
        let mut state = RegistryState::new(config());
        state.apply(&balance_event(1, "owner_a", 200_000));
        state.apply(&create_node_event(2, "a", "owner_a"));
        state.apply(&balance_event(3, "owner_b", 200_000));
        state.apply(&create_node_event(4, "b", "owner_b"));

        state.apply(&Event::Score(ScoreReport {
            height: 10,
            sender: "scorer".to_string(),
            target: "b".to_string(),
            score: 0.9,
            performance: 0.9,
            decentralization: 0.1,
        }));
        assert_eq!(state.core_nodes["b"].score, 0.9);

        // A's unrelated report at height 100 moves the global watermark.
        state.apply(&Event::Score(ScoreReport {
            height: 100,
            sender: "scorer".to_string(),
            target: "a".to_string(),
            score: 0.2,
            performance: 0.2,
            decentralization: 0.1,
        }));

        // B's next report, at height 105, falls inside the shared window
        // opened by A's report (105 - 100 < 10), so the lower score does
        // not overwrite B's existing high score.
        state.apply(&Event::Score(ScoreReport {
            height: 105,
            sender: "scorer".to_string(),
            target: "b".to_string(),
            score: 0.3,
            performance: 0.3,
            decentralization: 0.1,
        }));
        assert_eq!(state.core_nodes["b"].score, 0.9);
    }

    #[test]
    fn last_message_height_advances_even_on_rejected_message() {
        let mut state = RegistryState::new(config());
        // No balance for "nobody", so this create-node is rejected.
        state.apply(&Event::Lifecycle(LifecycleMessage {
            hash: "rejected".to_string(),
            height: 7,
            sender: "nobody".to_string(),
            target: None,
            action: LifecycleAction::CreateNode { content: Box::new(CreateNodeContent::default()) },
        }));
        assert_eq!(state.last_message_height, 7);
    }

    #[test]
    fn l2_stake_then_unstake_restores_state() {
        let mut state = RegistryState::new(config());
        state.apply(&balance_event(1, "owner", 200_000));
        state.apply(&create_node_event(2, "h1", "owner"));
        state.apply(&balance_event(3, "B", 10_000));

        state.apply(&Event::Lifecycle(LifecycleMessage {
            hash: "s1".to_string(),
            height: 4,
            sender: "B".to_string(),
            target: Some("h1".to_string()),
            action: LifecycleAction::Stake,
        }));
        assert_eq!(state.core_nodes["h1"].stakers.get("B"), Some(&10_000));

        state.apply(&Event::Lifecycle(LifecycleMessage {
            hash: "u1".to_string(),
            height: 5,
            sender: "B".to_string(),
            target: Some("h1".to_string()),
            action: LifecycleAction::Unstake,
        }));
        assert!(!state.core_nodes["h1"].stakers.contains_key("B"));
        assert_eq!(state.core_nodes["h1"].total_staked, 0);
    }

    #[test]
    fn l3_link_then_unlink_restores_state() {
        let mut state = RegistryState::new(config());
        state.apply(&balance_event(1, "owner", 200_000));
        state.apply(&create_node_event(2, "core", "owner"));
        state.apply(&Event::Lifecycle(LifecycleMessage {
            hash: "crn".to_string(),
            height: 3,
            sender: "manager".to_string(),
            target: None,
            action: LifecycleAction::CreateResourceNode {
                content: Box::new(CreateResourceNodeContent {
                    node_type: "compute".to_string(),
                    ..Default::default()
                }),
            },
        }));

        state.apply(&Event::Lifecycle(LifecycleMessage {
            hash: "link".to_string(),
            height: 4,
            sender: "owner".to_string(),
            target: Some("crn".to_string()),
            action: LifecycleAction::Link,
        }));
        assert_eq!(state.core_nodes["core"].resource_nodes, vec!["crn".to_string()]);
        assert_eq!(state.resource_nodes["crn"].parent, Some("core".to_string()));

        state.apply(&Event::Lifecycle(LifecycleMessage {
            hash: "unlink".to_string(),
            height: 5,
            sender: "owner".to_string(),
            target: Some("crn".to_string()),
            action: LifecycleAction::Unlink,
        }));
        assert!(state.core_nodes["core"].resource_nodes.is_empty());
        assert_eq!(state.resource_nodes["crn"].parent, None);
        assert_eq!(state.resource_nodes["crn"].status, ResourceNodeStatus::Waiting);
    }

    #[test]
    fn p5_ownership_and_staking_are_disjoint() {
        let mut state = RegistryState::new(config());
        state.apply(&balance_event(1, "owner", 200_000));
        state.apply(&create_node_event(2, "h1", "owner"));
        state.apply(&balance_event(3, "owner2", 200_000));
        state.apply(&create_node_event(4, "h2", "owner2"));

        let result = state.apply(&Event::Lifecycle(LifecycleMessage {
            hash: "badstake".to_string(),
            height: 5,
            sender: "owner".to_string(),
            target: Some("h2".to_string()),
            action: LifecycleAction::Stake,
        }));
        assert!(result.is_none());
        assert!(!state.core_nodes["h2"].stakers.contains_key("owner"));
    }
}
