//! Per-block reward integration over a registry snapshot sequence
//! (spec §4.4). Grounded on the shape of the teacher's
//! `RewardsState::calculate_rewards` — a context struct holding rolling
//! totals, one method per logical pool, `tracing` at pool granularity —
//! but the math itself (bonus decay, stakers log-pool, linkage multiplier)
//! is specific to this domain and has no teacher counterpart.

use std::collections::HashMap;

use registry_common::event::Event;
use registry_common::math::score_multiplier;
use registry_common::{Address, NodeStatus, RegistryConfig, ResourceNode};
use registry_state::{RegistryState, Snapshot};
use tracing::debug;

/// Result of a `distribute` pass: the map each recipient should receive,
/// in human units (already divided by `10^decimals`).
#[derive(Debug, Clone, Default)]
pub struct Distribution {
    pub start_height: u64,
    pub end_height: u64,
    pub rewards: HashMap<Address, f64>,
}

impl Distribution {
    fn credit(&mut self, address: &Address, amount: f64) {
        if amount == 0.0 || address.is_empty() {
            return;
        }
        *self.rewards.entry(address.clone()).or_insert(0.0) += amount;
    }
}

pub struct RewardIntegrator {
    config: RegistryConfig,
}

impl RewardIntegrator {
    pub fn new(config: RegistryConfig) -> Self {
        Self { config }
    }

    /// Replays `events` through a fresh [`RegistryState`] and integrates
    /// per-block reward emission over `[start_height, end_height]`,
    /// following the pass loop in spec §4.4.
    pub fn integrate<I>(&self, events: I, start_height: u64, end_height: u64) -> Distribution
    where
        I: IntoIterator<Item = Event>,
    {
        let mut state = RegistryState::new(self.config.clone());
        let mut distribution = Distribution {
            start_height,
            end_height,
            rewards: HashMap::new(),
        };
        let mut last_height = self.config.reward_start_height.max(start_height);
        let mut last_snapshot: Option<Snapshot> = None;

        for event in events {
            let height = event.height();
            if height > end_height {
                break;
            }
            let snapshot = state.apply(&event);
            if let Some(snapshot) = snapshot {
                if height > self.config.reward_start_height {
                    let segment_start = last_height.max(self.config.reward_start_height);
                    self.integrate_segment(&snapshot, segment_start, height, &mut distribution);
                }
                last_height = height;
                last_snapshot = Some(snapshot);
            }
        }

        if last_height < end_height {
            let closing = last_snapshot.unwrap_or_else(|| state.snapshot_at(end_height));
            let segment_start = last_height.max(self.config.reward_start_height);
            if end_height > self.config.reward_start_height {
                self.integrate_segment(&closing, segment_start, end_height, &mut distribution);
            }
        }

        distribution
    }

    fn integrate_segment(&self, snapshot: &Snapshot, since: u64, current: u64, distribution: &mut Distribution) {
        if current <= since {
            return;
        }
        let block_count = (current - since) as f64;
        let resource_by_hash: HashMap<&str, &ResourceNode> =
            snapshot.resource_nodes.iter().map(|r| (r.hash.as_str(), r)).collect();
        let active: Vec<_> = snapshot.core_nodes.iter().filter(|n| n.status == NodeStatus::Active).collect();
        if active.is_empty() {
            debug!(since, current, "no active core nodes, skipping segment");
            return;
        }

        let blocks_per_day = self.config.blocks_per_day as f64;
        let per_node_per_block = self.config.daily_nodes_reward / blocks_per_day / active.len() as f64;
        let per_node_segment = per_node_per_block * block_count;

        let per_bonus_segment = if current > self.config.bonus_start_height {
            let elapsed = (current - self.config.bonus_start_height) as f64;
            let modifier = self.config.bonus_modifier - elapsed * self.config.bonus_decay;
            if modifier > 1.0 {
                per_node_per_block * modifier * block_count
            } else {
                per_node_segment
            }
        } else {
            per_node_segment
        };

        let per_day_stakers = ((active.len() as f64).log10() + 1.0) / 3.0 * self.config.daily_stakers_base;
        let stakers_segment = per_day_stakers / blocks_per_day * block_count;

        let total_stake: u128 = active.iter().map(|n| n.total_staked).sum();

        for node in &active {
            let mut paid: usize = 0;
            for resource_hash in &node.resource_nodes {
                let Some(resource) = resource_by_hash.get(resource_hash.as_str()) else {
                    continue;
                };
                let crn_mult = score_multiplier(resource.score);
                let r_amount = (self.config.resource_node_monthly_base
                    + self.config.resource_node_monthly_variable * resource.decentralization)
                    / (365.0 / 12.0)
                    / blocks_per_day
                    * block_count
                    * crn_mult;
                if crn_mult > 0.0 {
                    paid += 1;
                    if paid <= self.config.node_max_paid {
                        let recipient = resolve_recipient(&resource.reward, &resource.owner);
                        distribution.credit(&recipient, r_amount);
                    }
                }
            }
            let paid = paid.min(self.config.node_max_paid);

            let linkage = (0.7 + 0.1 * paid as f64).min(1.0);
            let node_mult = linkage * score_multiplier(node.score);
            let operator_base = if node.has_bonus { per_bonus_segment } else { per_node_segment };
            let operator_recipient = resolve_recipient(&node.reward, &node.owner);
            distribution.credit(&operator_recipient, operator_base * node_mult);

            if total_stake > 0 {
                for (staker, stake) in &node.stakers {
                    let share = *stake as f64 / total_stake as f64;
                    distribution.credit(staker, share * stakers_segment * node_mult);
                }
            }
        }
    }
}

fn resolve_recipient(reward: &Address, owner: &Address) -> Address {
    if reward.is_empty() {
        owner.clone()
    } else {
        reward.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use registry_common::event::{BalanceUpdate, CreateNodeContent, CreateResourceNodeContent, LifecycleAction, LifecycleMessage, ScoreReport};
    use std::collections::{HashMap as Map, HashSet};

    fn config() -> RegistryConfig {
        let mut cfg = RegistryConfig::default();
        cfg.decimals = 0;
        cfg.node_threshold = 100;
        cfg.staking_threshold = 1;
        cfg.activation_threshold = 100;
        cfg.blocks_per_day = 6500;
        cfg.daily_nodes_reward = 6500.0;
        cfg.daily_stakers_base = 650.0;
        cfg
    }

    fn balance_event(height: u64, address: &str, balance: u128) -> Event {
        let mut balances = Map::new();
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

    #[test]
    fn s6_single_node_single_staker_single_resource_node() {
        let cfg = config();
        let events = vec![
            balance_event(1, "owner", 200),
            Event::Lifecycle(LifecycleMessage {
                hash: "core".to_string(),
                height: 2,
                sender: "owner".to_string(),
                target: None,
                action: LifecycleAction::CreateNode {
                    content: Box::new(CreateNodeContent::default()),
                },
            }),
            Event::Lifecycle(LifecycleMessage {
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
            }),
            Event::Lifecycle(LifecycleMessage {
                hash: "link".to_string(),
                height: 4,
                sender: "owner".to_string(),
                target: Some("crn".to_string()),
                action: LifecycleAction::Link,
            }),
            Event::Score(ScoreReport {
                height: 5,
                sender: "scorer".to_string(),
                target: "core".to_string(),
                score: 1.0,
                performance: 1.0,
                decentralization: 1.0,
            }),
            Event::Score(ScoreReport {
                height: 5,
                sender: "scorer".to_string(),
                target: "crn".to_string(),
                score: 1.0,
                performance: 1.0,
                decentralization: 1.0,
            }),
            balance_event(6, "B", 200),
            Event::Lifecycle(LifecycleMessage {
                hash: "stake".to_string(),
                height: 6,
                sender: "B".to_string(),
                target: Some("core".to_string()),
                action: LifecycleAction::Stake,
            }),
            balance_event(6, "C", 200),
            Event::Lifecycle(LifecycleMessage {
                hash: "stake2".to_string(),
                height: 6,
                sender: "C".to_string(),
                target: Some("core".to_string()),
                action: LifecycleAction::Stake,
            }),
        ];

        let integrator = RewardIntegrator::new(cfg.clone());
        let distribution = integrator.integrate(events, 0, 6500 + 6);

        let expected_operator = cfg.daily_nodes_reward * 0.8;
        let actual_operator = distribution.rewards["owner"];
        assert!((actual_operator - expected_operator).abs() / expected_operator < 1e-6);

        let expected_staker = 0.5 * ((1.0_f64.log10() + 1.0) / 3.0) * cfg.daily_stakers_base * 0.8;
        let actual_staker = distribution.rewards["B"];
        assert!((actual_staker - expected_staker).abs() / expected_staker < 1e-6);
    }

    #[test]
    fn p6_score_multiplier_edges() {
        assert_eq!(score_multiplier(0.19), 0.0);
        assert_eq!(score_multiplier(0.20), 0.0);
        assert!((score_multiplier(0.50) - 0.5).abs() < 1e-9);
        assert_eq!(score_multiplier(0.80), 1.0);
    }

    #[test]
    fn no_active_nodes_yields_empty_distribution() {
        let cfg = config();
        let integrator = RewardIntegrator::new(cfg);
        let distribution = integrator.integrate(vec![balance_event(1, "nobody", 0)], 0, 100);
        assert!(distribution.rewards.is_empty());
    }
}
