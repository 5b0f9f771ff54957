//! Registry configuration — all fields from spec §6 "Configuration".

use std::collections::HashSet;

use config::Config;
use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, Result};

const DEFAULT_REWARD_START_HEIGHT: u64 = 0;
const DEFAULT_BLOCKS_PER_DAY: u64 = 6_500;
const DEFAULT_DAILY_NODES_REWARD: f64 = 0.0;
const DEFAULT_DAILY_STAKERS_BASE: f64 = 0.0;
const DEFAULT_RESOURCE_NODE_MONTHLY_BASE: f64 = 0.0;
const DEFAULT_RESOURCE_NODE_MONTHLY_VARIABLE: f64 = 0.0;
const DEFAULT_BONUS_START_HEIGHT: u64 = u64::MAX;
const DEFAULT_BONUS_MODIFIER: f64 = 1.0;
const DEFAULT_BONUS_DECAY: f64 = 0.0;
const DEFAULT_STAKING_THRESHOLD: Amount = 0;
const DEFAULT_NODE_THRESHOLD: Amount = 0;
const DEFAULT_ACTIVATION_THRESHOLD: Amount = 0;
const DEFAULT_NODE_MAX_LINKED: usize = 3;
const DEFAULT_NODE_MAX_PAID: usize = 3;
const DEFAULT_CRN_INACTIVITY_THRESHOLD_DAYS: u64 = 3;
const DEFAULT_CRN_INACTIVITY_CUTOFF_HEIGHT: u64 = 0;
const DEFAULT_DECIMALS: u32 = 18;
const DEFAULT_BATCH_SIZE: usize = 100;

use crate::types::Amount;

/// Full configuration surface consumed by the state machine, the reward
/// integrator and the daemon's `run`/`distribute` commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub reward_start_height: u64,
    pub blocks_per_day: u64,
    pub daily_nodes_reward: f64,
    pub daily_stakers_base: f64,
    pub resource_node_monthly_base: f64,
    pub resource_node_monthly_variable: f64,
    pub bonus_start_height: u64,
    pub bonus_modifier: f64,
    pub bonus_decay: f64,
    pub staking_threshold: Amount,
    pub node_threshold: Amount,
    pub activation_threshold: Amount,
    pub node_max_linked: usize,
    pub node_max_paid: usize,
    pub crn_inactivity_threshold_days: u64,
    pub crn_inactivity_cutoff_height: u64,
    pub decimals: u32,
    pub batch_size: usize,
    pub scores_senders: HashSet<Address>,
    pub balances_senders: HashSet<Address>,
    pub platforms: HashSet<String>,
}

use crate::types::Address;

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            reward_start_height: DEFAULT_REWARD_START_HEIGHT,
            blocks_per_day: DEFAULT_BLOCKS_PER_DAY,
            daily_nodes_reward: DEFAULT_DAILY_NODES_REWARD,
            daily_stakers_base: DEFAULT_DAILY_STAKERS_BASE,
            resource_node_monthly_base: DEFAULT_RESOURCE_NODE_MONTHLY_BASE,
            resource_node_monthly_variable: DEFAULT_RESOURCE_NODE_MONTHLY_VARIABLE,
            bonus_start_height: DEFAULT_BONUS_START_HEIGHT,
            bonus_modifier: DEFAULT_BONUS_MODIFIER,
            bonus_decay: DEFAULT_BONUS_DECAY,
            staking_threshold: DEFAULT_STAKING_THRESHOLD,
            node_threshold: DEFAULT_NODE_THRESHOLD,
            activation_threshold: DEFAULT_ACTIVATION_THRESHOLD,
            node_max_linked: DEFAULT_NODE_MAX_LINKED,
            node_max_paid: DEFAULT_NODE_MAX_PAID,
            crn_inactivity_threshold_days: DEFAULT_CRN_INACTIVITY_THRESHOLD_DAYS,
            crn_inactivity_cutoff_height: DEFAULT_CRN_INACTIVITY_CUTOFF_HEIGHT,
            decimals: DEFAULT_DECIMALS,
            batch_size: DEFAULT_BATCH_SIZE,
            scores_senders: HashSet::new(),
            balances_senders: HashSet::new(),
            platforms: HashSet::new(),
        }
    }
}

impl RegistryConfig {
    /// Load from a layered `config::Config` (file + env), falling back to
    /// the defaults above for anything unset.
    pub fn from_config(config: &Config) -> Result<Self> {
        config
            .clone()
            .try_deserialize()
            .map_err(|e| RegistryError::InvalidConfig(e.to_string()))
    }

    /// The smallest-unit-per-whole-token factor, `10^decimals`.
    pub fn unit(&self) -> Amount {
        10u128.pow(self.decimals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_permissive_but_sane() {
        let cfg = RegistryConfig::default();
        assert_eq!(cfg.node_max_linked, 3);
        assert_eq!(cfg.unit(), 1_000_000_000_000_000_000);
    }
}
