//! Daemon-only configuration: the event log replay source, the durable
//! cache location and the publish channels. Layered into the same
//! `config::Config` tree as [`registry_common::RegistryConfig`] (spec §6) —
//! unknown keys are simply ignored by whichever struct doesn't use them.

use config::Config;
use registry_common::{Address, RegistryError};
use serde::{Deserialize, Serialize};

fn default_event_log_path() -> String {
    "events.json".to_string()
}

fn default_cache_path() -> String {
    "registry-cache.db".to_string()
}

fn default_channel() -> String {
    "aggregate".to_string()
}

fn default_testnet_channel() -> String {
    "aggregate-testnet".to_string()
}

fn default_chain() -> String {
    "eth".to_string()
}

/// Out of scope for the core (spec §1): the actual balance/message
/// ingesters, the aggregate store and the signer are external
/// collaborators. The daemon stands them up with a single JSON event log
/// (an archived capture of the three merged streams) and the logging
/// publisher/no-op batcher from `registry-publish`, so `run`/`distribute`
/// exercise the real merge, state machine and reward integrator end to
/// end without needing a live chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonSettings {
    pub event_log_path: String,
    pub cache_path: String,
    pub channel: String,
    pub testnet_channel: String,
    pub chain: String,
    pub reward_sender: Option<Address>,
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self {
            event_log_path: default_event_log_path(),
            cache_path: default_cache_path(),
            channel: default_channel(),
            testnet_channel: default_testnet_channel(),
            chain: default_chain(),
            reward_sender: None,
        }
    }
}

impl DaemonSettings {
    pub fn from_config(config: &Config) -> registry_common::error::Result<Self> {
        config
            .clone()
            .try_deserialize()
            .map_err(|e| RegistryError::InvalidConfig(e.to_string()))
    }
}
