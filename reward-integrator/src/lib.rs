//! Reward integration pass (spec §4.4).

pub mod rewards;

pub use rewards::{Distribution, RewardIntegrator};
