//! Common library for the node registry workspace.

pub mod config;
pub mod error;
pub mod event;
pub mod math;
pub mod merge;
pub mod types;

pub use config::RegistryConfig;
pub use error::RegistryError;
pub use event::{AmendMessage, BalanceUpdate, Event, LifecycleAction, LifecycleMessage, ScoreReport};
pub use types::{Address, Amount, CoreNode, NodeStatus, ResourceNode, ResourceNodeStatus};
