//! The `(height, core_nodes, resource_nodes)` tuple emitted on every
//! state-changing event (spec §4.3, §4.5).

use registry_common::{CoreNode, ResourceNode};
use serde::{Deserialize, Serialize};

/// A point-in-time view of the registry, ready to hand to a publisher.
/// `Serialize`s with the contractual `{nodes, resource_nodes}` shape from
/// spec §4.5; the publish boundary (dividing balances/stakes by
/// `10^decimals`) happens in `registry-publish`, not here — this type still
/// carries integer smallest-unit amounts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub height: u64,
    #[serde(rename = "nodes")]
    pub core_nodes: Vec<CoreNode>,
    pub resource_nodes: Vec<ResourceNode>,
}
