//! Snapshot/distribution publishing and transfer batching (spec §4.5, §6).

pub mod publisher;
pub mod snapshot_payload;

pub use publisher::{
    DistributionPost, DistributionStatus, LoggingPublisher, NoopTransferBatcher, Publisher, TransferBatcher,
    TransferRecord, TransferStatus,
};
pub use snapshot_payload::{PublishedCoreNode, PublishedResourceNode, PublishedSnapshot};
