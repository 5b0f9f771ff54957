//! Loads an archived event log and replays it through the real
//! [`OrderedMerge`] (spec §4.1), standing in for the live balance and
//! message ingesters (`node_ingest`) that this repo only specifies as
//! traits (spec §1).

use std::path::Path;
use std::pin::Pin;

use anyhow::{Context, Result};
use futures::stream::{self, Stream, StreamExt};
use registry_common::event::{BalanceUpdate, Event};
use registry_common::merge::OrderedMerge;

fn read_events(path: &Path) -> Result<Vec<Event>> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading event log at {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing event log at {}", path.display()))
}

/// Reads a JSON array of [`Event`] from `path`, splits it by source kind
/// (balance updates vs. everything else, mirroring one stream per chain
/// plus one for the signed-message feed) and merges them back into a
/// single non-decreasing sequence. Used by `distribute`, which replays the
/// whole archived range in one pass.
pub async fn load_merged(path: impl AsRef<Path>) -> Result<Vec<Event>> {
    let events = read_events(path.as_ref())?;
    let (balance_events, other_events): (Vec<Event>, Vec<Event>) = events.into_iter().partition(|e| matches!(e, Event::Balance(_)));

    let balance_stream: Pin<Box<dyn Stream<Item = Event> + Send>> = Box::pin(stream::iter(balance_events));
    let other_stream: Pin<Box<dyn Stream<Item = Event> + Send>> = Box::pin(stream::iter(other_events));

    let merged = OrderedMerge::from_streams(vec![balance_stream, other_stream]);
    Ok(merged.collect().await)
}

/// Reads the same archived log but keeps balance updates and
/// lifecycle/amend/score events as two separate, height-sorted vectors
/// instead of merging them. Used by `run`, which drives the two kinds
/// through [`node_ingest::BalanceIngester`]/[`node_ingest::MessageIngester`]
/// and lets `OrderedMerge` (or, for a single source of each kind, a plain
/// sort) recombine each incremental poll.
pub fn load_split(path: impl AsRef<Path>) -> Result<(Vec<BalanceUpdate>, Vec<Event>)> {
    let events = read_events(path.as_ref())?;
    let mut balances = Vec::new();
    let mut messages = Vec::new();
    for event in events {
        match event {
            Event::Balance(update) => balances.push(update),
            other => messages.push(other),
        }
    }
    balances.sort_by_key(|u| u.height);
    messages.sort_by_key(Event::height);
    Ok((balances, messages))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn loads_and_merges_mixed_event_kinds() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"Balance": {{"platform": "eth", "height": 3, "balances": {{}}, "changed_addresses": []}}}},
                {{"Score": {{"height": 1, "sender": "s", "target": "t", "score": 0.5, "performance": 0.5, "decentralization": 0.5}}}}
            ]"#
        )
        .unwrap();

        let events = load_merged(file.path()).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].height(), 1);
        assert_eq!(events[1].height(), 3);
    }

    #[test]
    fn splits_balances_from_messages_sorted_by_height() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"Balance": {{"platform": "eth", "height": 3, "balances": {{}}, "changed_addresses": []}}}},
                {{"Balance": {{"platform": "eth", "height": 1, "balances": {{}}, "changed_addresses": []}}}},
                {{"Score": {{"height": 2, "sender": "s", "target": "t", "score": 0.5, "performance": 0.5, "decentralization": 0.5}}}}
            ]"#
        )
        .unwrap();

        let (balances, messages) = load_split(file.path()).unwrap();
        assert_eq!(balances.iter().map(|b| b.height).collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].height(), 2);
    }
}
