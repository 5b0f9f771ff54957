//! The durable ordered cache (spec §6): resumes ingestion without
//! re-scanning full history. One `fjall` partition, namespaced by prefix
//! (e.g. one prefix per balance platform, one for the message stream).

use std::path::Path;

use anyhow::{Context, Result};
use fjall::{Database, Keyspace, KeyspaceCreateOptions};

const PARTITION_NAME: &str = "registry_cache";
/// Separates the prefix from the composite sort key inside the physical
/// key; `\0` never appears in a prefix or a sort key produced by
/// `registry_cache::key`.
const PREFIX_SEPARATOR: char = '\0';

pub struct DurableCache {
    _db: Database,
    partition: Keyspace,
}

impl DurableCache {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = Database::builder(path.as_ref())
            .open()
            .context("opening durable cache keyspace")?;
        let partition = db
            .keyspace(PARTITION_NAME, KeyspaceCreateOptions::default)
            .context("opening registry_cache partition")?;
        Ok(Self { _db: db, partition })
    }

    fn physical_key(prefix: &str, key: &str) -> String {
        format!("{prefix}{PREFIX_SEPARATOR}{key}")
    }

    fn prefix_upper_bound(prefix: &str) -> String {
        format!("{prefix}\u{1}")
    }

    pub fn store_entry(&self, prefix: &str, key: &str, value: &[u8]) -> Result<()> {
        self.partition
            .insert(Self::physical_key(prefix, key), value)
            .with_context(|| format!("store_entry({prefix}, {key})"))?;
        Ok(())
    }

    /// Entries under `prefix`, in ascending key order, optionally bounded
    /// by `[start, end]` on the composite sort key (inclusive).
    pub fn retrieve_entries(&self, prefix: &str, range: Option<(&str, &str)>) -> Result<Vec<(String, Vec<u8>)>> {
        let lower = match range {
            Some((start, _)) => Self::physical_key(prefix, start),
            None => Self::physical_key(prefix, ""),
        };
        let upper = Self::prefix_upper_bound(prefix);
        let strip_prefix = Self::physical_key(prefix, "");

        let mut out = Vec::new();
        for guard in self.partition.range(lower..upper) {
            let (raw_key, raw_value) = guard.into_inner().context("scanning durable cache range")?;
            let key_str = String::from_utf8_lossy(&raw_key).into_owned();
            let Some(suffix) = key_str.strip_prefix(&strip_prefix) else {
                continue;
            };
            if let Some((_, end)) = range {
                if suffix > end {
                    break;
                }
            }
            out.push((suffix.to_string(), raw_value.to_vec()));
        }
        Ok(out)
    }

    /// The highest sort key currently stored under `prefix`, or `None` if
    /// empty. Used by ingesters to resume from the last confirmed position.
    pub fn get_last_available_key(&self, prefix: &str) -> Result<Option<String>> {
        let lower = Self::physical_key(prefix, "");
        let upper = Self::prefix_upper_bound(prefix);
        let strip_prefix = lower.clone();

        let mut last: Option<String> = None;
        for guard in self.partition.range(lower..upper) {
            let raw_key = guard.key().context("scanning durable cache for last key")?;
            let key_str = String::from_utf8_lossy(&raw_key).into_owned();
            if let Some(suffix) = key_str.strip_prefix(&strip_prefix) {
                last = Some(suffix.to_string());
            }
        }
        Ok(last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::message_key;

    fn temp_cache() -> (DurableCache, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let cache = DurableCache::open(dir.path()).unwrap();
        (cache, dir)
    }

    #[test]
    fn round_trips_entries_in_order() {
        let (cache, _dir) = temp_cache();
        cache.store_entry("messages", &message_key(2, 0, "h2"), b"second").unwrap();
        cache.store_entry("messages", &message_key(1, 0, "h1"), b"first").unwrap();

        let entries = cache.retrieve_entries("messages", None).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].1, b"first");
        assert_eq!(entries[1].1, b"second");
    }

    #[test]
    fn prefixes_are_isolated() {
        let (cache, _dir) = temp_cache();
        cache.store_entry("eth", &message_key(1, 0, "h"), b"eth-value").unwrap();
        cache.store_entry("sol", &message_key(1, 0, "h"), b"sol-value").unwrap();

        let eth_entries = cache.retrieve_entries("eth", None).unwrap();
        assert_eq!(eth_entries.len(), 1);
        assert_eq!(eth_entries[0].1, b"eth-value");
    }

    #[test]
    fn get_last_available_key_returns_highest_sort_key() {
        let (cache, _dir) = temp_cache();
        assert!(cache.get_last_available_key("messages").unwrap().is_none());
        cache.store_entry("messages", &message_key(1, 0, "h1"), b"1").unwrap();
        cache.store_entry("messages", &message_key(5, 0, "h5"), b"5").unwrap();
        let last = cache.get_last_available_key("messages").unwrap().unwrap();
        assert_eq!(last, message_key(5, 0, "h5"));
    }
}
