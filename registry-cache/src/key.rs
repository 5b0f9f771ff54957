//! Composite sort keys (spec §6): zero-padded so lexicographic byte order
//! on the underlying LSM store matches numeric order.

/// `"{confirm_height}_{timestamp}_{hash}"`, for messages.
pub fn message_key(confirm_height: u64, timestamp: i64, hash: &str) -> String {
    format!("{confirm_height:020}_{timestamp:020}_{hash}")
}

/// `"{block}_{tx_index}_{log_index}"`, for chain events.
pub fn chain_event_key(block: u64, tx_index: u32, log_index: u32) -> String {
    format!("{block:020}_{tx_index:010}_{log_index:010}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_keys_sort_by_height_then_timestamp() {
        let a = message_key(10, 5, "hash-a");
        let b = message_key(10, 6, "hash-b");
        let c = message_key(11, 0, "hash-c");
        let mut keys = vec![c.clone(), a.clone(), b.clone()];
        keys.sort();
        assert_eq!(keys, vec![a, b, c]);
    }

    #[test]
    fn chain_event_keys_sort_by_block_then_indices() {
        let a = chain_event_key(1, 0, 5);
        let b = chain_event_key(1, 0, 6);
        let c = chain_event_key(1, 1, 0);
        let mut keys = vec![c.clone(), b.clone(), a.clone()];
        keys.sort();
        assert_eq!(keys, vec![a, b, c]);
    }
}
