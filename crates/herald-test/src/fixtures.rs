//! Test fixtures for chain events.

use chrono::{TimeZone, Utc};
use uuid::Uuid;

use herald_events::{ChainEvent, EventMetadata};

/// Source recorded in fixture metadata.
pub const TEST_SOURCE: &str = "herald-test";

/// Create test event metadata.
#[must_use]
pub fn test_metadata() -> EventMetadata {
    EventMetadata::new(TEST_SOURCE)
}

/// Create test event metadata with a fixed id and timestamp.
///
/// Useful when comparing serialized events.
#[must_use]
pub fn test_metadata_fixed() -> EventMetadata {
    let mut metadata = test_metadata();
    metadata.event_id = Uuid::nil();
    if let Some(timestamp) = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).single() {
        metadata.timestamp = timestamp;
    }
    metadata
}

/// Create a test block hash for `height`.
#[must_use]
pub fn test_block_hash(height: u64) -> String {
    format!("0x{height:064x}")
}

/// Create a test `NewBlock` event.
#[must_use]
pub fn test_new_block(height: u64) -> ChainEvent {
    ChainEvent::NewBlock {
        metadata: test_metadata(),
        height,
        hash: test_block_hash(height),
        tx_count: 0,
    }
}

/// Create a test `NewTransaction` event.
#[must_use]
pub fn test_new_transaction(hash: impl Into<String>) -> ChainEvent {
    ChainEvent::NewTransaction {
        metadata: test_metadata(),
        hash: hash.into(),
    }
}

/// Create a test `TransactionDropped` event.
#[must_use]
pub fn test_transaction_dropped(hash: impl Into<String>) -> ChainEvent {
    ChainEvent::TransactionDropped {
        metadata: test_metadata(),
        hash: hash.into(),
        reason: "evicted from pool".to_string(),
    }
}

/// Create a test `ChainReorg` event rolling back to `common_ancestor`.
#[must_use]
pub fn test_chain_reorg(common_ancestor: u64, new_head: u64) -> ChainEvent {
    ChainEvent::ChainReorg {
        metadata: test_metadata(),
        common_ancestor,
        new_head,
    }
}

/// Create a test `NodeStarted` event.
#[must_use]
pub fn test_node_started() -> ChainEvent {
    ChainEvent::NodeStarted {
        metadata: test_metadata(),
        version: "0.0.0-test".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_events::names;

    #[test]
    fn test_fixture_names() {
        assert_eq!(test_new_block(1).event_name().as_str(), names::NEW_BLOCK);
        assert_eq!(
            test_new_transaction("0x1").event_name().as_str(),
            names::NEW_TRANSACTION
        );
        assert_eq!(
            test_transaction_dropped("0x1").event_name().as_str(),
            names::TRANSACTION_DROPPED
        );
        assert_eq!(test_chain_reorg(1, 3).event_name().as_str(), names::CHAIN_REORG);
        assert_eq!(test_node_started().event_name().as_str(), names::NODE_STARTED);
    }

    #[test]
    fn test_block_hash_width() {
        assert_eq!(test_block_hash(255).len(), 66);
        assert!(test_block_hash(255).ends_with("ff"));
    }

    #[test]
    fn test_fixed_metadata_is_stable() {
        assert_eq!(test_metadata_fixed().event_id, test_metadata_fixed().event_id);
        assert_eq!(
            test_metadata_fixed().timestamp,
            test_metadata_fixed().timestamp
        );
    }
}
