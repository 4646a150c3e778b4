//! Conventional chain-node events and the channel names they travel on.
//!
//! The registry itself is payload-agnostic. This module is the closed set
//! of domain events that the node's producers publish, so consumers can
//! narrow an [`Event`] to a [`ChainEvent`] and match on it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event::{Event, EventName};

/// Conventional channel names.
pub mod names {
    /// A new block was appended to the local chain.
    pub const NEW_BLOCK: &str = "chain.new_block";
    /// A new transaction entered the pool.
    pub const NEW_TRANSACTION: &str = "chain.new_transaction";
    /// A transaction left the pool without being included.
    pub const TRANSACTION_DROPPED: &str = "chain.transaction_dropped";
    /// The canonical head moved to a different fork.
    pub const CHAIN_REORG: &str = "chain.reorg";
    /// Node lifecycle: started.
    pub const NODE_STARTED: &str = "node.started";
    /// Node lifecycle: stopping.
    pub const NODE_STOPPED: &str = "node.stopped";
}

/// Metadata attached to every chain event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// When the event was created.
    pub timestamp: DateTime<Utc>,
    /// Correlation ID for tracing related events.
    pub correlation_id: Option<Uuid>,
    /// Component that produced the event.
    pub source: String,
}

impl EventMetadata {
    /// Create new event metadata.
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            correlation_id: None,
            source: source.into(),
        }
    }

    /// Set correlation ID.
    #[must_use]
    pub fn with_correlation_id(mut self, id: Uuid) -> Self {
        self.correlation_id = Some(id);
        self
    }
}

impl Default for EventMetadata {
    fn default() -> Self {
        Self::new("unknown")
    }
}

/// Events produced by the chain subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChainEvent {
    /// A block was imported.
    NewBlock {
        /// Event metadata.
        metadata: EventMetadata,
        /// Block height.
        height: u64,
        /// Hex-encoded block hash.
        hash: String,
        /// Number of transactions in the block.
        tx_count: usize,
    },

    /// A transaction was accepted into the pool.
    NewTransaction {
        /// Event metadata.
        metadata: EventMetadata,
        /// Hex-encoded transaction hash.
        hash: String,
    },

    /// A pooled transaction was evicted.
    TransactionDropped {
        /// Event metadata.
        metadata: EventMetadata,
        /// Hex-encoded transaction hash.
        hash: String,
        /// Why it was evicted.
        reason: String,
    },

    /// The canonical chain switched forks.
    ChainReorg {
        /// Event metadata.
        metadata: EventMetadata,
        /// Height of the common ancestor.
        common_ancestor: u64,
        /// Height of the new head.
        new_head: u64,
    },

    /// The node finished start-up.
    NodeStarted {
        /// Event metadata.
        metadata: EventMetadata,
        /// Node software version.
        version: String,
    },

    /// The node is shutting down.
    NodeStopped {
        /// Event metadata.
        metadata: EventMetadata,
        /// Shutdown reason.
        reason: Option<String>,
    },
}

impl ChainEvent {
    /// Snake-case variant tag, matching the serialized `type` field.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::NewBlock { .. } => "new_block",
            Self::NewTransaction { .. } => "new_transaction",
            Self::TransactionDropped { .. } => "transaction_dropped",
            Self::ChainReorg { .. } => "chain_reorg",
            Self::NodeStarted { .. } => "node_started",
            Self::NodeStopped { .. } => "node_stopped",
        }
    }

    /// Channel this event is conventionally published on.
    #[must_use]
    pub fn event_name(&self) -> EventName {
        let name = match self {
            Self::NewBlock { .. } => names::NEW_BLOCK,
            Self::NewTransaction { .. } => names::NEW_TRANSACTION,
            Self::TransactionDropped { .. } => names::TRANSACTION_DROPPED,
            Self::ChainReorg { .. } => names::CHAIN_REORG,
            Self::NodeStarted { .. } => names::NODE_STARTED,
            Self::NodeStopped { .. } => names::NODE_STOPPED,
        };
        EventName::from(name)
    }

    /// Get the event metadata.
    #[must_use]
    pub fn metadata(&self) -> &EventMetadata {
        match self {
            Self::NewBlock { metadata, .. }
            | Self::NewTransaction { metadata, .. }
            | Self::TransactionDropped { metadata, .. }
            | Self::ChainReorg { metadata, .. }
            | Self::NodeStarted { metadata, .. }
            | Self::NodeStopped { metadata, .. } => metadata,
        }
    }
}

impl From<ChainEvent> for Event {
    fn from(event: ChainEvent) -> Self {
        Event::new(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_block(height: u64) -> ChainEvent {
        ChainEvent::NewBlock {
            metadata: EventMetadata::new("chain"),
            height,
            hash: format!("0x{height:064x}"),
            tx_count: 3,
        }
    }

    #[test]
    fn test_event_name_mapping() {
        assert_eq!(new_block(1).event_name().as_str(), names::NEW_BLOCK);

        let reorg = ChainEvent::ChainReorg {
            metadata: EventMetadata::default(),
            common_ancestor: 9,
            new_head: 12,
        };
        assert_eq!(reorg.event_name().as_str(), names::CHAIN_REORG);
        assert_eq!(reorg.event_type(), "chain_reorg");
    }

    #[test]
    fn test_serialized_tag_matches_event_type() {
        let event = new_block(7);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], event.event_type());
        assert_eq!(json["height"], 7);

        let parsed: ChainEvent = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn test_into_opaque_event() {
        let event: Event = new_block(5).into();
        let narrowed = event.payload::<ChainEvent>().unwrap();
        assert!(matches!(narrowed, ChainEvent::NewBlock { height: 5, .. }));
        assert_eq!(narrowed.metadata().source, "chain");
    }

    #[test]
    fn test_metadata_correlation() {
        let id = Uuid::new_v4();
        let meta = EventMetadata::new("txpool").with_correlation_id(id);
        assert_eq!(meta.correlation_id, Some(id));
        assert_eq!(meta.source, "txpool");
    }
}
