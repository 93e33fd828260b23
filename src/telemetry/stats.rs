//! Pipeline counters and their serializable snapshot

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::pipeline::channel::{ChannelCounters, ChannelSnapshot};

/// Aggregator-side counters, shared between the aggregator task and readers.
#[derive(Debug, Default)]
pub struct PipelineStats {
    packets_sent: AtomicU64,
    bytes_sent: AtomicU64,
    write_errors: AtomicU64,
    receive_timeouts: AtomicU64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_packet(&self, bytes: usize) {
        self.packets_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_write_error(&self) {
        self.write_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_timeout(&self) {
        self.receive_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn packets_sent(&self) -> u64 {
        self.packets_sent.load(Ordering::Relaxed)
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent.load(Ordering::Relaxed)
    }

    pub fn write_errors(&self) -> u64 {
        self.write_errors.load(Ordering::Relaxed)
    }

    pub fn receive_timeouts(&self) -> u64 {
        self.receive_timeouts.load(Ordering::Relaxed)
    }

    /// Capture these counters together with the given channel counters.
    pub fn snapshot(&self, channels: &[Arc<ChannelCounters>]) -> StatsSnapshot {
        StatsSnapshot {
            timestamp: Utc::now(),
            packets_sent: self.packets_sent(),
            bytes_sent: self.bytes_sent(),
            write_errors: self.write_errors(),
            receive_timeouts: self.receive_timeouts(),
            channels: channels.iter().map(|c| c.snapshot()).collect(),
        }
    }
}

/// One JSON Lines record.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub packets_sent: u64,
    pub bytes_sent: u64,
    pub write_errors: u64,
    pub receive_timeouts: u64,
    pub channels: Vec<ChannelSnapshot>,
}

impl StatsSnapshot {
    /// Total values dropped across every channel.
    pub fn total_dropped(&self) -> u64 {
        self.channels.iter().map(|c| c.dropped).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::channel::channel;

    #[test]
    fn test_counters_accumulate() {
        let stats = PipelineStats::new();
        stats.record_packet(4);
        stats.record_packet(7);
        stats.record_write_error();
        stats.record_timeout();
        stats.record_timeout();

        assert_eq!(stats.packets_sent(), 2);
        assert_eq!(stats.bytes_sent(), 11);
        assert_eq!(stats.write_errors(), 1);
        assert_eq!(stats.receive_timeouts(), 2);
    }

    #[test]
    fn test_snapshot_includes_channels() {
        let (tx, _rx) = channel::<u8>("movement");
        for i in 0..40 {
            tx.try_send(i);
        }

        let stats = PipelineStats::new();
        let snapshot = stats.snapshot(&[tx.counters()]);

        assert_eq!(snapshot.channels.len(), 1);
        assert_eq!(snapshot.channels[0].name, "movement");
        assert_eq!(snapshot.channels[0].enqueued, 32);
        assert_eq!(snapshot.total_dropped(), 8);
    }

    #[test]
    fn test_snapshot_serializes_as_json() {
        let stats = PipelineStats::new();
        stats.record_packet(7);
        let json = serde_json::to_value(stats.snapshot(&[])).unwrap();

        assert_eq!(json["packets_sent"], 1);
        assert_eq!(json["bytes_sent"], 7);
        assert!(json["timestamp"].is_string());
        assert!(json["channels"].as_array().unwrap().is_empty());
    }
}
