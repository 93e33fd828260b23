//! # Telemetry Module
//!
//! Pipeline statistics and their on-disk log.
//!
//! This module handles:
//! - Counting packets, bytes, write errors and receive timeouts
//! - Snapshotting per-channel traffic counters
//! - Formatting snapshots as JSONL (JSON Lines)
//! - Rotating log files (max N records per file, last M files kept)

pub mod logger;
pub mod stats;

pub use logger::StatsLogger;
pub use stats::{PipelineStats, StatsSnapshot};
