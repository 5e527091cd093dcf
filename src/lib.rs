//! Narrative reporting for node metrics
//!
//! A stream of partial metric updates is turned into bounded history
//! windows and into bilingual narrative reports that classify health,
//! celebrate milestones and flag problems.
//!
//! The synchronous core is [`pipeline::Narrator`]; [`actors`] runs it on a
//! tokio task with fire-and-forget persistence.

pub mod achievements;
pub mod actors;
pub mod config;
pub mod health;
pub mod history;
pub mod narrative;
pub mod normalizer;
pub mod pipeline;
pub mod problems;
pub mod storage;
pub mod templates;
pub mod util;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Partial metrics update as delivered by the transport.
///
/// Every field is optional. Absent scalar fields keep their previous value,
/// absent series fields simply receive no new sample this tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricUpdate {
    /// Transactions per second
    pub throughput: Option<f64>,

    /// Finality latency in milliseconds
    pub finality_ms: Option<f64>,

    /// Uptime percentage (0-100)
    pub uptime: Option<f64>,

    pub block_height: Option<u64>,
    pub peers: Option<u32>,
    pub mempool: Option<u64>,

    /// Network round-trip latency in milliseconds
    pub network_latency_ms: Option<f64>,

    pub validators: Option<Vec<ValidatorHealth>>,
}

impl MetricUpdate {
    pub fn is_empty(&self) -> bool {
        self == &MetricUpdate::default()
    }

    /// Decode and validate a loosely typed update from the transport.
    ///
    /// See [`normalizer::from_json`].
    pub fn from_json(value: &serde_json::Value) -> normalizer::Normalized {
        normalizer::from_json(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorHealth {
    pub name: String,

    /// Health percentage (0-100)
    pub health: f64,
}

impl ValidatorHealth {
    pub fn new(name: impl Into<String>, health: f64) -> Self {
        Self {
            name: name.into(),
            health,
        }
    }
}

/// Current value of every tracked channel at one update tick.
///
/// Series channels (throughput, finality, network latency) carry their most
/// recent sample here; the full windows live in the history store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSnapshot {
    pub timestamp: DateTime<Utc>,
    pub throughput: Option<f64>,
    pub finality_ms: Option<f64>,
    pub uptime: Option<f64>,
    pub block_height: Option<u64>,
    pub peers: Option<u32>,
    pub mempool: Option<u64>,
    pub network_latency_ms: Option<f64>,
    pub validators: Vec<ValidatorHealth>,
}

impl MetricSnapshot {
    pub fn empty(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            throughput: None,
            finality_ms: None,
            uptime: None,
            block_height: None,
            peers: None,
            mempool: None,
            network_latency_ms: None,
            validators: vec![],
        }
    }

    /// Apply a (normalized) partial update on top of this snapshot.
    pub fn merged(&self, update: &MetricUpdate, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            throughput: update.throughput.or(self.throughput),
            finality_ms: update.finality_ms.or(self.finality_ms),
            uptime: update.uptime.or(self.uptime),
            block_height: update.block_height.or(self.block_height),
            peers: update.peers.or(self.peers),
            mempool: update.mempool.or(self.mempool),
            network_latency_ms: update.network_latency_ms.or(self.network_latency_ms),
            validators: update
                .validators
                .clone()
                .unwrap_or_else(|| self.validators.clone()),
        }
    }
}
