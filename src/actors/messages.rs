//! Message types for actor communication
//!
//! ## Design Principles
//!
//! 1. **Commands**: Request/response messages sent to one actor via mpsc
//! 2. **Events**: Broadcast notifications, a closed set of variants
//! 3. **Immutability**: Events are cloneable for multi-subscriber fan-out

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::oneshot;

use crate::MetricUpdate;
use crate::achievements::Achievement;
use crate::history::SeriesChannel;
use crate::narrative::NarrativeReport;
use crate::pipeline::{StateTarget, StateWrite, Tick};
use crate::problems::Problem;

/// Event published by the narrator (and its persister)
///
/// Subscribers may lag and miss events; the actor never waits for them.
#[derive(Debug, Clone)]
pub enum NarratorEvent {
    /// A milestone was reached for the first time
    AchievementUnlocked(Achievement),

    /// The active problem list of a tick, published only when non-empty
    ProblemsDetected(Vec<Problem>),

    /// A report was composed
    ReportGenerated(Arc<NarrativeReport>),

    /// A durable write failed; it will be retried with the next write
    PersistFailed { target: StateTarget, error: String },
}

/// Commands that can be sent to the NarratorActor
#[derive(Debug)]
pub enum NarratorCommand {
    /// Process a typed update without waiting for the result
    Ingest { update: MetricUpdate },

    /// Process a loosely typed JSON update without waiting for the result
    IngestJson { value: Value },

    /// Process a typed update and return everything the tick produced
    Process {
        update: MetricUpdate,
        respond_to: oneshot::Sender<Tick>,
    },

    /// Get the most recent report
    LastReport {
        respond_to: oneshot::Sender<Option<NarrativeReport>>,
    },

    /// Get the full achievement ledger
    Achievements {
        respond_to: oneshot::Sender<Vec<Achievement>>,
    },

    /// Get the current problem list
    Problems {
        respond_to: oneshot::Sender<Vec<Problem>>,
    },

    /// Get a copy of one series window, oldest first
    Series {
        channel: SeriesChannel,
        respond_to: oneshot::Sender<Vec<f64>>,
    },

    /// Flush all state and stop
    ///
    /// The reply is sent once the final writes have been attempted.
    Shutdown { respond_to: oneshot::Sender<()> },
}

/// Commands that can be sent to the PersistenceActor
#[derive(Debug)]
pub enum PersistCommand {
    /// Perform one write
    Write(StateWrite),

    /// Retry pending writes, then reply whether nothing is left pending
    Flush { respond_to: oneshot::Sender<bool> },

    /// Stop after the queued commands before this one
    Shutdown,
}
