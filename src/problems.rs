//! Stateless problem detection
//!
//! Every tick recomputes the full problem list from the current snapshot.
//! There is no memory of the previous list: a problem whose predicate stops
//! holding simply does not appear in the next result.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::MetricSnapshot;
use crate::templates::{Language, TemplateTable, fill, group_thousands};

const UPTIME_FLOOR: f64 = 95.0;
const FINALITY_CEILING_MS: f64 = 1000.0;
const THROUGHPUT_FLOOR: f64 = 100.0;
const MEMPOOL_CEILING: u64 = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProblemKind {
    LowUptime,
    SlowFinality,
    LowThroughput,
    MempoolBacklog,
}

impl ProblemKind {
    pub const ALL: [ProblemKind; 4] = [
        ProblemKind::LowUptime,
        ProblemKind::SlowFinality,
        ProblemKind::LowThroughput,
        ProblemKind::MempoolBacklog,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            ProblemKind::LowUptime => "low_uptime",
            ProblemKind::SlowFinality => "slow_finality",
            ProblemKind::LowThroughput => "low_throughput",
            ProblemKind::MempoolBacklog => "mempool_backlog",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            ProblemKind::LowUptime => Severity::High,
            ProblemKind::SlowFinality | ProblemKind::LowThroughput => Severity::Medium,
            ProblemKind::MempoolBacklog => Severity::Low,
        }
    }

    /// Template variables when the predicate holds, `None` otherwise
    fn check(&self, snapshot: &MetricSnapshot) -> Option<Vec<(&'static str, String)>> {
        match self {
            ProblemKind::LowUptime => snapshot
                .uptime
                .filter(|uptime| *uptime < UPTIME_FLOOR)
                .map(|uptime| vec![("value", format!("{uptime:.2}"))]),
            ProblemKind::SlowFinality => snapshot
                .finality_ms
                .filter(|finality| *finality > FINALITY_CEILING_MS)
                .map(|finality| vec![("value", format!("{finality:.0}"))]),
            ProblemKind::LowThroughput => snapshot
                .throughput
                .filter(|tps| *tps < THROUGHPUT_FLOOR)
                .map(|tps| vec![("value", format!("{tps:.2}"))]),
            ProblemKind::MempoolBacklog => snapshot
                .mempool
                .filter(|size| *size > MEMPOOL_CEILING)
                .map(|size| vec![("count", group_thousands(size))]),
        }
    }
}

/// A currently active problem. Valid for one tick only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    pub id: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
}

#[derive(Debug, Clone)]
pub struct ProblemDetector {
    templates: Arc<TemplateTable>,
    language: Language,
}

impl ProblemDetector {
    pub fn new(templates: Arc<TemplateTable>, language: Language) -> Self {
        Self {
            templates,
            language,
        }
    }

    /// The complete list of problems active in `snapshot`
    pub fn detect(&self, snapshot: &MetricSnapshot, now: DateTime<Utc>) -> Vec<Problem> {
        let problems: Vec<_> = ProblemKind::ALL
            .iter()
            .filter_map(|kind| {
                let vars = kind.check(snapshot)?;
                Some(Problem {
                    id: kind.id().to_string(),
                    text: self.text_for(*kind, &vars),
                    timestamp: now,
                    severity: kind.severity(),
                })
            })
            .collect();

        trace!("detected {} problems", problems.len());
        problems
    }

    fn text_for(&self, kind: ProblemKind, vars: &[(&str, String)]) -> String {
        match self.templates.problem(self.language, kind.id()) {
            Some(template) => fill(template, vars),
            None => {
                warn!("no {} template for problem {}", self.language, kind.id());
                format!("Problem detected: {}", kind.id())
            }
        }
    }
}
