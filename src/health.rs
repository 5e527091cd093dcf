//! Deterministic health scoring
//!
//! The score starts at 100 and loses a fixed penalty for every violated
//! threshold. There is no smoothing: each snapshot is scored on its own.

use serde::{Deserialize, Serialize};

use crate::MetricSnapshot;

pub const FULL_SCORE: u8 = 100;

/// Scores at or above this are healthy
pub const HEALTHY_FLOOR: u8 = 80;

/// Scores at or above this (and below [`HEALTHY_FLOOR`]) are a warning
pub const WARNING_FLOOR: u8 = 50;

const UPTIME_FLOOR: f64 = 99.0;
const FINALITY_CEILING_MS: f64 = 1000.0;
const THROUGHPUT_FLOOR: f64 = 200.0;
const VALIDATOR_HEALTH_FLOOR: f64 = 70.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthLabel {
    Healthy,
    Warning,
    Critical,
}

impl HealthLabel {
    pub fn from_score(score: u8) -> Self {
        if score >= HEALTHY_FLOOR {
            HealthLabel::Healthy
        } else if score >= WARNING_FLOOR {
            HealthLabel::Warning
        } else {
            HealthLabel::Critical
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthLabel::Healthy => "healthy",
            HealthLabel::Warning => "warning",
            HealthLabel::Critical => "critical",
        }
    }
}

/// A violated health threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Penalty {
    LowUptime,
    SlowFinality,
    LowThroughput,
    UnhealthyValidator,
}

impl Penalty {
    pub fn points(&self) -> u8 {
        match self {
            Penalty::LowUptime => 20,
            Penalty::SlowFinality => 15,
            Penalty::LowThroughput => 15,
            Penalty::UnhealthyValidator => 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthAssessment {
    pub label: HealthLabel,
    pub score: u8,
    pub penalties: Vec<Penalty>,
}

impl HealthAssessment {
    /// Points lost against [`FULL_SCORE`]
    pub fn deficit(&self) -> u8 {
        FULL_SCORE - self.score
    }
}

/// Score a snapshot. Channels without a value are not penalized.
pub fn assess(snapshot: &MetricSnapshot) -> HealthAssessment {
    let mut penalties = vec![];

    if snapshot.uptime.is_some_and(|uptime| uptime < UPTIME_FLOOR) {
        penalties.push(Penalty::LowUptime);
    }
    if snapshot
        .finality_ms
        .is_some_and(|finality| finality > FINALITY_CEILING_MS)
    {
        penalties.push(Penalty::SlowFinality);
    }
    if snapshot.throughput.is_some_and(|tps| tps < THROUGHPUT_FLOOR) {
        penalties.push(Penalty::LowThroughput);
    }
    if snapshot
        .validators
        .iter()
        .any(|validator| validator.health < VALIDATOR_HEALTH_FLOOR)
    {
        penalties.push(Penalty::UnhealthyValidator);
    }

    let lost: u8 = penalties.iter().map(Penalty::points).sum();
    let score = FULL_SCORE.saturating_sub(lost);

    HealthAssessment {
        label: HealthLabel::from_score(score),
        score,
        penalties,
    }
}
