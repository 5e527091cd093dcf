//! Achievement ledger
//!
//! Milestones are one-time predicates over the previous and current
//! snapshot (and, for uptime streaks, the elapsed session time). Once a
//! milestone id is in the ledger it is never evaluated again, so unlocks
//! are idempotent across ticks and, after a reload, across restarts.
//!
//! The ledger itself does no I/O. The pipeline loads persisted entries at
//! startup through [`AchievementLedger::with_entries`] and hands the full
//! ledger to the persister whenever [`AchievementLedger::check_and_unlock`]
//! returns something new.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::MetricSnapshot;
use crate::templates::{Language, TemplateTable, fill};

/// Quality score attached to every achievement
pub const ACHIEVEMENT_SCORE: u8 = 100;

const UPTIME_STREAK_FLOOR: f64 = 99.9;
const HIGH_TPS: f64 = 1000.0;
const FAST_FINALITY_MS: f64 = 200.0;
const PEER_GROWTH: u32 = 1000;

/// An unlocked milestone. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Achievement {
    pub id: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub score: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Milestone {
    FirstBlock,
    HundredBlocks,
    ThousandBlocks,
    UptimeWeek,
    UptimeMonth,
    HighTps,
    FastFinality,
    PeerGrowth,
    ValidatorJoin,
}

impl Milestone {
    pub const ALL: [Milestone; 9] = [
        Milestone::FirstBlock,
        Milestone::HundredBlocks,
        Milestone::ThousandBlocks,
        Milestone::UptimeWeek,
        Milestone::UptimeMonth,
        Milestone::HighTps,
        Milestone::FastFinality,
        Milestone::PeerGrowth,
        Milestone::ValidatorJoin,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Milestone::FirstBlock => "first_block",
            Milestone::HundredBlocks => "hundred_blocks",
            Milestone::ThousandBlocks => "thousand_blocks",
            Milestone::UptimeWeek => "uptime_week",
            Milestone::UptimeMonth => "uptime_month",
            Milestone::HighTps => "high_tps",
            Milestone::FastFinality => "fast_finality",
            Milestone::PeerGrowth => "peer_growth",
            Milestone::ValidatorJoin => "validator_join",
        }
    }

    /// Evaluate the predicate. `session` is the time since the ledger was opened.
    pub fn reached(
        &self,
        previous: Option<&MetricSnapshot>,
        current: &MetricSnapshot,
        session: Duration,
    ) -> bool {
        match self {
            Milestone::FirstBlock => crossed_height(previous, current, 1),
            Milestone::HundredBlocks => crossed_height(previous, current, 100),
            Milestone::ThousandBlocks => crossed_height(previous, current, 1000),
            Milestone::UptimeWeek => uptime_streak(current, session, Duration::days(7)),
            Milestone::UptimeMonth => uptime_streak(current, session, Duration::days(30)),
            Milestone::HighTps => current.throughput.is_some_and(|tps| tps > HIGH_TPS),
            Milestone::FastFinality => current
                .finality_ms
                .is_some_and(|finality| finality < FAST_FINALITY_MS),
            Milestone::PeerGrowth => current.peers.is_some_and(|peers| peers >= PEER_GROWTH),
            Milestone::ValidatorJoin => previous.is_some_and(|previous| {
                !previous.validators.is_empty()
                    && current.validators.len() > previous.validators.len()
            }),
        }
    }

    fn vars(&self, current: &MetricSnapshot) -> Vec<(&'static str, String)> {
        match self {
            Milestone::HighTps => vec![(
                "value",
                format!("{:.0}", current.throughput.unwrap_or_default()),
            )],
            Milestone::FastFinality => vec![(
                "value",
                format!("{:.0}", current.finality_ms.unwrap_or_default()),
            )],
            Milestone::PeerGrowth => vec![("count", current.peers.unwrap_or_default().to_string())],
            Milestone::ValidatorJoin => vec![("count", current.validators.len().to_string())],
            _ => vec![],
        }
    }
}

/// `previous < target <= current`, with a missing previous height read as 0
fn crossed_height(previous: Option<&MetricSnapshot>, current: &MetricSnapshot, target: u64) -> bool {
    let Some(height) = current.block_height else {
        return false;
    };
    let before = previous.and_then(|p| p.block_height).unwrap_or(0);
    before < target && target <= height
}

fn uptime_streak(current: &MetricSnapshot, session: Duration, needed: Duration) -> bool {
    session >= needed && current.uptime.is_some_and(|uptime| uptime >= UPTIME_STREAK_FLOOR)
}

#[derive(Debug, Clone)]
pub struct AchievementLedger {
    entries: Vec<Achievement>,
    unlocked: HashSet<String>,
    templates: Arc<TemplateTable>,
    language: Language,
    session_start: DateTime<Utc>,
}

impl AchievementLedger {
    pub fn new(templates: Arc<TemplateTable>, language: Language, session_start: DateTime<Utc>) -> Self {
        Self {
            entries: vec![],
            unlocked: HashSet::new(),
            templates,
            language,
            session_start,
        }
    }

    /// Seed the ledger with previously persisted entries.
    ///
    /// Duplicate ids (from a hand-edited file) keep their first occurrence.
    pub fn with_entries(mut self, entries: Vec<Achievement>) -> Self {
        for entry in entries {
            if self.unlocked.contains(&entry.id) {
                warn!("dropping duplicate achievement '{}' from stored ledger", entry.id);
                continue;
            }
            self.unlocked.insert(entry.id.clone());
            self.entries.push(entry);
        }
        debug!("ledger seeded with {} achievements", self.entries.len());
        self
    }

    pub fn is_unlocked(&self, id: &str) -> bool {
        self.unlocked.contains(id)
    }

    /// All achievements in unlock order
    pub fn entries(&self) -> &[Achievement] {
        &self.entries
    }

    /// The `n` most recently unlocked achievements, oldest first
    pub fn recent(&self, n: usize) -> &[Achievement] {
        &self.entries[self.entries.len().saturating_sub(n)..]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Unlock every milestone that is newly reached this tick.
    ///
    /// Milestones already in the ledger are skipped without evaluation.
    pub fn check_and_unlock(
        &mut self,
        previous: Option<&MetricSnapshot>,
        current: &MetricSnapshot,
        now: DateTime<Utc>,
    ) -> Vec<Achievement> {
        let session = now.signed_duration_since(self.session_start);
        let mut unlocked = vec![];

        for milestone in Milestone::ALL {
            if self.is_unlocked(milestone.id()) {
                continue;
            }
            if !milestone.reached(previous, current, session) {
                continue;
            }

            let achievement = Achievement {
                id: milestone.id().to_string(),
                text: self.text_for(milestone, current),
                timestamp: now,
                score: ACHIEVEMENT_SCORE,
            };
            info!("achievement unlocked: {}", achievement.id);

            self.unlocked.insert(achievement.id.clone());
            self.entries.push(achievement.clone());
            unlocked.push(achievement);
        }

        unlocked
    }

    fn text_for(&self, milestone: Milestone, current: &MetricSnapshot) -> String {
        match self.templates.achievement(self.language, milestone.id()) {
            Some(template) => fill(template, &milestone.vars(current)),
            None => {
                warn!("no {} template for achievement {}", self.language, milestone.id());
                format!("Achievement unlocked: {}", milestone.id())
            }
        }
    }
}
