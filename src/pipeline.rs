//! The update → report pipeline
//!
//! [`Narrator`] owns all mutable state (history store, achievement ledger,
//! current problem list, random source) and is driven one tick at a time.
//! It performs no I/O after [`Narrator::open`]: durable writes that a tick
//! makes necessary are returned as [`StateWrite`]s for the caller to hand
//! to a persister, so a slow or failing backend can never stall or fail a
//! tick.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::Value;
use tracing::{debug, instrument, trace, warn};

use crate::MetricUpdate;
use crate::achievements::{Achievement, AchievementLedger};
use crate::config::Config;
use crate::health::{HealthAssessment, assess};
use crate::history::{HistoryCache, MetricHistory};
use crate::narrative::{NarrativeComposer, NarrativeReport, TemplateSelector};
use crate::normalizer::{self, FieldRejection, Normalized};
use crate::problems::{Problem, ProblemDetector};
use crate::storage::StateBackend;
use crate::templates::TemplateTable;

/// Number of ledger entries shown in a report
const REPORT_ACHIEVEMENTS: usize = 3;

/// A durable write requested by a tick
#[derive(Debug, Clone, PartialEq)]
pub enum StateWrite {
    History(HistoryCache),
    Ledger(Vec<Achievement>),
    Report(Box<NarrativeReport>),
}

/// Which piece of durable state a write touches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateTarget {
    History,
    Ledger,
    Report,
}

impl StateTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateTarget::History => "history",
            StateTarget::Ledger => "ledger",
            StateTarget::Report => "report",
        }
    }
}

impl StateWrite {
    pub fn target(&self) -> StateTarget {
        match self {
            StateWrite::History(_) => StateTarget::History,
            StateWrite::Ledger(_) => StateTarget::Ledger,
            StateWrite::Report(_) => StateTarget::Report,
        }
    }
}

/// Everything one tick produced
#[derive(Debug, Clone)]
pub struct Tick {
    pub report: NarrativeReport,
    pub health: HealthAssessment,

    /// Achievements unlocked by this tick only
    pub unlocked: Vec<Achievement>,

    /// The complete active problem list
    pub problems: Vec<Problem>,

    /// Ingress fields dropped by normalization
    pub rejected: Vec<FieldRejection>,

    pub writes: Vec<StateWrite>,
}

pub struct Narrator {
    history: MetricHistory,
    ledger: AchievementLedger,
    selector: TemplateSelector,
    detector: ProblemDetector,
    composer: NarrativeComposer,
    rng: StdRng,
    problems: Vec<Problem>,
    last_report: Option<NarrativeReport>,
    achievements_enabled: bool,
    problems_enabled: bool,
    archive_reports: bool,
}

impl Narrator {
    /// Build a pipeline, reloading whatever state `backend` still has.
    ///
    /// Unreadable state is logged and replaced by a fresh store; this never
    /// fails.
    #[instrument(skip_all, fields(backend = %backend.describe()))]
    pub fn open(
        config: &Config,
        templates: Arc<TemplateTable>,
        backend: &dyn StateBackend,
        now: DateTime<Utc>,
    ) -> Self {
        let window = config.window_length;
        let save_interval = config.save_interval();

        let history = match backend.load_history() {
            Ok(Some(cache)) => MetricHistory::restore(cache, window, save_interval, now),
            Ok(None) => {
                debug!("no history cache, starting fresh");
                MetricHistory::new(window, save_interval, now)
            }
            Err(e) => {
                warn!("could not load history cache, starting fresh: {e}");
                MetricHistory::new(window, save_interval, now)
            }
        };

        let ledger = AchievementLedger::new(templates.clone(), config.language, now);
        let ledger = match backend.load_ledger() {
            Ok(Some(entries)) => ledger.with_entries(entries),
            Ok(None) => {
                debug!("no achievement ledger, starting empty");
                ledger
            }
            Err(e) => {
                warn!("could not load achievement ledger, starting empty: {e}");
                ledger
            }
        };

        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            history,
            ledger,
            selector: TemplateSelector::new(templates.clone(), config.language),
            detector: ProblemDetector::new(templates.clone(), config.language),
            composer: NarrativeComposer::new(templates, config.language, config.investor_mode),
            rng,
            problems: vec![],
            last_report: None,
            achievements_enabled: config.achievements_enabled,
            problems_enabled: config.problems_enabled,
            archive_reports: config.archive_reports,
        }
    }

    /// Run one typed update through the pipeline
    pub fn process(&mut self, update: MetricUpdate, now: DateTime<Utc>) -> Tick {
        self.apply(normalizer::normalize(update), now)
    }

    /// Run one loosely typed JSON update through the pipeline
    pub fn process_json(&mut self, value: &Value, now: DateTime<Utc>) -> Tick {
        self.apply(normalizer::from_json(value), now)
    }

    #[instrument(skip_all, fields(tick = self.history.updates() + 1))]
    fn apply(&mut self, normalized: Normalized, now: DateTime<Utc>) -> Tick {
        let Normalized { update, rejected } = normalized;

        let previous = self.history.current().cloned();
        let current = self.history.update(&update, now).clone();
        let health = assess(&current);
        trace!("health {} ({})", health.label.as_str(), health.score);

        let unlocked = if self.achievements_enabled {
            self.ledger.check_and_unlock(previous.as_ref(), &current, now)
        } else {
            vec![]
        };

        self.problems = if self.problems_enabled {
            self.detector.detect(&current, now)
        } else {
            vec![]
        };

        let stories = self.selector.stories(&current, previous.as_ref());
        let shown: &[Achievement] = if self.achievements_enabled {
            self.ledger.recent(REPORT_ACHIEVEMENTS)
        } else {
            &[]
        };

        let report = self.composer.compose(
            &current,
            &health,
            shown,
            stories,
            &self.problems,
            &mut self.rng,
            now,
        );

        let mut writes = vec![];
        if !unlocked.is_empty() {
            writes.push(StateWrite::Ledger(self.ledger.entries().to_vec()));
        }
        if self.history.save_due(now) {
            writes.push(StateWrite::History(self.history.to_cache(now)));
            self.history.mark_saved(now);
        }
        if self.archive_reports {
            writes.push(StateWrite::Report(Box::new(report.clone())));
        }

        self.last_report = Some(report.clone());

        Tick {
            report,
            health,
            unlocked,
            problems: self.problems.clone(),
            rejected,
            writes,
        }
    }

    /// Writes that bring durable state fully up to date, used at shutdown
    pub fn final_writes(&mut self, now: DateTime<Utc>) -> Vec<StateWrite> {
        self.history.mark_saved(now);
        vec![
            StateWrite::History(self.history.to_cache(now)),
            StateWrite::Ledger(self.ledger.entries().to_vec()),
        ]
    }

    pub fn history(&self) -> &MetricHistory {
        &self.history
    }

    pub fn ledger(&self) -> &AchievementLedger {
        &self.ledger
    }

    pub fn problems(&self) -> &[Problem] {
        &self.problems
    }

    pub fn last_report(&self) -> Option<&NarrativeReport> {
        self.last_report.as_ref()
    }
}
