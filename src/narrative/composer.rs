//! Report assembly
//!
//! Sections always appear in this order, each one only when it has content:
//!
//! 1. opening line, picked at random from the pool for the health label
//! 2. up to three most recent achievements
//! 3. one story per populated channel
//! 4. up to three active problems
//! 5. investor digest (investor mode only)
//!
//! The random source is injected so a seeded generator yields the same
//! report for the same input.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::selector::{Icon, MetricStory, StoryChannel, Tone};
use crate::MetricSnapshot;
use crate::achievements::Achievement;
use crate::health::{HealthAssessment, HealthLabel};
use crate::problems::{Problem, Severity};
use crate::templates::{Heading, Language, TemplateTable, fill, group_thousands};

/// Maximum achievements and problems shown per report
pub const MAX_LIST_ITEMS: usize = 3;

const BASE_QUALITY: u8 = 95;
const RICH_REPORT_BONUS: u8 = 5;
const RICH_REPORT_SECTIONS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Opening,
    Achievements,
    Metric(StoryChannel),
    Problems,
    Investor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Section {
    Sentence {
        kind: SectionKind,
        text: String,
        tone: Tone,
        icon: Option<Icon>,
    },
    List {
        kind: SectionKind,
        title: String,
        items: Vec<String>,
        tone: Tone,
    },
}

impl Section {
    pub fn kind(&self) -> SectionKind {
        match self {
            Section::Sentence { kind, .. } | Section::List { kind, .. } => *kind,
        }
    }

    pub fn tone(&self) -> Tone {
        match self {
            Section::Sentence { tone, .. } | Section::List { tone, .. } => *tone,
        }
    }

    /// Plain-text rendering, one line per sentence or list item
    pub fn lines(&self) -> Vec<String> {
        match self {
            Section::Sentence { text, .. } => vec![text.clone()],
            Section::List { title, items, .. } => std::iter::once(title.clone())
                .chain(items.iter().map(|item| format!("  - {item}")))
                .collect(),
        }
    }
}

/// One composed report. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeReport {
    pub timestamp: DateTime<Utc>,
    pub health: HealthLabel,
    pub health_score: u8,
    pub sections: Vec<Section>,
    pub snapshot: MetricSnapshot,

    /// Informational only; never gates composition
    pub quality_score: u8,
}

impl NarrativeReport {
    pub fn section(&self, kind: SectionKind) -> Option<&Section> {
        self.sections.iter().find(|section| section.kind() == kind)
    }

    pub fn kinds(&self) -> Vec<SectionKind> {
        self.sections.iter().map(Section::kind).collect()
    }

    pub fn to_text(&self) -> String {
        self.sections
            .iter()
            .flat_map(Section::lines)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Illustrative business figures derived from a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InvestorDigest {
    pub network_value: u64,
    pub blocks: u64,
    pub daily_volume: u64,
    pub reliability: u8,
}

impl InvestorDigest {
    pub fn from_snapshot(snapshot: &MetricSnapshot) -> Self {
        let blocks = snapshot.block_height.unwrap_or_default();
        let tps = snapshot.throughput.unwrap_or_default();
        let uptime = snapshot.uptime.unwrap_or_default();

        Self {
            network_value: blocks.saturating_mul(10),
            blocks,
            daily_volume: (tps * 86_400.0 * 0.1).round() as u64,
            reliability: uptime.round().min(100.0) as u8,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NarrativeComposer {
    templates: Arc<TemplateTable>,
    language: Language,
    investor_mode: bool,
}

impl NarrativeComposer {
    pub fn new(templates: Arc<TemplateTable>, language: Language, investor_mode: bool) -> Self {
        Self {
            templates,
            language,
            investor_mode,
        }
    }

    pub fn investor_mode(&self) -> bool {
        self.investor_mode
    }

    /// Assemble a report.
    ///
    /// `achievements` are in unlock order; only the last [`MAX_LIST_ITEMS`]
    /// are shown. `problems` keep their detection order and are cut to the
    /// first [`MAX_LIST_ITEMS`].
    #[allow(clippy::too_many_arguments)]
    pub fn compose<R: Rng + ?Sized>(
        &self,
        snapshot: &MetricSnapshot,
        health: &HealthAssessment,
        achievements: &[Achievement],
        stories: Vec<MetricStory>,
        problems: &[Problem],
        rng: &mut R,
        now: DateTime<Utc>,
    ) -> NarrativeReport {
        let mut sections = vec![self.opening(health.label, rng)];

        if !achievements.is_empty() {
            let recent = &achievements[achievements.len().saturating_sub(MAX_LIST_ITEMS)..];
            sections.push(Section::List {
                kind: SectionKind::Achievements,
                title: self.templates.heading(self.language, Heading::Achievements).to_string(),
                items: recent.iter().map(|a| a.text.clone()).collect(),
                tone: Tone::Positive,
            });
        }

        sections.extend(stories.into_iter().map(|story| Section::Sentence {
            kind: SectionKind::Metric(story.channel),
            text: story.text,
            tone: story.tone,
            icon: Some(story.icon),
        }));

        if !problems.is_empty() {
            let shown = &problems[..problems.len().min(MAX_LIST_ITEMS)];
            let tone = if shown.iter().any(|p| p.severity == Severity::High) {
                Tone::Alert
            } else {
                Tone::Caution
            };
            sections.push(Section::List {
                kind: SectionKind::Problems,
                title: self.templates.heading(self.language, Heading::Problems).to_string(),
                items: shown.iter().map(|p| p.text.clone()).collect(),
                tone,
            });
        }

        if self.investor_mode {
            sections.push(self.investor_section(&InvestorDigest::from_snapshot(snapshot)));
        }

        let quality_score = quality_score(sections.len());
        debug!(
            "composed {} report: {} sections, quality {}",
            health.label.as_str(),
            sections.len(),
            quality_score
        );

        NarrativeReport {
            timestamp: now,
            health: health.label,
            health_score: health.score,
            sections,
            snapshot: snapshot.clone(),
            quality_score,
        }
    }

    fn opening<R: Rng + ?Sized>(&self, label: HealthLabel, rng: &mut R) -> Section {
        let text = match self.templates.openings(self.language, label).choose(rng) {
            Some(line) => line.clone(),
            None => {
                warn!("no {} opening lines for {}", self.language, label.as_str());
                format!("Node status: {}.", label.as_str())
            }
        };

        let tone = match label {
            HealthLabel::Healthy => Tone::Positive,
            HealthLabel::Warning => Tone::Caution,
            HealthLabel::Critical => Tone::Alert,
        };

        Section::Sentence {
            kind: SectionKind::Opening,
            text,
            tone,
            icon: None,
        }
    }

    fn investor_section(&self, digest: &InvestorDigest) -> Section {
        let items = [
            (
                "network_value",
                vec![
                    ("value", group_thousands(digest.network_value)),
                    ("blocks", group_thousands(digest.blocks)),
                ],
            ),
            (
                "transaction_volume",
                vec![("value", group_thousands(digest.daily_volume))],
            ),
            (
                "reliability_score",
                vec![("score", digest.reliability.to_string())],
            ),
        ]
        .into_iter()
        .map(|(id, vars)| match self.templates.investor(self.language, id) {
            Some(template) => fill(template, &vars),
            None => {
                warn!("no {} template for investor statistic {id}", self.language);
                let values = vars.iter().map(|(_, v)| v.as_str()).collect::<Vec<_>>();
                format!("{id}: {}", values.join(" / "))
            }
        })
        .collect();

        Section::List {
            kind: SectionKind::Investor,
            title: self.templates.heading(self.language, Heading::Investor).to_string(),
            items,
            tone: Tone::Neutral,
        }
    }
}

pub fn quality_score(sections: usize) -> u8 {
    let bonus = if sections >= RICH_REPORT_SECTIONS {
        RICH_REPORT_BONUS
    } else {
        0
    };
    BASE_QUALITY.saturating_add(bonus).min(100)
}
