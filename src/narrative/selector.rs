//! Per-channel template selection
//!
//! Each populated channel gets one tier key. The absolute tier comes from
//! fixed thresholds on the current value; a large enough change against the
//! previous snapshot replaces it with a trend tier for that tick only.
//!
//! For finality latency a *decrease* is the better direction, so the sign
//! of the change is flipped before choosing between `trend_better` and
//! `trend_worse`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::templates::{Language, TemplateTable, fill};
use crate::{MetricSnapshot, ValidatorHealth};

const THROUGHPUT_EXCELLENT: f64 = 800.0;
const THROUGHPUT_GOOD: f64 = 300.0;
const THROUGHPUT_TREND_PERCENT: f64 = 10.0;

const FINALITY_FAST_MS: f64 = 300.0;
const FINALITY_NORMAL_MS: f64 = 600.0;
const FINALITY_TREND_PERCENT: f64 = 15.0;

const UPTIME_PERFECT: f64 = 99.9;
const UPTIME_EXCELLENT: f64 = 99.0;
const UPTIME_GOOD: f64 = 95.0;

/// A validator at or above this health counts as healthy in stories
const VALIDATOR_HEALTHY: f64 = 90.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoryChannel {
    Throughput,
    Finality,
    Uptime,
    Validators,
    Network,
}

impl StoryChannel {
    /// Order in which metric stories appear in a report
    pub const ORDER: [StoryChannel; 5] = [
        StoryChannel::Throughput,
        StoryChannel::Finality,
        StoryChannel::Uptime,
        StoryChannel::Validators,
        StoryChannel::Network,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StoryChannel::Throughput => "throughput",
            StoryChannel::Finality => "finality",
            StoryChannel::Uptime => "uptime",
            StoryChannel::Validators => "validators",
            StoryChannel::Network => "network",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierKey {
    Excellent,
    Good,
    Low,
    TrendUp,
    TrendDown,
    Fast,
    Normal,
    Slow,
    TrendBetter,
    TrendWorse,
    Perfect,
    Concerning,
    AllHealthy,
    MostlyHealthy,
    SomeIssues,
    Critical,
    Growing,
    Stable,
    Shrinking,
}

impl TierKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            TierKey::Excellent => "excellent",
            TierKey::Good => "good",
            TierKey::Low => "low",
            TierKey::TrendUp => "trend_up",
            TierKey::TrendDown => "trend_down",
            TierKey::Fast => "fast",
            TierKey::Normal => "normal",
            TierKey::Slow => "slow",
            TierKey::TrendBetter => "trend_better",
            TierKey::TrendWorse => "trend_worse",
            TierKey::Perfect => "perfect",
            TierKey::Concerning => "concerning",
            TierKey::AllHealthy => "all_healthy",
            TierKey::MostlyHealthy => "mostly_healthy",
            TierKey::SomeIssues => "some_issues",
            TierKey::Critical => "critical",
            TierKey::Growing => "growing",
            TierKey::Stable => "stable",
            TierKey::Shrinking => "shrinking",
        }
    }

    pub fn is_trend(&self) -> bool {
        matches!(
            self,
            TierKey::TrendUp | TierKey::TrendDown | TierKey::TrendBetter | TierKey::TrendWorse
        )
    }
}

/// Severity tag handed to the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Positive,
    Neutral,
    Caution,
    Alert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Icon {
    Chart,
    Timer,
    Clock,
    Trophy,
    Network,
}

/// Chosen tier plus the change magnitude that was computed along the way
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selection {
    pub key: TierKey,

    /// Absolute percent change against the previous value, if there was one
    pub change: Option<f64>,
}

/// One sentence for one channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricStory {
    pub channel: StoryChannel,
    pub key: TierKey,
    pub text: String,
    pub tone: Tone,
    pub icon: Icon,
}

/// Signed percent change from `previous` to `current`; `None` without a
/// usable (non-zero) previous value.
fn percent_change(previous: Option<f64>, current: f64) -> Option<f64> {
    let previous = previous.filter(|previous| *previous != 0.0)?;
    Some((current - previous) * 100.0 / previous)
}

pub fn throughput_tier(current: f64, previous: Option<f64>) -> Selection {
    let absolute = if current > THROUGHPUT_EXCELLENT {
        TierKey::Excellent
    } else if current > THROUGHPUT_GOOD {
        TierKey::Good
    } else {
        TierKey::Low
    };

    let change = percent_change(previous, current);
    let key = match change {
        Some(change) if change.abs() > THROUGHPUT_TREND_PERCENT => {
            if change > 0.0 {
                TierKey::TrendUp
            } else {
                TierKey::TrendDown
            }
        }
        _ => absolute,
    };

    Selection {
        key,
        change: change.map(f64::abs),
    }
}

pub fn finality_tier(current: f64, previous: Option<f64>) -> Selection {
    let absolute = if current < FINALITY_FAST_MS {
        TierKey::Fast
    } else if current < FINALITY_NORMAL_MS {
        TierKey::Normal
    } else {
        TierKey::Slow
    };

    // positive improvement means latency went down
    let improvement = percent_change(previous, current).map(|change| -change);
    let key = match improvement {
        Some(improvement) if improvement.abs() > FINALITY_TREND_PERCENT => {
            if improvement > 0.0 {
                TierKey::TrendBetter
            } else {
                TierKey::TrendWorse
            }
        }
        _ => absolute,
    };

    Selection {
        key,
        change: improvement.map(f64::abs),
    }
}

pub fn uptime_tier(current: f64) -> TierKey {
    if current >= UPTIME_PERFECT {
        TierKey::Perfect
    } else if current >= UPTIME_EXCELLENT {
        TierKey::Excellent
    } else if current >= UPTIME_GOOD {
        TierKey::Good
    } else {
        TierKey::Concerning
    }
}

/// Healthy / total counts used by the validator story
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatorCounts {
    pub total: usize,
    pub healthy: usize,
}

impl ValidatorCounts {
    pub fn of(validators: &[ValidatorHealth]) -> Self {
        Self {
            total: validators.len(),
            healthy: validators
                .iter()
                .filter(|validator| validator.health >= VALIDATOR_HEALTHY)
                .count(),
        }
    }

    pub fn issues(&self) -> usize {
        self.total - self.healthy
    }

    fn ratio(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        self.healthy as f64 / self.total as f64
    }
}

pub fn validators_tier(counts: ValidatorCounts) -> TierKey {
    let ratio = counts.ratio();
    if counts.healthy == counts.total {
        TierKey::AllHealthy
    } else if ratio >= 0.8 {
        TierKey::MostlyHealthy
    } else if ratio >= 0.5 {
        TierKey::SomeIssues
    } else {
        TierKey::Critical
    }
}

pub fn network_tier(current_peers: u32, previous_peers: Option<u32>) -> TierKey {
    match previous_peers {
        Some(previous) if current_peers > previous => TierKey::Growing,
        Some(previous) if current_peers < previous => TierKey::Shrinking,
        _ => TierKey::Stable,
    }
}

/// Turns snapshots into per-channel sentences in one language
#[derive(Debug, Clone)]
pub struct TemplateSelector {
    templates: Arc<TemplateTable>,
    language: Language,
}

impl TemplateSelector {
    pub fn new(templates: Arc<TemplateTable>, language: Language) -> Self {
        Self {
            templates,
            language,
        }
    }

    /// One story per populated channel, in [`StoryChannel::ORDER`].
    pub fn stories(
        &self,
        current: &MetricSnapshot,
        previous: Option<&MetricSnapshot>,
    ) -> Vec<MetricStory> {
        StoryChannel::ORDER
            .iter()
            .filter_map(|channel| self.story(*channel, current, previous))
            .collect()
    }

    pub fn story(
        &self,
        channel: StoryChannel,
        current: &MetricSnapshot,
        previous: Option<&MetricSnapshot>,
    ) -> Option<MetricStory> {
        match channel {
            StoryChannel::Throughput => {
                let tps = current.throughput?;
                let selection = throughput_tier(tps, previous.and_then(|p| p.throughput));
                let mut vars = vec![("value", format!("{tps:.2}"))];
                if let Some(change) = selection.change {
                    vars.push(("change", format!("{change:.1}")));
                }
                let tone = if tps > 500.0 {
                    Tone::Positive
                } else {
                    Tone::Caution
                };
                Some(self.render(channel, selection.key, &vars, tone, Icon::Chart))
            }

            StoryChannel::Finality => {
                let finality = current.finality_ms?;
                let selection = finality_tier(finality, previous.and_then(|p| p.finality_ms));
                let mut vars = vec![("value", format!("{finality:.0}"))];
                if let Some(change) = selection.change {
                    vars.push(("change", format!("{change:.1}")));
                }
                let tone = if finality < 500.0 {
                    Tone::Positive
                } else {
                    Tone::Caution
                };
                Some(self.render(channel, selection.key, &vars, tone, Icon::Timer))
            }

            StoryChannel::Uptime => {
                let uptime = current.uptime?;
                let key = uptime_tier(uptime);
                let tone = if uptime >= UPTIME_EXCELLENT {
                    Tone::Positive
                } else {
                    Tone::Caution
                };
                let vars = [("value", format!("{uptime:.2}"))];
                Some(self.render(channel, key, &vars, tone, Icon::Clock))
            }

            StoryChannel::Validators => {
                if current.validators.is_empty() {
                    return None;
                }
                let counts = ValidatorCounts::of(&current.validators);
                let key = validators_tier(counts);
                let tone = match key {
                    TierKey::AllHealthy => Tone::Positive,
                    TierKey::MostlyHealthy => Tone::Caution,
                    _ => Tone::Alert,
                };
                let vars = [
                    ("count", counts.total.to_string()),
                    ("healthy", counts.healthy.to_string()),
                    ("issues", counts.issues().to_string()),
                ];
                Some(self.render(channel, key, &vars, tone, Icon::Trophy))
            }

            StoryChannel::Network => {
                if current.peers.is_none() && current.block_height.is_none() {
                    return None;
                }
                let peers = current.peers.unwrap_or_default();
                let previous_peers = previous.and_then(|p| p.peers);
                let key = network_tier(peers, previous_peers);
                let delta = previous_peers.map_or(0, |previous| peers.abs_diff(previous));
                let vars = [
                    ("count", peers.to_string()),
                    ("new", delta.to_string()),
                    ("lost", delta.to_string()),
                    ("height", current.block_height.unwrap_or_default().to_string()),
                    ("size", current.mempool.unwrap_or_default().to_string()),
                ];
                Some(self.render(channel, key, &vars, Tone::Neutral, Icon::Network))
            }
        }
    }

    fn render(
        &self,
        channel: StoryChannel,
        key: TierKey,
        vars: &[(&str, String)],
        tone: Tone,
        icon: Icon,
    ) -> MetricStory {
        let text = match self
            .templates
            .story(self.language, channel.as_str(), key.as_str())
        {
            Some(template) => fill(template, vars),
            None => {
                warn!(
                    "no {} template for {}.{}, using plain sentence",
                    self.language,
                    channel.as_str(),
                    key.as_str()
                );
                fallback_sentence(channel, vars)
            }
        };

        MetricStory {
            channel,
            key,
            text,
            tone,
            icon,
        }
    }
}

/// Untemplated sentence used when a template is missing
fn fallback_sentence(channel: StoryChannel, vars: &[(&str, String)]) -> String {
    let details = vars
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{}: {details}", channel.as_str())
}
