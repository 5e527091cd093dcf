//! Helper functions for integration tests

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use node_storyteller::{
    MetricUpdate, ValidatorHealth,
    actors::{NarratorEvent, NarratorHandle},
    config::{Config, StorageConfig},
    narrative::{NarrativeReport, Section, SectionKind, StoryChannel},
    pipeline::Narrator,
    storage::{NullBackend, StateBackend},
    templates::TemplateTable,
};
use tokio::sync::broadcast;

/// Deterministic config with persistence switched off
pub fn test_config() -> Config {
    Config {
        rng_seed: Some(5),
        storage: StorageConfig::None,
        ..Config::default()
    }
}

pub fn templates() -> Arc<TemplateTable> {
    Arc::new(TemplateTable::builtin())
}

pub fn narrator(config: &Config, now: DateTime<Utc>) -> Narrator {
    Narrator::open(config, templates(), &NullBackend, now)
}

pub fn spawn_narrator(config: &Config, backend: Arc<dyn StateBackend>) -> NarratorHandle {
    NarratorHandle::spawn(config, templates(), backend)
}

/// The reference snapshot: every channel comfortably healthy
pub fn healthy_update() -> MetricUpdate {
    MetricUpdate {
        throughput: Some(500.0),
        finality_ms: Some(400.0),
        uptime: Some(99.95),
        validators: Some(vec![
            ValidatorHealth::new("alpha", 97.0),
            ValidatorHealth::new("beta", 93.0),
            ValidatorHealth::new("gamma", 90.0),
        ]),
        ..Default::default()
    }
}

pub fn throughput(tps: f64) -> MetricUpdate {
    MetricUpdate {
        throughput: Some(tps),
        ..Default::default()
    }
}

pub fn height(block_height: u64) -> MetricUpdate {
    MetricUpdate {
        block_height: Some(block_height),
        ..Default::default()
    }
}

/// Text of the metric story for `channel`, if the report has one
pub fn story_text(report: &NarrativeReport, channel: StoryChannel) -> Option<String> {
    match report.section(SectionKind::Metric(channel))? {
        Section::Sentence { text, .. } => Some(text.clone()),
        Section::List { .. } => None,
    }
}

/// Skip events until the next report arrives
pub async fn next_report(events: &mut broadcast::Receiver<NarratorEvent>) -> Arc<NarrativeReport> {
    loop {
        let event = tokio::time::timeout(Duration::from_secs(2), events.recv())
            .await
            .expect("timed out waiting for a report")
            .expect("event channel closed");
        if let NarratorEvent::ReportGenerated(report) = event {
            return report;
        }
    }
}
