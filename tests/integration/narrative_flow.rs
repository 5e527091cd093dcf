//! End-to-end behaviour of the synchronous pipeline

use chrono::{Duration, Utc};
use node_storyteller::{
    MetricUpdate,
    config::Config,
    health::HealthLabel,
    history::SeriesChannel,
    narrative::{Section, SectionKind, StoryChannel},
    templates::Language,
};
use pretty_assertions::assert_eq;

use crate::helpers::*;

#[test]
fn test_throughput_trend_overrides_absolute_tier() {
    let now = Utc::now();
    let mut narrator = narrator(&test_config(), now);

    let first = narrator.process(throughput(500.0), now);
    assert_eq!(
        story_text(&first.report, StoryChannel::Throughput).as_deref(),
        Some("Processing 500.00 TPS steadily. The network is performing well.")
    );

    let second = narrator.process(throughput(650.0), now);
    assert_eq!(
        story_text(&second.report, StoryChannel::Throughput).as_deref(),
        Some("🚀 TPS is climbing! Up 30.0% since the last update.")
    );
}

#[test]
fn test_finality_decrease_reads_as_improvement() {
    let now = Utc::now();
    let mut narrator = narrator(&test_config(), now);
    let finality = |ms| MetricUpdate {
        finality_ms: Some(ms),
        ..Default::default()
    };

    narrator.process(finality(500.0), now);
    let tick = narrator.process(finality(350.0), now);

    assert_eq!(
        story_text(&tick.report, StoryChannel::Finality).as_deref(),
        Some("✨ Finality is improving! 30.0% faster than before.")
    );
}

#[test]
fn test_health_boundary() {
    let now = Utc::now();
    let mut narrator = narrator(&test_config(), now);

    let tick = narrator.process(healthy_update(), now);
    assert_eq!(tick.health.score, 100);
    assert_eq!(tick.health.label, HealthLabel::Healthy);

    let tick = narrator.process(
        MetricUpdate {
            uptime: Some(98.0),
            ..Default::default()
        },
        now,
    );
    assert_eq!(tick.health.deficit(), 20);
    assert_eq!(tick.health.score, 80);
    // 80 is the lowest healthy score
    assert_eq!(tick.health.label, HealthLabel::Healthy);
    assert_eq!(tick.report.health, HealthLabel::Healthy);

    let tick = narrator.process(
        MetricUpdate {
            throughput: Some(150.0),
            ..Default::default()
        },
        now,
    );
    assert_eq!(tick.health.score, 65);
    assert_eq!(tick.report.health, HealthLabel::Warning);
}

#[test]
fn test_window_keeps_newest_samples() {
    let now = Utc::now();
    let config = Config {
        window_length: 4,
        ..test_config()
    };
    let mut narrator = narrator(&config, now);

    for (i, tps) in [10.0, 20.0, 30.0, 40.0, 50.0, 60.0].into_iter().enumerate() {
        narrator.process(throughput(tps), now + Duration::seconds(i as i64));
    }

    assert_eq!(
        narrator.history().view(SeriesChannel::Throughput),
        vec![30.0, 40.0, 50.0, 60.0]
    );
    assert_eq!(narrator.history().current().unwrap().throughput, Some(60.0));
}

#[test]
fn test_scalar_fields_survive_partial_updates() {
    let now = Utc::now();
    let mut narrator = narrator(&test_config(), now);

    narrator.process(healthy_update(), now);
    let tick = narrator.process(height(42), now);

    let snapshot = &tick.report.snapshot;
    assert_eq!(snapshot.uptime, Some(99.95));
    assert_eq!(snapshot.block_height, Some(42));
    assert_eq!(snapshot.validators.len(), 3);
    // series channels only grow when a sample arrives
    assert_eq!(narrator.history().view(SeriesChannel::Throughput), vec![500.0]);
}

#[test]
fn test_full_report_shape() {
    let now = Utc::now();
    let config = Config {
        investor_mode: true,
        ..test_config()
    };
    let mut narrator = narrator(&config, now);

    let tick = narrator.process(
        MetricUpdate {
            block_height: Some(1),
            peers: Some(30),
            mempool: Some(7500),
            ..healthy_update()
        },
        now,
    );

    assert_eq!(
        tick.report.kinds(),
        vec![
            SectionKind::Opening,
            SectionKind::Achievements,
            SectionKind::Metric(StoryChannel::Throughput),
            SectionKind::Metric(StoryChannel::Finality),
            SectionKind::Metric(StoryChannel::Uptime),
            SectionKind::Metric(StoryChannel::Validators),
            SectionKind::Metric(StoryChannel::Network),
            SectionKind::Problems,
            SectionKind::Investor,
        ]
    );
    assert_eq!(tick.report.quality_score, 100);

    let Some(Section::List { items, .. }) = tick.report.section(SectionKind::Problems) else {
        panic!("missing problems section");
    };
    assert_eq!(
        items,
        &vec!["📊 7,500 transactions waiting - the network is experiencing high demand.".to_string()]
    );
}

#[test]
fn test_same_seed_same_reports() {
    let now = Utc::now();
    let mut a = narrator(&test_config(), now);
    let mut b = narrator(&test_config(), now);

    for update in [healthy_update(), throughput(120.0), height(7)] {
        assert_eq!(a.process(update.clone(), now).report, b.process(update, now).report);
    }
}

#[test]
fn test_arabic_report() {
    let now = Utc::now();
    let config = Config {
        language: Language::Ar,
        ..test_config()
    };
    let mut narrator = narrator(&config, now);

    let tick = narrator.process(healthy_update(), now);
    let text = tick.report.to_text();
    assert!(text.contains("500.00"), "{text}");
    assert!(!text.contains("Processing"), "{text}");
}

#[test]
fn test_json_ingress_matches_typed_ingress() {
    let now = Utc::now();
    let mut typed = narrator(&test_config(), now);
    let mut loose = narrator(&test_config(), now);

    let a = typed.process(
        MetricUpdate {
            throughput: Some(640.0),
            block_height: Some(12),
            peers: Some(8),
            ..Default::default()
        },
        now,
    );
    let b = loose.process_json(
        &serde_json::json!({ "tps": 640.0, "blockHeight": 12, "peers": 8 }),
        now,
    );

    assert!(b.rejected.is_empty());
    assert_eq!(a.report, b.report);
}
