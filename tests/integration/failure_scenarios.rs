//! Failure handling: bad input, broken storage, missing templates
//!
//! None of these may abort a tick or stop the actor.

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use chrono::Utc;
use node_storyteller::{
    MetricUpdate,
    actors::NarratorEvent,
    narrative::{SectionKind, StoryChannel},
    pipeline::{Narrator, StateTarget},
    storage::{FileBackend, MemoryBackend, NullBackend, StateBackend},
    templates::TemplateTable,
};
use pretty_assertions::assert_eq;

use crate::helpers::*;

#[tokio::test]
async fn test_write_failure_does_not_fail_tick() {
    let backend = Arc::new(MemoryBackend::new());
    backend.set_fail_writes(true);
    let handle = spawn_narrator(&test_config(), backend.clone());
    let mut events = handle.subscribe();

    let tick = handle.process(height(1)).await.unwrap();
    assert_eq!(tick.unlocked.len(), 1);

    let failure = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            if let Ok(NarratorEvent::PersistFailed { target, .. }) = events.recv().await {
                return target;
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(failure, StateTarget::Ledger);

    // the pipeline keeps going
    let tick = handle.process(throughput(700.0)).await.unwrap();
    assert!(tick.report.section(SectionKind::Metric(StoryChannel::Throughput)).is_some());

    // once storage recovers the pending ledger write goes through
    backend.set_fail_writes(false);
    handle.shutdown().await;
    let ids: Vec<_> = backend.ledger().unwrap().into_iter().map(|a| a.id).collect();
    assert_eq!(ids, vec!["first_block"]);
}

#[test]
fn test_corrupt_ledger_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let backend = FileBackend::new(dir.path());
    std::fs::write(backend.ledger_path(), "[{\"id\": \"first_blo").unwrap();
    std::fs::write(backend.history_path(), "").unwrap();

    let now = Utc::now();
    let mut narrator = Narrator::open(&test_config(), templates(), &backend, now);
    assert!(narrator.ledger().is_empty());
    assert!(narrator.history().current().is_none());

    let tick = narrator.process(height(1), now);
    assert_eq!(tick.unlocked.len(), 1);
}

#[tokio::test]
async fn test_leftover_temp_file_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let backend = FileBackend::new(dir.path());
    std::fs::write(dir.path().join("achievements.json.tmp"), "garbage").unwrap();

    assert!(backend.load_ledger().unwrap().is_none());

    let handle = spawn_narrator(&test_config(), Arc::new(backend.clone()));
    handle.process(height(100)).await.unwrap();
    handle.shutdown().await;

    let ledger = backend.load_ledger().unwrap().unwrap();
    assert_eq!(ledger.len(), 2);
}

#[test]
fn test_malformed_fields_partially_applied() {
    let now = Utc::now();
    let mut narrator = narrator(&test_config(), now);

    let tick = narrator.process(
        MetricUpdate {
            throughput: Some(f64::INFINITY),
            uptime: Some(-3.0),
            peers: Some(17),
            ..Default::default()
        },
        now,
    );

    let fields: Vec<_> = tick.rejected.iter().map(|r| r.field.as_str()).collect();
    assert_eq!(fields, vec!["throughput", "uptime"]);
    assert_eq!(tick.report.snapshot.peers, Some(17));
    assert_eq!(tick.report.snapshot.throughput, None);
}

#[test]
fn test_non_object_json_still_reports() {
    let now = Utc::now();
    let mut narrator = narrator(&test_config(), now);

    let tick = narrator.process_json(&serde_json::json!("not metrics"), now);
    assert_eq!(tick.rejected.len(), 1);
    assert_eq!(tick.report.kinds(), vec![SectionKind::Opening]);
}

#[test]
fn test_missing_templates_fall_back() {
    let now = Utc::now();
    let mut narrator = Narrator::open(&test_config(), Arc::new(TemplateTable::new()), &NullBackend, now);

    let tick = narrator.process(
        MetricUpdate {
            block_height: Some(1),
            mempool: Some(9000),
            ..healthy_update()
        },
        now,
    );

    assert_eq!(
        story_text(&tick.report, StoryChannel::Throughput).as_deref(),
        Some("throughput: value=500.00")
    );
    assert_eq!(tick.unlocked[0].text, "Achievement unlocked: first_block");
    assert_eq!(tick.problems[0].text, "Problem detected: mempool_backlog");
    assert_matches!(tick.report.section(SectionKind::Opening), Some(_));
}
