//! Actor-level tests: events, queries and shutdown

use std::sync::Arc;

use assert_matches::assert_matches;
use node_storyteller::{
    MetricUpdate,
    actors::NarratorEvent,
    config::Config,
    history::SeriesChannel,
    narrative::StoryChannel,
    storage::MemoryBackend,
};
use pretty_assertions::assert_eq;

use crate::helpers::*;

#[tokio::test]
async fn test_updates_processed_in_arrival_order() {
    let handle = spawn_narrator(&test_config(), Arc::new(MemoryBackend::new()));
    let mut events = handle.subscribe();

    handle.ingest(throughput(500.0)).await;
    handle.ingest(throughput(650.0)).await;

    let first = next_report(&mut events).await;
    let second = next_report(&mut events).await;
    assert_eq!(first.snapshot.throughput, Some(500.0));
    assert_eq!(
        story_text(&second, StoryChannel::Throughput).as_deref(),
        Some("🚀 TPS is climbing! Up 30.0% since the last update.")
    );

    handle.shutdown().await;
}

#[tokio::test]
async fn test_unlock_event_fires_once() {
    let handle = spawn_narrator(&test_config(), Arc::new(MemoryBackend::new()));
    let mut events = handle.subscribe();

    handle.ingest(height(1)).await;
    handle.ingest(height(1)).await;
    let _ = next_report(&mut events).await;

    // the first tick published the unlock before its report
    let second = handle.process(height(2)).await.unwrap();
    assert!(second.unlocked.is_empty());

    let mut unlocks = 0;
    while let Ok(event) = events.try_recv() {
        if matches!(event, NarratorEvent::AchievementUnlocked(_)) {
            unlocks += 1;
        }
    }
    assert_eq!(unlocks, 0);

    let ledger = handle.achievements().await;
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].id, "first_block");

    handle.shutdown().await;
}

#[tokio::test]
async fn test_event_sequence_for_one_tick() {
    let handle = spawn_narrator(&test_config(), Arc::new(MemoryBackend::new()));
    let mut events = handle.subscribe();

    handle
        .ingest(MetricUpdate {
            throughput: Some(1200.0),
            uptime: Some(92.0),
            ..Default::default()
        })
        .await;

    assert_matches!(
        events.recv().await,
        Ok(NarratorEvent::AchievementUnlocked(a)) if a.id == "high_tps"
    );
    assert_matches!(
        events.recv().await,
        Ok(NarratorEvent::ProblemsDetected(problems)) if problems[0].id == "low_uptime"
    );
    assert_matches!(events.recv().await, Ok(NarratorEvent::ReportGenerated(_)));

    assert_eq!(handle.problems().await.len(), 1);
    handle.shutdown().await;
}

#[tokio::test]
async fn test_series_query_returns_copy() {
    let config = Config {
        window_length: 3,
        ..test_config()
    };
    let handle = spawn_narrator(&config, Arc::new(MemoryBackend::new()));

    for tps in [1.0, 2.0, 3.0, 4.0] {
        handle.ingest(throughput(tps)).await;
    }

    let view = handle.series(SeriesChannel::Throughput).await;
    assert_eq!(view, vec![2.0, 3.0, 4.0]);

    handle.ingest(throughput(5.0)).await;
    // the earlier copy is unaffected by later updates
    assert_eq!(view, vec![2.0, 3.0, 4.0]);
    assert_eq!(
        handle.series(SeriesChannel::Throughput).await,
        vec![3.0, 4.0, 5.0]
    );

    handle.shutdown().await;
}

#[tokio::test]
async fn test_queries_after_shutdown_degrade() {
    let handle = spawn_narrator(&test_config(), Arc::new(MemoryBackend::new()));
    handle.shutdown().await;

    assert!(handle.process(throughput(1.0)).await.is_none());
    assert!(handle.last_report().await.is_none());
    assert!(handle.achievements().await.is_empty());
}
