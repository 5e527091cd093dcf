//! Durable state across restarts, using the file backend in a temp dir

use std::sync::Arc;

use node_storyteller::{
    config::{Config, StorageConfig},
    history::SeriesChannel,
    storage::{FileBackend, StateBackend, backend_from_config},
};
use pretty_assertions::assert_eq;

use crate::helpers::*;

fn file_config(dir: &std::path::Path) -> Config {
    Config {
        storage: StorageConfig::Files {
            dir: dir.to_path_buf(),
        },
        ..test_config()
    }
}

#[tokio::test]
async fn test_ledger_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = file_config(dir.path());

    let handle = spawn_narrator(&config, backend_from_config(&config.storage));
    let tick = handle.process(height(1500)).await.unwrap();
    assert_eq!(tick.unlocked.len(), 3);
    handle.shutdown().await;

    let handle = spawn_narrator(&config, backend_from_config(&config.storage));
    let ids: Vec<_> = handle
        .achievements()
        .await
        .into_iter()
        .map(|a| a.id)
        .collect();
    assert_eq!(ids, vec!["first_block", "hundred_blocks", "thousand_blocks"]);

    // reloaded milestones stay dormant
    let tick = handle.process(height(1501)).await.unwrap();
    assert!(tick.unlocked.is_empty());

    handle.shutdown().await;
}

#[tokio::test]
async fn test_history_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = file_config(dir.path());

    let handle = spawn_narrator(&config, backend_from_config(&config.storage));
    for tps in [310.0, 320.0, 330.0] {
        handle.ingest(throughput(tps)).await;
    }
    handle.shutdown().await;

    let handle = spawn_narrator(&config, backend_from_config(&config.storage));
    assert_eq!(
        handle.series(SeriesChannel::Throughput).await,
        vec![310.0, 320.0, 330.0]
    );

    // the restored snapshot acts as the previous value for trends
    let tick = handle.process(throughput(400.0)).await.unwrap();
    assert_eq!(
        story_text(&tick.report, node_storyteller::narrative::StoryChannel::Throughput).as_deref(),
        Some("🚀 TPS is climbing! Up 21.2% since the last update.")
    );

    handle.shutdown().await;
}

#[tokio::test]
async fn test_restore_trims_to_smaller_window() {
    let dir = tempfile::tempdir().unwrap();
    let config = file_config(dir.path());

    let handle = spawn_narrator(&config, backend_from_config(&config.storage));
    for tps in 1..=10 {
        handle.ingest(throughput(f64::from(tps))).await;
    }
    handle.shutdown().await;

    let smaller = Config {
        window_length: 4,
        ..config
    };
    let handle = spawn_narrator(&smaller, backend_from_config(&smaller.storage));
    assert_eq!(
        handle.series(SeriesChannel::Throughput).await,
        vec![7.0, 8.0, 9.0, 10.0]
    );
    handle.shutdown().await;
}

#[tokio::test]
async fn test_periodic_save_writes_cache() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        save_interval_secs: 0,
        ..file_config(dir.path())
    };
    let backend = Arc::new(FileBackend::new(dir.path()));

    let handle = spawn_narrator(&config, backend.clone());
    handle.process(throughput(250.0)).await.unwrap();
    handle.process(throughput(260.0)).await.unwrap();

    let mut cache = None;
    for _ in 0..50 {
        cache = backend.load_history().unwrap();
        if cache.as_ref().is_some_and(|c| c.throughput.len() == 2) {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert_eq!(cache.unwrap().throughput, vec![250.0, 260.0]);

    handle.shutdown().await;
}

#[tokio::test]
async fn test_report_archive() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        archive_reports: true,
        ..file_config(dir.path())
    };
    let backend = Arc::new(FileBackend::new(dir.path()));

    let handle = spawn_narrator(&config, backend.clone());
    let tick = handle.process(healthy_update()).await.unwrap();
    handle.shutdown().await;

    let path = backend.reports_dir().join(FileBackend::report_file_name(
        tick.report.timestamp.timestamp_millis(),
        0,
    ));
    let stored: node_storyteller::narrative::NarrativeReport =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(stored, tick.report);
}

#[tokio::test]
async fn test_every_tick_archived_in_a_burst() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        archive_reports: true,
        ..file_config(dir.path())
    };
    let backend = FileBackend::new(dir.path());
    let now = chrono::Utc::now();
    let mut narrator = node_storyteller::pipeline::Narrator::open(&config, templates(), &backend, now);

    for tps in [300.0, 310.0, 320.0] {
        for write in narrator.process(throughput(tps), now).writes {
            if let node_storyteller::pipeline::StateWrite::Report(report) = write {
                backend.archive_report(&report).await.unwrap();
            }
        }
    }

    let archived = std::fs::read_dir(backend.reports_dir()).unwrap().count();
    assert_eq!(archived, 3);
}
