//! Concurrent producers and independent pipelines

use std::sync::Arc;

use node_storyteller::{
    history::SeriesChannel,
    storage::MemoryBackend,
    templates::Language,
    config::Config,
};
use pretty_assertions::assert_eq;

use crate::helpers::*;

#[tokio::test]
async fn test_concurrent_producers_are_serialized() {
    let config = Config {
        window_length: 100,
        ..test_config()
    };
    let handle = spawn_narrator(&config, Arc::new(MemoryBackend::new()));

    let mut producers = vec![];
    for producer in 0..4 {
        let handle = handle.clone();
        producers.push(tokio::spawn(async move {
            for i in 0..10 {
                handle.ingest(throughput(f64::from(producer * 100 + i))).await;
            }
        }));
    }
    for producer in producers {
        producer.await.unwrap();
    }

    let mut samples = handle.series(SeriesChannel::Throughput).await;
    assert_eq!(samples.len(), 40);

    // each producer's own updates keep their relative order
    for producer in 0..4 {
        let own: Vec<_> = samples
            .iter()
            .copied()
            .filter(|tps| (*tps as i32) / 100 == producer)
            .collect();
        let expected: Vec<_> = (0..10).map(|i| f64::from(producer * 100 + i)).collect();
        assert_eq!(own, expected);
    }

    samples.sort_by(f64::total_cmp);
    samples.dedup();
    assert_eq!(samples.len(), 40);

    handle.shutdown().await;
}

#[tokio::test]
async fn test_pipelines_do_not_share_state() {
    let english = spawn_narrator(&test_config(), Arc::new(MemoryBackend::new()));
    let arabic = spawn_narrator(
        &Config {
            language: Language::Ar,
            ..test_config()
        },
        Arc::new(MemoryBackend::new()),
    );

    english.process(height(1)).await.unwrap();
    arabic.process(throughput(300.0)).await.unwrap();

    assert_eq!(english.achievements().await.len(), 1);
    assert!(arabic.achievements().await.is_empty());
    assert!(english.series(SeriesChannel::Throughput).await.is_empty());

    let report = arabic.last_report().await.unwrap();
    assert!(!report.to_text().contains("Processing"));

    english.shutdown().await;
    arabic.shutdown().await;
}
