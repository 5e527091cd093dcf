use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use node_storyteller::{
    MetricUpdate, ValidatorHealth,
    actors::{NarratorEvent, NarratorHandle},
    config::{Config, read_config_file},
    history::{SeriesChannel, render_sparkline, sparkline, summarize},
    storage::backend_from_config,
    util::get_config_path,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::broadcast;
use tracing::{debug, error, info, instrument, level_filters::LevelFilter, trace, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

const SPARKLINE_WIDTH: usize = 24;

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file (JSON, or TOML with a .toml extension)
    #[arg(short)]
    file: Option<PathBuf>,

    /// Number of simulated metric updates
    #[arg(long, default_value_t = 20)]
    ticks: u32,

    /// Delay between updates in milliseconds
    #[arg(long, default_value_t = 500)]
    interval_ms: u64,
}

fn init() {
    let filter = filter::Targets::new().with_targets(vec![
        ("node_storyteller", LevelFilter::DEBUG),
        ("storyteller", LevelFilter::TRACE),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let config = match args.file.clone().or_else(get_config_path) {
        Some(path) => read_config_file(path)?,
        None => {
            debug!("no config file given, using defaults");
            Config::default()
        }
    };

    let backend = backend_from_config(&config.storage);
    info!("state kept in {}", backend.describe());

    let templates = config.load_templates()?;
    let handle = NarratorHandle::spawn(&config, Arc::new(templates), backend);
    let logger = tokio::spawn(log_events(handle.subscribe()));

    let mut feed = SimulatedFeed::new(config.rng_seed);
    for _ in 0..args.ticks {
        handle.ingest(feed.next_update()).await;
        tokio::time::sleep(Duration::from_millis(args.interval_ms)).await;
    }

    let throughput = handle.series(SeriesChannel::Throughput).await;
    if let Some(summary) = summarize(&throughput) {
        info!(
            "throughput {} (min {:.1}, max {:.1}, avg {:.1})",
            render_sparkline(&sparkline(&throughput, SPARKLINE_WIDTH)),
            summary.min,
            summary.max,
            summary.mean
        );
    }

    handle.shutdown().await;
    logger.abort();

    Ok(())
}

#[instrument(skip_all)]
async fn log_events(mut events: broadcast::Receiver<NarratorEvent>) {
    loop {
        match events.recv().await {
            Ok(NarratorEvent::ReportGenerated(report)) => {
                info!(
                    "report: {} (score {}, quality {})",
                    report.health.as_str(),
                    report.health_score,
                    report.quality_score
                );
                for line in report.to_text().lines() {
                    info!("  {line}");
                }
            }
            Ok(NarratorEvent::AchievementUnlocked(achievement)) => {
                info!("achievement: {}", achievement.text);
            }
            Ok(NarratorEvent::ProblemsDetected(problems)) => {
                warn!("{} active problems", problems.len());
            }
            Ok(NarratorEvent::PersistFailed { target, error }) => {
                error!("could not save {}: {error}", target.as_str());
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("event logger lagged, skipped {skipped} events");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Random walk over plausible node metrics
struct SimulatedFeed {
    rng: StdRng,
    throughput: f64,
    finality_ms: f64,
    uptime: f64,
    block_height: u64,
    peers: u32,
}

impl SimulatedFeed {
    fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            throughput: 450.0,
            finality_ms: 480.0,
            uptime: 99.5,
            block_height: 0,
            peers: 24,
        }
    }

    fn next_update(&mut self) -> MetricUpdate {
        self.throughput = (self.throughput * self.rng.gen_range(0.8..1.25)).clamp(20.0, 1500.0);
        self.finality_ms = (self.finality_ms * self.rng.gen_range(0.8..1.2)).clamp(120.0, 1600.0);
        self.uptime = (self.uptime + self.rng.gen_range(-0.4..0.3)).clamp(90.0, 100.0);
        self.block_height += self.rng.gen_range(1..=12);
        self.peers = self.peers.saturating_add_signed(self.rng.gen_range(-2..=3));

        let validators = (0..5)
            .map(|i| ValidatorHealth::new(format!("validator-{i}"), self.rng.gen_range(60.0..100.0)))
            .collect();

        MetricUpdate {
            throughput: Some(self.throughput),
            finality_ms: Some(self.finality_ms),
            uptime: Some(self.uptime),
            block_height: Some(self.block_height),
            peers: Some(self.peers),
            mempool: Some(self.rng.gen_range(0..8000)),
            network_latency_ms: Some(self.rng.gen_range(15.0..90.0)),
            validators: Some(validators),
        }
    }
}
