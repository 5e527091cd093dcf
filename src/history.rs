//! Bounded metric history
//!
//! The store owns one FIFO window per series channel plus the latest
//! snapshot of every scalar channel. Windows never exceed the configured
//! length: the oldest sample is evicted as soon as a new one overflows it.
//!
//! ## Derived views
//!
//! [`moving_average`], [`summarize`], [`sparkline`] and [`gauge`] are pure
//! functions over copied samples. They exist for rendering only and never
//! touch stored state.
//!
//! ## Persistence
//!
//! The store tracks when it was last written to durable storage. The
//! pipeline asks [`MetricHistory::save_due`] after each update and hands a
//! [`HistoryCache`] to the persister when the save interval has elapsed.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{MetricSnapshot, MetricUpdate};

pub const DEFAULT_WINDOW: usize = 50;

/// FIFO window over the N most recent samples of one channel
#[derive(Debug, Clone, PartialEq)]
pub struct BoundedSeries<T> {
    samples: VecDeque<T>,
    capacity: usize,
}

impl<T> BoundedSeries<T> {
    /// A capacity of zero is bumped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, returning the evicted oldest sample on overflow.
    pub fn push(&mut self, sample: T) -> Option<T> {
        self.samples.push_back(sample);
        if self.samples.len() > self.capacity {
            return self.samples.pop_front();
        }
        None
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<&T> {
        self.samples.back()
    }

    /// Oldest first
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.samples.iter()
    }
}

impl<T: Clone> BoundedSeries<T> {
    /// Build a window from stored samples, keeping only the newest `capacity`.
    pub fn from_samples(capacity: usize, samples: impl IntoIterator<Item = T>) -> Self {
        let mut series = Self::new(capacity);
        for sample in samples {
            series.push(sample);
        }
        series
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.samples.iter().cloned().collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesChannel {
    Throughput,
    Finality,
    NetworkLatency,
}

impl SeriesChannel {
    pub const ALL: [SeriesChannel; 3] = [
        SeriesChannel::Throughput,
        SeriesChannel::Finality,
        SeriesChannel::NetworkLatency,
    ];
}

/// Durable form of the history store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryCache {
    pub snapshot: Option<MetricSnapshot>,
    pub throughput: Vec<f64>,
    pub finality: Vec<f64>,
    pub network_latency: Vec<f64>,
    pub saved_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct MetricHistory {
    throughput: BoundedSeries<f64>,
    finality: BoundedSeries<f64>,
    network_latency: BoundedSeries<f64>,
    snapshot: Option<MetricSnapshot>,
    save_interval: Duration,
    last_saved: DateTime<Utc>,
    updates: u64,
}

impl MetricHistory {
    pub fn new(window: usize, save_interval: Duration, now: DateTime<Utc>) -> Self {
        Self {
            throughput: BoundedSeries::new(window),
            finality: BoundedSeries::new(window),
            network_latency: BoundedSeries::new(window),
            snapshot: None,
            save_interval,
            last_saved: now,
            updates: 0,
        }
    }

    /// Rebuild the store from a cache written by an earlier process.
    ///
    /// Windows longer than the current configuration are trimmed to their
    /// newest samples.
    pub fn restore(
        cache: HistoryCache,
        window: usize,
        save_interval: Duration,
        now: DateTime<Utc>,
    ) -> Self {
        debug!(
            "restoring history from {} ({} throughput samples)",
            cache.saved_at,
            cache.throughput.len()
        );

        Self {
            throughput: BoundedSeries::from_samples(window, cache.throughput),
            finality: BoundedSeries::from_samples(window, cache.finality),
            network_latency: BoundedSeries::from_samples(window, cache.network_latency),
            snapshot: cache.snapshot,
            save_interval,
            last_saved: now,
            updates: 0,
        }
    }

    /// Apply a normalized partial update and return the new snapshot.
    pub fn update(&mut self, update: &MetricUpdate, now: DateTime<Utc>) -> &MetricSnapshot {
        if let Some(tps) = update.throughput {
            self.throughput.push(tps);
        }
        if let Some(finality) = update.finality_ms {
            self.finality.push(finality);
        }
        if let Some(latency) = update.network_latency_ms {
            self.network_latency.push(latency);
        }

        let next = match &self.snapshot {
            Some(previous) => previous.merged(update, now),
            None => MetricSnapshot::empty(now).merged(update, now),
        };

        self.updates += 1;
        trace!(
            "history update #{}: {} throughput / {} finality / {} latency samples",
            self.updates,
            self.throughput.len(),
            self.finality.len(),
            self.network_latency.len()
        );

        self.snapshot.insert(next)
    }

    /// The latest snapshot, if any update has been applied (or restored).
    pub fn current(&self) -> Option<&MetricSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn series(&self, channel: SeriesChannel) -> &BoundedSeries<f64> {
        match channel {
            SeriesChannel::Throughput => &self.throughput,
            SeriesChannel::Finality => &self.finality,
            SeriesChannel::NetworkLatency => &self.network_latency,
        }
    }

    /// Read-only copy of a series window, oldest first.
    pub fn view(&self, channel: SeriesChannel) -> Vec<f64> {
        self.series(channel).to_vec()
    }

    pub fn window(&self) -> usize {
        self.throughput.capacity()
    }

    pub fn updates(&self) -> u64 {
        self.updates
    }

    pub fn save_due(&self, now: DateTime<Utc>) -> bool {
        let elapsed = now.signed_duration_since(self.last_saved);
        elapsed.to_std().is_ok_and(|elapsed| elapsed >= self.save_interval)
    }

    pub fn mark_saved(&mut self, now: DateTime<Utc>) {
        self.last_saved = now;
    }

    pub fn to_cache(&self, now: DateTime<Utc>) -> HistoryCache {
        HistoryCache {
            snapshot: self.snapshot.clone(),
            throughput: self.throughput.to_vec(),
            finality: self.finality.to_vec(),
            network_latency: self.network_latency.to_vec(),
            saved_at: now,
        }
    }
}

/// Min / max / mean / latest of a series
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesSummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub latest: f64,
}

pub fn summarize(samples: &[f64]) -> Option<SeriesSummary> {
    let latest = *samples.last()?;
    let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
    let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean = samples.iter().sum::<f64>() / samples.len() as f64;

    Some(SeriesSummary {
        min,
        max,
        mean,
        latest,
    })
}

/// Mean of the newest `window` samples. A window of zero means all samples.
pub fn moving_average(samples: &[f64], window: usize) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    let window = if window == 0 {
        samples.len()
    } else {
        window.min(samples.len())
    };
    let tail = &samples[samples.len() - window..];
    Some(tail.iter().sum::<f64>() / tail.len() as f64)
}

/// Number of distinct sparkline levels
pub const SPARK_LEVELS: u8 = 8;

const SPARK_BLOCKS: [char; SPARK_LEVELS as usize] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Min/max-normalized bucket levels (0..[`SPARK_LEVELS`]) of the newest
/// `width` samples, left-padded with level 0 to exactly `width` entries.
pub fn sparkline(samples: &[f64], width: usize) -> Vec<u8> {
    let start = samples.len().saturating_sub(width);
    let visible = &samples[start..];

    let mut levels = vec![0; width - visible.len()];
    if visible.is_empty() {
        return levels;
    }

    let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
    let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = if max - min > 0.0 { max - min } else { 1.0 };

    levels.extend(visible.iter().map(|sample| {
        let scaled = ((sample - min) / range * f64::from(SPARK_LEVELS)).round();
        (scaled as u8).min(SPARK_LEVELS - 1)
    }));
    levels
}

pub fn render_sparkline(levels: &[u8]) -> String {
    levels
        .iter()
        .map(|level| SPARK_BLOCKS[usize::from((*level).min(SPARK_LEVELS - 1))])
        .collect()
}

/// Percentage progress of a scalar against a maximum
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Gauge {
    /// Clamped to 0..=100
    pub percent: f64,
    pub filled: usize,
    pub segments: usize,
}

pub fn gauge(value: f64, max: f64, segments: usize) -> Gauge {
    let percent = if max > 0.0 && value.is_finite() {
        (value / max * 100.0).clamp(0.0, 100.0)
    } else {
        0.0
    };
    let filled = ((percent / 100.0) * segments as f64).round() as usize;

    Gauge {
        percent,
        filled: filled.min(segments),
        segments,
    }
}
