//! NarratorActor - runs the pipeline on its own task
//!
//! Updates are processed strictly in the order they arrive on the command
//! channel. After each tick the actor publishes events and forwards any
//! requested durable writes to the persister without waiting for them.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, instrument, trace, warn};

use super::messages::{NarratorCommand, NarratorEvent};
use super::persistence::PersistenceHandle;
use crate::MetricUpdate;
use crate::achievements::Achievement;
use crate::config::Config;
use crate::history::SeriesChannel;
use crate::narrative::NarrativeReport;
use crate::pipeline::{Narrator, Tick};
use crate::problems::Problem;
use crate::storage::StateBackend;
use crate::templates::TemplateTable;

/// Capacity of the command channel
const COMMAND_BUFFER: usize = 32;

/// Capacity of the event channel before slow subscribers start lagging
const EVENT_BUFFER: usize = 64;

pub struct NarratorActor {
    narrator: Narrator,

    /// Command receiver
    command_rx: mpsc::Receiver<NarratorCommand>,

    /// Event publisher
    events: broadcast::Sender<NarratorEvent>,

    persistence: PersistenceHandle,
}

impl NarratorActor {
    pub fn new(
        narrator: Narrator,
        command_rx: mpsc::Receiver<NarratorCommand>,
        events: broadcast::Sender<NarratorEvent>,
        persistence: PersistenceHandle,
    ) -> Self {
        Self {
            narrator,
            command_rx,
            events,
            persistence,
        }
    }

    /// Run the actor's main loop
    #[instrument(skip(self))]
    pub async fn run(mut self) {
        debug!("starting narrator actor");

        while let Some(cmd) = self.command_rx.recv().await {
            match cmd {
                NarratorCommand::Ingest { update } => {
                    self.tick(update);
                }

                NarratorCommand::IngestJson { value } => {
                    let tick = self.narrator.process_json(&value, Utc::now());
                    self.publish(&tick);
                }

                NarratorCommand::Process { update, respond_to } => {
                    let tick = self.tick(update);
                    let _ = respond_to.send(tick);
                }

                NarratorCommand::LastReport { respond_to } => {
                    let _ = respond_to.send(self.narrator.last_report().cloned());
                }

                NarratorCommand::Achievements { respond_to } => {
                    let _ = respond_to.send(self.narrator.ledger().entries().to_vec());
                }

                NarratorCommand::Problems { respond_to } => {
                    let _ = respond_to.send(self.narrator.problems().to_vec());
                }

                NarratorCommand::Series {
                    channel,
                    respond_to,
                } => {
                    let _ = respond_to.send(self.narrator.history().view(channel));
                }

                NarratorCommand::Shutdown { respond_to } => {
                    debug!("received shutdown command");
                    self.flush_and_stop().await;
                    let _ = respond_to.send(());
                    return;
                }
            }
        }

        warn!("command channel closed, shutting down");
        self.flush_and_stop().await;
    }

    fn tick(&mut self, update: MetricUpdate) -> Tick {
        let tick = self.narrator.process(update, Utc::now());
        self.publish(&tick);
        tick
    }

    fn publish(&self, tick: &Tick) {
        trace!(
            "tick done: {} ({} unlocked, {} problems, {} writes)",
            tick.health.label.as_str(),
            tick.unlocked.len(),
            tick.problems.len(),
            tick.writes.len()
        );

        for write in &tick.writes {
            self.persistence.write(write.clone());
        }

        // send only fails without subscribers
        for achievement in &tick.unlocked {
            let _ = self
                .events
                .send(NarratorEvent::AchievementUnlocked(achievement.clone()));
        }
        if !tick.problems.is_empty() {
            let _ = self
                .events
                .send(NarratorEvent::ProblemsDetected(tick.problems.clone()));
        }
        let _ = self
            .events
            .send(NarratorEvent::ReportGenerated(Arc::new(tick.report.clone())));
    }

    async fn flush_and_stop(&mut self) {
        for write in self.narrator.final_writes(Utc::now()) {
            self.persistence.write(write);
        }
        if !self.persistence.flush().await {
            warn!("some state could not be saved before shutdown");
        }
        self.persistence.shutdown();
        info!("narrator stopped");
    }
}

/// Handle for controlling the NarratorActor
#[derive(Debug, Clone)]
pub struct NarratorHandle {
    sender: mpsc::Sender<NarratorCommand>,
    events: broadcast::Sender<NarratorEvent>,
}

impl NarratorHandle {
    /// Open the pipeline against `backend` and spawn the actor pair.
    ///
    /// Stored state is loaded before this returns.
    pub fn spawn(
        config: &Config,
        templates: Arc<TemplateTable>,
        backend: Arc<dyn StateBackend>,
    ) -> Self {
        let narrator = Narrator::open(config, templates, backend.as_ref(), Utc::now());

        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);
        let (event_tx, _) = broadcast::channel(EVENT_BUFFER);

        let persistence = PersistenceHandle::spawn(backend, event_tx.clone());
        let actor = NarratorActor::new(narrator, cmd_rx, event_tx.clone(), persistence);
        tokio::spawn(actor.run());

        Self {
            sender: cmd_tx,
            events: event_tx,
        }
    }

    /// Subscribe to narrator events
    pub fn subscribe(&self) -> broadcast::Receiver<NarratorEvent> {
        self.events.subscribe()
    }

    /// Queue an update
    pub async fn ingest(&self, update: MetricUpdate) {
        let _ = self.sender.send(NarratorCommand::Ingest { update }).await;
    }

    /// Queue a loosely typed JSON update
    pub async fn ingest_json(&self, value: Value) {
        let _ = self.sender.send(NarratorCommand::IngestJson { value }).await;
    }

    /// Process an update and wait for the result
    pub async fn process(&self, update: MetricUpdate) -> Option<Tick> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(NarratorCommand::Process {
                update,
                respond_to: tx,
            })
            .await
            .ok()?;

        rx.await.ok()
    }

    pub async fn last_report(&self) -> Option<NarrativeReport> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(NarratorCommand::LastReport { respond_to: tx })
            .await
            .ok()?;

        rx.await.ok()?
    }

    pub async fn achievements(&self) -> Vec<Achievement> {
        let (tx, rx) = oneshot::channel();
        if self
            .sender
            .send(NarratorCommand::Achievements { respond_to: tx })
            .await
            .is_err()
        {
            return vec![];
        }
        rx.await.unwrap_or_default()
    }

    pub async fn problems(&self) -> Vec<Problem> {
        let (tx, rx) = oneshot::channel();
        if self
            .sender
            .send(NarratorCommand::Problems { respond_to: tx })
            .await
            .is_err()
        {
            return vec![];
        }
        rx.await.unwrap_or_default()
    }

    pub async fn series(&self, channel: SeriesChannel) -> Vec<f64> {
        let (tx, rx) = oneshot::channel();
        if self
            .sender
            .send(NarratorCommand::Series {
                channel,
                respond_to: tx,
            })
            .await
            .is_err()
        {
            return vec![];
        }
        rx.await.unwrap_or_default()
    }

    /// Flush state and stop the actor, waiting until the final writes ran
    pub async fn shutdown(&self) {
        let (tx, rx) = oneshot::channel();
        if self
            .sender
            .send(NarratorCommand::Shutdown { respond_to: tx })
            .await
            .is_ok()
        {
            let _ = rx.await;
        }
    }
}
