//! PersistenceActor - performs durable writes off the pipeline
//!
//! The narrator hands writes over an unbounded channel and never waits for
//! them. A failed history or ledger write is kept as pending and retried
//! before the next write (a newer write to the same target replaces it).
//! Failed report archive writes are only reported.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, error, instrument, trace, warn};

use super::messages::{NarratorEvent, PersistCommand};
use crate::pipeline::{StateTarget, StateWrite};
use crate::storage::{StateBackend, StorageResult};

pub struct PersistenceActor {
    backend: Arc<dyn StateBackend>,

    /// Command receiver
    command_rx: mpsc::UnboundedReceiver<PersistCommand>,

    /// Failure events go out on the narrator's event channel
    events: broadcast::Sender<NarratorEvent>,

    /// Latest failed write per target, waiting for a retry
    pending: HashMap<StateTarget, StateWrite>,

    write_count: u64,
}

impl PersistenceActor {
    pub fn new(
        backend: Arc<dyn StateBackend>,
        command_rx: mpsc::UnboundedReceiver<PersistCommand>,
        events: broadcast::Sender<NarratorEvent>,
    ) -> Self {
        Self {
            backend,
            command_rx,
            events,
            pending: HashMap::new(),
            write_count: 0,
        }
    }

    /// Run the actor's main loop
    #[instrument(skip(self), fields(backend = %self.backend.describe()))]
    pub async fn run(mut self) {
        debug!("starting persistence actor");

        while let Some(cmd) = self.command_rx.recv().await {
            match cmd {
                PersistCommand::Write(write) => {
                    self.pending.remove(&write.target());
                    self.retry_pending().await;
                    self.write(write).await;
                }

                PersistCommand::Flush { respond_to } => {
                    self.retry_pending().await;
                    let _ = respond_to.send(self.pending.is_empty());
                }

                PersistCommand::Shutdown => {
                    debug!("received shutdown command");
                    break;
                }
            }
        }

        if !self.pending.is_empty() {
            warn!(
                "stopping with {} unsaved state writes",
                self.pending.len()
            );
        }
        debug!("persistence actor stopped after {} writes", self.write_count);
    }

    async fn retry_pending(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        trace!("retrying {} pending writes", self.pending.len());

        let pending: Vec<_> = self.pending.drain().map(|(_, write)| write).collect();
        for write in pending {
            self.write(write).await;
        }
    }

    async fn write(&mut self, write: StateWrite) {
        let target = write.target();
        match self.perform(&write).await {
            Ok(()) => {
                self.write_count += 1;
                trace!("{} written", target.as_str());
            }
            Err(e) => {
                error!("failed to write {}: {e}", target.as_str());
                let _ = self.events.send(NarratorEvent::PersistFailed {
                    target,
                    error: e.to_string(),
                });
                if target != StateTarget::Report {
                    self.pending.insert(target, write);
                }
            }
        }
    }

    async fn perform(&self, write: &StateWrite) -> StorageResult<()> {
        match write {
            StateWrite::History(cache) => self.backend.save_history(cache).await,
            StateWrite::Ledger(entries) => self.backend.save_ledger(entries).await,
            StateWrite::Report(report) => self.backend.archive_report(report).await,
        }
    }
}

/// Handle for handing writes to the PersistenceActor
#[derive(Debug, Clone)]
pub struct PersistenceHandle {
    sender: mpsc::UnboundedSender<PersistCommand>,
}

impl PersistenceHandle {
    pub fn spawn(backend: Arc<dyn StateBackend>, events: broadcast::Sender<NarratorEvent>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let actor = PersistenceActor::new(backend, cmd_rx, events);
        tokio::spawn(actor.run());
        Self { sender: cmd_tx }
    }

    /// Queue a write. Never blocks.
    pub fn write(&self, write: StateWrite) {
        let target = write.target();
        if self.sender.send(PersistCommand::Write(write)).is_err() {
            warn!("persistence actor gone, dropping {} write", target.as_str());
        }
    }

    /// Wait until every queued write has been attempted.
    ///
    /// Returns `false` if some writes are still failing.
    pub async fn flush(&self) -> bool {
        let (tx, rx) = oneshot::channel();
        if self
            .sender
            .send(PersistCommand::Flush { respond_to: tx })
            .is_err()
        {
            return false;
        }
        rx.await.unwrap_or(false)
    }

    pub fn shutdown(&self) {
        let _ = self.sender.send(PersistCommand::Shutdown);
    }
}
