//! Delivery orchestrator – render → persist → notify, per athlete.
//!
//! ```text
//! Pending → Rendering → Rendered → Notifying → Delivered
//!               │                      │
//!               └→ RenderFailed        └→ NotifyFailed
//! ```
//!
//! Nothing here returns an error to the code that triggered the delivery.
//! Failures are written to the record (`lastCardError`) or logged, and the
//! final state is returned for observability.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};

use crate::documents::DocumentDir;
use crate::error::{RenderError, ServiceError};
use crate::notify::{Notifier, NotifyOutcome};
use crate::pipeline::CardRenderer;
use crate::record::{AthleteRecord, DisplayId};
use crate::store::{CardChange, RecordStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum DeliveryState {
    Pending,
    Rendering,
    Rendered,
    Notifying,
    Delivered,
    RenderFailed,
    NotifyFailed,
}

impl DeliveryState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            DeliveryState::Delivered | DeliveryState::RenderFailed | DeliveryState::NotifyFailed
        )
    }
}

/// Drives one record through the delivery state machine.
pub struct Orchestrator {
    store: Arc<dyn RecordStore>,
    renderer: Arc<dyn CardRenderer>,
    notifier: Arc<dyn Notifier>,
    docs: DocumentDir,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn RecordStore>,
        renderer: Arc<dyn CardRenderer>,
        notifier: Arc<dyn Notifier>,
        docs: DocumentDir,
    ) -> Self {
        Self {
            store,
            renderer,
            notifier,
            docs,
        }
    }

    fn enter(&self, id: &DisplayId, state: DeliveryState) {
        log::debug!("Delivery {id}: {state:?}");
    }

    /// Render the card and record the outcome on the athlete record.
    ///
    /// On success the record is returned pointing at the new document. The
    /// render error is returned as well as persisted so `regenerate` can
    /// report it.
    pub async fn render_and_record(
        &self,
        record: &AthleteRecord,
    ) -> Result<Result<AthleteRecord, RenderError>, crate::error::StoreError> {
        let id = &record.display_id;
        self.enter(id, DeliveryState::Rendering);
        match self.renderer.render(record).await {
            Ok(location) => {
                let updated = self
                    .store
                    .apply_card_change(id, CardChange::Rendered { location })
                    .await?;
                log::info!("ID card generated for {id}");
                self.enter(id, DeliveryState::Rendered);
                Ok(Ok(updated))
            }
            Err(e) => {
                log::warn!("ID card generation failed for {id}: {e}");
                self.store
                    .apply_card_change(
                        id,
                        CardChange::RenderFailed {
                            error: e.to_string(),
                        },
                    )
                    .await?;
                self.enter(id, DeliveryState::RenderFailed);
                Ok(Err(e))
            }
        }
    }

    /// Email the rendered card. `record` must carry a card location.
    pub async fn notify(&self, record: &AthleteRecord) -> DeliveryState {
        let id = &record.display_id;
        self.enter(id, DeliveryState::Notifying);

        let Some(path) = record
            .card
            .location
            .as_deref()
            .and_then(|loc| self.docs.resolve(loc))
        else {
            log::warn!("No usable card location for {id}; not emailing");
            return DeliveryState::NotifyFailed;
        };

        match self.notifier.send_card(record, &path).await {
            Ok(NotifyOutcome::Sent { message_id }) => {
                if let Err(e) = self.store.apply_card_change(id, CardChange::Sent).await {
                    log::error!("Card for {id} was emailed ({message_id}) but not recorded: {e}");
                    return DeliveryState::Notifying;
                }
                log::info!("ID card for {id} delivered ({message_id})");
                DeliveryState::Delivered
            }
            Ok(NotifyOutcome::NotConfigured) => {
                log::info!("ID card for {id} not emailed: email service not configured");
                DeliveryState::NotifyFailed
            }
            Err(e) => {
                log::warn!("Failed to email ID card for {id}: {e}");
                DeliveryState::NotifyFailed
            }
        }
    }

    /// Run the full chain for `record` and return the state it ended in.
    pub async fn deliver(&self, record: &AthleteRecord) -> DeliveryState {
        let id = &record.display_id;
        self.enter(id, DeliveryState::Pending);
        match self.render_and_record(record).await {
            Ok(Ok(updated)) => self.notify(&updated).await,
            Ok(Err(_)) => DeliveryState::RenderFailed,
            Err(e) => {
                log::error!("Could not record card status for {id}: {e}");
                DeliveryState::Rendering
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Fire-and-forget queue
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct DeliveryJob {
    pub record: AthleteRecord,
}

/// Hands delivery jobs to a background worker without waiting for them.
#[async_trait]
pub trait DeliveryQueue: Send + Sync {
    async fn enqueue(&self, job: DeliveryJob) -> Result<(), ServiceError>;

    /// Stop accepting jobs. Jobs already queued still run.
    fn close(&self);
}

/// Final state counts reported by a worker when it drains.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeliverySummary {
    pub delivered: usize,
    pub render_failed: usize,
    pub notify_failed: usize,
    /// Jobs that stopped early because a status change could not be stored,
    /// or whose task panicked.
    pub incomplete: usize,
}

impl DeliverySummary {
    fn record(&mut self, state: DeliveryState) {
        match state {
            DeliveryState::Delivered => self.delivered += 1,
            DeliveryState::RenderFailed => self.render_failed += 1,
            DeliveryState::NotifyFailed => self.notify_failed += 1,
            _ => self.incomplete += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.delivered + self.render_failed + self.notify_failed + self.incomplete
    }
}

/// In-process queue backed by an unbounded tokio channel.
pub struct ChannelQueue {
    tx: Mutex<Option<mpsc::UnboundedSender<DeliveryJob>>>,
}

#[async_trait]
impl DeliveryQueue for ChannelQueue {
    async fn enqueue(&self, job: DeliveryJob) -> Result<(), ServiceError> {
        let tx = match self.tx.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        let tx = tx.ok_or(ServiceError::QueueClosed)?;
        log::debug!("Queued delivery for {}", job.record.display_id);
        tx.send(job).map_err(|_| ServiceError::QueueClosed)
    }

    fn close(&self) {
        match self.tx.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
    }
}

/// Handle to the worker spawned by [`spawn_worker`].
pub struct DeliveryWorker {
    handle: JoinHandle<DeliverySummary>,
}

impl DeliveryWorker {
    /// Wait for every queued and running job to finish. Call after closing
    /// the queue, otherwise this waits forever.
    pub async fn join(self) -> DeliverySummary {
        match self.handle.await {
            Ok(summary) => summary,
            Err(e) => {
                log::error!("Delivery worker aborted: {e}");
                DeliverySummary::default()
            }
        }
    }
}

/// Start a worker that runs each queued job as its own task. Jobs for
/// different athletes run concurrently and may finish in any order.
pub fn spawn_worker(orchestrator: Arc<Orchestrator>) -> (Arc<ChannelQueue>, DeliveryWorker) {
    let (tx, mut rx) = mpsc::unbounded_channel::<DeliveryJob>();
    let queue = Arc::new(ChannelQueue {
        tx: Mutex::new(Some(tx)),
    });

    let handle = tokio::spawn(async move {
        log::info!("Delivery worker started");
        let mut tasks: JoinSet<DeliveryState> = JoinSet::new();
        let mut summary = DeliverySummary::default();

        loop {
            tokio::select! {
                job = rx.recv() => match job {
                    Some(job) => {
                        let orch = Arc::clone(&orchestrator);
                        tasks.spawn(async move { orch.deliver(&job.record).await });
                    }
                    None => break,
                },
                Some(done) = tasks.join_next(), if !tasks.is_empty() => {
                    finish(&mut summary, done);
                }
            }
        }

        while let Some(done) = tasks.join_next().await {
            finish(&mut summary, done);
        }
        log::info!("Delivery worker drained: {summary:?}");
        summary
    });

    (queue, DeliveryWorker { handle })
}

fn finish(summary: &mut DeliverySummary, done: Result<DeliveryState, tokio::task::JoinError>) {
    match done {
        Ok(state) => summary.record(state),
        Err(e) => {
            log::error!("Delivery task failed: {e}");
            summary.incomplete += 1;
        }
    }
}
