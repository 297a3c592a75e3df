//! `CardService` – the process-wide entry point. Built once at startup and
//! shared by request handlers.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::assets::LogoCache;
use crate::config::ServiceConfig;
use crate::delivery::{
    spawn_worker, DeliveryJob, DeliveryQueue, DeliveryState, DeliveryWorker, Orchestrator,
};
use crate::documents::{download_name, DocumentDir};
use crate::error::{NotificationError, RenderError, ServiceError};
use crate::notify::{DisabledNotifier, HttpMailer, Notifier};
use crate::pipeline::{CardRenderer, PdfCardRenderer};
use crate::record::{AthleteRecord, DisplayId, NewAthlete};
use crate::retention::RetentionSweeper;
use crate::store::RecordStore;

/// A stored card ready to be downloaded or viewed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardDocument {
    pub location: String,
    /// Suggested download name, `Para_Sports_ID_Card_<displayId>.pdf`.
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Mail relay from config, or the disabled notifier when none is set.
pub fn notifier_from_config(config: &ServiceConfig) -> Result<Arc<dyn Notifier>, NotificationError> {
    match &config.mail_api_url {
        Some(url) => {
            log::info!("Email delivery via {url}");
            Ok(Arc::new(HttpMailer::new(
                url.clone(),
                config.mail_api_key.clone(),
                config.sender_email.clone(),
                config.mail_timeout,
            )?))
        }
        None => {
            log::warn!("MAIL_API_URL not set; ID cards will not be emailed");
            Ok(Arc::new(DisabledNotifier))
        }
    }
}

pub struct CardService {
    config: ServiceConfig,
    store: Arc<dyn RecordStore>,
    renderer: Arc<dyn CardRenderer>,
    orchestrator: Arc<Orchestrator>,
    queue: Arc<dyn DeliveryQueue>,
    docs: DocumentDir,
}

impl CardService {
    /// Wire the service from its collaborators and start the delivery
    /// worker. Must be called inside a tokio runtime.
    pub fn new(
        config: ServiceConfig,
        store: Arc<dyn RecordStore>,
        renderer: Arc<dyn CardRenderer>,
        notifier: Arc<dyn Notifier>,
    ) -> (Self, DeliveryWorker) {
        let docs = DocumentDir::new(&config.output_dir);
        let orchestrator = Arc::new(Orchestrator::new(
            store.clone(),
            renderer.clone(),
            notifier,
            docs.clone(),
        ));
        let (queue, worker) = spawn_worker(orchestrator.clone());
        let service = Self {
            config,
            store,
            renderer,
            orchestrator,
            queue,
            docs,
        };
        (service, worker)
    }

    /// Production wiring: PDF renderer, logo cache and notifier from `config`.
    pub fn from_config(
        config: ServiceConfig,
        store: Arc<dyn RecordStore>,
    ) -> Result<(Self, DeliveryWorker), ServiceError> {
        let notifier = notifier_from_config(&config)?;
        let renderer = Arc::new(PdfCardRenderer::new(
            DocumentDir::new(&config.output_dir),
            &config.uploads_dir,
            LogoCache::new(&config.logo_path, config.logo_url.clone())?,
        ));
        Ok(Self::new(config, store, renderer, notifier))
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Create the record and start delivery in the background. Succeeds as
    /// soon as the record is stored.
    pub async fn register(&self, new: NewAthlete) -> Result<AthleteRecord, ServiceError> {
        let record = self.store.create(new).await?;
        self.trigger_delivery(record.clone()).await;
        Ok(record)
    }

    /// Render `record`'s card and return its location. Does not touch the
    /// stored record.
    pub async fn render(&self, record: &AthleteRecord) -> Result<String, RenderError> {
        self.renderer.render(record).await
    }

    /// Fire-and-forget delivery. A closed queue is logged, never returned.
    pub async fn trigger_delivery(&self, record: AthleteRecord) {
        let id = record.display_id.clone();
        if let Err(e) = self.queue.enqueue(DeliveryJob { record }).await {
            log::error!("Could not queue ID card delivery for {id}: {e}");
        }
    }

    /// Render a fresh card for an existing record and point the record at
    /// it. The previous file is left for the retention sweeper.
    pub async fn regenerate(&self, display_id: &DisplayId) -> Result<String, ServiceError> {
        let record = self
            .store
            .find_by_display_id(display_id)
            .await?
            .ok_or(ServiceError::RecordNotFound)?;
        log::info!("Regenerating ID card for {display_id}");
        let updated = self.orchestrator.render_and_record(&record).await??;
        updated
            .card
            .location
            .ok_or(ServiceError::CardNotGenerated)
    }

    /// Email the current card for `display_id` and return the resulting state.
    pub async fn send(&self, display_id: &DisplayId) -> Result<DeliveryState, ServiceError> {
        let record = self
            .store
            .find_by_display_id(display_id)
            .await?
            .ok_or(ServiceError::RecordNotFound)?;
        if !record.card.generated {
            return Err(ServiceError::CardNotGenerated);
        }
        Ok(self.orchestrator.notify(&record).await)
    }

    /// Bytes of the card currently referenced by the record.
    pub async fn document(&self, display_id: &DisplayId) -> Result<CardDocument, ServiceError> {
        let record = self
            .store
            .find_by_display_id(display_id)
            .await?
            .ok_or(ServiceError::RecordNotFound)?;
        let location = match (record.card.generated, record.card.location) {
            (true, Some(location)) => location,
            _ => return Err(ServiceError::CardNotGenerated),
        };
        let path = self
            .docs
            .resolve(&location)
            .ok_or_else(|| ServiceError::DocumentMissing(PathBuf::from(&location)))?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ServiceError::DocumentMissing(path))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(CardDocument {
            location,
            filename: download_name(display_id),
            bytes,
        })
    }

    pub fn sweeper(&self) -> RetentionSweeper {
        RetentionSweeper::new(
            self.docs.clone(),
            self.config.retention,
            self.config.sweep_interval,
        )
    }

    /// Start the periodic retention sweep.
    pub fn spawn_sweeper(&self) -> JoinHandle<()> {
        self.sweeper().spawn()
    }

    /// Stop accepting deliveries. Await the [`DeliveryWorker`] afterwards to
    /// let queued jobs finish.
    pub fn shutdown(&self) {
        self.queue.close();
    }
}
