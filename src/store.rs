//! Record store interface and the in-memory implementation used by the CLI
//! and tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::StoreError;
use crate::record::{AthleteRecord, DisplayId, NewAthlete};

/// Attempts at drawing an unused display id before giving up.
const DISPLAY_ID_ATTEMPTS: usize = 20;

/// Partial card-status update applied by the delivery pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardChange {
    /// A document was written; point the record at it and clear any error.
    Rendered { location: String },
    /// Rendering failed; keep the message for operators.
    RenderFailed { error: String },
    /// The card was emailed to the athlete.
    Sent,
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Validate and persist a registration, assigning `id` and `displayId`.
    async fn create(&self, new: NewAthlete) -> Result<AthleteRecord, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<AthleteRecord>, StoreError>;

    async fn find_by_display_id(
        &self,
        display_id: &DisplayId,
    ) -> Result<Option<AthleteRecord>, StoreError>;

    /// Replace the profile of `record`. Rejected with
    /// [`StoreError::VersionConflict`] if the stored copy moved on since
    /// `record` was read.
    async fn update(&self, record: AthleteRecord) -> Result<AthleteRecord, StoreError>;

    /// Apply a card-status change without touching the profile.
    async fn apply_card_change(
        &self,
        display_id: &DisplayId,
        change: CardChange,
    ) -> Result<AthleteRecord, StoreError>;

    /// All records, newest registration first.
    async fn list(&self) -> Result<Vec<AthleteRecord>, StoreError>;
}

fn touch(record: &mut AthleteRecord, now: DateTime<Utc>) {
    record.updated_at = now.max(record.registered_at);
    record.version += 1;
}

fn apply(record: &mut AthleteRecord, change: CardChange) -> Result<(), StoreError> {
    match change {
        CardChange::Rendered { location } => {
            record.card.generated = true;
            record.card.location = Some(location);
            record.card.last_error = None;
        }
        CardChange::RenderFailed { error } => {
            record.card.generated = false;
            record.card.sent = false;
            record.card.last_error = Some(error);
        }
        CardChange::Sent => {
            if !record.card.generated {
                return Err(StoreError::InvalidTransition);
            }
            record.card.sent = true;
        }
    }
    Ok(())
}

/// Records keyed by display id behind a tokio `RwLock`.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: RwLock<BTreeMap<DisplayId, AthleteRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn create(&self, new: NewAthlete) -> Result<AthleteRecord, StoreError> {
        let now = Utc::now();
        let profile = new.normalized();
        profile.validate_on(now.date_naive())?;

        let mut records = self.records.write().await;
        if records.values().any(|r| r.profile.email == profile.email) {
            return Err(StoreError::DuplicateEmail);
        }
        let display_id = (0..DISPLAY_ID_ATTEMPTS)
            .map(|_| DisplayId::generate(now.year()))
            .find(|id| !records.contains_key(id))
            .ok_or(StoreError::DuplicateDisplayId)?;

        let record = AthleteRecord::new(profile, display_id.clone(), now);
        records.insert(display_id, record.clone());
        log::info!(
            "Registered {} as {}",
            record.full_name(),
            record.display_id
        );
        Ok(record)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<AthleteRecord>, StoreError> {
        let records = self.records.read().await;
        Ok(records.values().find(|r| r.id == id).cloned())
    }

    async fn find_by_display_id(
        &self,
        display_id: &DisplayId,
    ) -> Result<Option<AthleteRecord>, StoreError> {
        Ok(self.records.read().await.get(display_id).cloned())
    }

    async fn update(&self, record: AthleteRecord) -> Result<AthleteRecord, StoreError> {
        let now = Utc::now();
        let profile = record.profile.normalized();
        profile.validate_on(now.date_naive())?;

        let mut records = self.records.write().await;
        let email_taken = records
            .values()
            .any(|r| r.display_id != record.display_id && r.profile.email == profile.email);
        let stored = records
            .get_mut(&record.display_id)
            .ok_or(StoreError::NotFound)?;
        if stored.version != record.version {
            return Err(StoreError::VersionConflict {
                expected: record.version,
                found: stored.version,
            });
        }
        if email_taken {
            return Err(StoreError::DuplicateEmail);
        }

        // Identity, timestamps and card status are not caller-editable.
        stored.profile = profile;
        touch(stored, now);
        Ok(stored.clone())
    }

    async fn apply_card_change(
        &self,
        display_id: &DisplayId,
        change: CardChange,
    ) -> Result<AthleteRecord, StoreError> {
        let mut records = self.records.write().await;
        let stored = records.get_mut(display_id).ok_or(StoreError::NotFound)?;
        apply(stored, change)?;
        touch(stored, Utc::now());
        Ok(stored.clone())
    }

    async fn list(&self) -> Result<Vec<AthleteRecord>, StoreError> {
        let mut all: Vec<AthleteRecord> = self.records.read().await.values().cloned().collect();
        all.sort_by(|a, b| b.registered_at.cmp(&a.registered_at));
        Ok(all)
    }
}
