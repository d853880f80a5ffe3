//! Backend-agnostic persistence trait for onboarding records.
//!
//! The engine speaks only to this trait. The contract carries the two
//! concurrency guarantees the lifecycle engine relies on:
//!
//! - `insert` is conditional on employee uniqueness and surfaces
//!   [`StoreError::DuplicateEmployee`] without creating a partial record;
//! - `update` is a compare-and-swap on the record's `version` column and
//!   surfaces [`StoreError::VersionConflict`] without writing anything.

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::error::StoreError;
use crate::onboarding::model::{OnboardingRecord, RecordStatus};

/// Filter for listing records.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub status: Option<RecordStatus>,
    pub assigned_hr: Option<String>,
    pub assigned_buddy: Option<String>,
}

/// A page of listed records plus the total match count.
#[derive(Debug, Clone)]
pub struct RecordPage {
    pub records: Vec<OnboardingRecord>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

/// Aggregate statistics over all records.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatsOverview {
    pub total: u64,
    pub not_started: u64,
    pub in_progress: u64,
    pub completed: u64,
    pub on_hold: u64,
    pub overdue: u64,
    pub average_progress: f64,
}

/// Persistence backend for onboarding records.
#[async_trait]
pub trait OnboardingStore: Send + Sync {
    /// Run all pending schema migrations.
    async fn run_migrations(&self) -> Result<(), StoreError>;

    /// Insert a new record. Fails with `DuplicateEmployee` if a record for
    /// the same employee already exists; the uniqueness check and the
    /// insert are one atomic operation.
    async fn insert(&self, record: &OnboardingRecord) -> Result<(), StoreError>;

    /// Fetch a record by id.
    async fn get(&self, id: Uuid) -> Result<Option<OnboardingRecord>, StoreError>;

    /// Fetch the record for an employee.
    async fn get_by_employee(
        &self,
        employee: &str,
    ) -> Result<Option<OnboardingRecord>, StoreError>;

    /// Compare-and-swap write. Persists `record` only if the stored version
    /// still equals `record.version`; on success returns the new version.
    async fn update(&self, record: &OnboardingRecord) -> Result<u64, StoreError>;

    /// List records matching `filter`, newest first. `page` is 1-based.
    async fn list(
        &self,
        filter: &ListFilter,
        page: u32,
        limit: u32,
    ) -> Result<RecordPage, StoreError>;

    /// Aggregate statistics across all records.
    async fn stats(&self) -> Result<StatsOverview, StoreError>;
}
