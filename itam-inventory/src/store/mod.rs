//! Data access traits for the inventory core
//!
//! Every service takes its stores as injected trait objects so tests (and
//! embedders without a database) can substitute the in-memory backend. The
//! asset register is read-only from this crate's point of view: scanning
//! never mutates an asset.

pub mod memory;
pub mod sqlite;

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use itam_common::models::{
    AssetSnapshot, CaptureMetadata, InventoryPlan, MatchStatus, OcrFields, PlanStatus, ScanRecord,
    ScopeType,
};
use itam_common::Result;

use crate::scope::ScopeFilter;

/// 1-based pagination window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub page: u32,
    pub page_size: u32,
}

impl Page {
    pub const DEFAULT_SIZE: u32 = 50;

    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.max(1),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(1, Self::DEFAULT_SIZE)
    }
}

/// Whether an upsert created a new row or overwrote an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertOutcome {
    Created,
    Updated,
}

/// Per-status scan counts for one plan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanTally {
    pub matched: u64,
    pub discrepancy: u64,
    pub unmatched: u64,
}

impl ScanTally {
    /// Raw scanned count across all statuses
    pub fn scanned(&self) -> u64 {
        self.matched + self.discrepancy + self.unmatched
    }
}

/// Insert payload for a new plan; always lands in `draft`
#[derive(Debug, Clone)]
pub struct NewPlanRow {
    pub name: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub scope_type: ScopeType,
    pub scope_ids: BTreeSet<i64>,
    pub created_by: i64,
}

/// Full replacement field set for an editable plan
#[derive(Debug, Clone)]
pub struct PlanUpdate {
    pub name: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub scope_type: ScopeType,
    pub scope_ids: BTreeSet<i64>,
}

/// Listing filter for plans
#[derive(Debug, Clone, Default)]
pub struct PlanFilter {
    pub status: Option<PlanStatus>,
    /// Case-insensitive substring over name and description
    pub search: Option<String>,
}

/// Upsert payload for a scan; the store assigns id and timestamp
#[derive(Debug, Clone)]
pub struct NewScanRecord {
    pub plan_id: i64,
    pub asset_tag: String,
    pub matched_asset_id: Option<i64>,
    pub status: MatchStatus,
    pub discrepancy_note: Option<String>,
    pub ocr: Option<OcrFields>,
    pub capture: CaptureMetadata,
    pub scanned_by: i64,
}

/// Listing filter for scan records
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub status: Option<MatchStatus>,
    /// Case-insensitive substring over the asset tag
    pub search: Option<String>,
}

/// Persistence for inventory plans
#[async_trait]
pub trait PlanStore: Send + Sync {
    async fn insert(&self, plan: NewPlanRow) -> Result<InventoryPlan>;

    async fn find(&self, id: i64) -> Result<Option<InventoryPlan>>;

    /// Newest-first page of plans plus the total filtered count
    async fn list(&self, filter: &PlanFilter, page: Page) -> Result<(Vec<InventoryPlan>, u64)>;

    async fn update_fields(&self, id: i64, update: PlanUpdate) -> Result<InventoryPlan>;

    /// Compare-and-set status transition. Returns the updated plan when the
    /// current status equals `from`; `None` when the plan exists but is in a
    /// different state (the caller turns that into an `InvalidState` error
    /// naming the required state). Two racing transitions cannot both
    /// succeed.
    async fn transition(
        &self,
        id: i64,
        from: PlanStatus,
        to: PlanStatus,
    ) -> Result<Option<InventoryPlan>>;

    async fn delete(&self, id: i64) -> Result<()>;
}

/// Persistence for scan records
#[async_trait]
pub trait ScanStore: Send + Sync {
    /// Atomic insert-or-update keyed on (plan_id, asset_tag). Concurrent
    /// upserts of the same tag are linearized by the unique constraint;
    /// the second writer observes `Updated`.
    async fn upsert(&self, record: NewScanRecord) -> Result<(ScanRecord, UpsertOutcome)>;

    async fn find(&self, record_id: i64) -> Result<Option<ScanRecord>>;

    async fn find_by_tag(&self, plan_id: i64, asset_tag: &str) -> Result<Option<ScanRecord>>;

    /// Most-recently-scanned-first page plus the total filtered count
    async fn list_for_plan(
        &self,
        plan_id: i64,
        filter: &RecordFilter,
        page: Page,
    ) -> Result<(Vec<ScanRecord>, u64)>;

    async fn tally(&self, plan_id: i64) -> Result<ScanTally>;

    /// Every asset tag recorded for the plan, sorted ascending
    async fn scanned_tags(&self, plan_id: i64) -> Result<BTreeSet<String>>;

    /// Discrepancy-review edit of an existing record
    async fn update_review(
        &self,
        record_id: i64,
        status: MatchStatus,
        note: Option<String>,
    ) -> Result<ScanRecord>;
}

/// Read-only contract with the asset register.
///
/// The scrapped-asset exclusion is part of the [`ScopeFilter`] the core
/// passes in; implementations apply the filter as given and never add or
/// remove conditions of their own.
#[async_trait]
pub trait AssetRegistry: Send + Sync {
    async fn find_by_tag(&self, tag: &str) -> Result<Option<AssetSnapshot>>;

    async fn count_matching(&self, scope: &ScopeFilter) -> Result<u64>;

    /// Page of matching assets in ascending tag order
    async fn list_matching(&self, scope: &ScopeFilter, page: Page) -> Result<Vec<AssetSnapshot>>;
}
