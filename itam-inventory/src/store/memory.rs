//! In-memory store backend
//!
//! Complete implementation of the store traits over Mutex-guarded maps.
//! Backs the integration tests and embedders that don't want a database.
//! Upsert and status transitions run under a single lock acquisition, so
//! concurrent same-tag scans are linearized last-write-wins and two racing
//! transitions cannot both succeed, the same guarantees the SQLite backend
//! gets from its unique index and compare-and-set UPDATE.

use std::collections::BTreeSet;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use itam_common::models::{
    AssetSnapshot, InventoryPlan, MatchStatus, PlanStatus, ScanRecord,
};
use itam_common::{Error, Result};

use crate::scope::ScopeFilter;
use crate::store::{
    AssetRegistry, NewPlanRow, NewScanRecord, Page, PlanFilter, PlanStore, PlanUpdate,
    RecordFilter, ScanStore, ScanTally, UpsertOutcome,
};

fn paginate<T: Clone>(items: &[T], page: Page) -> Vec<T> {
    items
        .iter()
        .skip(page.offset() as usize)
        .take(page.page_size as usize)
        .cloned()
        .collect()
}

/// Plans held in process memory
#[derive(Debug, Default)]
pub struct MemoryPlanStore {
    inner: Mutex<PlanTable>,
}

#[derive(Debug, Default)]
struct PlanTable {
    next_id: i64,
    rows: Vec<InventoryPlan>,
}

impl MemoryPlanStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PlanStore for MemoryPlanStore {
    async fn insert(&self, plan: NewPlanRow) -> Result<InventoryPlan> {
        let mut table = self.inner.lock().unwrap();
        table.next_id += 1;
        let now = Utc::now();
        let row = InventoryPlan {
            id: table.next_id,
            name: plan.name,
            description: plan.description,
            start_date: plan.start_date,
            end_date: plan.end_date,
            scope_type: plan.scope_type,
            scope_ids: plan.scope_ids,
            status: PlanStatus::Draft,
            created_by: plan.created_by,
            created_at: now,
            updated_at: now,
        };
        table.rows.push(row.clone());
        Ok(row)
    }

    async fn find(&self, id: i64) -> Result<Option<InventoryPlan>> {
        let table = self.inner.lock().unwrap();
        Ok(table.rows.iter().find(|p| p.id == id).cloned())
    }

    async fn list(&self, filter: &PlanFilter, page: Page) -> Result<(Vec<InventoryPlan>, u64)> {
        let table = self.inner.lock().unwrap();
        let needle = filter.search.as_ref().map(|s| s.to_lowercase());
        let mut matching: Vec<InventoryPlan> = table
            .rows
            .iter()
            .filter(|p| filter.status.map_or(true, |s| p.status == s))
            .filter(|p| match &needle {
                Some(needle) => {
                    p.name.to_lowercase().contains(needle)
                        || p.description
                            .as_ref()
                            .map(|d| d.to_lowercase().contains(needle))
                            .unwrap_or(false)
                }
                None => true,
            })
            .cloned()
            .collect();
        // Newest first; id breaks created_at ties deterministically
        matching.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        let total = matching.len() as u64;
        Ok((paginate(&matching, page), total))
    }

    async fn update_fields(&self, id: i64, update: PlanUpdate) -> Result<InventoryPlan> {
        let mut table = self.inner.lock().unwrap();
        let row = table
            .rows
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| Error::NotFound(format!("inventory plan {}", id)))?;
        row.name = update.name;
        row.description = update.description;
        row.start_date = update.start_date;
        row.end_date = update.end_date;
        row.scope_type = update.scope_type;
        row.scope_ids = update.scope_ids;
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn transition(
        &self,
        id: i64,
        from: PlanStatus,
        to: PlanStatus,
    ) -> Result<Option<InventoryPlan>> {
        let mut table = self.inner.lock().unwrap();
        let row = table
            .rows
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| Error::NotFound(format!("inventory plan {}", id)))?;
        if row.status != from {
            return Ok(None);
        }
        row.status = to;
        row.updated_at = Utc::now();
        Ok(Some(row.clone()))
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let mut table = self.inner.lock().unwrap();
        let before = table.rows.len();
        table.rows.retain(|p| p.id != id);
        if table.rows.len() == before {
            return Err(Error::NotFound(format!("inventory plan {}", id)));
        }
        Ok(())
    }
}

/// Scan records held in process memory
#[derive(Debug, Default)]
pub struct MemoryScanStore {
    inner: Mutex<RecordTable>,
}

#[derive(Debug, Default)]
struct RecordTable {
    next_id: i64,
    rows: Vec<ScanRecord>,
}

impl MemoryScanStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScanStore for MemoryScanStore {
    async fn upsert(&self, record: NewScanRecord) -> Result<(ScanRecord, UpsertOutcome)> {
        let mut table = self.inner.lock().unwrap();
        let now = Utc::now();

        if let Some(row) = table
            .rows
            .iter_mut()
            .find(|r| r.plan_id == record.plan_id && r.asset_tag == record.asset_tag)
        {
            row.matched_asset_id = record.matched_asset_id;
            row.status = record.status;
            row.discrepancy_note = record.discrepancy_note;
            row.ocr = record.ocr;
            row.capture = record.capture;
            row.scanned_by = record.scanned_by;
            row.scanned_at = now;
            return Ok((row.clone(), UpsertOutcome::Updated));
        }

        table.next_id += 1;
        let row = ScanRecord {
            id: table.next_id,
            plan_id: record.plan_id,
            asset_tag: record.asset_tag,
            matched_asset_id: record.matched_asset_id,
            status: record.status,
            discrepancy_note: record.discrepancy_note,
            ocr: record.ocr,
            capture: record.capture,
            scanned_by: record.scanned_by,
            scanned_at: now,
        };
        table.rows.push(row.clone());
        Ok((row, UpsertOutcome::Created))
    }

    async fn find(&self, record_id: i64) -> Result<Option<ScanRecord>> {
        let table = self.inner.lock().unwrap();
        Ok(table.rows.iter().find(|r| r.id == record_id).cloned())
    }

    async fn find_by_tag(&self, plan_id: i64, asset_tag: &str) -> Result<Option<ScanRecord>> {
        let table = self.inner.lock().unwrap();
        Ok(table
            .rows
            .iter()
            .find(|r| r.plan_id == plan_id && r.asset_tag == asset_tag)
            .cloned())
    }

    async fn list_for_plan(
        &self,
        plan_id: i64,
        filter: &RecordFilter,
        page: Page,
    ) -> Result<(Vec<ScanRecord>, u64)> {
        let table = self.inner.lock().unwrap();
        let needle = filter.search.as_ref().map(|s| s.to_lowercase());
        let mut matching: Vec<ScanRecord> = table
            .rows
            .iter()
            .filter(|r| r.plan_id == plan_id)
            .filter(|r| filter.status.map_or(true, |s| r.status == s))
            .filter(|r| match &needle {
                Some(needle) => r.asset_tag.to_lowercase().contains(needle),
                None => true,
            })
            .cloned()
            .collect();
        // Most recent scan first
        matching.sort_by(|a, b| (b.scanned_at, b.id).cmp(&(a.scanned_at, a.id)));
        let total = matching.len() as u64;
        Ok((paginate(&matching, page), total))
    }

    async fn tally(&self, plan_id: i64) -> Result<ScanTally> {
        let table = self.inner.lock().unwrap();
        let mut tally = ScanTally::default();
        for row in table.rows.iter().filter(|r| r.plan_id == plan_id) {
            match row.status {
                MatchStatus::Matched => tally.matched += 1,
                MatchStatus::Discrepancy => tally.discrepancy += 1,
                MatchStatus::Unmatched => tally.unmatched += 1,
            }
        }
        Ok(tally)
    }

    async fn scanned_tags(&self, plan_id: i64) -> Result<BTreeSet<String>> {
        let table = self.inner.lock().unwrap();
        Ok(table
            .rows
            .iter()
            .filter(|r| r.plan_id == plan_id)
            .map(|r| r.asset_tag.clone())
            .collect())
    }

    async fn update_review(
        &self,
        record_id: i64,
        status: MatchStatus,
        note: Option<String>,
    ) -> Result<ScanRecord> {
        let mut table = self.inner.lock().unwrap();
        let row = table
            .rows
            .iter_mut()
            .find(|r| r.id == record_id)
            .ok_or_else(|| Error::NotFound(format!("scan record {}", record_id)))?;
        row.status = status;
        row.discrepancy_note = note;
        Ok(row.clone())
    }
}

/// In-process asset register for tests and embedders
#[derive(Debug, Default)]
pub struct MemoryAssetRegistry {
    assets: Mutex<Vec<AssetSnapshot>>,
}

impl MemoryAssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an asset by tag
    pub fn put(&self, asset: AssetSnapshot) {
        let mut assets = self.assets.lock().unwrap();
        assets.retain(|a| a.tag != asset.tag);
        assets.push(asset);
    }
}

#[async_trait]
impl AssetRegistry for MemoryAssetRegistry {
    async fn find_by_tag(&self, tag: &str) -> Result<Option<AssetSnapshot>> {
        let assets = self.assets.lock().unwrap();
        Ok(assets.iter().find(|a| a.tag == tag).cloned())
    }

    async fn count_matching(&self, scope: &ScopeFilter) -> Result<u64> {
        let assets = self.assets.lock().unwrap();
        Ok(assets.iter().filter(|a| scope.matches(a)).count() as u64)
    }

    async fn list_matching(&self, scope: &ScopeFilter, page: Page) -> Result<Vec<AssetSnapshot>> {
        let assets = self.assets.lock().unwrap();
        let mut matching: Vec<AssetSnapshot> =
            assets.iter().filter(|a| scope.matches(a)).cloned().collect();
        matching.sort_by(|a, b| a.tag.cmp(&b.tag));
        Ok(paginate(&matching, page))
    }
}
