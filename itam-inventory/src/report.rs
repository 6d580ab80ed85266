//! Progress and discrepancy reporting
//!
//! Aggregates a plan's scan records against the scoped asset population.
//! Population membership is re-resolved on every call, so an asset created
//! mid-count shows up immediately. Reports are available in any plan state
//! but typically consumed after `completed`.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;

use itam_common::models::{
    AssetSnapshot, InventoryPlan, MatchStatus, PlanStatus, ScanRecord,
};
use itam_common::{Error, Result};

use crate::scope::ScopeFilter;
use crate::store::{
    AssetRegistry, Page, PlanStore, RecordFilter, ScanStore, ScanTally,
};

/// Page size used when walking a full population or record set
const WALK_PAGE_SIZE: u32 = 500;

/// Completion snapshot for one plan
#[derive(Debug, Clone, Serialize)]
pub struct PlanProgress {
    pub plan_id: i64,
    /// Scoped non-scrapped population size
    pub total_assets: u64,
    pub tally: ScanTally,
    /// Raw scanned count across all statuses
    pub scanned: u64,
    /// round(matched / total × 100); 0 when the population is empty
    pub percentage: u32,
}

/// Plan header repeated on reports
#[derive(Debug, Clone, Serialize)]
pub struct PlanSummary {
    pub id: i64,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: PlanStatus,
}

impl From<&InventoryPlan> for PlanSummary {
    fn from(plan: &InventoryPlan) -> Self {
        Self {
            id: plan.id,
            name: plan.name.clone(),
            start_date: plan.start_date,
            end_date: plan.end_date,
            status: plan.status,
        }
    }
}

/// Final reconciliation report: three disjoint sets, each in ascending tag
/// order (ties broken by insertion order)
#[derive(Debug, Clone, Serialize)]
pub struct DiscrepancyReport {
    pub plan: PlanSummary,
    /// Scanned, attribute or scope mismatch
    pub discrepancies: Vec<ScanRecord>,
    /// Scanned, unknown to the register ("over-count")
    pub unmatched: Vec<ScanRecord>,
    /// In scope, never scanned ("under-count")
    pub not_scanned: Vec<AssetSnapshot>,
}

impl DiscrepancyReport {
    pub fn discrepancy_count(&self) -> usize {
        self.discrepancies.len()
    }

    pub fn unmatched_count(&self) -> usize {
        self.unmatched.len()
    }

    pub fn not_scanned_count(&self) -> usize {
        self.not_scanned.len()
    }
}

/// Which rows of the checklist to return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChecklistFilter {
    #[default]
    All,
    Scanned,
    Pending,
}

/// One checklist row: a scoped asset and whether it has been counted
#[derive(Debug, Clone, Serialize)]
pub struct ChecklistEntry {
    pub asset: AssetSnapshot,
    pub is_scanned: bool,
}

/// Scoped asset checklist page with plan-wide summary counts
#[derive(Debug, Clone, Serialize)]
pub struct PlanAssetsPage {
    pub assets: Vec<ChecklistEntry>,
    /// Scoped population size
    pub total: u64,
    /// Distinct tags recorded for the plan
    pub scanned: u64,
    pub pending: u64,
}

/// Progress and discrepancy reporter
pub struct Reporter {
    plans: Arc<dyn PlanStore>,
    scans: Arc<dyn ScanStore>,
    registry: Arc<dyn AssetRegistry>,
}

impl Reporter {
    pub fn new(
        plans: Arc<dyn PlanStore>,
        scans: Arc<dyn ScanStore>,
        registry: Arc<dyn AssetRegistry>,
    ) -> Self {
        Self {
            plans,
            scans,
            registry,
        }
    }

    /// Completion percentage and per-status counts.
    pub async fn progress(&self, plan_id: i64) -> Result<PlanProgress> {
        let plan = self.require(plan_id).await?;
        let scope = ScopeFilter::for_plan(&plan);
        let total_assets = self.registry.count_matching(&scope).await?;
        let tally = self.scans.tally(plan_id).await?;

        let percentage = if total_assets == 0 {
            0
        } else {
            ((tally.matched as f64 / total_assets as f64) * 100.0).round() as u32
        };

        Ok(PlanProgress {
            plan_id,
            total_assets,
            tally,
            scanned: tally.scanned(),
            percentage,
        })
    }

    /// The final reconciliation report.
    pub async fn discrepancy_report(&self, plan_id: i64) -> Result<DiscrepancyReport> {
        let plan = self.require(plan_id).await?;
        let scope = ScopeFilter::for_plan(&plan);

        let mut discrepancies = self
            .collect_records(plan_id, MatchStatus::Discrepancy)
            .await?;
        let mut unmatched = self.collect_records(plan_id, MatchStatus::Unmatched).await?;
        sort_records(&mut discrepancies);
        sort_records(&mut unmatched);

        let scanned_tags = self.scans.scanned_tags(plan_id).await?;
        let mut not_scanned = Vec::new();
        let mut page = Page::new(1, WALK_PAGE_SIZE);
        loop {
            let batch = self.registry.list_matching(&scope, page).await?;
            let fetched = batch.len();
            not_scanned.extend(
                batch
                    .into_iter()
                    .filter(|asset| !scanned_tags.contains(&asset.tag)),
            );
            if fetched < WALK_PAGE_SIZE as usize {
                break;
            }
            page = Page::new(page.page + 1, WALK_PAGE_SIZE);
        }

        Ok(DiscrepancyReport {
            plan: PlanSummary::from(&plan),
            discrepancies,
            unmatched,
            not_scanned,
        })
    }

    /// Checklist of scoped assets annotated with scan state.
    pub async fn plan_assets(
        &self,
        plan_id: i64,
        page: Page,
        filter: ChecklistFilter,
    ) -> Result<PlanAssetsPage> {
        let plan = self.require(plan_id).await?;
        let scope = ScopeFilter::for_plan(&plan);

        let total = self.registry.count_matching(&scope).await?;
        let scanned_tags = self.scans.scanned_tags(plan_id).await?;
        let assets = self.registry.list_matching(&scope, page).await?;

        let entries = assets
            .into_iter()
            .map(|asset| {
                let is_scanned = scanned_tags.contains(&asset.tag);
                ChecklistEntry { asset, is_scanned }
            })
            .filter(|entry| match filter {
                ChecklistFilter::All => true,
                ChecklistFilter::Scanned => entry.is_scanned,
                ChecklistFilter::Pending => !entry.is_scanned,
            })
            .collect();

        let scanned = scanned_tags.len() as u64;
        Ok(PlanAssetsPage {
            assets: entries,
            total,
            scanned,
            pending: total.saturating_sub(scanned),
        })
    }

    async fn collect_records(
        &self,
        plan_id: i64,
        status: MatchStatus,
    ) -> Result<Vec<ScanRecord>> {
        let filter = RecordFilter {
            status: Some(status),
            search: None,
        };
        let mut records = Vec::new();
        let mut page = Page::new(1, WALK_PAGE_SIZE);
        loop {
            let (batch, _) = self.scans.list_for_plan(plan_id, &filter, page).await?;
            let fetched = batch.len();
            records.extend(batch);
            if fetched < WALK_PAGE_SIZE as usize {
                break;
            }
            page = Page::new(page.page + 1, WALK_PAGE_SIZE);
        }
        Ok(records)
    }

    async fn require(&self, plan_id: i64) -> Result<InventoryPlan> {
        self.plans
            .find(plan_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("inventory plan {}", plan_id)))
    }
}

fn sort_records(records: &mut [ScanRecord]) {
    records.sort_by(|a, b| (a.asset_tag.as_str(), a.id).cmp(&(b.asset_tag.as_str(), b.id)));
}
