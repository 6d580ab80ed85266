//! Plan lifecycle
//!
//! Owns creation, field edits, and the one-way status ladder
//! draft → in_progress → completed → closed. Transitions go through the
//! store's compare-and-set so a double "start" cannot both succeed.
//! Completing with unscanned assets is allowed by policy; they surface as
//! "not scanned" in the discrepancy report. Deleting is legal only from
//! draft; a plan that was ever started carries scan history.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use itam_common::models::{InventoryPlan, PlanStatus, ScopeType};
use itam_common::{Error, FieldError, Result};

use crate::scope::ScopeFilter;
use crate::store::{
    AssetRegistry, NewPlanRow, Page, PlanFilter, PlanStore, PlanUpdate, ScanStore, ScanTally,
};

/// Create request
#[derive(Debug, Clone)]
pub struct NewPlan {
    pub name: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub scope_type: ScopeType,
    pub scope_ids: BTreeSet<i64>,
}

/// Edit request; `None` keeps the existing value. Scope type and ids change
/// together so the non-empty invariant can be checked on the pair.
#[derive(Debug, Clone, Default)]
pub struct PlanChanges {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub scope: Option<(ScopeType, BTreeSet<i64>)>,
}

/// Listing row: a plan plus its scan counts
#[derive(Debug, Clone, Serialize)]
pub struct PlanWithStats {
    pub plan: InventoryPlan,
    pub tally: ScanTally,
}

/// Plan detail: scan counts plus the scoped population size
#[derive(Debug, Clone, Serialize)]
pub struct PlanDetail {
    pub plan: InventoryPlan,
    pub tally: ScanTally,
    /// Non-scrapped assets currently inside the plan's scope
    pub total_assets: u64,
}

/// Inventory-plan lifecycle service
pub struct PlanService {
    plans: Arc<dyn PlanStore>,
    scans: Arc<dyn ScanStore>,
    registry: Arc<dyn AssetRegistry>,
}

impl PlanService {
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

    /// Create a plan in `draft`.
    pub async fn create(&self, new: NewPlan, actor_id: i64) -> Result<InventoryPlan> {
        validate_fields(
            &new.name,
            new.start_date,
            new.end_date,
            new.scope_type,
            &new.scope_ids,
        )?;

        let plan = self
            .plans
            .insert(NewPlanRow {
                name: new.name,
                description: new.description,
                start_date: new.start_date,
                end_date: new.end_date,
                scope_type: new.scope_type,
                scope_ids: new.scope_ids,
                created_by: actor_id,
            })
            .await?;

        info!(plan_id = plan.id, name = %plan.name, "Created inventory plan");
        Ok(plan)
    }

    /// Edit plan fields; legal only while draft or in_progress.
    pub async fn edit(&self, id: i64, changes: PlanChanges) -> Result<InventoryPlan> {
        let existing = self.require(id).await?;
        if !existing.status.is_editable() {
            return Err(Error::InvalidState(
                "completed or closed plans cannot be edited".into(),
            ));
        }

        let (scope_type, scope_ids) = changes
            .scope
            .unwrap_or((existing.scope_type, existing.scope_ids.clone()));
        let update = PlanUpdate {
            name: changes.name.unwrap_or(existing.name),
            description: changes.description.unwrap_or(existing.description),
            start_date: changes.start_date.unwrap_or(existing.start_date),
            end_date: changes.end_date.unwrap_or(existing.end_date),
            scope_type,
            scope_ids,
        };

        validate_fields(
            &update.name,
            update.start_date,
            update.end_date,
            update.scope_type,
            &update.scope_ids,
        )?;

        self.plans.update_fields(id, update).await
    }

    /// draft → in_progress
    pub async fn start(&self, id: i64) -> Result<InventoryPlan> {
        let plan = self
            .plans
            .transition(id, PlanStatus::Draft, PlanStatus::InProgress)
            .await?
            .ok_or_else(|| Error::InvalidState("only draft plans can start".into()))?;
        info!(plan_id = id, "Inventory plan started");
        Ok(plan)
    }

    /// in_progress → completed. Full scan coverage is not required; anything
    /// unscanned shows up in the discrepancy report.
    pub async fn complete(&self, id: i64) -> Result<InventoryPlan> {
        let plan = self
            .plans
            .transition(id, PlanStatus::InProgress, PlanStatus::Completed)
            .await?
            .ok_or_else(|| Error::InvalidState("only in-progress plans can be completed".into()))?;
        info!(plan_id = id, "Inventory plan completed");
        Ok(plan)
    }

    /// completed → closed. Terminal; no further edits, scans, or record
    /// updates.
    pub async fn close(&self, id: i64) -> Result<InventoryPlan> {
        let plan = self
            .plans
            .transition(id, PlanStatus::Completed, PlanStatus::Closed)
            .await?
            .ok_or_else(|| Error::InvalidState("only completed plans can be closed".into()))?;
        info!(plan_id = id, "Inventory plan closed");
        Ok(plan)
    }

    /// Delete a draft plan.
    pub async fn delete(&self, id: i64) -> Result<()> {
        let plan = self.require(id).await?;
        if plan.status != PlanStatus::Draft {
            return Err(Error::InvalidState("only draft plans can be deleted".into()));
        }
        self.plans.delete(id).await?;
        info!(plan_id = id, "Inventory plan deleted");
        Ok(())
    }

    /// Plan detail with scan tallies and the current scoped population size.
    pub async fn get(&self, id: i64) -> Result<PlanDetail> {
        let plan = self.require(id).await?;
        let tally = self.scans.tally(id).await?;
        let scope = ScopeFilter::for_plan(&plan);
        let total_assets = self.registry.count_matching(&scope).await?;
        Ok(PlanDetail {
            plan,
            tally,
            total_assets,
        })
    }

    /// Newest-first plan listing with per-plan scan tallies.
    pub async fn list(
        &self,
        filter: &PlanFilter,
        page: Page,
    ) -> Result<(Vec<PlanWithStats>, u64)> {
        let (plans, total) = self.plans.list(filter, page).await?;
        let mut out = Vec::with_capacity(plans.len());
        for plan in plans {
            let tally = self.scans.tally(plan.id).await?;
            out.push(PlanWithStats { plan, tally });
        }
        Ok((out, total))
    }

    async fn require(&self, id: i64) -> Result<InventoryPlan> {
        self.plans
            .find(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("inventory plan {}", id)))
    }
}

fn validate_fields(
    name: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
    scope_type: ScopeType,
    scope_ids: &BTreeSet<i64>,
) -> Result<()> {
    let mut errors = Vec::new();

    if name.trim().is_empty() {
        errors.push(FieldError::new("name", "is required"));
    }
    // Equal dates are a valid single-day count
    if end_date < start_date {
        errors.push(FieldError::new("end_date", "must not precede start_date"));
    }
    if scope_type != ScopeType::All && scope_ids.is_empty() {
        errors.push(FieldError::new(
            "scope_ids",
            format!("must not be empty when scope_type is {}", scope_type),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(Error::Validation(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn single_day_count_is_valid() {
        let day = date(2025, 3, 1);
        assert!(validate_fields("Q1 count", day, day, ScopeType::All, &BTreeSet::new()).is_ok());
    }

    #[test]
    fn reversed_dates_are_rejected() {
        let result = validate_fields(
            "Q1 count",
            date(2025, 3, 2),
            date(2025, 3, 1),
            ScopeType::All,
            &BTreeSet::new(),
        );
        let Err(Error::Validation(fields)) = result else {
            panic!("expected validation error");
        };
        assert_eq!(fields[0].field, "end_date");
    }

    #[test]
    fn scoped_plan_needs_ids() {
        let result = validate_fields(
            "Dept count",
            date(2025, 3, 1),
            date(2025, 3, 5),
            ScopeType::Department,
            &BTreeSet::new(),
        );
        let Err(Error::Validation(fields)) = result else {
            panic!("expected validation error");
        };
        assert_eq!(fields[0].field, "scope_ids");
    }

    #[test]
    fn blank_name_and_bad_dates_report_both_fields() {
        let result = validate_fields(
            "  ",
            date(2025, 3, 2),
            date(2025, 3, 1),
            ScopeType::All,
            &BTreeSet::new(),
        );
        let Err(Error::Validation(fields)) = result else {
            panic!("expected validation error");
        };
        assert_eq!(fields.len(), 2);
    }
}
