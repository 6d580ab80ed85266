//! Shared test fixtures: services wired over the in-memory stores plus a
//! small asset register to count against.

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;

use itam_common::models::{AssetSnapshot, AssetStatus, CaptureMetadata, InventoryPlan, ScopeType};
use itam_inventory::store::memory::{MemoryAssetRegistry, MemoryPlanStore, MemoryScanStore};
use itam_inventory::{ManualScan, NewPlan, OcrScan, PlanService, Reporter, ScanService};

pub const ACTOR: i64 = 42;

pub struct TestWorld {
    pub registry: Arc<MemoryAssetRegistry>,
    pub plans: PlanService,
    pub scans: ScanService,
    pub reporter: Reporter,
}

impl TestWorld {
    pub fn new() -> Self {
        let plan_store = Arc::new(MemoryPlanStore::new());
        let scan_store = Arc::new(MemoryScanStore::new());
        let registry = Arc::new(MemoryAssetRegistry::new());

        Self {
            registry: registry.clone(),
            plans: PlanService::new(plan_store.clone(), scan_store.clone(), registry.clone()),
            scans: ScanService::new(plan_store.clone(), scan_store.clone(), registry.clone()),
            reporter: Reporter::new(plan_store, scan_store, registry),
        }
    }

    /// Create a plan scoped to everything, spanning one week.
    pub async fn draft_plan(&self, name: &str) -> InventoryPlan {
        self.plans
            .create(new_plan(name, ScopeType::All, []), ACTOR)
            .await
            .unwrap()
    }

    /// Create a plan and drive it to in_progress.
    pub async fn started_plan(&self, name: &str) -> InventoryPlan {
        let plan = self.draft_plan(name).await;
        self.plans.start(plan.id).await.unwrap()
    }
}

pub fn new_plan(
    name: &str,
    scope_type: ScopeType,
    scope_ids: impl IntoIterator<Item = i64>,
) -> NewPlan {
    NewPlan {
        name: name.to_string(),
        description: None,
        start_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2025, 3, 7).unwrap(),
        scope_type,
        scope_ids: scope_ids.into_iter().collect::<BTreeSet<i64>>(),
    }
}

pub fn asset(id: i64, tag: &str, department_id: i64) -> AssetSnapshot {
    AssetSnapshot {
        id,
        tag: tag.to_string(),
        name: format!("Asset {}", tag),
        category_id: 1,
        category_name: "IT-Portable Computer".to_string(),
        department_id,
        location_id: Some(5),
        acquired_on: NaiveDate::from_ymd_opt(2023, 9, 15).unwrap(),
        status: AssetStatus::InService,
    }
}

pub fn manual(tag: &str) -> ManualScan {
    ManualScan {
        asset_tag: tag.to_string(),
        location_id: None,
        department_id: None,
        note: None,
        capture: CaptureMetadata::default(),
    }
}

pub fn ocr(text: &str) -> OcrScan {
    OcrScan {
        text: text.to_string(),
        fallback_tag: None,
        capture: CaptureMetadata::default(),
    }
}
