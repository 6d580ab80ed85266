//! Scan ingestion
//!
//! Orchestrates one scan event: look the tag up in the register, resolve
//! scope membership, classify, then atomically upsert the plan's record for
//! that tag. Scanning never mutates the asset register; only movement
//! operations elsewhere in the system change location or custodian.
//!
//! Two entry points share the pipeline:
//! - manual entry (tag typed or picked from the checklist), which refuses to
//!   silently overwrite a tag already recorded as matched, and
//! - OCR (recognized label text), which is a plain idempotent upsert so
//!   re-photographing a tag just updates the record.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use itam_common::models::{
    AssetSnapshot, CaptureMetadata, InventoryPlan, MatchStatus, PlanStatus, ScanRecord,
};
use itam_common::{Error, Result};

use crate::classify::{classify, ManualContext};
use crate::ocr::parse_tag_text;
use crate::scope::ScopeFilter;
use crate::store::{
    AssetRegistry, NewScanRecord, Page, PlanStore, RecordFilter, ScanStore, UpsertOutcome,
};

/// Manual scan request
#[derive(Debug, Clone)]
pub struct ManualScan {
    pub asset_tag: String,
    /// Where the scanner claims the asset was found
    pub location_id: Option<i64>,
    pub department_id: Option<i64>,
    /// Free-text note; overrides the generated discrepancy note when present
    pub note: Option<String>,
    pub capture: CaptureMetadata,
}

/// OCR scan request
#[derive(Debug, Clone)]
pub struct OcrScan {
    /// Recognized text from the tag photo
    pub text: String,
    /// Tag the client recognized separately (e.g. barcode), used when the
    /// text itself carries no tag label
    pub fallback_tag: Option<String>,
    pub capture: CaptureMetadata,
}

/// Discrepancy-review edit; `None` keeps the existing value
#[derive(Debug, Clone, Default)]
pub struct RecordReview {
    pub status: Option<MatchStatus>,
    pub note: Option<String>,
}

/// Result of one ingested scan
#[derive(Debug, Clone, Serialize)]
pub struct ScanOutcome {
    pub record: ScanRecord,
    /// Created on first scan of the tag, Updated on re-scan
    pub outcome: UpsertOutcome,
    /// The matched asset, when the tag resolved
    pub asset: Option<AssetSnapshot>,
}

/// Scan ingestion service
pub struct ScanService {
    plans: Arc<dyn PlanStore>,
    scans: Arc<dyn ScanStore>,
    registry: Arc<dyn AssetRegistry>,
}

impl ScanService {
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

    /// Ingest a manually entered scan.
    ///
    /// A tag already recorded as `matched` in this plan fails with
    /// [`Error::AlreadyScanned`] and leaves the record untouched; correction
    /// goes through [`ScanService::update_record`] instead.
    pub async fn scan_manual(
        &self,
        plan_id: i64,
        scan: ManualScan,
        actor_id: i64,
    ) -> Result<ScanOutcome> {
        if scan.asset_tag.trim().is_empty() {
            return Err(Error::invalid_field("asset_tag", "is required"));
        }
        let plan = self.require_in_progress(plan_id).await?;

        if let Some(existing) = self.scans.find_by_tag(plan_id, &scan.asset_tag).await? {
            if existing.status == MatchStatus::Matched {
                return Err(Error::AlreadyScanned(scan.asset_tag));
            }
        }

        let asset = self.registry.find_by_tag(&scan.asset_tag).await?;
        let scope = ScopeFilter::for_plan(&plan);
        let classification = classify(
            Some(&scan.asset_tag),
            asset.as_ref(),
            &scope,
            None,
            ManualContext {
                location_id: scan.location_id,
                department_id: scan.department_id,
            },
        );

        let note = scan.note.or(classification.note);
        let (record, outcome) = self
            .scans
            .upsert(NewScanRecord {
                plan_id,
                asset_tag: classification.asset_tag,
                matched_asset_id: classification.matched_asset_id,
                status: classification.status,
                discrepancy_note: note,
                ocr: None,
                capture: scan.capture,
                scanned_by: actor_id,
            })
            .await?;

        info!(
            plan_id,
            tag = %record.asset_tag,
            status = %record.status,
            "Manual scan ingested"
        );
        Ok(ScanOutcome {
            record,
            outcome,
            asset,
        })
    }

    /// Ingest an OCR-sourced scan. Idempotent per tag: re-scanning reports
    /// `Updated` and overwrites the previous classification.
    pub async fn scan_ocr(
        &self,
        plan_id: i64,
        scan: OcrScan,
        actor_id: i64,
    ) -> Result<ScanOutcome> {
        let plan = self.require_in_progress(plan_id).await?;

        let parsed = parse_tag_text(&scan.text);
        let tag = parsed.tag.clone().or(scan.fallback_tag);

        let asset = match &tag {
            Some(tag) => self.registry.find_by_tag(tag).await?,
            None => None,
        };
        let scope = ScopeFilter::for_plan(&plan);
        let classification = classify(
            tag.as_deref(),
            asset.as_ref(),
            &scope,
            Some(&parsed),
            ManualContext::default(),
        );

        let (record, outcome) = self
            .scans
            .upsert(NewScanRecord {
                plan_id,
                asset_tag: classification.asset_tag,
                matched_asset_id: classification.matched_asset_id,
                status: classification.status,
                discrepancy_note: classification.note,
                ocr: Some(parsed.to_fields()),
                capture: scan.capture,
                scanned_by: actor_id,
            })
            .await?;

        info!(
            plan_id,
            tag = %record.asset_tag,
            status = %record.status,
            "OCR scan ingested"
        );
        Ok(ScanOutcome {
            record,
            outcome,
            asset,
        })
    }

    /// Discrepancy review: adjust a record's match status or note after the
    /// fact. Forbidden once the owning plan is closed.
    pub async fn update_record(
        &self,
        record_id: i64,
        review: RecordReview,
        _actor_id: i64,
    ) -> Result<ScanRecord> {
        let record = self
            .scans
            .find(record_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("scan record {}", record_id)))?;

        let plan = self
            .plans
            .find(record.plan_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("inventory plan {}", record.plan_id)))?;
        if plan.status == PlanStatus::Closed {
            return Err(Error::InvalidState(
                "closed plans cannot accept record updates".into(),
            ));
        }

        let status = review.status.unwrap_or(record.status);
        let note = review.note.or(record.discrepancy_note);
        self.scans.update_review(record_id, status, note).await
    }

    /// Scan-record listing for one plan, newest scan first.
    pub async fn list_records(
        &self,
        plan_id: i64,
        filter: &RecordFilter,
        page: Page,
    ) -> Result<(Vec<ScanRecord>, u64)> {
        self.require(plan_id).await?;
        self.scans.list_for_plan(plan_id, filter, page).await
    }

    async fn require(&self, plan_id: i64) -> Result<InventoryPlan> {
        self.plans
            .find(plan_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("inventory plan {}", plan_id)))
    }

    async fn require_in_progress(&self, plan_id: i64) -> Result<InventoryPlan> {
        let plan = self.require(plan_id).await?;
        if plan.status != PlanStatus::InProgress {
            return Err(Error::InvalidState(
                "scanning requires an in-progress plan".into(),
            ));
        }
        Ok(plan)
    }
}
