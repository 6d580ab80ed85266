//! Domain models for asset inventory
//!
//! Plain records shared between the stores and the services. Status enums
//! serialize as their lowercase wire strings and provide `as_str`/`parse`
//! helpers for TEXT columns.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of an inventory plan
///
/// Transitions only move forward: draft → in_progress → completed → closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Draft,
    InProgress,
    Completed,
    Closed,
}

impl PlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanStatus::Draft => "draft",
            PlanStatus::InProgress => "in_progress",
            PlanStatus::Completed => "completed",
            PlanStatus::Closed => "closed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(PlanStatus::Draft),
            "in_progress" => Some(PlanStatus::InProgress),
            "completed" => Some(PlanStatus::Completed),
            "closed" => Some(PlanStatus::Closed),
            _ => None,
        }
    }

    /// Whether plan fields may still be edited in this state
    pub fn is_editable(&self) -> bool {
        matches!(self, PlanStatus::Draft | PlanStatus::InProgress)
    }
}

impl std::fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which dimension of the register a plan counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeType {
    All,
    Department,
    Location,
    Category,
}

impl ScopeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeType::All => "all",
            ScopeType::Department => "department",
            ScopeType::Location => "location",
            ScopeType::Category => "category",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "all" => Some(ScopeType::All),
            "department" => Some(ScopeType::Department),
            "location" => Some(ScopeType::Location),
            "category" => Some(ScopeType::Category),
            _ => None,
        }
    }
}

impl std::fmt::Display for ScopeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reconciliation outcome of a single scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Matched,
    Discrepancy,
    Unmatched,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Matched => "matched",
            MatchStatus::Discrepancy => "discrepancy",
            MatchStatus::Unmatched => "unmatched",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "matched" => Some(MatchStatus::Matched),
            "discrepancy" => Some(MatchStatus::Discrepancy),
            "unmatched" => Some(MatchStatus::Unmatched),
            _ => None,
        }
    }
}

impl std::fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of an asset in the register
///
/// Scrapped assets are excluded from every inventory scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetStatus {
    InService,
    Idle,
    UnderRepair,
    Scrapped,
}

impl AssetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetStatus::InService => "in_service",
            AssetStatus::Idle => "idle",
            AssetStatus::UnderRepair => "under_repair",
            AssetStatus::Scrapped => "scrapped",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "in_service" => Some(AssetStatus::InService),
            "idle" => Some(AssetStatus::Idle),
            "under_repair" => Some(AssetStatus::UnderRepair),
            "scrapped" => Some(AssetStatus::Scrapped),
            _ => None,
        }
    }
}

/// A physical-inventory plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryPlan {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub scope_type: ScopeType,
    /// Department/location/category ids; empty when scope_type is `all`
    pub scope_ids: BTreeSet<i64>,
    pub status: PlanStatus,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields parsed out of the raw OCR text of a printed asset tag
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrFields {
    /// Original recognized text, kept for audit
    pub raw_text: String,
    pub category: Option<String>,
    pub name: Option<String>,
    /// Acquisition year/month as printed, e.g. "2023/9"
    pub acquired: Option<String>,
}

/// Optional capture context attached to a scan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaptureMetadata {
    pub image_path: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// One scan event within a plan; unique per (plan_id, asset_tag)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRecord {
    pub id: i64,
    pub plan_id: i64,
    /// Tag as scanned; may not resolve to any asset in the register
    pub asset_tag: String,
    pub matched_asset_id: Option<i64>,
    pub status: MatchStatus,
    pub discrepancy_note: Option<String>,
    /// Present only for OCR-sourced scans
    pub ocr: Option<OcrFields>,
    pub capture: CaptureMetadata,
    pub scanned_by: i64,
    pub scanned_at: DateTime<Utc>,
}

/// Read-only view of an asset as the inventory core consumes it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetSnapshot {
    pub id: i64,
    pub tag: String,
    pub name: String,
    pub category_id: i64,
    /// Flattened category label, e.g. "IT-Portable Computer"
    pub category_name: String,
    pub department_id: i64,
    pub location_id: Option<i64>,
    pub acquired_on: NaiveDate,
    pub status: AssetStatus,
}
