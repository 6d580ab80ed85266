//! # Inventory Reconciliation Core
//!
//! Drives periodic physical-inventory counts against the asset register:
//! - Plan lifecycle (draft → in_progress → completed → closed)
//! - Scope resolution (all / by department / by location / by category)
//! - Scan ingestion (manual entry and OCR-recognized tag text)
//! - Match classification (matched / discrepancy / unmatched)
//! - Progress and discrepancy reporting (including never-scanned assets)
//!
//! Storage and the asset register are reached through the traits in
//! [`store`]; `store::memory` ships a complete in-process implementation
//! and `store::sqlite` a SQLite-backed one for plans and scan records.

pub mod classify;
pub mod ocr;
pub mod plan;
pub mod report;
pub mod scan;
pub mod scope;
pub mod store;

pub use classify::{Classification, ManualContext};
pub use ocr::ParsedTag;
pub use plan::{NewPlan, PlanChanges, PlanDetail, PlanService, PlanWithStats};
pub use report::{DiscrepancyReport, PlanAssetsPage, PlanProgress, Reporter};
pub use scan::{ManualScan, OcrScan, RecordReview, ScanOutcome, ScanService};
pub use scope::ScopeFilter;
pub use store::{AssetRegistry, Page, PlanStore, ScanStore, ScanTally, UpsertOutcome};
