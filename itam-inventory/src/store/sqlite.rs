//! SQLite store backend
//!
//! Persistence for the core's own entities (plans and scan records). Two
//! invariants live here:
//!
//! - `UNIQUE(plan_id, asset_tag)` on scan_records, enforced by a
//!   single-statement `INSERT .. ON CONFLICT DO UPDATE` so concurrent scans
//!   of the same tag are linearized last-write-wins. A `revision` counter
//!   distinguishes created from updated without a read-then-write race.
//! - Plan status transitions are a compare-and-set
//!   `UPDATE .. WHERE id = ? AND status = ?`, so two racing transitions
//!   cannot both succeed.
//!
//! Scope ids are a child table keyed (plan_id, scope_id), not an encoded
//! blob.

use std::collections::BTreeSet;
use std::path::Path;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tracing::info;

use itam_common::models::{
    CaptureMetadata, InventoryPlan, MatchStatus, OcrFields, PlanStatus, ScanRecord, ScopeType,
};
use itam_common::{Error, Result};

use crate::store::{
    NewPlanRow, NewScanRecord, Page, PlanFilter, PlanStore, PlanUpdate, RecordFilter, ScanStore,
    ScanTally, UpsertOutcome,
};

/// Open (creating if needed) the inventory database and ensure the schema
/// exists. Idempotent; safe to call on every startup.
pub async fn init_store(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // Options apply per connection, so every pool member gets the pragmas.
    // WAL keeps readers unblocked while a scan burst writes.
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new inventory database: {}", db_path.display());
    } else {
        info!("Opened inventory database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

async fn create_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS inventory_plans (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            description TEXT,
            start_date TEXT NOT NULL,
            end_date TEXT NOT NULL,
            scope_type TEXT NOT NULL DEFAULT 'all',
            status TEXT NOT NULL DEFAULT 'draft',
            created_by INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS inventory_plan_scopes (
            plan_id INTEGER NOT NULL REFERENCES inventory_plans(id) ON DELETE CASCADE,
            scope_id INTEGER NOT NULL,
            PRIMARY KEY (plan_id, scope_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS scan_records (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            plan_id INTEGER NOT NULL REFERENCES inventory_plans(id),
            asset_tag TEXT NOT NULL,
            matched_asset_id INTEGER,
            status TEXT NOT NULL,
            discrepancy_note TEXT,
            ocr_raw_text TEXT,
            ocr_category TEXT,
            ocr_name TEXT,
            ocr_acquired TEXT,
            image_path TEXT,
            gps_latitude REAL,
            gps_longitude REAL,
            scanned_by INTEGER NOT NULL,
            scanned_at TEXT NOT NULL,
            revision INTEGER NOT NULL DEFAULT 0,
            UNIQUE (plan_id, asset_tag)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_scan_records_plan_status
         ON scan_records(plan_id, status)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

fn parse_plan_status(s: &str) -> Result<PlanStatus> {
    PlanStatus::parse(s)
        .ok_or_else(|| Error::Config(format!("unknown plan status in database: {}", s)))
}

fn parse_scope_type(s: &str) -> Result<ScopeType> {
    ScopeType::parse(s)
        .ok_or_else(|| Error::Config(format!("unknown scope type in database: {}", s)))
}

fn parse_match_status(s: &str) -> Result<MatchStatus> {
    MatchStatus::parse(s)
        .ok_or_else(|| Error::Config(format!("unknown match status in database: {}", s)))
}

fn plan_from_row(row: &SqliteRow, scope_ids: BTreeSet<i64>) -> Result<InventoryPlan> {
    Ok(InventoryPlan {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        start_date: row.try_get::<NaiveDate, _>("start_date")?,
        end_date: row.try_get::<NaiveDate, _>("end_date")?,
        scope_type: parse_scope_type(row.try_get::<String, _>("scope_type")?.as_str())?,
        scope_ids,
        status: parse_plan_status(row.try_get::<String, _>("status")?.as_str())?,
        created_by: row.try_get("created_by")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

fn record_from_row(row: &SqliteRow) -> Result<ScanRecord> {
    let ocr = match row.try_get::<Option<String>, _>("ocr_raw_text")? {
        Some(raw_text) => Some(OcrFields {
            raw_text,
            category: row.try_get("ocr_category")?,
            name: row.try_get("ocr_name")?,
            acquired: row.try_get("ocr_acquired")?,
        }),
        None => None,
    };

    Ok(ScanRecord {
        id: row.try_get("id")?,
        plan_id: row.try_get("plan_id")?,
        asset_tag: row.try_get("asset_tag")?,
        matched_asset_id: row.try_get("matched_asset_id")?,
        status: parse_match_status(row.try_get::<String, _>("status")?.as_str())?,
        discrepancy_note: row.try_get("discrepancy_note")?,
        ocr,
        capture: CaptureMetadata {
            image_path: row.try_get("image_path")?,
            latitude: row.try_get("gps_latitude")?,
            longitude: row.try_get("gps_longitude")?,
        },
        scanned_by: row.try_get("scanned_by")?,
        scanned_at: row.try_get::<DateTime<Utc>, _>("scanned_at")?,
    })
}

/// Plans persisted to SQLite
#[derive(Debug, Clone)]
pub struct SqlitePlanStore {
    pool: SqlitePool,
}

impl SqlitePlanStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn scope_ids(&self, plan_id: i64) -> Result<BTreeSet<i64>> {
        let rows =
            sqlx::query("SELECT scope_id FROM inventory_plan_scopes WHERE plan_id = ?")
                .bind(plan_id)
                .fetch_all(&self.pool)
                .await?;
        rows.iter()
            .map(|r| r.try_get::<i64, _>("scope_id").map_err(Error::from))
            .collect()
    }

    async fn load(&self, id: i64) -> Result<Option<InventoryPlan>> {
        let row = sqlx::query("SELECT * FROM inventory_plans WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => {
                let scope_ids = self.scope_ids(id).await?;
                Ok(Some(plan_from_row(&row, scope_ids)?))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl PlanStore for SqlitePlanStore {
    async fn insert(&self, plan: NewPlanRow) -> Result<InventoryPlan> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            r#"
            INSERT INTO inventory_plans
                (name, description, start_date, end_date, scope_type, status,
                 created_by, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, 'draft', ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&plan.name)
        .bind(&plan.description)
        .bind(plan.start_date)
        .bind(plan.end_date)
        .bind(plan.scope_type.as_str())
        .bind(plan.created_by)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        let id: i64 = row.try_get("id")?;
        for scope_id in &plan.scope_ids {
            sqlx::query("INSERT INTO inventory_plan_scopes (plan_id, scope_id) VALUES (?, ?)")
                .bind(id)
                .bind(scope_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        plan_from_row(&row, plan.scope_ids)
    }

    async fn find(&self, id: i64) -> Result<Option<InventoryPlan>> {
        self.load(id).await
    }

    async fn list(&self, filter: &PlanFilter, page: Page) -> Result<(Vec<InventoryPlan>, u64)> {
        let mut conditions = String::from("1=1");
        if filter.status.is_some() {
            conditions.push_str(" AND status = ?");
        }
        if filter.search.is_some() {
            conditions.push_str(
                " AND (name LIKE '%'||?||'%' OR ifnull(description,'') LIKE '%'||?||'%')",
            );
        }

        let count_sql = format!("SELECT COUNT(*) AS n FROM inventory_plans WHERE {}", conditions);
        let mut count_query = sqlx::query(&count_sql);
        if let Some(status) = filter.status {
            count_query = count_query.bind(status.as_str());
        }
        if let Some(search) = &filter.search {
            count_query = count_query.bind(search).bind(search);
        }
        let total: i64 = count_query.fetch_one(&self.pool).await?.try_get("n")?;

        let list_sql = format!(
            "SELECT * FROM inventory_plans WHERE {} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            conditions
        );
        let mut list_query = sqlx::query(&list_sql);
        if let Some(status) = filter.status {
            list_query = list_query.bind(status.as_str());
        }
        if let Some(search) = &filter.search {
            list_query = list_query.bind(search).bind(search);
        }
        let rows = list_query
            .bind(page.page_size as i64)
            .bind(page.offset() as i64)
            .fetch_all(&self.pool)
            .await?;

        let mut plans = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: i64 = row.try_get("id")?;
            let scope_ids = self.scope_ids(id).await?;
            plans.push(plan_from_row(row, scope_ids)?);
        }
        Ok((plans, total as u64))
    }

    async fn update_fields(&self, id: i64, update: PlanUpdate) -> Result<InventoryPlan> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE inventory_plans
            SET name = ?, description = ?, start_date = ?, end_date = ?,
                scope_type = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&update.name)
        .bind(&update.description)
        .bind(update.start_date)
        .bind(update.end_date)
        .bind(update.scope_type.as_str())
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("inventory plan {}", id)));
        }

        sqlx::query("DELETE FROM inventory_plan_scopes WHERE plan_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        for scope_id in &update.scope_ids {
            sqlx::query("INSERT INTO inventory_plan_scopes (plan_id, scope_id) VALUES (?, ?)")
                .bind(id)
                .bind(scope_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        self.load(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("inventory plan {}", id)))
    }

    async fn transition(
        &self,
        id: i64,
        from: PlanStatus,
        to: PlanStatus,
    ) -> Result<Option<InventoryPlan>> {
        let result = sqlx::query(
            "UPDATE inventory_plans SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
        )
        .bind(to.as_str())
        .bind(Utc::now())
        .bind(id)
        .bind(from.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Distinguish a missing plan from a state mismatch
            return match self.load(id).await? {
                Some(_) => Ok(None),
                None => Err(Error::NotFound(format!("inventory plan {}", id))),
            };
        }

        self.load(id)
            .await?
            .map(Some)
            .ok_or_else(|| Error::NotFound(format!("inventory plan {}", id)))
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM inventory_plan_scopes WHERE plan_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM inventory_plans WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("inventory plan {}", id)));
        }
        Ok(())
    }
}

/// Scan records persisted to SQLite
#[derive(Debug, Clone)]
pub struct SqliteScanStore {
    pool: SqlitePool,
}

impl SqliteScanStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ScanStore for SqliteScanStore {
    async fn upsert(&self, record: NewScanRecord) -> Result<(ScanRecord, UpsertOutcome)> {
        let (raw_text, category, name, acquired) = match &record.ocr {
            Some(ocr) => (
                Some(ocr.raw_text.clone()),
                ocr.category.clone(),
                ocr.name.clone(),
                ocr.acquired.clone(),
            ),
            None => (None, None, None, None),
        };

        // One statement; the unique index linearizes concurrent writers and
        // the revision counter tells created from updated without a
        // read-then-write race
        let row = sqlx::query(
            r#"
            INSERT INTO scan_records
                (plan_id, asset_tag, matched_asset_id, status, discrepancy_note,
                 ocr_raw_text, ocr_category, ocr_name, ocr_acquired,
                 image_path, gps_latitude, gps_longitude, scanned_by, scanned_at, revision)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0)
            ON CONFLICT (plan_id, asset_tag) DO UPDATE SET
                matched_asset_id = excluded.matched_asset_id,
                status = excluded.status,
                discrepancy_note = excluded.discrepancy_note,
                ocr_raw_text = excluded.ocr_raw_text,
                ocr_category = excluded.ocr_category,
                ocr_name = excluded.ocr_name,
                ocr_acquired = excluded.ocr_acquired,
                image_path = excluded.image_path,
                gps_latitude = excluded.gps_latitude,
                gps_longitude = excluded.gps_longitude,
                scanned_by = excluded.scanned_by,
                scanned_at = excluded.scanned_at,
                revision = scan_records.revision + 1
            RETURNING *
            "#,
        )
        .bind(record.plan_id)
        .bind(&record.asset_tag)
        .bind(record.matched_asset_id)
        .bind(record.status.as_str())
        .bind(&record.discrepancy_note)
        .bind(&raw_text)
        .bind(&category)
        .bind(&name)
        .bind(&acquired)
        .bind(&record.capture.image_path)
        .bind(record.capture.latitude)
        .bind(record.capture.longitude)
        .bind(record.scanned_by)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        let revision: i64 = row.try_get("revision")?;
        let outcome = if revision == 0 {
            UpsertOutcome::Created
        } else {
            UpsertOutcome::Updated
        };
        Ok((record_from_row(&row)?, outcome))
    }

    async fn find(&self, record_id: i64) -> Result<Option<ScanRecord>> {
        let row = sqlx::query("SELECT * FROM scan_records WHERE id = ?")
            .bind(record_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(record_from_row).transpose()
    }

    async fn find_by_tag(&self, plan_id: i64, asset_tag: &str) -> Result<Option<ScanRecord>> {
        let row = sqlx::query("SELECT * FROM scan_records WHERE plan_id = ? AND asset_tag = ?")
            .bind(plan_id)
            .bind(asset_tag)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(record_from_row).transpose()
    }

    async fn list_for_plan(
        &self,
        plan_id: i64,
        filter: &RecordFilter,
        page: Page,
    ) -> Result<(Vec<ScanRecord>, u64)> {
        let mut conditions = String::from("plan_id = ?");
        if filter.status.is_some() {
            conditions.push_str(" AND status = ?");
        }
        if filter.search.is_some() {
            conditions.push_str(" AND asset_tag LIKE '%'||?||'%'");
        }

        let count_sql = format!("SELECT COUNT(*) AS n FROM scan_records WHERE {}", conditions);
        let mut count_query = sqlx::query(&count_sql).bind(plan_id);
        if let Some(status) = filter.status {
            count_query = count_query.bind(status.as_str());
        }
        if let Some(search) = &filter.search {
            count_query = count_query.bind(search);
        }
        let total: i64 = count_query.fetch_one(&self.pool).await?.try_get("n")?;

        let list_sql = format!(
            "SELECT * FROM scan_records WHERE {} ORDER BY scanned_at DESC, id DESC LIMIT ? OFFSET ?",
            conditions
        );
        let mut list_query = sqlx::query(&list_sql).bind(plan_id);
        if let Some(status) = filter.status {
            list_query = list_query.bind(status.as_str());
        }
        if let Some(search) = &filter.search {
            list_query = list_query.bind(search);
        }
        let rows = list_query
            .bind(page.page_size as i64)
            .bind(page.offset() as i64)
            .fetch_all(&self.pool)
            .await?;

        let records = rows
            .iter()
            .map(record_from_row)
            .collect::<Result<Vec<_>>>()?;
        Ok((records, total as u64))
    }

    async fn tally(&self, plan_id: i64) -> Result<ScanTally> {
        let rows = sqlx::query(
            "SELECT status, COUNT(*) AS n FROM scan_records WHERE plan_id = ? GROUP BY status",
        )
        .bind(plan_id)
        .fetch_all(&self.pool)
        .await?;

        let mut tally = ScanTally::default();
        for row in rows {
            let count: i64 = row.try_get("n")?;
            match parse_match_status(row.try_get::<String, _>("status")?.as_str())? {
                MatchStatus::Matched => tally.matched = count as u64,
                MatchStatus::Discrepancy => tally.discrepancy = count as u64,
                MatchStatus::Unmatched => tally.unmatched = count as u64,
            }
        }
        Ok(tally)
    }

    async fn scanned_tags(&self, plan_id: i64) -> Result<BTreeSet<String>> {
        let rows = sqlx::query("SELECT asset_tag FROM scan_records WHERE plan_id = ?")
            .bind(plan_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|r| r.try_get::<String, _>("asset_tag").map_err(Error::from))
            .collect()
    }

    async fn update_review(
        &self,
        record_id: i64,
        status: MatchStatus,
        note: Option<String>,
    ) -> Result<ScanRecord> {
        let row = sqlx::query(
            "UPDATE scan_records SET status = ?, discrepancy_note = ? WHERE id = ? RETURNING *",
        )
        .bind(status.as_str())
        .bind(&note)
        .bind(record_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => record_from_row(&row),
            None => Err(Error::NotFound(format!("scan record {}", record_id))),
        }
    }
}
