//! SQLite storage layer.
//!
//! A single pooled connection set (r2d2 + rusqlite) shared by all handlers.
//! Workflow operations that touch more than one table (approve, reject,
//! manual entry) run inside a `BEGIN IMMEDIATE` transaction so the status
//! check-and-set, the fundraising-ledger increment, and the material
//! increment commit or roll back as one unit. Counter updates are always
//! increment-style SQL, never read-then-overwrite.

use chrono::{DateTime, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension, TransactionBehavior};
use std::env;
use std::path::Path;

pub mod models;

use crate::audit::NewAuditEntry;
use models::{
    Admin, AuditLogEntry, Donation, DonationStatus, DonationSummary, FundraisingGoal, Material,
    PendingDonation,
};

pub type DbPool = Pool<SqliteConnectionManager>;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS admins (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    pin_hash    TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    last_login  TEXT
);

CREATE TABLE IF NOT EXISTS materials (
    id               TEXT PRIMARY KEY,
    name             TEXT NOT NULL UNIQUE COLLATE NOCASE,
    unit             TEXT NOT NULL,
    quantity_needed  INTEGER NOT NULL,
    quantity_current INTEGER NOT NULL DEFAULT 0,
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS fundraising_goal (
    id             TEXT PRIMARY KEY,
    goal_amount    REAL NOT NULL,
    current_amount REAL NOT NULL DEFAULT 0,
    created_at     TEXT NOT NULL,
    updated_at     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS donations (
    id               TEXT PRIMARY KEY,
    donor_name       TEXT,
    is_anonymous     INTEGER NOT NULL DEFAULT 0,
    amount           REAL NOT NULL,
    material_id      TEXT REFERENCES materials(id),
    proof_image_url  TEXT NOT NULL,
    status           TEXT NOT NULL DEFAULT 'pending'
                     CHECK (status IN ('pending', 'approved', 'rejected')),
    rejection_reason TEXT,
    admin_id         TEXT REFERENCES admins(id),
    created_at       TEXT NOT NULL,
    processed_at     TEXT
);

CREATE INDEX IF NOT EXISTS idx_donations_status_created ON donations(status, created_at);
CREATE INDEX IF NOT EXISTS idx_donations_material ON donations(material_id);

CREATE TABLE IF NOT EXISTS audit_log (
    id          TEXT PRIMARY KEY,
    action_type TEXT NOT NULL,
    admin_id    TEXT,
    admin_name  TEXT,
    target_type TEXT NOT NULL,
    target_id   TEXT,
    old_value   TEXT,
    new_value   TEXT,
    description TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_audit_created ON audit_log(created_at);
";

pub async fn init_pool() -> anyhow::Result<DbPool> {
    let path = env::var("DATABASE_PATH").unwrap_or_else(|_| "buildflow.db".to_string());
    init_pool_at(Path::new(&path))
}

/// Open a pool against a concrete file path. Used directly by tests.
pub fn init_pool_at(path: &Path) -> anyhow::Result<DbPool> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let manager = SqliteConnectionManager::file(path).with_init(|conn| {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;
             PRAGMA synchronous = NORMAL;",
        )
    });

    let pool = Pool::builder()
        .max_size(10)
        .connection_timeout(std::time::Duration::from_secs(60))
        .build(manager)
        .map_err(|e| anyhow::anyhow!("Failed to create DB pool: {}", e))?;

    Ok(pool)
}

/// Apply the embedded schema. Idempotent.
pub async fn run_migrations(pool: &DbPool) -> anyhow::Result<()> {
    let conn = pool.get()?;
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

// ── Donations ───────────────────────────────────────────────────

/// Outcome of an approve/reject attempt on a donation.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessOutcome {
    Processed {
        amount: f64,
        donor_name: Option<String>,
        material_id: Option<String>,
    },
    NotFound,
    AlreadyProcessed,
}

pub async fn insert_donation(
    pool: &DbPool,
    id: &str,
    donor_name: &Option<String>,
    is_anonymous: bool,
    amount: f64,
    material_id: &Option<String>,
    proof_image_url: &str,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO donations (id, donor_name, is_anonymous, amount, material_id, proof_image_url, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'pending', ?7)",
        params![id, donor_name, is_anonymous, amount, material_id, proof_image_url, now],
    )?;
    Ok(())
}

/// Insert an admin-entered donation that is approved from the start, applying
/// the ledger and material side effects in the same transaction.
pub async fn insert_manual_donation(
    pool: &DbPool,
    id: &str,
    donor_name: &Option<String>,
    is_anonymous: bool,
    amount: f64,
    material_id: &Option<String>,
    proof_image_url: &str,
    admin_id: &str,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    let mut conn = pool.get()?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    tx.execute(
        "INSERT INTO donations (id, donor_name, is_anonymous, amount, material_id, proof_image_url, status, admin_id, created_at, processed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'approved', ?7, ?8, ?8)",
        params![id, donor_name, is_anonymous, amount, material_id, proof_image_url, admin_id, now],
    )?;
    tx.execute(
        "UPDATE fundraising_goal SET current_amount = current_amount + ?1, updated_at = ?2",
        params![amount, now],
    )?;
    if let Some(mid) = material_id {
        // Each donation claims exactly one unit, independent of its amount.
        tx.execute(
            "UPDATE materials SET quantity_current = quantity_current + 1, updated_at = ?2 WHERE id = ?1",
            params![mid, now],
        )?;
    }
    tx.commit()?;
    Ok(())
}

pub async fn get_donation(pool: &DbPool, id: &str) -> anyhow::Result<Option<Donation>> {
    let conn = pool.get()?;
    let donation = conn
        .query_row(
            "SELECT id, donor_name, is_anonymous, amount, material_id, proof_image_url,
                    status, rejection_reason, admin_id, created_at, processed_at
             FROM donations WHERE id = ?1",
            params![id],
            |row| {
                Ok(Donation {
                    id: row.get("id")?,
                    donor_name: row.get("donor_name")?,
                    is_anonymous: row.get("is_anonymous")?,
                    amount: row.get("amount")?,
                    material_id: row.get("material_id")?,
                    proof_image_url: row.get("proof_image_url")?,
                    status: row.get("status")?,
                    rejection_reason: row.get("rejection_reason")?,
                    admin_id: row.get("admin_id")?,
                    created_at: row.get("created_at")?,
                    processed_at: row.get("processed_at")?,
                })
            },
        )
        .optional()?;
    Ok(donation)
}

fn summary_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DonationSummary> {
    Ok(DonationSummary {
        id: row.get("id")?,
        donor_name: row.get("donor_name")?,
        is_anonymous: row.get("is_anonymous")?,
        amount: row.get("amount")?,
        proof_image_url: row.get("proof_image_url")?,
        status: row.get("status")?,
        created_at: row.get("created_at")?,
        material_name: row.get("material_name")?,
    })
}

/// Newest-first listing, optionally filtered by status. `limit` is clamped by
/// the caller.
pub async fn list_donations(
    pool: &DbPool,
    status: Option<DonationStatus>,
    limit: i64,
) -> anyhow::Result<Vec<DonationSummary>> {
    let conn = pool.get()?;
    let base = "SELECT d.id, d.donor_name, d.is_anonymous, d.amount, d.proof_image_url,
                       d.status, d.created_at, m.name AS material_name
                FROM donations d LEFT JOIN materials m ON m.id = d.material_id";
    let mut out = Vec::new();
    match status {
        Some(s) => {
            let mut stmt = conn.prepare(&format!(
                "{base} WHERE d.status = ?1 ORDER BY d.created_at DESC LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![s, limit], summary_from_row)?;
            for row in rows {
                out.push(row?);
            }
        }
        None => {
            let mut stmt =
                conn.prepare(&format!("{base} ORDER BY d.created_at DESC LIMIT ?1"))?;
            let rows = stmt.query_map(params![limit], summary_from_row)?;
            for row in rows {
                out.push(row?);
            }
        }
    }
    Ok(out)
}

/// Pending donations for the review queue, oldest first (FIFO).
pub async fn list_pending_donations(pool: &DbPool) -> anyhow::Result<Vec<PendingDonation>> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT d.id, d.donor_name, d.is_anonymous, d.amount, d.material_id,
                d.proof_image_url, d.status, d.created_at,
                m.name AS material_name, m.unit AS material_unit
         FROM donations d LEFT JOIN materials m ON m.id = d.material_id
         WHERE d.status = 'pending'
         ORDER BY d.created_at ASC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(PendingDonation {
            id: row.get("id")?,
            donor_name: row.get("donor_name")?,
            is_anonymous: row.get("is_anonymous")?,
            amount: row.get("amount")?,
            material_id: row.get("material_id")?,
            proof_image_url: row.get("proof_image_url")?,
            status: row.get("status")?,
            created_at: row.get("created_at")?,
            material_name: row.get("material_name")?,
            material_unit: row.get("material_unit")?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// Approve a pending donation. The status flip is a conditional UPDATE keyed
/// on the prior status, so two racing approvals produce at most one ledger
/// increment; the loser sees `AlreadyProcessed`.
pub async fn approve_donation(
    pool: &DbPool,
    id: &str,
    admin_id: &str,
    now: DateTime<Utc>,
) -> anyhow::Result<ProcessOutcome> {
    let mut conn = pool.get()?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let row = tx
        .query_row(
            "SELECT status, amount, material_id, donor_name FROM donations WHERE id = ?1",
            params![id],
            |row| {
                Ok((
                    row.get::<_, DonationStatus>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            },
        )
        .optional()?;
    let Some((status, amount, material_id, donor_name)) = row else {
        return Ok(ProcessOutcome::NotFound);
    };
    if status != DonationStatus::Pending {
        return Ok(ProcessOutcome::AlreadyProcessed);
    }

    let updated = tx.execute(
        "UPDATE donations SET status = 'approved', admin_id = ?1, processed_at = ?2
         WHERE id = ?3 AND status = 'pending'",
        params![admin_id, now, id],
    )?;
    if updated == 0 {
        return Ok(ProcessOutcome::AlreadyProcessed);
    }

    tx.execute(
        "UPDATE fundraising_goal SET current_amount = current_amount + ?1, updated_at = ?2",
        params![amount, now],
    )?;
    if let Some(mid) = &material_id {
        // Flat +1 per approved donation, regardless of the amount.
        tx.execute(
            "UPDATE materials SET quantity_current = quantity_current + 1, updated_at = ?2 WHERE id = ?1",
            params![mid, now],
        )?;
    }

    tx.commit()?;
    Ok(ProcessOutcome::Processed {
        amount,
        donor_name,
        material_id,
    })
}

/// Reject a pending donation. No ledger or material effect.
pub async fn reject_donation(
    pool: &DbPool,
    id: &str,
    admin_id: &str,
    reason: Option<&str>,
    now: DateTime<Utc>,
) -> anyhow::Result<ProcessOutcome> {
    let mut conn = pool.get()?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let row = tx
        .query_row(
            "SELECT status, amount, donor_name FROM donations WHERE id = ?1",
            params![id],
            |row| {
                Ok((
                    row.get::<_, DonationStatus>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            },
        )
        .optional()?;
    let Some((status, amount, donor_name)) = row else {
        return Ok(ProcessOutcome::NotFound);
    };
    if status != DonationStatus::Pending {
        return Ok(ProcessOutcome::AlreadyProcessed);
    }

    let updated = tx.execute(
        "UPDATE donations SET status = 'rejected', admin_id = ?1, rejection_reason = ?2, processed_at = ?3
         WHERE id = ?4 AND status = 'pending'",
        params![admin_id, reason, now, id],
    )?;
    if updated == 0 {
        return Ok(ProcessOutcome::AlreadyProcessed);
    }

    tx.commit()?;
    Ok(ProcessOutcome::Processed {
        amount,
        donor_name,
        material_id: None,
    })
}

// ── Fundraising goal ────────────────────────────────────────────

pub async fn get_goal(pool: &DbPool) -> anyhow::Result<Option<FundraisingGoal>> {
    let conn = pool.get()?;
    let goal = conn
        .query_row(
            "SELECT id, goal_amount, current_amount, updated_at FROM fundraising_goal LIMIT 1",
            [],
            |row| {
                Ok(FundraisingGoal {
                    id: row.get(0)?,
                    goal_amount: row.get(1)?,
                    current_amount: row.get(2)?,
                    updated_at: row.get(3)?,
                })
            },
        )
        .optional()?;
    Ok(goal)
}

/// Create the singleton goal row if missing, otherwise update the target.
pub async fn ensure_goal(pool: &DbPool, goal_amount: f64, now: DateTime<Utc>) -> anyhow::Result<()> {
    let conn = pool.get()?;
    let existing: Option<String> = conn
        .query_row("SELECT id FROM fundraising_goal LIMIT 1", [], |row| row.get(0))
        .optional()?;
    match existing {
        Some(id) => {
            conn.execute(
                "UPDATE fundraising_goal SET goal_amount = ?1, updated_at = ?2 WHERE id = ?3",
                params![goal_amount, now, id],
            )?;
        }
        None => {
            conn.execute(
                "INSERT INTO fundraising_goal (id, goal_amount, current_amount, created_at, updated_at)
                 VALUES (?1, ?2, 0, ?3, ?3)",
                params![uuid::Uuid::new_v4().to_string(), goal_amount, now],
            )?;
        }
    }
    Ok(())
}

/// Reconciliation: rewrite current_amount from the sum of approved donations.
/// The invariant `current_amount == SUM(amount) WHERE approved` must always be
/// restorable this way; run at startup as a self-healing check.
pub async fn recompute_goal_total(pool: &DbPool, now: DateTime<Utc>) -> anyhow::Result<f64> {
    let conn = pool.get()?;
    conn.execute(
        "UPDATE fundraising_goal
         SET current_amount = (SELECT COALESCE(SUM(amount), 0) FROM donations WHERE status = 'approved'),
             updated_at = ?1",
        params![now],
    )?;
    let total = conn
        .query_row("SELECT current_amount FROM fundraising_goal LIMIT 1", [], |row| row.get(0))
        .optional()?;
    Ok(total.unwrap_or(0.0))
}

// ── Materials ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum CreateMaterialOutcome {
    Created,
    DuplicateName,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UpdateMaterialOutcome {
    Updated {
        name: String,
        old_current: i64,
        new_current: i64,
    },
    NotFound,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeleteMaterialOutcome {
    Deleted,
    NotFound,
    HasDonations(i64),
}

fn material_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Material> {
    Ok(Material {
        id: row.get("id")?,
        name: row.get("name")?,
        unit: row.get("unit")?,
        quantity_needed: row.get("quantity_needed")?,
        quantity_current: row.get("quantity_current")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub async fn list_materials(pool: &DbPool) -> anyhow::Result<Vec<Material>> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT id, name, unit, quantity_needed, quantity_current, created_at, updated_at
         FROM materials ORDER BY name",
    )?;
    let rows = stmt.query_map([], material_from_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub async fn get_material(pool: &DbPool, id: &str) -> anyhow::Result<Option<Material>> {
    let conn = pool.get()?;
    let material = conn
        .query_row(
            "SELECT id, name, unit, quantity_needed, quantity_current, created_at, updated_at
             FROM materials WHERE id = ?1",
            params![id],
            material_from_row,
        )
        .optional()?;
    Ok(material)
}

pub async fn create_material(
    pool: &DbPool,
    id: &str,
    name: &str,
    unit: &str,
    quantity_needed: i64,
    quantity_current: i64,
    now: DateTime<Utc>,
) -> anyhow::Result<CreateMaterialOutcome> {
    let conn = pool.get()?;
    // Name uniqueness is case-insensitive; the NOCASE unique index is the backstop.
    let existing: Option<String> = conn
        .query_row(
            "SELECT id FROM materials WHERE name = ?1 COLLATE NOCASE",
            params![name],
            |row| row.get(0),
        )
        .optional()?;
    if existing.is_some() {
        return Ok(CreateMaterialOutcome::DuplicateName);
    }
    conn.execute(
        "INSERT INTO materials (id, name, unit, quantity_needed, quantity_current, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
        params![id, name, unit, quantity_needed, quantity_current, now],
    )?;
    Ok(CreateMaterialOutcome::Created)
}

/// Partial update of the two quantity fields. Returns the old and new
/// quantity_current so the caller can decide whether to audit the change.
pub async fn update_material_quantities(
    pool: &DbPool,
    id: &str,
    quantity_current: Option<i64>,
    quantity_needed: Option<i64>,
    now: DateTime<Utc>,
) -> anyhow::Result<UpdateMaterialOutcome> {
    let mut conn = pool.get()?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let row = tx
        .query_row(
            "SELECT name, quantity_current FROM materials WHERE id = ?1",
            params![id],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
        )
        .optional()?;
    let Some((name, old_current)) = row else {
        return Ok(UpdateMaterialOutcome::NotFound);
    };

    if let Some(current) = quantity_current {
        tx.execute(
            "UPDATE materials SET quantity_current = ?1, updated_at = ?2 WHERE id = ?3",
            params![current, now, id],
        )?;
    }
    if let Some(needed) = quantity_needed {
        tx.execute(
            "UPDATE materials SET quantity_needed = ?1, updated_at = ?2 WHERE id = ?3",
            params![needed, now, id],
        )?;
    }

    tx.commit()?;
    Ok(UpdateMaterialOutcome::Updated {
        name,
        old_current,
        new_current: quantity_current.unwrap_or(old_current),
    })
}

pub async fn delete_material(pool: &DbPool, id: &str) -> anyhow::Result<DeleteMaterialOutcome> {
    let conn = pool.get()?;
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM donations WHERE material_id = ?1",
        params![id],
        |row| row.get(0),
    )?;
    if count > 0 {
        return Ok(DeleteMaterialOutcome::HasDonations(count));
    }
    let deleted = conn.execute("DELETE FROM materials WHERE id = ?1", params![id])?;
    if deleted == 0 {
        return Ok(DeleteMaterialOutcome::NotFound);
    }
    Ok(DeleteMaterialOutcome::Deleted)
}

// ── Admins ──────────────────────────────────────────────────────

pub async fn list_admins(pool: &DbPool) -> anyhow::Result<Vec<Admin>> {
    let conn = pool.get()?;
    let mut stmt =
        conn.prepare("SELECT id, name, pin_hash, last_login FROM admins ORDER BY created_at")?;
    let rows = stmt.query_map([], |row| {
        Ok(Admin {
            id: row.get(0)?,
            name: row.get(1)?,
            pin_hash: row.get(2)?,
            last_login: row.get(3)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub async fn create_admin(
    pool: &DbPool,
    id: &str,
    name: &str,
    pin_hash: &str,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO admins (id, name, pin_hash, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![id, name, pin_hash, now],
    )?;
    Ok(())
}

pub async fn touch_last_login(pool: &DbPool, admin_id: &str, now: DateTime<Utc>) -> anyhow::Result<()> {
    let conn = pool.get()?;
    conn.execute(
        "UPDATE admins SET last_login = ?1 WHERE id = ?2",
        params![now, admin_id],
    )?;
    Ok(())
}

// ── Audit log ───────────────────────────────────────────────────

pub async fn insert_audit_log(
    pool: &DbPool,
    id: &str,
    entry: &NewAuditEntry,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO audit_log (id, action_type, admin_id, admin_name, target_type, target_id,
                                old_value, new_value, description, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            id,
            entry.action_type,
            entry.admin_id,
            entry.admin_name,
            entry.target_type,
            entry.target_id,
            entry.old_value.as_ref().map(|v| v.to_string()),
            entry.new_value.as_ref().map(|v| v.to_string()),
            entry.description,
            now,
        ],
    )?;
    Ok(())
}

/// Newest-first page of audit entries plus the exact total count.
pub async fn list_audit_logs(
    pool: &DbPool,
    limit: i64,
    offset: i64,
) -> anyhow::Result<(Vec<AuditLogEntry>, i64)> {
    let conn = pool.get()?;
    let total: i64 = conn.query_row("SELECT COUNT(*) FROM audit_log", [], |row| row.get(0))?;
    let mut stmt = conn.prepare(
        "SELECT id, action_type, admin_id, admin_name, target_type, target_id,
                old_value, new_value, description, created_at
         FROM audit_log ORDER BY created_at DESC, id DESC LIMIT ?1 OFFSET ?2",
    )?;
    let rows = stmt.query_map(params![limit, offset], |row| {
        let old_value: Option<String> = row.get("old_value")?;
        let new_value: Option<String> = row.get("new_value")?;
        Ok(AuditLogEntry {
            id: row.get("id")?,
            action_type: row.get("action_type")?,
            admin_id: row.get("admin_id")?,
            admin_name: row.get("admin_name")?,
            target_type: row.get("target_type")?,
            target_id: row.get("target_id")?,
            old_value: old_value.and_then(|s| serde_json::from_str(&s).ok()),
            new_value: new_value.and_then(|s| serde_json::from_str(&s).ok()),
            description: row.get("description")?,
            created_at: row.get("created_at")?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok((out, total))
}
