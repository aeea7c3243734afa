//! End-to-end workflow tests against the storage layer: the donation state
//! machine, the fundraising-ledger invariant, and material bookkeeping.

use chrono::Utc;
use tempfile::TempDir;
use uuid::Uuid;

use buildflow::auth::{self, AdminSession, RegisterOutcome};
use buildflow::db::{
    self, CreateMaterialOutcome, DbPool, DeleteMaterialOutcome, ProcessOutcome,
};
use buildflow::db::models::DonationStatus;
use buildflow::{audit, validation};

async fn setup() -> (TempDir, DbPool) {
    let dir = TempDir::new().expect("tempdir");
    let pool = db::init_pool_at(&dir.path().join("test.db")).expect("pool");
    db::run_migrations(&pool).await.expect("migrations");
    db::ensure_goal(&pool, 1_000_000.0, Utc::now()).await.expect("goal");
    (dir, pool)
}

async fn seed_admin(pool: &DbPool) -> String {
    let id = Uuid::new_v4().to_string();
    // Low cost keeps the suite fast; production hashing uses the default.
    let hash = bcrypt::hash("1234", 4).expect("hash");
    db::create_admin(pool, &id, "María", &hash, Utc::now())
        .await
        .expect("admin");
    id
}

async fn seed_material(pool: &DbPool, name: &str) -> String {
    let id = Uuid::new_v4().to_string();
    let outcome = db::create_material(pool, &id, name, "Bolsas", 100, 0, Utc::now())
        .await
        .expect("material");
    assert_eq!(outcome, CreateMaterialOutcome::Created);
    id
}

async fn seed_donation(pool: &DbPool, amount: f64, material_id: Option<&str>) -> String {
    let id = Uuid::new_v4().to_string();
    db::insert_donation(
        pool,
        &id,
        &Some("Juan Pérez".to_string()),
        false,
        amount,
        &material_id.map(String::from),
        "https://example.com/boleta.jpg",
        Utc::now(),
    )
    .await
    .expect("donation");
    id
}

async fn current_amount(pool: &DbPool) -> f64 {
    db::get_goal(pool)
        .await
        .expect("goal fetch")
        .expect("goal row")
        .current_amount
}

#[tokio::test]
async fn pending_submission_has_no_ledger_effect() {
    let (_dir, pool) = setup().await;
    let id = seed_donation(&pool, 500.0, None).await;

    assert_eq!(current_amount(&pool).await, 0.0);

    let donation = db::get_donation(&pool, &id).await.unwrap().unwrap();
    assert_eq!(donation.status, DonationStatus::Pending);
    assert!(donation.admin_id.is_none());
    assert!(donation.processed_at.is_none());
    assert!(donation.rejection_reason.is_none());
}

#[tokio::test]
async fn approve_updates_ledger_material_and_stamps() {
    let (_dir, pool) = setup().await;
    let admin_id = seed_admin(&pool).await;
    let material_id = seed_material(&pool, "Cemento").await;
    let donation_id = seed_donation(&pool, 500.0, Some(&material_id)).await;

    let outcome = db::approve_donation(&pool, &donation_id, &admin_id, Utc::now())
        .await
        .unwrap();
    assert_eq!(
        outcome,
        ProcessOutcome::Processed {
            amount: 500.0,
            donor_name: Some("Juan Pérez".to_string()),
            material_id: Some(material_id.clone()),
        }
    );

    assert_eq!(current_amount(&pool).await, 500.0);

    // One unit per approved donation, independent of the amount.
    let material = db::get_material(&pool, &material_id).await.unwrap().unwrap();
    assert_eq!(material.quantity_current, 1);

    let donation = db::get_donation(&pool, &donation_id).await.unwrap().unwrap();
    assert_eq!(donation.status, DonationStatus::Approved);
    assert_eq!(donation.admin_id.as_deref(), Some(admin_id.as_str()));
    assert!(donation.processed_at.is_some());
}

#[tokio::test]
async fn approve_is_recorded_in_audit_log() {
    let (_dir, pool) = setup().await;
    let admin_id = seed_admin(&pool).await;
    let donation_id = seed_donation(&pool, 500.0, None).await;

    db::approve_donation(&pool, &donation_id, &admin_id, Utc::now())
        .await
        .unwrap();

    let session = AdminSession {
        admin_id,
        admin_name: "María".to_string(),
    };
    audit::record(
        &pool,
        audit::approve_donation(&session, &donation_id, Some("Juan Pérez"), 500.0),
    )
    .await;

    let (logs, total) = db::list_audit_logs(&pool, 50, 0).await.unwrap();
    assert_eq!(total, 1);
    assert!(logs[0].description.contains("Q500.00"));
    assert!(logs[0].description.contains("Juan Pérez"));
    assert_eq!(logs[0].target_id.as_deref(), Some(donation_id.as_str()));
}

#[tokio::test]
async fn second_approval_is_rejected_without_ledger_change() {
    let (_dir, pool) = setup().await;
    let admin_id = seed_admin(&pool).await;
    let donation_id = seed_donation(&pool, 250.0, None).await;

    let first = db::approve_donation(&pool, &donation_id, &admin_id, Utc::now())
        .await
        .unwrap();
    assert!(matches!(first, ProcessOutcome::Processed { .. }));

    let second = db::approve_donation(&pool, &donation_id, &admin_id, Utc::now())
        .await
        .unwrap();
    assert_eq!(second, ProcessOutcome::AlreadyProcessed);

    let reject = db::reject_donation(&pool, &donation_id, &admin_id, None, Utc::now())
        .await
        .unwrap();
    assert_eq!(reject, ProcessOutcome::AlreadyProcessed);

    assert_eq!(current_amount(&pool).await, 250.0);
}

#[tokio::test]
async fn reject_stores_reason_and_leaves_ledger_untouched() {
    let (_dir, pool) = setup().await;
    let admin_id = seed_admin(&pool).await;
    let material_id = seed_material(&pool, "Arena").await;
    let donation_id = seed_donation(&pool, 900.0, Some(&material_id)).await;

    let outcome = db::reject_donation(
        &pool,
        &donation_id,
        &admin_id,
        Some("comprobante ilegible"),
        Utc::now(),
    )
    .await
    .unwrap();
    assert!(matches!(outcome, ProcessOutcome::Processed { amount, .. } if amount == 900.0));

    assert_eq!(current_amount(&pool).await, 0.0);
    let material = db::get_material(&pool, &material_id).await.unwrap().unwrap();
    assert_eq!(material.quantity_current, 0);

    let donation = db::get_donation(&pool, &donation_id).await.unwrap().unwrap();
    assert_eq!(donation.status, DonationStatus::Rejected);
    assert_eq!(
        donation.rejection_reason.as_deref(),
        Some("comprobante ilegible")
    );
    assert!(donation.processed_at.is_some());

    let approve = db::approve_donation(&pool, &donation_id, &admin_id, Utc::now())
        .await
        .unwrap();
    assert_eq!(approve, ProcessOutcome::AlreadyProcessed);
}

#[tokio::test]
async fn unknown_donation_is_not_found() {
    let (_dir, pool) = setup().await;
    let admin_id = seed_admin(&pool).await;
    let missing = Uuid::new_v4().to_string();

    let outcome = db::approve_donation(&pool, &missing, &admin_id, Utc::now())
        .await
        .unwrap();
    assert_eq!(outcome, ProcessOutcome::NotFound);
}

#[tokio::test]
async fn concurrent_approvals_sum_exactly() {
    let (_dir, pool) = setup().await;
    let admin_id = seed_admin(&pool).await;

    let amounts = [100.0, 200.0, 300.0, 400.0, 500.0, 600.0, 700.0, 800.0];
    let mut ids = Vec::new();
    for amount in amounts {
        ids.push(seed_donation(&pool, amount, None).await);
    }

    let mut handles = Vec::new();
    for id in ids {
        let pool = pool.clone();
        let admin_id = admin_id.clone();
        handles.push(tokio::spawn(async move {
            db::approve_donation(&pool, &id, &admin_id, Utc::now()).await
        }));
    }
    for handle in handles {
        let outcome = handle.await.unwrap().unwrap();
        assert!(matches!(outcome, ProcessOutcome::Processed { .. }));
    }

    assert_eq!(current_amount(&pool).await, amounts.iter().sum::<f64>());
}

#[tokio::test]
async fn racing_approvals_of_one_donation_increment_once() {
    let (_dir, pool) = setup().await;
    let admin_id = seed_admin(&pool).await;
    let donation_id = seed_donation(&pool, 150.0, None).await;

    let mut handles = Vec::new();
    for _ in 0..4 {
        let pool = pool.clone();
        let admin_id = admin_id.clone();
        let donation_id = donation_id.clone();
        handles.push(tokio::spawn(async move {
            db::approve_donation(&pool, &donation_id, &admin_id, Utc::now()).await
        }));
    }

    let mut processed = 0;
    for handle in handles {
        match handle.await.unwrap().unwrap() {
            ProcessOutcome::Processed { .. } => processed += 1,
            ProcessOutcome::AlreadyProcessed => {}
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
    assert_eq!(processed, 1);
    assert_eq!(current_amount(&pool).await, 150.0);
}

#[tokio::test]
async fn manual_donation_applies_immediately() {
    let (_dir, pool) = setup().await;
    let admin_id = seed_admin(&pool).await;
    let material_id = seed_material(&pool, "Block").await;

    let id = Uuid::new_v4().to_string();
    db::insert_manual_donation(
        &pool,
        &id,
        &Some("Ana López".to_string()),
        false,
        1200.0,
        &Some(material_id.clone()),
        "Entrada manual",
        &admin_id,
        Utc::now(),
    )
    .await
    .unwrap();

    assert_eq!(current_amount(&pool).await, 1200.0);
    let material = db::get_material(&pool, &material_id).await.unwrap().unwrap();
    assert_eq!(material.quantity_current, 1);

    let donation = db::get_donation(&pool, &id).await.unwrap().unwrap();
    assert_eq!(donation.status, DonationStatus::Approved);
    assert!(donation.processed_at.is_some());
}

#[tokio::test]
async fn recompute_restores_corrupted_ledger() {
    let (_dir, pool) = setup().await;
    let admin_id = seed_admin(&pool).await;
    for amount in [100.0, 250.5] {
        let id = seed_donation(&pool, amount, None).await;
        db::approve_donation(&pool, &id, &admin_id, Utc::now())
            .await
            .unwrap();
    }
    // A rejected donation must not count.
    let rejected = seed_donation(&pool, 999.0, None).await;
    db::reject_donation(&pool, &rejected, &admin_id, None, Utc::now())
        .await
        .unwrap();

    // Corrupt the stored total directly, then reconcile.
    let conn = pool.get().unwrap();
    conn.execute("UPDATE fundraising_goal SET current_amount = 77777", [])
        .unwrap();
    drop(conn);
    assert_eq!(current_amount(&pool).await, 77777.0);

    let total = db::recompute_goal_total(&pool, Utc::now()).await.unwrap();
    assert_eq!(total, 350.5);
    assert_eq!(current_amount(&pool).await, 350.5);
}

#[tokio::test]
async fn material_delete_blocked_while_referenced() {
    let (_dir, pool) = setup().await;
    let referenced = seed_material(&pool, "Hierro").await;
    let unreferenced = seed_material(&pool, "Lámina").await;
    seed_donation(&pool, 50.0, Some(&referenced)).await;

    let outcome = db::delete_material(&pool, &referenced).await.unwrap();
    assert_eq!(outcome, DeleteMaterialOutcome::HasDonations(1));
    assert!(db::get_material(&pool, &referenced).await.unwrap().is_some());

    let outcome = db::delete_material(&pool, &unreferenced).await.unwrap();
    assert_eq!(outcome, DeleteMaterialOutcome::Deleted);
    assert!(db::get_material(&pool, &unreferenced).await.unwrap().is_none());

    let outcome = db::delete_material(&pool, &Uuid::new_v4().to_string())
        .await
        .unwrap();
    assert_eq!(outcome, DeleteMaterialOutcome::NotFound);
}

#[tokio::test]
async fn material_names_are_unique_case_insensitively() {
    let (_dir, pool) = setup().await;
    seed_material(&pool, "Cemento").await;

    let outcome = db::create_material(
        &pool,
        &Uuid::new_v4().to_string(),
        "CEMENTO",
        "Bolsas",
        50,
        0,
        Utc::now(),
    )
    .await
    .unwrap();
    assert_eq!(outcome, CreateMaterialOutcome::DuplicateName);
}

#[tokio::test]
async fn pending_queue_is_oldest_first() {
    let (_dir, pool) = setup().await;
    let first = Uuid::new_v4().to_string();
    let second = Uuid::new_v4().to_string();
    let base = Utc::now();
    db::insert_donation(&pool, &first, &None, true, 10.0, &None, "url", base)
        .await
        .unwrap();
    db::insert_donation(
        &pool,
        &second,
        &None,
        true,
        20.0,
        &None,
        "url",
        base + chrono::Duration::seconds(5),
    )
    .await
    .unwrap();

    let pending = db::list_pending_donations(&pool).await.unwrap();
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0].id, first);
    assert_eq!(pending[1].id, second);
}

#[tokio::test]
async fn register_admin_enforces_pin_rules() {
    let (_dir, pool) = setup().await;

    let outcome = auth::register_admin(&pool, "María", "4321").await.unwrap();
    assert!(matches!(outcome, RegisterOutcome::Created(_)));

    // The same PIN would make first-match login ambiguous.
    let outcome = auth::register_admin(&pool, "Pedro", "4321").await.unwrap();
    assert_eq!(outcome, RegisterOutcome::PinInUse);

    let outcome = auth::register_admin(&pool, "Pedro", "12ab").await.unwrap();
    assert_eq!(outcome, RegisterOutcome::InvalidPin);

    assert_eq!(db::list_admins(&pool).await.unwrap().len(), 1);
}

#[tokio::test]
async fn sanitized_input_is_stored() {
    let (_dir, pool) = setup().await;
    let raw = "  <b>Juan</b> & María  ";
    let cleaned = validation::sanitize_string(raw);
    assert_eq!(cleaned, "Juan  María");

    let id = Uuid::new_v4().to_string();
    db::insert_donation(
        &pool,
        &id,
        &Some(cleaned.clone()),
        false,
        100.0,
        &None,
        "url",
        Utc::now(),
    )
    .await
    .unwrap();
    let donation = db::get_donation(&pool, &id).await.unwrap().unwrap();
    assert_eq!(donation.donor_name.as_deref(), Some("Juan  María"));
}
