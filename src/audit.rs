//! Append-only audit trail for privileged actions.
//!
//! Recording is a secondary effect: it runs after the authoritative state
//! change has committed, on a detached task, and a write failure is logged
//! but never surfaced to the caller. `record_detached` returns `()` so the
//! non-propagation guarantee is structural, not a convention.

use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::AdminSession;
use crate::db::models::AuditAction;
use crate::db::{self, DbPool};

#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub action_type: AuditAction,
    pub admin_id: Option<String>,
    pub admin_name: Option<String>,
    pub target_type: String,
    pub target_id: Option<String>,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
    pub description: String,
}

fn format_quetzales(amount: f64) -> String {
    format!("Q{:.2}", amount)
}

fn donor_label(donor_name: Option<&str>) -> &str {
    donor_name.unwrap_or("Anónimo")
}

pub fn approve_donation(
    admin: &AdminSession,
    donation_id: &str,
    donor_name: Option<&str>,
    amount: f64,
) -> NewAuditEntry {
    NewAuditEntry {
        action_type: AuditAction::ApproveDonation,
        admin_id: Some(admin.admin_id.clone()),
        admin_name: Some(admin.admin_name.clone()),
        target_type: "donation".to_string(),
        target_id: Some(donation_id.to_string()),
        old_value: Some(json!({ "status": "pending" })),
        new_value: Some(json!({ "status": "approved", "amount": amount })),
        description: format!(
            "Aprobó donación de {} de {}",
            format_quetzales(amount),
            donor_label(donor_name)
        ),
    }
}

pub fn reject_donation(
    admin: &AdminSession,
    donation_id: &str,
    donor_name: Option<&str>,
    amount: f64,
    reason: Option<&str>,
) -> NewAuditEntry {
    let mut description = format!(
        "Rechazó donación de {} de {}",
        format_quetzales(amount),
        donor_label(donor_name)
    );
    if let Some(reason) = reason {
        description.push_str(&format!(" - Razón: {}", reason));
    }
    NewAuditEntry {
        action_type: AuditAction::RejectDonation,
        admin_id: Some(admin.admin_id.clone()),
        admin_name: Some(admin.admin_name.clone()),
        target_type: "donation".to_string(),
        target_id: Some(donation_id.to_string()),
        old_value: Some(json!({ "status": "pending" })),
        new_value: Some(json!({ "status": "rejected", "reason": reason })),
        description,
    }
}

pub fn manual_donation(
    admin: &AdminSession,
    donation_id: &str,
    donor_name: Option<&str>,
    amount: f64,
) -> NewAuditEntry {
    NewAuditEntry {
        action_type: AuditAction::ManualDonation,
        admin_id: Some(admin.admin_id.clone()),
        admin_name: Some(admin.admin_name.clone()),
        target_type: "donation".to_string(),
        target_id: Some(donation_id.to_string()),
        old_value: None,
        new_value: Some(json!({ "amount": amount, "donor_name": donor_label(donor_name) })),
        description: format!(
            "Agregó donación manual de {} de {}",
            format_quetzales(amount),
            donor_label(donor_name)
        ),
    }
}

pub fn update_material(
    admin: &AdminSession,
    material_id: &str,
    material_name: &str,
    old_quantity: i64,
    new_quantity: i64,
) -> NewAuditEntry {
    NewAuditEntry {
        action_type: AuditAction::UpdateMaterial,
        admin_id: Some(admin.admin_id.clone()),
        admin_name: Some(admin.admin_name.clone()),
        target_type: "material".to_string(),
        target_id: Some(material_id.to_string()),
        old_value: Some(json!({ "quantity_current": old_quantity })),
        new_value: Some(json!({ "quantity_current": new_quantity })),
        description: format!(
            "Actualizó {}: {} → {}",
            material_name, old_quantity, new_quantity
        ),
    }
}

/// Write one audit entry. Failures are logged, never returned.
pub async fn record(pool: &DbPool, entry: NewAuditEntry) {
    let id = Uuid::new_v4().to_string();
    if let Err(e) = db::insert_audit_log(pool, &id, &entry, chrono::Utc::now()).await {
        tracing::warn!(
            action = entry.action_type.as_str(),
            "failed to write audit log entry: {:#}",
            e
        );
    }
}

/// Fire-and-forget variant used by request handlers.
pub fn record_detached(pool: &DbPool, entry: NewAuditEntry) {
    let pool = pool.clone();
    tokio::spawn(async move {
        record(&pool, entry).await;
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> AdminSession {
        AdminSession {
            admin_id: "admin-1".to_string(),
            admin_name: "María".to_string(),
        }
    }

    #[test]
    fn approve_entry_embeds_formatted_amount() {
        let entry = approve_donation(&session(), "d-1", Some("Juan Pérez"), 500.0);
        assert_eq!(entry.action_type, AuditAction::ApproveDonation);
        assert!(entry.description.contains("Q500.00"));
        assert!(entry.description.contains("Juan Pérez"));
        assert_eq!(entry.old_value, Some(json!({ "status": "pending" })));
    }

    #[test]
    fn anonymous_donor_falls_back_to_label() {
        let entry = manual_donation(&session(), "d-2", None, 75.5);
        assert!(entry.description.contains("Anónimo"));
        assert!(entry.description.contains("Q75.50"));
    }

    #[test]
    fn reject_entry_appends_reason_when_present() {
        let entry = reject_donation(&session(), "d-3", None, 10.0, Some("comprobante ilegible"));
        assert!(entry.description.ends_with("Razón: comprobante ilegible"));
        let entry = reject_donation(&session(), "d-3", None, 10.0, None);
        assert!(!entry.description.contains("Razón"));
    }
}
