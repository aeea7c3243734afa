use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::ToSql;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle status of a donation. Pending is the only non-terminal state;
/// approve/reject transitions are one-way.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DonationStatus {
    Pending,
    Approved,
    Rejected,
}

impl DonationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DonationStatus::Pending => "pending",
            DonationStatus::Approved => "approved",
            DonationStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(DonationStatus::Pending),
            "approved" => Some(DonationStatus::Approved),
            "rejected" => Some(DonationStatus::Rejected),
            _ => None,
        }
    }
}

impl FromSql for DonationStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        DonationStatus::parse(s)
            .ok_or_else(|| FromSqlError::Other(format!("unknown donation status: {}", s).into()))
    }
}

impl ToSql for DonationStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

/// Privileged actions recorded in the audit log.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    ApproveDonation,
    RejectDonation,
    ManualDonation,
    UpdateMaterial,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::ApproveDonation => "approve_donation",
            AuditAction::RejectDonation => "reject_donation",
            AuditAction::ManualDonation => "manual_donation",
            AuditAction::UpdateMaterial => "update_material",
        }
    }
}

impl FromSql for AuditAction {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "approve_donation" => Ok(AuditAction::ApproveDonation),
            "reject_donation" => Ok(AuditAction::RejectDonation),
            "manual_donation" => Ok(AuditAction::ManualDonation),
            "update_material" => Ok(AuditAction::UpdateMaterial),
            other => Err(FromSqlError::Other(
                format!("unknown audit action: {}", other).into(),
            )),
        }
    }
}

impl ToSql for AuditAction {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Donation {
    pub id: String,
    pub donor_name: Option<String>,
    pub is_anonymous: bool,
    pub amount: f64,
    pub material_id: Option<String>,
    pub proof_image_url: String,
    pub status: DonationStatus,
    pub rejection_reason: Option<String>,
    pub admin_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

/// Donation row flattened with its material name, as returned by list queries.
#[derive(Serialize, Debug, Clone)]
pub struct DonationSummary {
    pub id: String,
    pub donor_name: Option<String>,
    pub is_anonymous: bool,
    pub amount: f64,
    pub proof_image_url: String,
    pub status: DonationStatus,
    pub created_at: DateTime<Utc>,
    pub material_name: Option<String>,
}

/// Pending-queue entry with enough material context for the review panel.
#[derive(Serialize, Debug, Clone)]
pub struct PendingDonation {
    pub id: String,
    pub donor_name: Option<String>,
    pub is_anonymous: bool,
    pub amount: f64,
    pub material_id: Option<String>,
    pub proof_image_url: String,
    pub status: DonationStatus,
    pub created_at: DateTime<Utc>,
    pub material_name: Option<String>,
    pub material_unit: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Material {
    pub id: String,
    pub name: String,
    pub unit: String,
    pub quantity_needed: i64,
    pub quantity_current: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FundraisingGoal {
    pub id: String,
    pub goal_amount: f64,
    pub current_amount: f64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Debug, Clone)]
pub struct Admin {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub pin_hash: String,
    pub last_login: Option<DateTime<Utc>>,
}

#[derive(Serialize, Debug, Clone)]
pub struct AuditLogEntry {
    pub id: String,
    pub action_type: AuditAction,
    pub admin_id: Option<String>,
    pub admin_name: Option<String>,
    pub target_type: String,
    pub target_id: Option<String>,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_strings() {
        for s in [
            DonationStatus::Pending,
            DonationStatus::Approved,
            DonationStatus::Rejected,
        ] {
            assert_eq!(DonationStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(DonationStatus::parse("deleted"), None);
    }

    #[test]
    fn audit_action_serializes_snake_case() {
        let v = serde_json::to_value(AuditAction::ApproveDonation).unwrap();
        assert_eq!(v, serde_json::json!("approve_donation"));
    }
}
