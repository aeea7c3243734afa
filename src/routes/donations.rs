//! Public donation endpoints: donor submission and the open listing.

use axum::{
    extract::{Json, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json as AxumJson},
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::db::models::DonationStatus;
use crate::validation;
use crate::AppState;

const DEFAULT_LIST_LIMIT: i64 = 20;
const MAX_LIST_LIMIT: i64 = 100;

#[derive(Deserialize)]
pub struct SubmitDonationRequest {
    pub donor_name: Option<String>,
    #[serde(default)]
    pub is_anonymous: bool,
    pub amount: Option<f64>,
    pub material_id: Option<String>,
    pub proof_image_url: Option<String>,
}

#[derive(Deserialize)]
pub struct ListParams {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

/// Unauthenticated submission. Creates a pending donation with no ledger
/// effect; an admin reviews it later.
pub async fn submit_donation(
    State(state): State<AppState>,
    Json(req): Json<SubmitDonationRequest>,
) -> impl IntoResponse {
    let donor_name = validation::sanitize_opt(req.donor_name.as_deref());
    if !req.is_anonymous && donor_name.is_none() {
        return (
            StatusCode::BAD_REQUEST,
            "El nombre del donante es requerido si no es anónimo",
        )
            .into_response();
    }

    let amount = match req.amount {
        Some(a) if validation::is_valid_amount(a) => a,
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                "El monto debe ser entre Q1 y Q1,000,000",
            )
                .into_response();
        }
    };

    let proof = req
        .proof_image_url
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let Some(proof) = proof else {
        return (
            StatusCode::BAD_REQUEST,
            "El comprobante de depósito es requerido",
        )
            .into_response();
    };

    let material_id = match req.material_id.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(mid) => {
            if !validation::is_valid_uuid(mid) {
                return (StatusCode::BAD_REQUEST, "ID de material inválido").into_response();
            }
            match crate::db::get_material(&state.db, mid).await {
                Ok(Some(_)) => Some(mid.to_string()),
                Ok(None) => {
                    return (StatusCode::BAD_REQUEST, "El material seleccionado no existe")
                        .into_response();
                }
                Err(e) => {
                    tracing::error!("Material lookup failed: {:#}", e);
                    return (StatusCode::INTERNAL_SERVER_ERROR, "Error interno del servidor")
                        .into_response();
                }
            }
        }
        None => None,
    };

    let id = Uuid::new_v4().to_string();
    let donor_name = if req.is_anonymous { None } else { donor_name };
    if let Err(e) = crate::db::insert_donation(
        &state.db,
        &id,
        &donor_name,
        req.is_anonymous,
        amount,
        &material_id,
        proof,
        Utc::now(),
    )
    .await
    {
        tracing::error!("Donation insert failed: {:#}", e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Error al registrar la donación. Intenta de nuevo.",
        )
            .into_response();
    }

    (
        StatusCode::CREATED,
        AxumJson(serde_json::json!({
            "success": true,
            "message": "Donación registrada exitosamente",
            "donation_id": id,
        })),
    )
        .into_response()
}

/// Public listing, newest first. Unknown status values are ignored rather
/// than rejected.
pub async fn list_donations(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> impl IntoResponse {
    let status = params
        .status
        .as_deref()
        .and_then(DonationStatus::parse);
    let limit = params
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);

    match crate::db::list_donations(&state.db, status, limit).await {
        Ok(donations) => {
            AxumJson(serde_json::json!({ "donations": donations })).into_response()
        }
        Err(e) => {
            tracing::error!("Donation list failed: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error al obtener las donaciones",
            )
                .into_response()
        }
    }
}
