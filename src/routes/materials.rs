//! Materials registry: admin CRUD over the construction-supply checklist.

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json as AxumJson},
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AdminSession;
use crate::db::{self, CreateMaterialOutcome, DeleteMaterialOutcome, UpdateMaterialOutcome};
use crate::validation::{self, VALID_UNITS};
use crate::{audit, AppState};

#[derive(Deserialize)]
pub struct CreateMaterialRequest {
    pub name: Option<String>,
    pub unit: Option<String>,
    pub quantity_needed: Option<i64>,
    pub quantity_current: Option<i64>,
}

#[derive(Deserialize)]
pub struct UpdateMaterialRequest {
    pub quantity_current: Option<i64>,
    pub quantity_needed: Option<i64>,
}

pub async fn list_materials(
    State(state): State<AppState>,
    _session: AdminSession,
) -> impl IntoResponse {
    match db::list_materials(&state.db).await {
        Ok(materials) => AxumJson(serde_json::json!({
            "success": true,
            "materials": materials,
            "units": VALID_UNITS,
        }))
        .into_response(),
        Err(e) => {
            tracing::error!("Material list failed: {:#}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error al obtener materiales.").into_response()
        }
    }
}

pub async fn create_material(
    State(state): State<AppState>,
    _session: AdminSession,
    Json(req): Json<CreateMaterialRequest>,
) -> impl IntoResponse {
    let name = req.name.as_deref().map(str::trim).unwrap_or_default().to_string();
    if !validation::is_valid_material_name(&name) {
        return (StatusCode::BAD_REQUEST, "Nombre inválido (2-100 caracteres).").into_response();
    }

    let unit = req.unit.unwrap_or_default();
    if !validation::is_valid_unit(&unit) {
        return (StatusCode::BAD_REQUEST, "Unidad inválida.").into_response();
    }

    let Some(quantity_needed) = req.quantity_needed.filter(|q| validation::is_valid_quantity_needed(*q))
    else {
        return (
            StatusCode::BAD_REQUEST,
            "Cantidad necesaria inválida (1-100,000).",
        )
            .into_response();
    };

    let quantity_current = req.quantity_current.unwrap_or(0);
    if !validation::is_valid_quantity_current(quantity_current) {
        return (
            StatusCode::BAD_REQUEST,
            "Cantidad actual inválida (0-100,000).",
        )
            .into_response();
    }

    let id = Uuid::new_v4().to_string();
    match db::create_material(
        &state.db,
        &id,
        &name,
        &unit,
        quantity_needed,
        quantity_current,
        Utc::now(),
    )
    .await
    {
        Ok(CreateMaterialOutcome::Created) => {
            let material = db::get_material(&state.db, &id).await.ok().flatten();
            (
                StatusCode::CREATED,
                AxumJson(serde_json::json!({
                    "success": true,
                    "message": format!("Material \"{}\" creado exitosamente.", name),
                    "material": material,
                })),
            )
                .into_response()
        }
        Ok(CreateMaterialOutcome::DuplicateName) => (
            StatusCode::CONFLICT,
            "Ya existe un material con ese nombre.",
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Material create failed: {:#}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error al crear el material.").into_response()
        }
    }
}

/// Partial update of the quantity fields. Changes to quantity_current are
/// audited; quantity_needed edits are not.
pub async fn update_material(
    State(state): State<AppState>,
    Path(id): Path<String>,
    session: AdminSession,
    Json(req): Json<UpdateMaterialRequest>,
) -> impl IntoResponse {
    if !validation::is_valid_uuid(&id) {
        return (StatusCode::BAD_REQUEST, "ID de material inválido.").into_response();
    }

    if req.quantity_current.is_none() && req.quantity_needed.is_none() {
        return (StatusCode::BAD_REQUEST, "No hay datos para actualizar.").into_response();
    }
    if let Some(qty) = req.quantity_current {
        if !validation::is_valid_quantity_current(qty) {
            return (StatusCode::BAD_REQUEST, "Cantidad actual inválida.").into_response();
        }
    }
    if let Some(qty) = req.quantity_needed {
        if !validation::is_valid_quantity_needed(qty) {
            return (StatusCode::BAD_REQUEST, "Cantidad necesaria inválida.").into_response();
        }
    }

    match db::update_material_quantities(
        &state.db,
        &id,
        req.quantity_current,
        req.quantity_needed,
        Utc::now(),
    )
    .await
    {
        Ok(UpdateMaterialOutcome::Updated {
            name,
            old_current,
            new_current,
        }) => {
            if old_current != new_current {
                audit::record_detached(
                    &state.db,
                    audit::update_material(&session, &id, &name, old_current, new_current),
                );
            }
            AxumJson(serde_json::json!({
                "success": true,
                "message": format!("Material \"{}\" actualizado.", name),
                "material_id": id,
            }))
            .into_response()
        }
        Ok(UpdateMaterialOutcome::NotFound) => {
            (StatusCode::NOT_FOUND, "Material no encontrado.").into_response()
        }
        Err(e) => {
            tracing::error!("Material update failed: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error al actualizar el material.",
            )
                .into_response()
        }
    }
}

/// Deletion is blocked while donations reference the material; the response
/// reports the exact blocking count.
pub async fn delete_material(
    State(state): State<AppState>,
    Path(id): Path<String>,
    _session: AdminSession,
) -> impl IntoResponse {
    if !validation::is_valid_uuid(&id) {
        return (StatusCode::BAD_REQUEST, "ID de material inválido.").into_response();
    }

    match db::delete_material(&state.db, &id).await {
        Ok(DeleteMaterialOutcome::Deleted) => AxumJson(serde_json::json!({
            "success": true,
            "message": "Material eliminado.",
        }))
        .into_response(),
        Ok(DeleteMaterialOutcome::HasDonations(count)) => (
            StatusCode::CONFLICT,
            AxumJson(serde_json::json!({
                "error": "No se puede eliminar: el material tiene donaciones asociadas.",
                "donations": count,
            })),
        )
            .into_response(),
        Ok(DeleteMaterialOutcome::NotFound) => {
            (StatusCode::NOT_FOUND, "Material no encontrado.").into_response()
        }
        Err(e) => {
            tracing::error!("Material delete failed: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error al eliminar el material.",
            )
                .into_response()
        }
    }
}
