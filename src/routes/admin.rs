//! PIN login, session lifecycle, and the donation review workflow.

use axum::{
    body::Bytes,
    extract::{Json, Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Json as AxumJson},
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{self, AdminSession};
use crate::db::{self, ProcessOutcome};
use crate::rate_limit::Decision;
use crate::validation;
use crate::{audit, AppState};

#[derive(Deserialize)]
pub struct LoginRequest {
    pub pin: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct RejectRequest {
    pub reason: Option<String>,
}

#[derive(Deserialize)]
pub struct ManualDonationRequest {
    pub donor_name: Option<String>,
    #[serde(default)]
    pub is_anonymous: bool,
    pub amount: Option<f64>,
    pub material_id: Option<String>,
    pub notes: Option<String>,
}

/// Best-effort client address for failed-login accounting. Trusts the first
/// hop of x-forwarded-for when present, like the deployments this sits
/// behind.
fn client_ip(headers: &HeaderMap) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|h| h.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    if let Some(real_ip) = headers.get("x-real-ip").and_then(|h| h.to_str().ok()) {
        return real_ip.to_string();
    }
    "unknown".to_string()
}

pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> impl IntoResponse {
    let ip = client_ip(&headers);

    // A blocked attempt is rejected before credentials are examined and does
    // not consume a further attempt.
    if let Decision::Blocked { retry_after } = state.rate_limiter.check(&ip) {
        let seconds = retry_after.as_secs_f64().ceil() as u64;
        return (
            StatusCode::TOO_MANY_REQUESTS,
            AxumJson(serde_json::json!({
                "error": format!("Demasiados intentos fallidos. Espere {} segundos.", seconds),
                "cooldown": seconds,
            })),
        )
            .into_response();
    }

    let pin = req.pin.unwrap_or_default();
    if !auth::is_valid_pin(&pin) {
        state.rate_limiter.record_failure(&ip);
        return (
            StatusCode::BAD_REQUEST,
            AxumJson(serde_json::json!({
                "error": "PIN inválido. Debe ser de 4 a 6 dígitos.",
            })),
        )
            .into_response();
    }

    let admins = match db::list_admins(&state.db).await {
        Ok(admins) => admins,
        Err(e) => {
            tracing::error!("Admin lookup failed: {:#}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error del servidor. Intente de nuevo.",
            )
                .into_response();
        }
    };
    if admins.is_empty() {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "No hay administradores configurados.",
        )
            .into_response();
    }

    // First match wins; PINs are unique by construction (enforced at
    // registration).
    let matched = admins
        .iter()
        .find(|admin| auth::verify_pin(&pin, &admin.pin_hash));

    let Some(admin) = matched else {
        state.rate_limiter.record_failure(&ip);
        let attempts_remaining = state.rate_limiter.attempts_remaining(&ip);
        return (
            StatusCode::UNAUTHORIZED,
            AxumJson(serde_json::json!({
                "error": "PIN incorrecto.",
                "attemptsRemaining": attempts_remaining,
            })),
        )
            .into_response();
    };

    state.rate_limiter.clear(&ip);

    let token = match auth::create_session_token(&admin.id, &admin.name) {
        Ok(token) => token,
        Err(e) => {
            tracing::error!("Session token creation failed: {:#}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error del servidor. Intente de nuevo.",
            )
                .into_response();
        }
    };

    if let Err(e) = db::touch_last_login(&state.db, &admin.id, Utc::now()).await {
        tracing::warn!("Failed to record last login: {:#}", e);
    }

    let cookie = auth::build_session_cookie(&token);
    let mut response = AxumJson(serde_json::json!({
        "success": true,
        "message": format!("¡Bienvenido/a, {}!", admin.name),
        "admin": { "id": admin.id, "name": admin.name },
    }))
    .into_response();
    response.headers_mut().insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&cookie).expect("valid cookie"),
    );
    response
}

pub async fn logout() -> impl IntoResponse {
    let cookie = auth::clear_session_cookie();
    let mut response = AxumJson(serde_json::json!({
        "success": true,
        "message": "Sesión cerrada exitosamente.",
    }))
    .into_response();
    response.headers_mut().insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&cookie).expect("valid cookie"),
    );
    response
}

/// Review queue, oldest first.
pub async fn list_pending(
    State(state): State<AppState>,
    _session: AdminSession,
) -> impl IntoResponse {
    match db::list_pending_donations(&state.db).await {
        Ok(donations) => AxumJson(serde_json::json!({
            "success": true,
            "count": donations.len(),
            "donations": donations,
        }))
        .into_response(),
        Err(e) => {
            tracing::error!("Pending list failed: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error al obtener donaciones pendientes.",
            )
                .into_response()
        }
    }
}

pub async fn approve_donation(
    State(state): State<AppState>,
    Path(id): Path<String>,
    session: AdminSession,
) -> impl IntoResponse {
    if !validation::is_valid_uuid(&id) {
        return (StatusCode::BAD_REQUEST, "ID de donación inválido.").into_response();
    }

    match db::approve_donation(&state.db, &id, &session.admin_id, Utc::now()).await {
        Ok(ProcessOutcome::Processed {
            amount, donor_name, ..
        }) => {
            audit::record_detached(
                &state.db,
                audit::approve_donation(&session, &id, donor_name.as_deref(), amount),
            );
            AxumJson(serde_json::json!({
                "success": true,
                "message": "¡Donación aprobada exitosamente!",
                "donation_id": id,
                "amount": amount,
            }))
            .into_response()
        }
        Ok(ProcessOutcome::NotFound) => {
            (StatusCode::NOT_FOUND, "Donación no encontrada.").into_response()
        }
        Ok(ProcessOutcome::AlreadyProcessed) => {
            (StatusCode::BAD_REQUEST, "Esta donación ya fue procesada.").into_response()
        }
        Err(e) => {
            tracing::error!("Approve failed for {}: {:#}", id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error al aprobar la donación.",
            )
                .into_response()
        }
    }
}

pub async fn reject_donation(
    State(state): State<AppState>,
    Path(id): Path<String>,
    session: AdminSession,
    body: Bytes,
) -> impl IntoResponse {
    if !validation::is_valid_uuid(&id) {
        return (StatusCode::BAD_REQUEST, "ID de donación inválido.").into_response();
    }

    // The body is optional; an unparseable one is treated as empty.
    let req: RejectRequest = serde_json::from_slice(&body).unwrap_or_default();
    let reason = req.reason.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(|s| {
        s.chars()
            .take(validation::MAX_REASON_LEN)
            .collect::<String>()
    });

    match db::reject_donation(&state.db, &id, &session.admin_id, reason.as_deref(), Utc::now())
        .await
    {
        Ok(ProcessOutcome::Processed {
            amount, donor_name, ..
        }) => {
            audit::record_detached(
                &state.db,
                audit::reject_donation(
                    &session,
                    &id,
                    donor_name.as_deref(),
                    amount,
                    reason.as_deref(),
                ),
            );
            AxumJson(serde_json::json!({
                "success": true,
                "message": "Donación rechazada.",
                "donation_id": id,
            }))
            .into_response()
        }
        Ok(ProcessOutcome::NotFound) => {
            (StatusCode::NOT_FOUND, "Donación no encontrada.").into_response()
        }
        Ok(ProcessOutcome::AlreadyProcessed) => {
            (StatusCode::BAD_REQUEST, "Esta donación ya fue procesada.").into_response()
        }
        Err(e) => {
            tracing::error!("Reject failed for {}: {:#}", id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error al rechazar la donación.",
            )
                .into_response()
        }
    }
}

/// Admin-entered donation, approved from the start. Same validation as the
/// public submission; applies the ledger and material effects in one step.
pub async fn create_manual_donation(
    State(state): State<AppState>,
    session: AdminSession,
    Json(req): Json<ManualDonationRequest>,
) -> impl IntoResponse {
    let amount = match req.amount {
        Some(a) if validation::is_valid_amount(a) => a,
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                "El monto debe ser entre Q1 y Q1,000,000.",
            )
                .into_response();
        }
    };

    let donor_name = validation::sanitize_opt(req.donor_name.as_deref());
    if !req.is_anonymous && donor_name.is_none() {
        return (
            StatusCode::BAD_REQUEST,
            "El nombre del donante es requerido si no es anónimo.",
        )
            .into_response();
    }

    let material_id = match req.material_id.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(mid) => {
            if !validation::is_valid_uuid(mid) {
                return (StatusCode::BAD_REQUEST, "ID de material inválido.").into_response();
            }
            match db::get_material(&state.db, mid).await {
                Ok(Some(_)) => Some(mid.to_string()),
                Ok(None) => {
                    return (StatusCode::BAD_REQUEST, "El material seleccionado no existe.")
                        .into_response();
                }
                Err(e) => {
                    tracing::error!("Material lookup failed: {:#}", e);
                    return (StatusCode::INTERNAL_SERVER_ERROR, "Error interno del servidor.")
                        .into_response();
                }
            }
        }
        None => None,
    };

    let proof = match validation::sanitize_opt(req.notes.as_deref()) {
        Some(notes) => format!("Manual: {}", notes.chars().take(200).collect::<String>()),
        None => "Entrada manual".to_string(),
    };

    let id = Uuid::new_v4().to_string();
    let donor_name = if req.is_anonymous { None } else { donor_name };
    if let Err(e) = db::insert_manual_donation(
        &state.db,
        &id,
        &donor_name,
        req.is_anonymous,
        amount,
        &material_id,
        &proof,
        &session.admin_id,
        Utc::now(),
    )
    .await
    {
        tracing::error!("Manual donation insert failed: {:#}", e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Error al crear la donación.",
        )
            .into_response();
    }

    audit::record_detached(
        &state.db,
        audit::manual_donation(&session, &id, donor_name.as_deref(), amount),
    );

    (
        StatusCode::CREATED,
        AxumJson(serde_json::json!({
            "success": true,
            "message": "¡Donación agregada exitosamente!",
            "donation_id": id,
        })),
    )
        .into_response()
}
