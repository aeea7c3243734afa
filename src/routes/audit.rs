//! Paginated audit-log listing for the admin panel.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json as AxumJson},
};
use serde::Deserialize;

use crate::auth::AdminSession;
use crate::db;
use crate::AppState;

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 100;

#[derive(Deserialize)]
pub struct AuditListParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn list_audit_logs(
    State(state): State<AppState>,
    _session: AdminSession,
    Query(params): Query<AuditListParams>,
) -> impl IntoResponse {
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = params.offset.unwrap_or(0).max(0);

    match db::list_audit_logs(&state.db, limit, offset).await {
        Ok((logs, total)) => AxumJson(serde_json::json!({
            "success": true,
            "logs": logs,
            "total": total,
            "limit": limit,
            "offset": offset,
        }))
        .into_response(),
        Err(e) => {
            tracing::error!("Audit list failed: {:#}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error al obtener el historial.").into_response()
        }
    }
}
