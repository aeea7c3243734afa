//! Public campaign snapshot: fundraising progress, the materials checklist,
//! and the latest approved donations for the donor wall. The realtime layer
//! simply re-fetches this endpoint when notified.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json as AxumJson},
};

use crate::db::models::DonationStatus;
use crate::AppState;

const DONOR_WALL_LIMIT: i64 = 20;
const DEFAULT_GOAL: f64 = 1_000_000.0;

pub async fn dashboard_snapshot(State(state): State<AppState>) -> impl IntoResponse {
    let goal = match crate::db::get_goal(&state.db).await {
        Ok(goal) => goal,
        Err(e) => {
            tracing::error!("Goal fetch failed: {:#}", e);
            return dashboard_error();
        }
    };
    let materials = match crate::db::list_materials(&state.db).await {
        Ok(materials) => materials,
        Err(e) => {
            tracing::error!("Materials fetch failed: {:#}", e);
            return dashboard_error();
        }
    };
    let donations = match crate::db::list_donations(
        &state.db,
        Some(DonationStatus::Approved),
        DONOR_WALL_LIMIT,
    )
    .await
    {
        Ok(donations) => donations,
        Err(e) => {
            tracing::error!("Donations fetch failed: {:#}", e);
            return dashboard_error();
        }
    };

    let (current_amount, goal_amount) = goal
        .map(|g| (g.current_amount, g.goal_amount))
        .unwrap_or((0.0, DEFAULT_GOAL));

    AxumJson(serde_json::json!({
        "fundraising": {
            "current_amount": current_amount,
            "goal_amount": goal_amount,
        },
        "materials": materials,
        "donations": donations,
    }))
    .into_response()
}

fn dashboard_error() -> axum::response::Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Error al conectar con el servidor. Por favor, intenta de nuevo.",
    )
        .into_response()
}
