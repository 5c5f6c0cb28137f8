use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use super::error_response;
use crate::models::PlanType;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/members", get(get_members))
        .route("/members", post(create_member))
        .route("/members/{member_id}/report", get(get_member_report))
}

// POST /api/members
#[derive(Debug, Deserialize)]
struct CreateMemberRequest {
    pub name: String,
    pub plan: PlanType,
}

async fn create_member(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateMemberRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let member = state
        .bookings
        .create_member(&req.name, req.plan)
        .await
        .map_err(error_response)?;

    Ok((StatusCode::CREATED, Json(member)))
}

// GET /api/members
async fn get_members(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let members = state.bookings.list_members().await.map_err(error_response)?;
    Ok((StatusCode::OK, Json(members)))
}

// GET /api/members/{member_id}/report
async fn get_member_report(
    State(state): State<Arc<AppState>>,
    Path(member_id): Path<i64>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let report = state
        .bookings
        .member_report(member_id)
        .await
        .map_err(error_response)?;

    Ok((StatusCode::OK, Json(report)))
}
