use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use super::error_response;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/bookings", get(get_bookings))
        .route("/bookings", post(create_booking))
        .route("/bookings/{booking_id}", delete(cancel_booking))
}

/* ---------- BOOKINGS ---------- */

// POST /api/bookings
#[derive(Debug, Deserialize)]
struct CreateBookingRequest {
    pub member_id: i64,
    pub class_id: i64,
}

async fn create_booking(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if req.member_id <= 0 || req.class_id <= 0 {
        return Err((
            StatusCode::BAD_REQUEST,
            "member_id and class_id must be > 0".to_string(),
        ));
    }

    let booking = state
        .bookings
        .create_booking(req.member_id, req.class_id)
        .await
        .map_err(error_response)?;

    Ok((StatusCode::CREATED, Json(booking)))
}

// GET /api/bookings
async fn get_bookings(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let bookings = state.bookings.list_bookings().await.map_err(error_response)?;
    Ok((StatusCode::OK, Json(bookings)))
}

// DELETE /api/bookings/{booking_id}
async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<i64>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let cancelled = state
        .bookings
        .cancel_booking(booking_id)
        .await
        .map_err(error_response)?;

    if cancelled {
        Ok((
            StatusCode::OK,
            Json(serde_json::json!({"message": "booking cancelled"})),
        ))
    } else {
        Err((
            StatusCode::NOT_FOUND,
            format!("booking {} not found or already cancelled", booking_id),
        ))
    }
}
