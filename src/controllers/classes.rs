use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error_response;
use crate::models::ClassSession;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/classes", get(get_classes))
        .route("/classes", post(create_class))
}

// POST /api/classes
#[derive(Debug, Deserialize)]
struct CreateClassRequest {
    pub class_type: String,
    pub scheduled_at: DateTime<Utc>,
    pub capacity_max: i32,
}

#[derive(Debug, Serialize)]
struct ClassResponse {
    pub id: i64,
    pub class_type: String,
    pub scheduled_at: DateTime<Utc>,
    pub capacity_max: i32,
    pub occupied_seats: i32,
    pub seats_available: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<ClassSession> for ClassResponse {
    fn from(class: ClassSession) -> Self {
        let seats_available = class.seats_available();
        ClassResponse {
            id: class.id,
            class_type: class.class_type,
            scheduled_at: class.scheduled_at,
            capacity_max: class.capacity_max,
            occupied_seats: class.occupied_seats,
            seats_available,
            active: class.active,
            created_at: class.created_at,
        }
    }
}

async fn create_class(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateClassRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let class = state
        .bookings
        .create_class(&req.class_type, req.scheduled_at, req.capacity_max)
        .await
        .map_err(error_response)?;

    Ok((StatusCode::CREATED, Json(ClassResponse::from(class))))
}

// GET /api/classes
async fn get_classes(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let classes = state.bookings.list_classes().await.map_err(error_response)?;
    let payload: Vec<ClassResponse> = classes.into_iter().map(ClassResponse::from).collect();
    Ok((StatusCode::OK, Json(payload)))
}
