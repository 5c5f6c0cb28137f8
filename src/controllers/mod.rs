pub mod bookings;
pub mod classes;
pub mod members;

use axum::http::StatusCode;
use axum::Router;
use std::sync::Arc;

use crate::services::BookingError;

pub fn routes() -> Router<Arc<crate::AppState>> {
    Router::new()
        .merge(members::routes())
        .merge(classes::routes())
        .merge(bookings::routes())
}

/* ---------- helpers ---------- */

// Maps engine rejections to transport statuses.
pub(crate) fn error_response(err: BookingError) -> (StatusCode, String) {
    match &err {
        BookingError::MemberNotFound(_) | BookingError::ClassNotFound(_) => {
            (StatusCode::NOT_FOUND, err.to_string())
        }
        BookingError::ClassFull { .. }
        | BookingError::QuotaExceeded { .. }
        | BookingError::DuplicateBooking { .. }
        | BookingError::ConcurrencyConflict => (StatusCode::CONFLICT, err.to_string()),
        BookingError::InvalidInput(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        BookingError::Storage(e) => {
            tracing::error!("storage error: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal storage error".to_string(),
            )
        }
    }
}
