use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

// A reservation of one seat in one class. Never deleted; cancellation flips `active`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Booking {
    pub id: i64,
    pub member_id: i64,
    pub class_id: i64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}
