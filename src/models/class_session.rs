use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ClassSession {
    pub id: i64,
    pub class_type: String, // Cross, Funcional, Pilates, etc.
    pub scheduled_at: DateTime<Utc>,
    pub capacity_max: i32,
    pub occupied_seats: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl ClassSession {
    pub fn has_available_seats(&self) -> bool {
        self.occupied_seats < self.capacity_max
    }

    pub fn seats_available(&self) -> i32 {
        self.capacity_max - self.occupied_seats
    }
}
