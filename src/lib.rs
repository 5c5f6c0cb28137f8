pub mod config;
pub mod controllers;
pub mod database;
pub mod models;
pub mod services;

use std::sync::Arc;

use crate::services::BookingService;

// Shared state for the whole application
#[derive(Clone)]
pub struct AppState {
    pub db: database::Database,
    pub config: config::Config,
    pub bookings: BookingService,
}

impl AppState {
    pub async fn new(config: config::Config) -> anyhow::Result<Arc<Self>> {
        let db = database::Database::connect(&config.database.url, config.database.pool_size).await?;

        db.run_migrations().await?;

        let bookings = BookingService::new(db.clone(), config.booking.clone());

        Ok(Arc::new(Self {
            db,
            config,
            bookings,
        }))
    }
}
