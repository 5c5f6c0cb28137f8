use serde::Deserialize;
use std::env;

// Top-level configuration container
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub booking: BookingConfig,
}

// Application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
}

// Database settings
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
}

// Booking engine settings
#[derive(Debug, Clone, Deserialize)]
pub struct BookingConfig {
    // Minimum lead time for a new class, in minutes. 0 only requires a future time.
    pub min_lead_minutes: i64,
    // How many times a lost seat-counter race is retried before giving up.
    pub admission_retries: u32,
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            app: AppConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "8000".to_string())
                    .parse()
                    .expect("PORT must be a valid number"),
                environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
                rust_log: env::var("RUST_LOG")
                    .unwrap_or_else(|_| "gym_class=debug,tower_http=debug".to_string()),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
                pool_size: env::var("DB_POOL_SIZE")
                    .unwrap_or_else(|_| "20".to_string())
                    .parse()
                    .expect("DB_POOL_SIZE must be a valid number"),
            },
            booking: BookingConfig {
                min_lead_minutes: env::var("BOOKING_MIN_LEAD_MINUTES")
                    .unwrap_or_else(|_| "0".to_string())
                    .parse()
                    .expect("BOOKING_MIN_LEAD_MINUTES must be a valid number"),
                admission_retries: env::var("BOOKING_ADMISSION_RETRIES")
                    .unwrap_or_else(|_| "3".to_string())
                    .parse()
                    .expect("BOOKING_ADMISSION_RETRIES must be a valid number"),
            },
        }
    }
}
