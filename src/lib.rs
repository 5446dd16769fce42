//! # Account Service
//!
//! User registration and authenticated profile retrieval backend.
//!
//! ## Architecture
//!
//! - **domain**: core models and the account repository trait
//! - **infrastructure**: SeaORM persistence, migrations and crypto (bcrypt, JWT)
//! - **interfaces**: REST API (Axum) with Swagger documentation
//! - **config**: TOML application configuration
//! - **shared**: error types and shutdown plumbing

pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod shared;

pub use config::{default_config_path, AppConfig};

// Re-export database types for easy access
pub use infrastructure::database::{init_database, DatabaseConfig};

// Re-export API router
pub use interfaces::http::router::{create_api_router, AppState};
