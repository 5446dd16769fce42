//! Account service entry point.
//!
//! Loads configuration from a TOML file, connects to the database, runs
//! migrations, seeds a default admin account when the database is empty
//! and serves the HTTP API until a shutdown signal arrives.

use std::path::PathBuf;
use std::sync::Arc;

use sea_orm_migration::MigratorTrait;
use tracing::{error, info};

use account_service::config::{default_config_path, AppConfig};
use account_service::domain::account::{AccountRepositoryInterface, NewAccount};
use account_service::infrastructure::crypto::jwt::JwtConfig;
use account_service::infrastructure::database::migrator::Migrator;
use account_service::infrastructure::database::repositories::SeaOrmAccountRepository;
use account_service::infrastructure::database::{init_database, DatabaseConfig};
use account_service::interfaces::http::router::{create_api_router, AppState};
use account_service::shared::shutdown::ShutdownSignal;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ── Load configuration ─────────────────────────────────────
    let config_path = std::env::var("ACCOUNT_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| default_config_path());
    let app_cfg = match AppConfig::load(&config_path) {
        Ok(cfg) => {
            init_tracing(&cfg);
            info!("Configuration loaded from {}", config_path.display());
            cfg
        }
        Err(e) => {
            let cfg = AppConfig::default();
            init_tracing(&cfg);
            error!("Failed to load config: {}. Using defaults.", e);
            cfg
        }
    };

    info!("Starting account service...");

    // ── Database ───────────────────────────────────────────────
    let db_config = DatabaseConfig {
        url: app_cfg.database.url.clone(),
    };
    let db = match init_database(&db_config).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            return Err(e.into());
        }
    };

    info!("Running database migrations...");
    if let Err(e) = Migrator::up(&db, None).await {
        error!("Failed to run migrations: {}", e);
        return Err(e.into());
    }
    info!("Migrations completed");

    let accounts: Arc<dyn AccountRepositoryInterface> =
        Arc::new(SeaOrmAccountRepository::new(db));

    // Create default admin account if the database is empty
    create_default_admin(accounts.as_ref(), &app_cfg).await;

    let jwt_config = JwtConfig {
        secret: app_cfg.security.jwt_secret.clone(),
        expiration_hours: app_cfg.security.jwt_expiration_hours,
        issuer: "account-service".to_string(),
    };
    info!(
        "JWT configured with {}h token expiration",
        jwt_config.expiration_hours
    );

    let app = create_api_router(AppState {
        accounts,
        jwt_config,
    });

    // ── Serve ──────────────────────────────────────────────────
    let addr = app_cfg.server.address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    let shutdown = ShutdownSignal::new();
    shutdown.listen_for_signals();

    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { signal.wait().await })
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Create the default admin account (with an admin profile) if no
/// accounts exist in the database.
async fn create_default_admin(accounts: &dyn AccountRepositoryInterface, cfg: &AppConfig) {
    match accounts.count_accounts().await {
        Ok(0) => {
            info!("Creating default admin account...");
            let dto = NewAccount {
                username: cfg.admin.username.clone(),
                email: cfg.admin.email.clone(),
                password: cfg.admin.password.clone(),
                role: cfg.admin.role.clone(),
            };
            match accounts.register_account(dto).await {
                Ok(account) => {
                    info!("Default admin created: {}", account.email);
                    info!("Please change the admin password immediately!");
                }
                Err(e) => error!("Failed to create admin account: {}", e),
            }
        }
        Ok(_) => {}
        Err(e) => error!("Failed to count accounts: {}", e),
    }
}

/// Initialize tracing (logging) from the application config.
fn init_tracing(config: &AppConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    match config.logging.format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }
}
