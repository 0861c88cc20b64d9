use anyhow::Result;
use hoop_academy::api::create_routes;
use hoop_academy::auth::AuthService;
use hoop_academy::config::{run_migrations, AppConfig, DatabaseConfig, DatabaseSeeder};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let db_config = DatabaseConfig::from_env()?;
    let pool = db_config.create_pool().await?;
    run_migrations(&pool).await?;

    if let Some((email, password)) = config.bootstrap_admin() {
        let auth_service = AuthService::new(pool.clone(), &config.jwt_secret);
        if auth_service.ensure_admin(email, password).await? {
            info!(%email, "bootstrap admin created");
        }
    } else if config.is_development() {
        warn!("ADMIN_EMAIL / ADMIN_PASSWORD not set, no admin account will be bootstrapped");
    }

    if config.seed_demo_data {
        DatabaseSeeder::new(pool.clone()).seed_all().await?;
    }

    let app = create_routes(pool, &config.jwt_secret);

    let address = config.server_address();
    let listener = TcpListener::bind(&address).await?;
    info!(environment = %config.environment, "Hoop Academy server starting on http://{}", address);
    info!("Health check available at http://{}/health", address);

    axum::serve(listener, app).await?;

    Ok(())
}
