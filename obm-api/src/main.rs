//! obm-api - OpenBookManager catalog service
//!
//! JSON API for managing a personal book catalog: books, authors, a
//! two-level category taxonomy with per-category tag sequences, a wishlist,
//! and the ISBN scan-import staging workflow.

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use obm_api::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting obm-api (OpenBookManager catalog service)");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = obm_common::config::Config::resolve()?;
    info!("Database: {}", config.database_path.display());
    info!("Covers directory: {}", config.covers_dir.display());

    std::fs::create_dir_all(&config.covers_dir)?;

    let db_pool = obm_common::db::init_database(&config.database_path).await?;
    info!("Database connection established");

    // First-run bootstrap: create the admin account if configured
    match std::env::var("OBM_ADMIN_PASSWORD") {
        Ok(password) if !password.trim().is_empty() => {
            if obm_api::db::sessions::ensure_admin_user(&db_pool, &password).await? {
                info!("Created initial admin user");
            }
        }
        _ => {
            if obm_api::db::sessions::count_users(&db_pool).await? == 0 {
                warn!("No users exist and OBM_ADMIN_PASSWORD is not set; login will be impossible");
            }
        }
    }

    let listen_addr = config.listen_addr;
    let state = AppState::new(db_pool, config);
    let app = obm_api::build_router(state);

    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    info!("Listening on http://{}", listen_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
