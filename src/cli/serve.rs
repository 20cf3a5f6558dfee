use tracing::info;

use crate::api;
use crate::cli::commands::ServeArgs;
use crate::config::Settings;
use crate::errors::AstraError;

pub async fn handle_serve(args: ServeArgs) -> Result<(), AstraError> {
    let mut settings = Settings::from_env()?;
    if let Some(bind) = args.bind {
        settings.bind_addr = bind;
    }
    if let Some(db) = args.db {
        settings.db_path = db;
    }
    if let Some(workers) = args.workers {
        settings.max_concurrent_scans = workers;
    }
    settings.validate()?;

    info!(db = %settings.db_path, workers = settings.max_concurrent_scans, "Starting API server");

    let state = api::create_app_state(&settings)?;
    let app = api::build_router(state);

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr).await?;
    info!("Listening on {}", settings.bind_addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| AstraError::Internal(format!("Server error: {}", e)))?;

    Ok(())
}
