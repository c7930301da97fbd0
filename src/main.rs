use laptime_tracker::backend::Backend;
use laptime_tracker::env::{DbConfig, load_environment};
use laptime_tracker::telemetry::init_tracing;
use laptime_tracker::{Error, init_rocket};
use tracing::{error, info};

#[rocket::main]
async fn main() -> Result<(), Error> {
    let loaded = load_environment();
    init_tracing();
    let environment = loaded.inspect_err(|e| error!("Failed to load environment: {:#}", e))?;
    environment.log();

    let config = DbConfig::from_env().inspect_err(|e| error!("Invalid configuration: {}", e))?;

    let backend = Backend::connect(&config)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;

    match backend.migrate().await {
        Ok(()) => info!("Migrations completed successfully"),
        Err(e) => {
            error!("Failed to run migrations: {}", e);
            return Err(e.into());
        }
    }

    let rocket = init_rocket(backend.clone()).await.launch().await;
    backend.close().await;
    rocket?;

    Ok(())
}
