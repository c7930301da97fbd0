use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{Pool, Postgres};
use tracing::info;

use crate::db::drivertime::DriverTimeFilter;
use crate::db::query::{ListOptions, PartialUpdate};
use crate::db::{convention, driver, drivertime};
use crate::env::DbConfig;
use crate::error::AppError;
use crate::models::{
    BestSectors, Convention, Driver, DriverTime, NewConvention, NewDriver, NewDriverTime,
};

/// Entry point for every operation on the timing database.
///
/// Each call checks one connection out of the pool for the duration of a
/// single transaction; nothing is held between calls.
#[derive(Clone)]
pub struct Backend {
    pool: Pool<Postgres>,
}

impl Backend {
    pub async fn connect(config: &DbConfig) -> Result<Self, AppError> {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.database);

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;

        info!(host = %config.host, database = %config.database, "Connected to database");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("Disconnected from database");
    }

    // Drivers

    pub async fn list_drivers(&self, options: &ListOptions) -> Result<Vec<Driver>, AppError> {
        info!(?options, "Get all drivers was called");
        driver::list(&self.pool, options).await
    }

    pub async fn get_driver(&self, id: &str) -> Result<Driver, AppError> {
        info!(driver_id = %id, "Get driver was called");
        driver::get(&self.pool, id).await
    }

    pub async fn create_driver(&self, draft: NewDriver) -> Result<Driver, AppError> {
        info!(name = %draft.name, "Post driver was called");
        driver::create(&self.pool, draft).await
    }

    pub async fn update_driver(
        &self,
        id: &str,
        changes: &PartialUpdate,
    ) -> Result<Driver, AppError> {
        info!(driver_id = %id, "Update driver was called");
        driver::update(&self.pool, id, changes).await
    }

    pub async fn delete_driver(&self, id: &str) -> Result<String, AppError> {
        info!(driver_id = %id, "Delete driver was called");
        driver::delete(&self.pool, id).await
    }

    // Conventions

    pub async fn list_conventions(
        &self,
        options: &ListOptions,
    ) -> Result<Vec<Convention>, AppError> {
        info!(?options, "Get all conventions was called");
        convention::list(&self.pool, options).await
    }

    pub async fn get_convention(&self, id: i64) -> Result<Convention, AppError> {
        info!(convention_id = id, "Get convention was called");
        convention::get(&self.pool, id).await
    }

    pub async fn create_convention(&self, draft: NewConvention) -> Result<Convention, AppError> {
        info!(name = %draft.name, "Post convention was called");
        convention::create(&self.pool, draft).await
    }

    pub async fn update_convention(
        &self,
        id: i64,
        changes: &PartialUpdate,
    ) -> Result<Convention, AppError> {
        info!(convention_id = id, "Update convention was called");
        convention::update(&self.pool, id, changes).await
    }

    pub async fn delete_convention(&self, id: i64) -> Result<String, AppError> {
        info!(convention_id = id, "Delete convention was called");
        convention::delete(&self.pool, id).await
    }

    // Drivertimes

    pub async fn list_drivertimes(
        &self,
        filter: &DriverTimeFilter,
        options: &ListOptions,
    ) -> Result<Vec<DriverTime>, AppError> {
        info!(?filter, ?options, "Get all drivertimes was called");
        drivertime::list(&self.pool, filter, options).await
    }

    pub async fn get_drivertime(&self, id: i64) -> Result<DriverTime, AppError> {
        info!(drivertime_id = id, "Get drivertime was called");
        drivertime::get(&self.pool, id).await
    }

    pub async fn create_drivertime(&self, draft: NewDriverTime) -> Result<DriverTime, AppError> {
        info!(
            driver_id = %draft.driver_id,
            convention_id = draft.convention_id,
            "Post drivertime was called"
        );
        drivertime::create(&self.pool, draft).await
    }

    pub async fn update_drivertime(
        &self,
        id: i64,
        changes: &PartialUpdate,
    ) -> Result<DriverTime, AppError> {
        info!(drivertime_id = id, "Update drivertime was called");
        drivertime::update(&self.pool, id, changes).await
    }

    pub async fn delete_drivertime(&self, id: i64) -> Result<String, AppError> {
        info!(drivertime_id = id, "Delete drivertime was called");
        drivertime::delete(&self.pool, id).await
    }

    pub async fn best_sectors(&self, filter: &DriverTimeFilter) -> Result<BestSectors, AppError> {
        info!(?filter, "Best sectors was called");
        drivertime::best_sectors(&self.pool, filter).await
    }
}
