#[macro_use]
extern crate rocket;

pub mod api;
pub mod backend;
pub mod db;
pub mod env;
pub mod error;
pub mod models;
pub mod telemetry;
pub mod validation;
#[cfg(test)]
mod test;

use api::{
    api_create_convention, api_create_driver, api_create_drivertime, api_delete_convention,
    api_delete_driver, api_delete_drivertime, api_get_best_sectors, api_get_convention,
    api_get_conventions, api_get_driver, api_get_drivers, api_get_drivertime, api_get_drivertimes,
    api_update_convention, api_update_driver, api_update_drivertime, health,
};
use backend::Backend;
use env::ConfigError;
use error::AppError;
use rocket::{Build, Rocket};
use telemetry::TelemetryFairing;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Anyhow(#[from] anyhow::Error),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Application error: {0}")]
    App(#[from] AppError),
    #[error("{0}")]
    Rocket(Box<rocket::Error>),
}

impl From<rocket::Error> for Error {
    fn from(value: rocket::Error) -> Self {
        Error::Rocket(Box::new(value))
    }
}

pub async fn init_rocket(backend: Backend) -> Rocket<Build> {
    info!("Starting laptime tracker");

    rocket::build()
        .manage(backend)
        .mount(
            "/api",
            routes![
                api_get_drivers,
                api_get_driver,
                api_create_driver,
                api_update_driver,
                api_delete_driver,
                api_get_conventions,
                api_get_convention,
                api_create_convention,
                api_update_convention,
                api_delete_convention,
                api_get_drivertimes,
                api_get_best_sectors,
                api_get_drivertime,
                api_create_drivertime,
                api_update_drivertime,
                api_delete_drivertime,
                health,
            ],
        )
        .attach(TelemetryFairing)
}
