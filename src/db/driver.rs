use sqlx::{Pool, Postgres};
use tracing::{info, instrument};
use uuid::Uuid;

use super::Entity;
use super::query::{Column, ColumnKind, FieldValue, ListOptions, PartialUpdate};
use crate::error::AppError;
use crate::models::{Driver, NewDriver};
use crate::validation::ValidateExt;

pub const COLUMNS: &[Column] = &[
    Column::required("name", ColumnKind::Text),
    Column::optional("email", ColumnKind::Text),
];

impl Entity for Driver {
    type Id = String;

    const TABLE: &'static str = "drivers";
    const LABEL: &'static str = "Driver";
    const UPDATABLE: &'static [Column] = COLUMNS;
    const SORTABLE: &'static [&'static str] = &["id", "name", "email", "created"];

    fn not_found(id: &String) -> AppError {
        AppError::DriverNotFound(id.clone())
    }
}

#[instrument(skip(pool))]
pub async fn create(pool: &Pool<Postgres>, draft: NewDriver) -> Result<Driver, AppError> {
    info!("Creating driver");
    let draft = draft.validated()?;

    let id = draft.id.unwrap_or_else(|| Uuid::new_v4().to_string());
    let mut fields = vec![("id", FieldValue::from(id)), ("name", FieldValue::from(draft.name))];
    if let Some(email) = draft.email {
        fields.push(("email", FieldValue::from(email)));
    }

    super::insert::<Driver>(pool, fields).await
}

#[instrument(skip(pool))]
pub async fn get(pool: &Pool<Postgres>, id: &str) -> Result<Driver, AppError> {
    info!("Fetching driver by ID");
    super::get::<Driver>(pool, &id.to_string()).await
}

#[instrument(skip(pool))]
pub async fn list(pool: &Pool<Postgres>, options: &ListOptions) -> Result<Vec<Driver>, AppError> {
    info!("Listing drivers");
    super::list::<Driver>(pool, Vec::new(), options).await
}

#[instrument(skip(pool))]
pub async fn update(
    pool: &Pool<Postgres>,
    id: &str,
    changes: &PartialUpdate,
) -> Result<Driver, AppError> {
    info!("Updating driver");
    super::update::<Driver>(pool, &id.to_string(), changes).await
}

#[instrument(skip(pool))]
pub async fn delete(pool: &Pool<Postgres>, id: &str) -> Result<String, AppError> {
    info!("Deleting driver");
    super::delete::<Driver>(pool, &id.to_string()).await
}
