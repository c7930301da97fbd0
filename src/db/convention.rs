use sqlx::{Pool, Postgres};
use tracing::{info, instrument};

use super::Entity;
use super::query::{Column, ColumnKind, FieldValue, ListOptions, PartialUpdate};
use crate::error::AppError;
use crate::models::{Convention, NewConvention};
use crate::validation::ValidateExt;

pub const COLUMNS: &[Column] = &[
    Column::required("name", ColumnKind::Text),
    Column::optional("location", ColumnKind::Text),
    Column::optional("date", ColumnKind::Date),
];

impl Entity for Convention {
    type Id = i64;

    const TABLE: &'static str = "conventions";
    const LABEL: &'static str = "Convention";
    const UPDATABLE: &'static [Column] = COLUMNS;
    const SORTABLE: &'static [&'static str] = &["id", "name", "location", "date"];

    fn not_found(id: &i64) -> AppError {
        AppError::ConventionNotFound(*id)
    }
}

#[instrument(skip(pool))]
pub async fn create(pool: &Pool<Postgres>, draft: NewConvention) -> Result<Convention, AppError> {
    info!("Creating convention");
    let draft = draft.validated()?;

    let mut fields = vec![("name", FieldValue::from(draft.name))];
    if let Some(location) = draft.location {
        fields.push(("location", FieldValue::from(location)));
    }
    if let Some(date) = draft.date {
        fields.push(("date", FieldValue::from(date)));
    }

    super::insert::<Convention>(pool, fields).await
}

#[instrument(skip(pool))]
pub async fn get(pool: &Pool<Postgres>, id: i64) -> Result<Convention, AppError> {
    info!("Fetching convention by ID");
    super::get::<Convention>(pool, &id).await
}

#[instrument(skip(pool))]
pub async fn list(
    pool: &Pool<Postgres>,
    options: &ListOptions,
) -> Result<Vec<Convention>, AppError> {
    info!("Listing conventions");
    super::list::<Convention>(pool, Vec::new(), options).await
}

#[instrument(skip(pool))]
pub async fn update(
    pool: &Pool<Postgres>,
    id: i64,
    changes: &PartialUpdate,
) -> Result<Convention, AppError> {
    info!("Updating convention");
    super::update::<Convention>(pool, &id, changes).await
}

#[instrument(skip(pool))]
pub async fn delete(pool: &Pool<Postgres>, id: i64) -> Result<String, AppError> {
    info!("Deleting convention");
    super::delete::<Convention>(pool, &id).await
}
