pub mod convention;
pub mod driver;
pub mod drivertime;
pub mod query;

use std::fmt;

use sqlx::postgres::{PgArguments, PgConnection, PgRow};
use sqlx::query::QueryAs;
use sqlx::{FromRow, Pool, Postgres, Transaction};
use tracing::{debug, instrument, warn};

use crate::error::AppError;
use query::{
    Column, FieldValue, ListOptions, PartialUpdate, Statement, build_delete, build_find,
    build_insert, build_list, build_update,
};

/// A row-backed record living in its own table with an `id` primary key.
pub trait Entity: for<'r> FromRow<'r, PgRow> + Send + Unpin {
    type Id: Clone + fmt::Display + fmt::Debug + Into<FieldValue> + Send + Sync;

    const TABLE: &'static str;
    const LABEL: &'static str;
    /// Columns a partial update may touch, in the order they are assigned.
    const UPDATABLE: &'static [Column];
    const SORTABLE: &'static [&'static str];

    fn not_found(id: &Self::Id) -> AppError;
}

fn bind_values<'q, O>(
    mut query: QueryAs<'q, Postgres, O, PgArguments>,
    values: &'q [FieldValue],
) -> QueryAs<'q, Postgres, O, PgArguments> {
    for value in values {
        query = match value {
            FieldValue::Text(text) => query.bind(text.as_deref()),
            FieldValue::Float(number) => query.bind(*number),
            FieldValue::Integer(number) => query.bind(*number),
            FieldValue::Date(date) => query.bind(*date),
        };
    }
    query
}

pub(crate) async fn fetch_optional<O>(
    conn: &mut PgConnection,
    statement: &Statement,
) -> Result<Option<O>, AppError>
where
    O: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    debug!(sql = %statement.sql, params = statement.values.len(), "Executing statement");
    let row = bind_values(sqlx::query_as::<_, O>(&statement.sql), &statement.values)
        .fetch_optional(conn)
        .await?;
    Ok(row)
}

pub(crate) async fn fetch_one<O>(conn: &mut PgConnection, statement: &Statement) -> Result<O, AppError>
where
    O: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    debug!(sql = %statement.sql, params = statement.values.len(), "Executing statement");
    let row = bind_values(sqlx::query_as::<_, O>(&statement.sql), &statement.values)
        .fetch_one(conn)
        .await?;
    Ok(row)
}

pub(crate) async fn fetch_all<O>(conn: &mut PgConnection, statement: &Statement) -> Result<Vec<O>, AppError>
where
    O: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    debug!(sql = %statement.sql, params = statement.values.len(), "Executing statement");
    let rows = bind_values(sqlx::query_as::<_, O>(&statement.sql), &statement.values)
        .fetch_all(conn)
        .await?;
    Ok(rows)
}

/// Commits on success. On any error the transaction is rolled back explicitly
/// and the original error is returned unchanged.
pub(crate) async fn finish<T>(
    tx: Transaction<'_, Postgres>,
    result: Result<T, AppError>,
) -> Result<T, AppError> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_error) = tx.rollback().await {
                warn!(error = %rollback_error, "Failed to roll back transaction");
            }
            Err(err)
        }
    }
}

/// Existence guard: the row with `id`, or the entity's not-found error.
#[instrument(skip(conn))]
pub async fn find_by_id<E: Entity>(conn: &mut PgConnection, id: &E::Id) -> Result<E, AppError> {
    let statement = build_find(E::TABLE, id.clone().into());
    fetch_optional::<E>(conn, &statement)
        .await?
        .ok_or_else(|| E::not_found(id))
}

pub(crate) async fn get<E: Entity>(pool: &Pool<Postgres>, id: &E::Id) -> Result<E, AppError> {
    let mut tx = pool.begin().await?;
    let result = find_by_id::<E>(&mut *tx, id).await;
    finish(tx, result).await
}

pub(crate) async fn list<E: Entity>(
    pool: &Pool<Postgres>,
    filters: Vec<(&'static str, FieldValue)>,
    options: &ListOptions,
) -> Result<Vec<E>, AppError> {
    let statement = build_list(E::TABLE, filters, options, E::SORTABLE)?;
    let mut tx = pool.begin().await?;
    let result = fetch_all::<E>(&mut *tx, &statement).await;
    finish(tx, result).await
}

pub(crate) async fn insert<E: Entity>(
    pool: &Pool<Postgres>,
    fields: Vec<(&'static str, FieldValue)>,
) -> Result<E, AppError> {
    let statement = build_insert(E::TABLE, fields);
    let mut tx = pool.begin().await?;
    let result = fetch_one::<E>(&mut *tx, &statement).await;
    finish(tx, result).await
}

/// Validates and compiles the update before touching the database, then runs
/// the existence check and the update inside one transaction.
pub(crate) async fn update<E: Entity>(
    pool: &Pool<Postgres>,
    id: &E::Id,
    changes: &PartialUpdate,
) -> Result<E, AppError> {
    let statement = build_update(E::TABLE, id.clone().into(), changes, E::UPDATABLE)?;

    let mut tx = pool.begin().await?;
    let result = async {
        find_by_id::<E>(&mut *tx, id).await?;
        fetch_optional::<E>(&mut *tx, &statement)
            .await?
            .ok_or_else(|| E::not_found(id))
    }
    .await;
    finish(tx, result).await
}

pub(crate) async fn delete<E: Entity>(pool: &Pool<Postgres>, id: &E::Id) -> Result<String, AppError> {
    let statement = build_delete(E::TABLE, id.clone().into());

    let mut tx = pool.begin().await?;
    let result = async {
        find_by_id::<E>(&mut *tx, id).await?;
        fetch_optional::<E>(&mut *tx, &statement)
            .await?
            .ok_or_else(|| E::not_found(id))?;
        Ok::<_, AppError>(format!("{} deleted with id: {}", E::LABEL, id))
    }
    .await;
    finish(tx, result).await
}
