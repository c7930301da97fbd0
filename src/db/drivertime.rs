use sqlx::{Pool, Postgres};
use tracing::{info, instrument};

use super::query::{
    Column, ColumnKind, FieldValue, ListOptions, PartialUpdate, build_minimums,
};
use super::{Entity, fetch_one, finish};
use crate::error::AppError;
use crate::models::{BestSectors, DriverTime, NewDriverTime};
use crate::validation::ValidateExt;

pub const COLUMNS: &[Column] = &[
    Column::required("sector1", ColumnKind::Float),
    Column::required("sector2", ColumnKind::Float),
    Column::required("sector3", ColumnKind::Float),
    Column::required("laptime", ColumnKind::Float),
];

const BEST_COLUMNS: &[(&str, &str)] = &[
    ("sector1", "best_sector1"),
    ("sector2", "best_sector2"),
    ("sector3", "best_sector3"),
    ("laptime", "best_laptime"),
];

impl Entity for DriverTime {
    type Id = i64;

    const TABLE: &'static str = "drivertimes";
    const LABEL: &'static str = "Drivertime";
    const UPDATABLE: &'static [Column] = COLUMNS;
    const SORTABLE: &'static [&'static str] = &[
        "id",
        "driver",
        "convention",
        "sector1",
        "sector2",
        "sector3",
        "laptime",
    ];

    fn not_found(id: &i64) -> AppError {
        AppError::DriverTimeNotFound(*id)
    }
}

/// Narrows listings and aggregates to one driver, one convention, or both.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DriverTimeFilter {
    pub driver_id: Option<String>,
    pub convention_id: Option<i64>,
}

impl DriverTimeFilter {
    pub fn driver(mut self, driver_id: &str) -> Self {
        self.driver_id = Some(driver_id.to_string());
        self
    }

    pub fn convention(mut self, convention_id: i64) -> Self {
        self.convention_id = Some(convention_id);
        self
    }

    fn conditions(&self) -> Vec<(&'static str, FieldValue)> {
        let mut conditions = Vec::new();
        if let Some(driver_id) = &self.driver_id {
            conditions.push(("driver", FieldValue::from(driver_id.clone())));
        }
        if let Some(convention_id) = self.convention_id {
            conditions.push(("convention", FieldValue::from(convention_id)));
        }
        conditions
    }
}

#[instrument(skip(pool))]
pub async fn create(pool: &Pool<Postgres>, draft: NewDriverTime) -> Result<DriverTime, AppError> {
    info!("Creating drivertime");
    let draft = draft.validated()?;

    let fields = vec![
        ("driver", FieldValue::from(draft.driver_id)),
        ("convention", FieldValue::from(draft.convention_id)),
        ("sector1", FieldValue::from(draft.sector1)),
        ("sector2", FieldValue::from(draft.sector2)),
        ("sector3", FieldValue::from(draft.sector3)),
        ("laptime", FieldValue::from(draft.laptime)),
    ];

    super::insert::<DriverTime>(pool, fields).await
}

#[instrument(skip(pool))]
pub async fn get(pool: &Pool<Postgres>, id: i64) -> Result<DriverTime, AppError> {
    info!("Fetching drivertime by ID");
    super::get::<DriverTime>(pool, &id).await
}

#[instrument(skip(pool))]
pub async fn list(
    pool: &Pool<Postgres>,
    filter: &DriverTimeFilter,
    options: &ListOptions,
) -> Result<Vec<DriverTime>, AppError> {
    info!("Listing drivertimes");
    super::list::<DriverTime>(pool, filter.conditions(), options).await
}

#[instrument(skip(pool))]
pub async fn update(
    pool: &Pool<Postgres>,
    id: i64,
    changes: &PartialUpdate,
) -> Result<DriverTime, AppError> {
    info!("Updating drivertime");
    super::update::<DriverTime>(pool, &id, changes).await
}

#[instrument(skip(pool))]
pub async fn delete(pool: &Pool<Postgres>, id: i64) -> Result<String, AppError> {
    info!("Deleting drivertime");
    super::delete::<DriverTime>(pool, &id).await
}

/// Minimum of every sector and the lap time. No matching rows gives all `None`.
#[instrument(skip(pool))]
pub async fn best_sectors(
    pool: &Pool<Postgres>,
    filter: &DriverTimeFilter,
) -> Result<BestSectors, AppError> {
    info!("Computing best sectors");
    let statement = build_minimums(DriverTime::TABLE, BEST_COLUMNS, filter.conditions());

    let mut tx = pool.begin().await?;
    let result = fetch_one::<BestSectors>(&mut *tx, &statement).await;
    finish(tx, result).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_conditions_follow_foreign_keys() {
        assert!(DriverTimeFilter::default().conditions().is_empty());

        let conditions = DriverTimeFilter::default()
            .driver("d-1")
            .convention(4)
            .conditions();
        assert_eq!(
            conditions,
            vec![
                ("driver", FieldValue::from("d-1")),
                ("convention", FieldValue::Integer(4)),
            ]
        );
    }
}
