use rocket::FromForm;
use rocket::State;
use rocket::http::Status;
use rocket::http::uri::Origin;
use rocket::response::status::Custom;
use rocket::serde::json::Json;

use crate::backend::Backend;
use crate::db::drivertime::DriverTimeFilter;
use crate::db::query::{ListOptions, PartialUpdate, parse_date, parse_float, parse_integer};
use crate::db::{convention, driver, drivertime};
use crate::error::AppError;
use crate::models::{
    BestSectors, Convention, Driver, DriverTime, NewConvention, NewDriver, NewDriverTime,
};
use crate::validation::{optional, required};

#[derive(FromForm, Debug)]
pub struct ListParams {
    sort_by: Option<String>,
    order: Option<String>,
    limit: Option<String>,
}

impl ListParams {
    fn options(&self) -> Result<ListOptions, AppError> {
        ListOptions::parse(
            self.sort_by.as_deref(),
            self.order.as_deref(),
            self.limit.as_deref(),
        )
    }
}

#[derive(FromForm, Debug)]
pub struct DriverTimeListParams {
    driver_id: Option<String>,
    convention_id: Option<String>,
    sort_by: Option<String>,
    order: Option<String>,
    limit: Option<String>,
}

#[derive(FromForm, Debug)]
pub struct DriverTimeFilterParams {
    driver_id: Option<String>,
    convention_id: Option<String>,
}

fn filter_from(
    driver_id: Option<&str>,
    convention_id: Option<&str>,
) -> Result<DriverTimeFilter, AppError> {
    let mut filter = DriverTimeFilter::default();
    if let Some(driver_id) = optional(driver_id) {
        filter = filter.driver(driver_id);
    }
    if let Some(raw) = optional(convention_id) {
        filter = filter.convention(parse_integer("convention_id", raw)?);
    }
    Ok(filter)
}

/// Every `(name, value)` pair of the query string, percent-decoded, in request order.
fn query_pairs(uri: &Origin<'_>) -> Vec<(String, String)> {
    uri.query()
        .map(|query| {
            query
                .segments()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect()
        })
        .unwrap_or_default()
}

#[get("/health")]
pub fn health() -> &'static str {
    "OK"
}

// Drivers

#[get("/drivers?<params..>")]
pub async fn api_get_drivers(
    params: ListParams,
    backend: &State<Backend>,
) -> Result<Json<Vec<Driver>>, AppError> {
    let options = params.options()?;
    Ok(Json(backend.list_drivers(&options).await?))
}

#[get("/driver/<id>")]
pub async fn api_get_driver(id: &str, backend: &State<Backend>) -> Result<Json<Driver>, AppError> {
    Ok(Json(backend.get_driver(id).await?))
}

#[post("/driver?<name>&<email>&<id>")]
pub async fn api_create_driver(
    name: Option<&str>,
    email: Option<&str>,
    id: Option<&str>,
    backend: &State<Backend>,
) -> Result<Custom<Json<Driver>>, AppError> {
    let mut draft = NewDriver::new(required("name", name)?);
    if let Some(email) = optional(email) {
        draft = draft.with_email(email);
    }
    if let Some(id) = optional(id) {
        draft = draft.with_id(id);
    }

    let created = backend.create_driver(draft).await?;
    Ok(Custom(Status::Created, Json(created)))
}

#[put("/driver/<id>/update")]
pub async fn api_update_driver(
    id: &str,
    uri: &Origin<'_>,
    backend: &State<Backend>,
) -> Result<Json<Driver>, AppError> {
    let changes = PartialUpdate::from_params(driver::COLUMNS, query_pairs(uri))?;
    Ok(Json(backend.update_driver(id, &changes).await?))
}

#[delete("/driver/<id>/delete")]
pub async fn api_delete_driver(id: &str, backend: &State<Backend>) -> Result<String, AppError> {
    backend.delete_driver(id).await
}

// Conventions

#[get("/conventions?<params..>")]
pub async fn api_get_conventions(
    params: ListParams,
    backend: &State<Backend>,
) -> Result<Json<Vec<Convention>>, AppError> {
    let options = params.options()?;
    Ok(Json(backend.list_conventions(&options).await?))
}

#[get("/convention/<id>")]
pub async fn api_get_convention(
    id: &str,
    backend: &State<Backend>,
) -> Result<Json<Convention>, AppError> {
    let id = parse_integer("id", id)?;
    Ok(Json(backend.get_convention(id).await?))
}

#[post("/convention?<name>&<location>&<date>")]
pub async fn api_create_convention(
    name: Option<&str>,
    location: Option<&str>,
    date: Option<&str>,
    backend: &State<Backend>,
) -> Result<Custom<Json<Convention>>, AppError> {
    let mut draft = NewConvention::new(required("name", name)?, optional(location));
    if let Some(date) = optional(date) {
        draft = draft.on(parse_date("date", date)?);
    }

    let created = backend.create_convention(draft).await?;
    Ok(Custom(Status::Created, Json(created)))
}

#[put("/convention/<id>/update")]
pub async fn api_update_convention(
    id: &str,
    uri: &Origin<'_>,
    backend: &State<Backend>,
) -> Result<Json<Convention>, AppError> {
    let id = parse_integer("id", id)?;
    let changes = PartialUpdate::from_params(convention::COLUMNS, query_pairs(uri))?;
    Ok(Json(backend.update_convention(id, &changes).await?))
}

#[delete("/convention/<id>")]
pub async fn api_delete_convention(id: &str, backend: &State<Backend>) -> Result<String, AppError> {
    let id = parse_integer("id", id)?;
    backend.delete_convention(id).await
}

// Drivertimes

#[get("/drivertimes?<params..>")]
pub async fn api_get_drivertimes(
    params: DriverTimeListParams,
    backend: &State<Backend>,
) -> Result<Json<Vec<DriverTime>>, AppError> {
    let filter = filter_from(params.driver_id.as_deref(), params.convention_id.as_deref())?;
    let options = ListOptions::parse(
        params.sort_by.as_deref(),
        params.order.as_deref(),
        params.limit.as_deref(),
    )?;
    Ok(Json(backend.list_drivertimes(&filter, &options).await?))
}

#[get("/drivertimes/best?<params..>")]
pub async fn api_get_best_sectors(
    params: DriverTimeFilterParams,
    backend: &State<Backend>,
) -> Result<Json<BestSectors>, AppError> {
    let filter = filter_from(params.driver_id.as_deref(), params.convention_id.as_deref())?;
    Ok(Json(backend.best_sectors(&filter).await?))
}

#[get("/drivertime/<id>")]
pub async fn api_get_drivertime(
    id: &str,
    backend: &State<Backend>,
) -> Result<Json<DriverTime>, AppError> {
    let id = parse_integer("id", id)?;
    Ok(Json(backend.get_drivertime(id).await?))
}

#[post("/drivertime?<driver_id>&<convention_id>&<sector1>&<sector2>&<sector3>&<laptime>")]
pub async fn api_create_drivertime(
    driver_id: Option<&str>,
    convention_id: Option<&str>,
    sector1: Option<&str>,
    sector2: Option<&str>,
    sector3: Option<&str>,
    laptime: Option<&str>,
    backend: &State<Backend>,
) -> Result<Custom<Json<DriverTime>>, AppError> {
    let draft = NewDriverTime {
        driver_id: required("driver_id", driver_id)?.to_string(),
        convention_id: parse_integer("convention_id", required("convention_id", convention_id)?)?,
        sector1: parse_float("sector1", required("sector1", sector1)?)?,
        sector2: parse_float("sector2", required("sector2", sector2)?)?,
        sector3: parse_float("sector3", required("sector3", sector3)?)?,
        laptime: parse_float("laptime", required("laptime", laptime)?)?,
    };

    let created = backend.create_drivertime(draft).await?;
    Ok(Custom(Status::Created, Json(created)))
}

#[put("/drivertime/<id>/update")]
pub async fn api_update_drivertime(
    id: &str,
    uri: &Origin<'_>,
    backend: &State<Backend>,
) -> Result<Json<DriverTime>, AppError> {
    let id = parse_integer("id", id)?;
    let changes = PartialUpdate::from_params(drivertime::COLUMNS, query_pairs(uri))?;
    Ok(Json(backend.update_drivertime(id, &changes).await?))
}

#[delete("/drivertime/<id>")]
pub async fn api_delete_drivertime(id: &str, backend: &State<Backend>) -> Result<String, AppError> {
    let id = parse_integer("id", id)?;
    backend.delete_drivertime(id).await
}
