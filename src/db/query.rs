//! Statement assembly for the repositories.
//!
//! Only identifiers from the static column tables below are ever written into
//! statement text. Every caller-supplied value is bound positionally.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;

use crate::error::AppError;
use crate::models::ymd;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Float,
    Date,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
    pub required: bool,
}

impl Column {
    pub const fn required(name: &'static str, kind: ColumnKind) -> Self {
        Self {
            name,
            kind,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, kind: ColumnKind) -> Self {
        Self {
            name,
            kind,
            required: false,
        }
    }

    /// Parses a raw query-string value into a value of this column's type.
    /// An empty value on an optional column means "clear it".
    pub fn parse(&self, raw: &str) -> Result<FieldValue, AppError> {
        let raw = raw.trim();
        if raw.is_empty() && !self.required {
            return Ok(match self.kind {
                ColumnKind::Date => FieldValue::Date(None),
                _ => FieldValue::Text(None),
            });
        }

        match self.kind {
            ColumnKind::Text => Ok(FieldValue::Text(Some(raw.to_string()))),
            ColumnKind::Float => parse_float(self.name, raw).map(FieldValue::Float),
            ColumnKind::Date => parse_date(self.name, raw).map(|date| FieldValue::Date(Some(date))),
        }
    }

    fn accepts(&self, value: &FieldValue) -> bool {
        match (self.kind, value) {
            (ColumnKind::Text, FieldValue::Text(Some(text))) => {
                !self.required || !text.trim().is_empty()
            }
            (ColumnKind::Text, FieldValue::Text(None)) => !self.required,
            (ColumnKind::Float, FieldValue::Float(_)) => true,
            (ColumnKind::Date, FieldValue::Date(Some(_))) => true,
            (ColumnKind::Date, FieldValue::Date(None)) => !self.required,
            _ => false,
        }
    }
}

pub fn parse_float(field: &str, raw: &str) -> Result<f64, AppError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| AppError::invalid(format!("Expected a number for {}, got '{}'", field, raw)))
}

pub fn parse_integer(field: &str, raw: &str) -> Result<i64, AppError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| AppError::invalid(format!("Expected an integer for {}, got '{}'", field, raw)))
}

pub fn parse_date(field: &str, raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw.trim(), ymd::FORMAT).map_err(|_| {
        AppError::invalid(format!(
            "Invalid date format for {}. Expected format: YYYY-MM-DD",
            field
        ))
    })
}

/// A value bound into a statement. `None` binds a typed SQL `NULL`.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(Option<String>),
    Float(f64),
    Integer(i64),
    Date(Option<NaiveDate>),
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(Some(value))
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(Some(value.to_string()))
    }
}

impl From<Option<String>> for FieldValue {
    fn from(value: Option<String>) -> Self {
        FieldValue::Text(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(value: NaiveDate) -> Self {
        FieldValue::Date(Some(value))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub values: Vec<FieldValue>,
}

impl Statement {
    fn new() -> Self {
        Self {
            sql: String::new(),
            values: Vec::new(),
        }
    }

    fn push_value(&mut self, value: FieldValue) -> String {
        self.values.push(value);
        format!("${}", self.values.len())
    }
}

/// A sparse set of column changes. Setting the same field twice keeps the last value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialUpdate {
    fields: Vec<(String, FieldValue)>,
}

impl PartialUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: &str, value: impl Into<FieldValue>) -> Self {
        let value = value.into();
        match self.fields.iter_mut().find(|(name, _)| name == field) {
            Some(existing) => existing.1 = value,
            None => self.fields.push((field.to_string(), value)),
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Builds an update from raw `(field, value)` pairs, typing each value by its column.
    pub fn from_params<I, K, V>(columns: &[Column], params: I) -> Result<Self, AppError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut update = Self::new();
        for (key, raw) in params {
            let key = key.as_ref();
            let column = find_column(columns, key)?;
            update = update.set(key, column.parse(raw.as_ref())?);
        }
        Ok(update)
    }
}

fn find_column<'a>(columns: &'a [Column], field: &str) -> Result<&'a Column, AppError> {
    columns.iter().find(|column| column.name == field).ok_or_else(|| {
        let allowed: Vec<&str> = columns.iter().map(|column| column.name).collect();
        AppError::invalid(format!(
            "Field '{}' cannot be updated, allowed fields: {}",
            field,
            allowed.join(", ")
        ))
    })
}

/// `UPDATE <table> SET a = $1, b = $2 WHERE id = $3 RETURNING *`.
///
/// Assignments follow the order of `allowed`, so the same update set always
/// produces the same statement regardless of how it was assembled.
pub fn build_update(
    table: &str,
    id: FieldValue,
    update: &PartialUpdate,
    allowed: &[Column],
) -> Result<Statement, AppError> {
    if update.is_empty() {
        return Err(AppError::invalid("No fields given to update"));
    }

    for field in update.fields() {
        find_column(allowed, field)?;
    }

    let mut statement = Statement::new();
    let mut assignments = Vec::with_capacity(update.len());
    for column in allowed {
        let Some(value) = update.get(column.name) else {
            continue;
        };
        if !column.accepts(value) {
            return Err(AppError::invalid(format!(
                "Invalid value for {}: {:?}",
                column.name, value
            )));
        }
        let placeholder = statement.push_value(value.clone());
        assignments.push(format!("{} = {}", column.name, placeholder));
    }

    let id_placeholder = statement.push_value(id);
    statement.sql = format!(
        "UPDATE {} SET {} WHERE id = {} RETURNING *",
        table,
        assignments.join(", "),
        id_placeholder
    );

    Ok(statement)
}

/// `INSERT INTO <table> (a, b) VALUES ($1, $2) RETURNING *` over the supplied columns only.
pub fn build_insert(table: &str, fields: Vec<(&'static str, FieldValue)>) -> Statement {
    let mut statement = Statement::new();
    let mut columns = Vec::with_capacity(fields.len());
    let mut placeholders = Vec::with_capacity(fields.len());

    for (column, value) in fields {
        columns.push(column);
        placeholders.push(statement.push_value(value));
    }

    statement.sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
        table,
        columns.join(", "),
        placeholders.join(", ")
    );
    statement
}

pub fn build_find(table: &str, id: FieldValue) -> Statement {
    let mut statement = Statement::new();
    let placeholder = statement.push_value(id);
    statement.sql = format!("SELECT * FROM {} WHERE id = {}", table, placeholder);
    statement
}

pub fn build_delete(table: &str, id: FieldValue) -> Statement {
    let mut statement = Statement::new();
    let placeholder = statement.push_value(id);
    statement.sql = format!("DELETE FROM {} WHERE id = {} RETURNING *", table, placeholder);
    statement
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortOrder {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(AppError::invalid(format!(
                "Invalid order '{}', expected 'asc' or 'desc'",
                raw
            ))),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Asc => write!(f, "ASC"),
            SortOrder::Desc => write!(f, "DESC"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListOptions {
    pub sort_by: Option<String>,
    pub order: Option<SortOrder>,
    pub limit: Option<i64>,
}

impl ListOptions {
    pub fn sorted_by(mut self, column: &str, order: SortOrder) -> Self {
        self.sort_by = Some(column.to_string());
        self.order = Some(order);
        self
    }

    pub fn limited(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Parses the raw query-string form of the options.
    pub fn parse(
        sort_by: Option<&str>,
        order: Option<&str>,
        limit: Option<&str>,
    ) -> Result<Self, AppError> {
        Ok(Self {
            sort_by: sort_by.map(|column| column.trim().to_string()),
            order: order.map(|raw| raw.parse::<SortOrder>()).transpose()?,
            limit: limit.map(|raw| parse_integer("limit", raw)).transpose()?,
        })
    }
}

/// `SELECT * FROM <table> [WHERE ...] ORDER BY <column> <order> [LIMIT $n]`.
///
/// `sort_by` must be one of `sortable`; anything else is rejected before any
/// text is assembled. Without a sort column the listing is ordered by id.
pub fn build_list(
    table: &str,
    filters: Vec<(&'static str, FieldValue)>,
    options: &ListOptions,
    sortable: &[&'static str],
) -> Result<Statement, AppError> {
    let sort_column = match options.sort_by.as_deref() {
        Some(requested) => *sortable
            .iter()
            .find(|column| **column == requested)
            .ok_or_else(|| {
                AppError::invalid(format!(
                    "Cannot sort by '{}', allowed columns: {}",
                    requested,
                    sortable.join(", ")
                ))
            })?,
        None => "id",
    };

    if let Some(limit) = options.limit {
        if limit < 0 {
            return Err(AppError::invalid(format!(
                "Limit must not be negative, got {}",
                limit
            )));
        }
    }

    let mut statement = Statement::new();
    let mut sql = format!("SELECT * FROM {}", table);
    push_filters(&mut statement, &mut sql, filters);
    sql.push_str(&format!(
        " ORDER BY {} {}",
        sort_column,
        options.order.unwrap_or_default()
    ));
    if let Some(limit) = options.limit {
        let placeholder = statement.push_value(FieldValue::Integer(limit));
        sql.push_str(&format!(" LIMIT {}", placeholder));
    }

    statement.sql = sql;
    Ok(statement)
}

/// `SELECT MIN(a) AS best_a, ... FROM <table> [WHERE ...]`.
pub fn build_minimums(
    table: &str,
    columns: &[(&'static str, &'static str)],
    filters: Vec<(&'static str, FieldValue)>,
) -> Statement {
    let selections: Vec<String> = columns
        .iter()
        .map(|(column, alias)| format!("MIN({}) AS {}", column, alias))
        .collect();

    let mut statement = Statement::new();
    let mut sql = format!("SELECT {} FROM {}", selections.join(", "), table);
    push_filters(&mut statement, &mut sql, filters);
    statement.sql = sql;
    statement
}

fn push_filters(
    statement: &mut Statement,
    sql: &mut String,
    filters: Vec<(&'static str, FieldValue)>,
) {
    let conditions: Vec<String> = filters
        .into_iter()
        .map(|(column, value)| format!("{} = {}", column, statement.push_value(value)))
        .collect();

    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }
}
