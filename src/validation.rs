use std::collections::BTreeMap;

use tracing::instrument;
use validator::{Validate, ValidationErrors};

use crate::error::AppError;

/// Flattens validator output into `field: message; field: message`.
pub fn describe(errors: &ValidationErrors) -> String {
    let mut by_field: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for (field, field_errors) in errors.field_errors() {
        let messages = field_errors.iter().map(|error| {
            error
                .message
                .clone()
                .unwrap_or_else(|| "Invalid value".into())
                .to_string()
        });
        by_field
            .entry(field.to_string())
            .or_default()
            .extend(messages);
    }

    by_field
        .into_iter()
        .map(|(field, messages)| format!("{}: {}", field, messages.join(", ")))
        .collect::<Vec<_>>()
        .join("; ")
}

pub trait ValidateExt: Validate + Sized {
    fn validated(self) -> Result<Self, AppError>;
}

impl<T: Validate + std::fmt::Debug> ValidateExt for T {
    #[instrument(level = "debug")]
    fn validated(self) -> Result<Self, AppError> {
        match self.validate() {
            Ok(()) => Ok(self),
            Err(errors) => Err(AppError::InvalidInput(describe(&errors))),
        }
    }
}

/// A required query-string parameter, or `InvalidInput` naming it.
pub fn required<'a>(field: &str, value: Option<&'a str>) -> Result<&'a str, AppError> {
    match value.map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(AppError::invalid(format!("Missing required parameter: {}", field))),
    }
}

/// An optional query-string parameter. Blank values count as absent.
pub fn optional(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
