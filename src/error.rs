use opentelemetry_semantic_conventions::{attribute::OTEL_STATUS_CODE, trace::ERROR_TYPE};
use rocket::http::Status;
use sqlx::error::ErrorKind;
use thiserror::Error;
use tracing::{Span, error, warn};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Driver not found: {0}")]
    DriverNotFound(String),

    #[error("Convention not found: {0}")]
    ConventionNotFound(i64),

    #[error("Drivertime not found: {0}")]
    DriverTimeNotFound(i64),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Database connection failure: {0}")]
    ConnectionFailure(String),

    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn invalid(message: impl Into<String>) -> Self {
        AppError::InvalidInput(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            AppError::DriverNotFound(_)
                | AppError::ConventionNotFound(_)
                | AppError::DriverTimeNotFound(_)
        )
    }

    pub fn log_and_record(&self, ctx: &str) {
        let current_span = Span::current();
        let is_valid_span = !current_span.is_none();

        let message = self.to_string();
        let error_kind = match self {
            AppError::DriverNotFound(_)
            | AppError::ConventionNotFound(_)
            | AppError::DriverTimeNotFound(_) => {
                warn!(message = %message, context = %ctx, "Not found error");
                "not_found_error"
            }
            AppError::InvalidInput(msg) => {
                warn!(message = %msg, context = %ctx, "Invalid input");
                "invalid_input_error"
            }
            AppError::ConstraintViolation(msg) => {
                warn!(message = %msg, context = %ctx, "Constraint violation");
                "constraint_violation_error"
            }
            AppError::ConnectionFailure(msg) => {
                error!(message = %msg, context = %ctx, "Database connection failure");
                "connection_failure_error"
            }
            AppError::Database(err) => {
                error!(error = %message, context = %ctx, db_error = %err, "Database error");
                "database_error"
            }
            AppError::Internal(msg) => {
                error!(message = %msg, context = %ctx, "Internal server error");
                "internal_error"
            }
        };

        if is_valid_span {
            current_span.record("error", tracing::field::display(true));
            current_span.record(ERROR_TYPE, tracing::field::display(error_kind));
            current_span.record("error.message", tracing::field::display(&message));

            if self.status_code().code >= 500 {
                current_span.record(OTEL_STATUS_CODE, tracing::field::display("ERROR"));
            }
        }
    }

    pub fn status_code(&self) -> Status {
        match self {
            AppError::DriverNotFound(_)
            | AppError::ConventionNotFound(_)
            | AppError::DriverTimeNotFound(_) => Status::NotFound,
            AppError::InvalidInput(_) => Status::BadRequest,
            AppError::ConstraintViolation(_) => Status::BadRequest,
            AppError::ConnectionFailure(_) => Status::ServiceUnavailable,
            AppError::Database(_) => Status::InternalServerError,
            AppError::Internal(_) => Status::InternalServerError,
        }
    }

    pub fn to_status_with_log(&self, context: &str) -> Status {
        self.log_and_record(context);
        self.status_code()
    }

    /// Text sent back to HTTP callers. Server-side failures keep their detail in the logs.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Database(_) | AppError::Internal(_) => "Internal server error".to_string(),
            AppError::ConnectionFailure(_) => "Database unavailable".to_string(),
            _ => self.to_string(),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::Database(db_error) => match db_error.kind() {
                ErrorKind::UniqueViolation
                | ErrorKind::ForeignKeyViolation
                | ErrorKind::NotNullViolation
                | ErrorKind::CheckViolation => {
                    AppError::ConstraintViolation(db_error.message().to_string())
                }
                _ => AppError::Database(error),
            },
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => AppError::ConnectionFailure(error.to_string()),
            _ => AppError::Database(error),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(error: sqlx::migrate::MigrateError) -> Self {
        AppError::Internal(format!("Migration error: {}", error))
    }
}

impl<'r> rocket::response::Responder<'r, 'static> for AppError {
    fn respond_to(self, req: &'r rocket::Request<'_>) -> rocket::response::Result<'static> {
        let status =
            self.to_status_with_log(&format!("Request to {} {}", req.method(), req.uri()));
        (status, self.public_message()).respond_to(req)
    }
}

#[cfg(test)]
mod tests {
    use super::AppError;
    use rocket::http::Status;

    #[test]
    fn test_not_found_variants_map_to_404() {
        let errors = [
            AppError::DriverNotFound("abc".to_string()),
            AppError::ConventionNotFound(4),
            AppError::DriverTimeNotFound(9),
        ];

        for error in errors {
            assert!(error.is_not_found());
            assert_eq!(error.status_code(), Status::NotFound);
        }
    }

    #[test]
    fn test_client_errors_map_to_400() {
        assert_eq!(
            AppError::invalid("name is required").status_code(),
            Status::BadRequest
        );
        assert_eq!(
            AppError::ConstraintViolation("check".to_string()).status_code(),
            Status::BadRequest
        );
    }

    #[test]
    fn test_pool_failures_become_connection_failures() {
        let error = AppError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(error, AppError::ConnectionFailure(_)));
        assert_eq!(error.status_code(), Status::ServiceUnavailable);

        let error = AppError::from(sqlx::Error::PoolClosed);
        assert!(matches!(error, AppError::ConnectionFailure(_)));
    }

    #[test]
    fn test_unexpected_sqlx_errors_are_server_errors() {
        let error = AppError::from(sqlx::Error::RowNotFound);
        assert!(matches!(error, AppError::Database(_)));
        assert_eq!(error.status_code(), Status::InternalServerError);
        assert_eq!(error.public_message(), "Internal server error");
    }

    #[test]
    fn test_not_found_message_names_the_id() {
        let error = AppError::DriverNotFound("3a14b8b0".to_string());
        assert_eq!(error.public_message(), "Driver not found: 3a14b8b0");
    }
}
