use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Malformed dates, ids or missing required fields
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// Duplicate keys or deleting a referenced row
    #[error("{0}")]
    Integrity(String),

    #[error("Report rendering failed: {0}")]
    Renderer(#[from] crate::render::RenderError),

    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

// MySQL server error numbers
const ER_DUP_ENTRY: u16 = 1062;
const ER_ROW_IS_REFERENCED: u16 = 1217;
const ER_ROW_IS_REFERENCED_2: u16 = 1451;
const ER_NO_REFERENCED_ROW: u16 = 1216;
const ER_NO_REFERENCED_ROW_2: u16 = 1452;

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn integrity(msg: impl Into<String>) -> Self {
        AppError::Integrity(msg.into())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            if let Some(mysql) = db_err.try_downcast_ref::<sqlx::mysql::MySqlDatabaseError>() {
                match mysql.number() {
                    ER_DUP_ENTRY => return AppError::integrity("Record already exists"),
                    ER_ROW_IS_REFERENCED | ER_ROW_IS_REFERENCED_2 => {
                        return AppError::integrity("Record is referenced by other records");
                    }
                    ER_NO_REFERENCED_ROW | ER_NO_REFERENCED_ROW_2 => {
                        return AppError::integrity("Referenced record does not exist");
                    }
                    _ => {}
                }
            }
        }
        AppError::Database(e)
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Integrity(_) => StatusCode::CONFLICT,
            AppError::Renderer(e) if e.is_unconfigured() => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Renderer(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let message = match self {
            AppError::Database(e) => {
                tracing::error!(error = %e, "Database error");
                "Internal Server Error".to_string()
            }
            other => {
                if status.is_server_error() {
                    tracing::error!(status = %status, error = %other, "Request failed");
                }
                other.to_string()
            }
        };

        HttpResponse::build(status).json(json!({ "message": message }))
    }
}
