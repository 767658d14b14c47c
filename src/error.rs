use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};
use validator::ValidationErrors;

use crate::services::photos::PhotoError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid fields: {0}")]
    InvalidFields(#[from] ValidationErrors),

    #[error("Rate limited")]
    RateLimited,

    #[error("Photo error: {0}")]
    Photo(#[from] PhotoError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Field order used when reporting form errors.
const FIELD_ORDER: [&str; 5] = ["date", "onsenName", "sleepScore", "rating", "memo"];

impl AppError {
    /// Shorthand for a single field-level validation failure.
    pub fn field(field: &'static str, message: &'static str) -> Self {
        let mut errors = ValidationErrors::new();
        let mut error = validator::ValidationError::new("invalid");
        error.message = Some(message.into());
        errors.add(field, error);
        AppError::InvalidFields(errors)
    }
}

fn field_messages(errors: &ValidationErrors) -> Map<String, Value> {
    let field_errors = errors.field_errors();
    let mut names: Vec<&str> = field_errors.keys().copied().collect();
    names.sort_by_key(|name| {
        FIELD_ORDER
            .iter()
            .position(|known| known == name)
            .unwrap_or(FIELD_ORDER.len())
    });

    let mut fields = Map::new();
    for name in names {
        let messages: Vec<Value> = field_errors[name]
            .iter()
            .map(|e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string())
                    .into()
            })
            .collect();
        fields.insert(name.to_string(), Value::Array(messages));
    }
    fields
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            AppError::InvalidFields(_) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "Some fields are invalid".into(),
            ),
            AppError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, self.to_string()),
            AppError::Photo(e @ PhotoError::TooLarge { .. }) => {
                (StatusCode::PAYLOAD_TOO_LARGE, e.to_string())
            }
            AppError::Photo(e @ PhotoError::Read(_)) => (StatusCode::BAD_REQUEST, e.to_string()),
            AppError::Photo(e) => {
                tracing::warn!(error = %e, "Photo processing failed");
                (StatusCode::BAD_GATEWAY, "Photo could not be stored".into())
            }
            AppError::Database(e) => {
                tracing::error!(error = %e, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".into(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!(error = %e, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".into(),
                )
            }
        };

        let mut error = json!({
            "message": message,
            "code": status.as_u16(),
        });
        if let AppError::InvalidFields(errors) = &self {
            error["fields"] = Value::Object(field_messages(errors));
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
