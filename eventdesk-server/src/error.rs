use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use eventdesk_common::api::ErrorMessage;
use tracing::error;

#[derive(thiserror::Error, Debug)]
pub enum ServerError {
    #[error("Database error: {0}")]
    DatabaseError(&'static str),

    #[error("Bad request: {0}")]
    BadRequest(&'static str),

    #[error("Not found: {0}")]
    NotFound(&'static str),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Unexpected error: {0}")]
    UnexpectedError(&'static str),

    #[error("Conflict: {0}")]
    Conflict(&'static str),
}

impl ServerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ServerError::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Conflict(_) => StatusCode::CONFLICT,
        }
    }

    pub fn message(&self) -> String {
        match self {
            ServerError::NotFound(v) => format!("{v} not found"),
            ServerError::BadRequest(v) => v.to_string(),
            ServerError::Conflict(v) => v.to_string(),
            ServerError::InvalidCredentials => "Invalid credentials".to_string(),
            ServerError::UnexpectedError(_) | ServerError::DatabaseError(_) => {
                "An unexpected error occurred. Please try again later".into()
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("{self}");
        }

        (
            status,
            Json(ErrorMessage {
                value: self.message(),
            }),
        )
            .into_response()
    }
}
