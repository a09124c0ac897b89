use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use coordinator::CoordinatorError;
use serde::Serialize;

/// Error returned by API handlers.
#[derive(Debug, thiserror::Error)]
pub(crate) enum ApiError {
    #[error(transparent)]
    Coordinator(#[from] CoordinatorError),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Coordinator(error) => match error {
                CoordinatorError::InvalidName(_) | CoordinatorError::Protocol(_) => StatusCode::BAD_REQUEST,
                CoordinatorError::NotFound(_) => StatusCode::NOT_FOUND,
                CoordinatorError::AlreadyExists(_) => StatusCode::CONFLICT,
                CoordinatorError::Backend { .. } => StatusCode::BAD_GATEWAY,
                CoordinatorError::Store(_) | CoordinatorError::Artifact(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request_error",
            Self::Coordinator(error) => match error {
                CoordinatorError::InvalidName(_) | CoordinatorError::Protocol(_) => "invalid_request_error",
                CoordinatorError::NotFound(_) => "not_found_error",
                CoordinatorError::AlreadyExists(_) => "conflict_error",
                CoordinatorError::Backend { .. } => "backend_error",
                CoordinatorError::Store(_) | CoordinatorError::Artifact(_) => "internal_error",
            },
        }
    }

    /// Message that is safe to expose to API consumers.
    pub fn client_message(&self) -> String {
        match self {
            Self::Coordinator(CoordinatorError::Store(_) | CoordinatorError::Artifact(_)) => {
                "Internal server error".to_string()
            }
            Self::Coordinator(CoordinatorError::Backend { stderr }) => {
                let stderr = stderr.trim();

                if stderr.is_empty() {
                    "Backend command failed".to_string()
                } else {
                    format!("Backend command failed: {stderr}")
                }
            }
            _ => self.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    success: bool,
    error: ErrorDetails,
}

#[derive(Debug, Serialize)]
struct ErrorDetails {
    message: String,
    r#type: &'static str,
    code: u16,
}

/// Builds the JSON error body shared by handlers and middleware.
pub(crate) fn error_response(status: StatusCode, error_type: &'static str, message: String) -> Response {
    let body = ErrorResponse {
        success: false,
        error: ErrorDetails {
            message,
            r#type: error_type,
            code: status.as_u16(),
        },
    };

    (status, Json(body)).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            log::error!("request failed: {self}");
        }

        error_response(status, self.error_type(), self.client_message())
    }
}
