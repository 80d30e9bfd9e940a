use application::ApplicationError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::{DomainError, RepositoryError};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                code,
                message: message.into(),
            },
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, "CONFLICT", message)
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }
}

impl From<ApplicationError> for ApiError {
    fn from(error: ApplicationError) -> Self {
        match error {
            ApplicationError::Domain(err) => {
                let status_and_code = match &err {
                    DomainError::RoomNotFound { .. } => (StatusCode::NOT_FOUND, "ROOM_NOT_FOUND"),
                    DomainError::UserNotFound => (StatusCode::NOT_FOUND, "USER_NOT_FOUND"),
                    DomainError::RoomAlreadyExists => (StatusCode::CONFLICT, "ROOM_EXISTS"),
                    DomainError::NotAuthenticated => {
                        (StatusCode::UNAUTHORIZED, "NOT_AUTHENTICATED")
                    }
                    _ => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
                };
                ApiError::new(status_and_code.0, status_and_code.1, err.to_string())
            }
            ApplicationError::Repository(err) => match err {
                RepositoryError::NotFound => ApiError::new(
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    "requested resource not found",
                ),
                RepositoryError::Conflict => {
                    ApiError::new(StatusCode::CONFLICT, "CONFLICT", "resource already exists")
                }
                RepositoryError::Storage { message } => ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    format!("database error: {message}"),
                ),
            },
            ApplicationError::Internal(message) => ApiError::internal_server_error(message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_map_to_http_statuses() {
        let error = ApiError::from(ApplicationError::Domain(DomainError::room_not_found("x")));
        assert_eq!(error.status, StatusCode::NOT_FOUND);
        assert_eq!(error.body.code, "ROOM_NOT_FOUND");
        assert_eq!(error.body.message, "Room \"x\" not found");

        let error = ApiError::from(ApplicationError::Domain(DomainError::EmptyMessage));
        assert_eq!(error.status, StatusCode::BAD_REQUEST);

        let error = ApiError::from(ApplicationError::Repository(RepositoryError::Conflict));
        assert_eq!(error.status, StatusCode::CONFLICT);
    }
}
