//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::response::MessageBody;
use crate::routes::HttpVerb;

/// Fatal startup errors. Raised before any route is registered.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("base path not defined for controller: {controller}")]
    MissingBasePath { controller: &'static str },
    #[error("duplicate route: {verb} {path}")]
    DuplicateRoute { verb: HttpVerb, path: String },
    #[error("route {verb} {path} requires role '{role}' but no role gate is configured")]
    MissingRoleGate {
        verb: HttpVerb,
        path: String,
        role: String,
    },
    #[error("environment: {0}")]
    Env(String),
}

/// Failures of the persistence collaborator. Never shown to clients.
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("{0}")]
    Other(String),
}

/// Outcome kinds of the CRUD service.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("ID in path does not match ID in body (path {path}, body {body:?})")]
    IdMismatch { path: i64, body: Option<i64> },
    #[error("entity {0} not found")]
    NotFound(i64),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// HTTP-facing error taxonomy. Only the controller layer builds these.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid ID")]
    InvalidIdentifier,
    #[error("Invalid body:\n- {}", .0.join("\n- "))]
    InvalidBody(Vec<String>),
    #[error("ID in path does not match ID in body")]
    IdMismatch,
    #[error("Entity not found")]
    NotFound,
    #[error("Internal server error")]
    Unhandled(String),
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::IdMismatch { .. } => ApiError::IdMismatch,
            ServiceError::NotFound(_) => ApiError::NotFound,
            ServiceError::Repository(e) => ApiError::Unhandled(e.to_string()),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidIdentifier | ApiError::InvalidBody(_) | ApiError::IdMismatch => {
                StatusCode::BAD_REQUEST
            }
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Unhandled(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Unhandled(detail) = &self {
            tracing::error!(error = %detail, "unhandled error");
        }
        let body = MessageBody {
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_body_lists_every_item() {
        let e = ApiError::InvalidBody(vec![
            "model is required".into(),
            "wheels is required".into(),
        ]);
        assert_eq!(
            e.to_string(),
            "Invalid body:\n- model is required\n- wheels is required"
        );
        assert_eq!(e.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn repository_failures_hide_their_detail() {
        let e: ApiError = ServiceError::Repository(RepositoryError::Other("pool timed out".into())).into();
        assert_eq!(e.to_string(), "Internal server error");
        assert_eq!(e.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn service_kinds_map_to_statuses() {
        let mismatch: ApiError = ServiceError::IdMismatch { path: 2, body: Some(1) }.into();
        assert_eq!(mismatch.status(), StatusCode::BAD_REQUEST);
        assert_eq!(mismatch.to_string(), "ID in path does not match ID in body");
        let missing: ApiError = ServiceError::NotFound(9).into();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(missing.to_string(), "Entity not found");
    }
}
