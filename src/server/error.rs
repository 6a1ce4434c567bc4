//! Error types for the server

use crate::error::ClassifierError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),

    #[error(transparent)]
    Classifier(#[from] ClassifierError),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) | ServerError::Json(_) => StatusCode::BAD_REQUEST,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Classifier(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            ServerError::Classifier(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(detail = %self, "Request failed");
        } else {
            tracing::warn!(detail = %self, status = status.as_u16(), "Request rejected");
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ServerError::BadRequest("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ServerError::from(ClassifierError::UnsupportedFormat(".txt".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServerError::from(ClassifierError::TrainingError("boom".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
