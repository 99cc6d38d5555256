// rest_api/src/error.rs

use axum::{
    extract::rejection::{BytesRejection, JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use log::{error, warn};
use serde_json::json;
use thiserror::Error;

use models::errors::HospitalError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Hospital(#[from] HospitalError),
    #[error("Invalid request body: {0}")]
    Body(#[from] JsonRejection),
    #[error("Invalid request body: {0}")]
    RawBody(#[from] BytesRejection),
    #[error("Invalid path parameter: {0}")]
    Path(#[from] PathRejection),
    #[error("Invalid query string: {0}")]
    Query(#[from] QueryRejection),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Hospital(e) => match e {
                HospitalError::Validation(_) => StatusCode::BAD_REQUEST,
                HospitalError::Conflict(_) => StatusCode::CONFLICT,
                HospitalError::NotFound(_) => StatusCode::NOT_FOUND,
                HospitalError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
                HospitalError::Forbidden(_) => StatusCode::FORBIDDEN,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Body(_) | ApiError::RawBody(_) | ApiError::Path(_) | ApiError::Query(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!("Request failed: {}", self);
            "Server Error".to_string()
        } else {
            warn!("Request rejected with {}: {}", status.as_u16(), self);
            match &self {
                ApiError::Hospital(e) => e.to_string(),
                other => other.to_string(),
            }
        };

        (status, Json(json!({ "success": false, "error": message }))).into_response()
    }
}
