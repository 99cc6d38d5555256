// rest_api/src/routes/mod.rs

pub mod appointments;
pub mod doctors;
pub mod inventory;
pub mod users;

use axum::{http::StatusCode, Json};
use serde::Serialize;

use crate::error::ApiError;

/// The success envelope every route answers with.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    pub data: T,
}

pub type ApiResult<T> = Result<Json<Envelope<T>>, ApiError>;
pub type CreatedResult<T> = Result<(StatusCode, Json<Envelope<T>>), ApiError>;

pub fn ok<T: Serialize>(data: T) -> Json<Envelope<T>> {
    Json(Envelope { success: true, count: None, data })
}

pub fn listed<T: Serialize>(items: Vec<T>) -> Json<Envelope<Vec<T>>> {
    Json(Envelope { success: true, count: Some(items.len()), data: items })
}

pub fn created<T: Serialize>(data: T) -> (StatusCode, Json<Envelope<T>>) {
    (StatusCode::CREATED, ok(data))
}
