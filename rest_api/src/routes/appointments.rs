// rest_api/src/routes/appointments.rs

use axum::{
    extract::State,
    routing::{get, put},
    Router,
};
use serde::Deserialize;
use uuid::Uuid;

use lib::{AppointmentUpdate, BookingRequest, PaymentRequest, PrescriptionRequest};
use models::medical::AppointmentView;

use crate::auth::Authenticated;
use crate::extract::{JsonBody, OptionalJsonBody, PathParam, QueryParams};
use crate::routes::{created, listed, ok, ApiResult, CreatedResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotQuery {
    pub doctor_id: Uuid,
    pub date: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_appointments).post(create_appointment))
        .route("/slots", get(booked_slots))
        .route("/:id", get(get_appointment).put(update_appointment).delete(delete_appointment))
        .route("/:id/prescription", put(add_prescription))
        .route("/:id/payment", put(update_payment))
}

async fn list_appointments(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
) -> ApiResult<Vec<AppointmentView>> {
    Ok(listed(state.services.appointments.list(&caller).await?))
}

async fn create_appointment(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    JsonBody(request): JsonBody<BookingRequest>,
) -> CreatedResult<AppointmentView> {
    Ok(created(state.services.appointments.book(&caller, request).await?))
}

async fn booked_slots(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    QueryParams(query): QueryParams<SlotQuery>,
) -> ApiResult<Vec<String>> {
    let slots = state.services.appointments.booked_slots(&caller, &query.doctor_id, &query.date).await?;
    Ok(listed(slots))
}

async fn get_appointment(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    PathParam(id): PathParam<Uuid>,
) -> ApiResult<AppointmentView> {
    Ok(ok(state.services.appointments.get(&caller, &id).await?))
}

async fn update_appointment(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    PathParam(id): PathParam<Uuid>,
    JsonBody(update): JsonBody<AppointmentUpdate>,
) -> ApiResult<AppointmentView> {
    Ok(ok(state.services.appointments.update(&caller, &id, update).await?))
}

async fn add_prescription(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    PathParam(id): PathParam<Uuid>,
    JsonBody(request): JsonBody<PrescriptionRequest>,
) -> ApiResult<AppointmentView> {
    Ok(ok(state.services.appointments.attach_prescription(&caller, &id, request).await?))
}

async fn update_payment(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    PathParam(id): PathParam<Uuid>,
    OptionalJsonBody(request): OptionalJsonBody<PaymentRequest>,
) -> ApiResult<AppointmentView> {
    Ok(ok(state.services.appointments.record_payment(&caller, &id, request).await?))
}

async fn delete_appointment(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    PathParam(id): PathParam<Uuid>,
) -> ApiResult<serde_json::Value> {
    state.services.appointments.delete(&caller, &id).await?;
    Ok(ok(serde_json::Value::Object(Default::default())))
}
