// rest_api/src/routes/doctors.rs

use axum::{extract::State, routing::get, Router};
use uuid::Uuid;

use models::medical::{Doctor, DoctorUpdate, NewDoctor};

use crate::auth::Authenticated;
use crate::extract::{JsonBody, PathParam};
use crate::routes::{created, listed, ok, ApiResult, CreatedResult};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_doctors).post(create_doctor))
        .route("/user/:user_id", get(get_doctor_by_user))
        .route("/search/:specialization", get(search_doctors))
        .route("/:id", get(get_doctor).put(update_doctor).delete(deactivate_doctor))
}

async fn list_doctors(State(state): State<AppState>) -> ApiResult<Vec<Doctor>> {
    Ok(listed(state.services.doctors.list_active().await?))
}

async fn get_doctor(State(state): State<AppState>, PathParam(id): PathParam<Uuid>) -> ApiResult<Doctor> {
    Ok(ok(state.services.doctors.get(&id).await?))
}

async fn get_doctor_by_user(State(state): State<AppState>, PathParam(user): PathParam<Uuid>) -> ApiResult<Doctor> {
    Ok(ok(state.services.doctors.get_by_user(&user).await?))
}

async fn search_doctors(
    State(state): State<AppState>,
    PathParam(specialization): PathParam<String>,
) -> ApiResult<Vec<Doctor>> {
    Ok(listed(state.services.doctors.search(&specialization).await?))
}

async fn create_doctor(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    JsonBody(new): JsonBody<NewDoctor>,
) -> CreatedResult<Doctor> {
    Ok(created(state.services.doctors.create(&caller, new).await?))
}

async fn update_doctor(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    PathParam(id): PathParam<Uuid>,
    JsonBody(update): JsonBody<DoctorUpdate>,
) -> ApiResult<Doctor> {
    Ok(ok(state.services.doctors.update(&caller, &id, update).await?))
}

async fn deactivate_doctor(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    PathParam(id): PathParam<Uuid>,
) -> ApiResult<Doctor> {
    Ok(ok(state.services.doctors.deactivate(&caller, &id).await?))
}
