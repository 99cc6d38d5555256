// rest_api/src/routes/users.rs

use axum::{extract::State, routing::get, Router};
use serde::Deserialize;
use uuid::Uuid;

use models::medical::{Role, UserProfile, UserUpdate};

use crate::auth::{Authenticated, MaybeAuthenticated};
use crate::extract::{JsonBody, PathParam, QueryParams};
use crate::routes::{listed, ok, ApiResult};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct RoleFilter {
    pub role: Option<Role>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users))
        .route("/:id", get(get_user).put(update_user))
}

/// Listing doctors is public; any other listing needs an admin.
async fn list_users(
    State(state): State<AppState>,
    MaybeAuthenticated(caller): MaybeAuthenticated,
    QueryParams(filter): QueryParams<RoleFilter>,
) -> ApiResult<Vec<UserProfile>> {
    Ok(listed(state.services.users.list(caller.as_ref(), filter.role).await?))
}

async fn get_user(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    PathParam(id): PathParam<Uuid>,
) -> ApiResult<UserProfile> {
    Ok(ok(state.services.users.view(&caller, &id).await?))
}

async fn update_user(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    PathParam(id): PathParam<Uuid>,
    JsonBody(update): JsonBody<UserUpdate>,
) -> ApiResult<UserProfile> {
    Ok(ok(state.services.users.update(&caller, &id, update).await?))
}
