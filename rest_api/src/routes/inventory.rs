// rest_api/src/routes/inventory.rs

use axum::{
    extract::State,
    routing::{get, post},
    Router,
};

use models::medical::{InventoryStats, InventoryUpdate, InventoryView};

use crate::auth::Authenticated;
use crate::extract::JsonBody;
use crate::routes::{created, ok, ApiResult, CreatedResult};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_inventory).put(update_inventory))
        .route("/stats", get(inventory_stats))
        .route("/initialize", post(initialize_inventory))
}

async fn get_inventory(State(state): State<AppState>) -> ApiResult<InventoryView> {
    Ok(ok(state.services.inventory.get().await?))
}

async fn update_inventory(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    JsonBody(update): JsonBody<InventoryUpdate>,
) -> ApiResult<InventoryView> {
    Ok(ok(state.services.inventory.update(&caller, update).await?))
}

async fn inventory_stats(State(state): State<AppState>) -> ApiResult<InventoryStats> {
    Ok(ok(state.services.inventory.stats().await?))
}

async fn initialize_inventory(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
) -> CreatedResult<InventoryView> {
    Ok(created(state.services.inventory.initialize(&caller).await?))
}
