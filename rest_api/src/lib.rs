// rest_api/src/lib.rs
// HTTP surface of the hospital service: an axum router over the engine
// services, plus server startup and shutdown.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    routing::get,
    Json, Router,
};
use log::{info, warn};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use lib::{Database, HospitalServices};
use models::medical::{NewUser, Role};
use notifications_service::{LogNotifier, NotificationQueue, Notifier, WebhookNotifier};

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod routes;

pub use crate::config::{load_rest_api_config, RestApiConfig};
pub use crate::error::ApiError;

/// Shared state for the axum application.
#[derive(Clone)]
pub struct AppState {
    pub services: HospitalServices,
    pub jwt_secret: Arc<str>,
}

impl AppState {
    pub fn new(services: HospitalServices, jwt_secret: &str) -> Self {
        AppState { services, jwt_secret: Arc::from(jwt_secret) }
    }
}

async fn health_check_handler() -> Json<Value> {
    Json(json!({ "success": true, "data": { "status": "ok" } }))
}

/// All routes, mounted under `/api/v1`.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_origin(Any);

    let api = Router::new()
        .route("/health", get(health_check_handler))
        .nest("/appointments", routes::appointments::router())
        .nest("/doctors", routes::doctors::router())
        .nest("/users", routes::users::router())
        .nest("/inventory", routes::inventory::router());

    Router::new().nest("/api/v1", api).with_state(state).layer(cors)
}

/// Creates the configured admin account on first start.
pub async fn bootstrap_admin(services: &HospitalServices, config: &RestApiConfig) -> Result<()> {
    let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
        return Ok(());
    };
    if services.users.find_by_email(email).await?.is_some() {
        info!("Admin account {} already exists", email);
        return Ok(());
    }
    let admin = services
        .users
        .register(NewUser {
            name: "Hospital Administrator".to_string(),
            email: email.clone(),
            password: password.clone(),
            role: Role::Admin,
            phone: None,
            date_of_birth: None,
        })
        .await
        .context("Failed to create the bootstrap admin account")?;
    warn!("Created admin account {} ({}); change its password", admin.email, admin.id);
    Ok(())
}

fn notifier_for(config: &RestApiConfig) -> Arc<dyn Notifier> {
    match &config.notification_webhook_url {
        Some(url) => {
            info!("Delivering notifications to webhook {}", url);
            Arc::new(WebhookNotifier::new(url.clone()))
        }
        None => {
            info!("No notification webhook configured; notifications are logged only");
            Arc::new(LogNotifier)
        }
    }
}

/// Opens storage, starts the background tasks and serves until `shutdown`
/// resolves.
pub async fn start_server<F>(config: RestApiConfig, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let database = Database::open(&config.data_directory)
        .with_context(|| format!("Failed to open database at {}", config.data_directory.display()))?;

    let (queue, dispatcher) = NotificationQueue::spawn(notifier_for(&config));
    let services = HospitalServices::new(&database, queue);
    bootstrap_admin(&services, &config).await?;

    let sweep = services
        .reminder_sweep()
        .spawn(Duration::from_secs(config.reminder_interval_secs));

    let app = build_router(AppState::new(services, &config.jwt_secret));
    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to address: {}", addr))?;
    info!("REST API server listening on {}", addr);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown)
        .await
        .context("REST API server failed to start or run")?;

    sweep.abort();
    let _ = sweep.await;
    // The dispatcher drains what is queued once every sender is gone.
    let _ = dispatcher.await;
    database.flush().await?;
    info!("REST API server stopped.");
    Ok(())
}
