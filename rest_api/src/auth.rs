// rest_api/src/auth.rs
// Bearer-token extractors. The token only names the account; the account
// is reloaded on every request so deactivation takes effect immediately.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use models::errors::HospitalError;
use security::{bearer_token, validate_token, Caller};

use crate::{error::ApiError, AppState};

/// Rejects the request with 401 unless it carries a valid token for an
/// active account.
pub struct Authenticated(pub Caller);

/// For public routes that behave differently for signed-in callers. A
/// missing header yields `None`; a bad token is still rejected.
pub struct MaybeAuthenticated(pub Option<Caller>);

fn authorization_header(parts: &Parts) -> Option<&str> {
    parts.headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok())
}

async fn resolve(header: &str, state: &AppState) -> Result<Caller, ApiError> {
    let token = bearer_token(header)
        .ok_or_else(|| HospitalError::Unauthorized("Not authorized to access this route".to_string()))?;
    let claims = validate_token(token, &state.jwt_secret)?;
    Ok(state.services.users.authenticate(&claims.user_id()?).await?)
}

#[async_trait]
impl FromRequestParts<AppState> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match authorization_header(parts) {
            Some(header) => Ok(Authenticated(resolve(header, state).await?)),
            None => Err(HospitalError::Unauthorized("Not authorized to access this route".to_string()).into()),
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for MaybeAuthenticated {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match authorization_header(parts) {
            Some(header) => Ok(MaybeAuthenticated(Some(resolve(header, state).await?))),
            None => Ok(MaybeAuthenticated(None)),
        }
    }
}
