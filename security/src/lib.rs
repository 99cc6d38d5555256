// security/src/lib.rs
// Caller identity, bearer-token handling and the authorization policy.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use log::debug;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use models::errors::{HospitalError, HospitalResult};
use models::medical::Role;

pub mod policy;

pub use policy::{appointment_scope, allows_anonymous, authorize, Action, AppointmentScope, Resource};

/// The authenticated principal of a request. `role` is the role stored on
/// the account, not whatever the token claimed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub id: Uuid,
    pub role: Role,
}

impl Caller {
    pub fn new(id: Uuid, role: Role) -> Self {
        Caller { id, role }
    }

    pub fn is(&self, role: Role) -> bool {
        self.role == role
    }
}

/// Claims for JWT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub iat: u64,
    pub exp: u64,
}

impl Claims {
    pub fn user_id(&self) -> HospitalResult<Uuid> {
        Uuid::parse_str(&self.sub).map_err(|_| HospitalError::Unauthorized("Not authorized, token failed".to_string()))
    }
}

/// Issues an HS256 token for `user_id`. Login is handled elsewhere; this is
/// used by provisioning tools and tests.
pub fn issue_token(user_id: Uuid, role: Role, secret: &str, ttl_hours: i64) -> HospitalResult<String> {
    if secret.trim().is_empty() {
        return Err(HospitalError::ConfigurationError("JWT secret is not configured".to_string()));
    }
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        role,
        iat: now.timestamp().max(0) as u64,
        exp: (now + Duration::hours(ttl_hours)).timestamp().max(0) as u64,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| HospitalError::InternalError(format!("Failed to encode JWT: {}", e)))
}

/// Decodes and validates a JWT token. Any failure is `Unauthorized`.
pub fn validate_token(token: &str, secret: &str) -> HospitalResult<Claims> {
    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &Validation::default())
        .map(|data| data.claims)
        .map_err(|e| {
            debug!("Rejected bearer token: {}", e);
            HospitalError::Unauthorized("Not authorized, token failed".to_string())
        })
}

/// Pulls the token out of an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-that-is-long-enough-for-hs256";

    #[test]
    fn should_round_trip_token() {
        let id = Uuid::new_v4();
        let token = issue_token(id, Role::Doctor, SECRET, 1).unwrap();
        let claims = validate_token(&token, SECRET).unwrap();
        assert_eq!(claims.user_id().unwrap(), id);
        assert_eq!(claims.role, Role::Doctor);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn should_reject_wrong_secret() {
        let token = issue_token(Uuid::new_v4(), Role::Patient, SECRET, 1).unwrap();
        assert!(matches!(
            validate_token(&token, "another-secret-entirely-different"),
            Err(HospitalError::Unauthorized(_))
        ));
    }

    #[test]
    fn should_reject_expired_token() {
        let token = issue_token(Uuid::new_v4(), Role::Patient, SECRET, -2).unwrap();
        assert!(matches!(validate_token(&token, SECRET), Err(HospitalError::Unauthorized(_))));
    }

    #[test]
    fn should_refuse_to_sign_with_blank_secret() {
        assert!(matches!(
            issue_token(Uuid::new_v4(), Role::Admin, "  ", 1),
            Err(HospitalError::ConfigurationError(_))
        ));
    }

    #[test]
    fn should_parse_bearer_header() {
        assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Basic abc"), None);
    }
}
