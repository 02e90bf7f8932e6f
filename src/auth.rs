use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::AppState;

/// Bearer token claims. Tokens are minted by the identity collaborator;
/// this service only verifies them and reads the role.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    pub role: String,
    pub exp: usize,
}

pub fn issue_token(
    secret: &str,
    user_id: Uuid,
    email: Option<String>,
    role: &str,
    ttl_secs: usize,
) -> Result<String, ServiceError> {
    let claims = Claims {
        sub: user_id,
        email,
        role: role.to_string(),
        exp: Utc::now().timestamp() as usize + ttl_secs,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ServiceError::InternalError(format!("failed to sign token: {}", e)))
}

pub fn verify_token(secret: &str, token: &str) -> Result<Claims, ServiceError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| ServiceError::Unauthorized("Token tidak valid atau kadaluarsa".to_string()))
}

fn bearer_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Verified bearer token of any role.
pub struct AuthenticatedUser(pub Claims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| ServiceError::Unauthorized("Token tidak ditemukan".to_string()))?;
        let claims = verify_token(&state.config.jwt_secret, &token)?;
        Ok(AuthenticatedUser(claims))
    }
}

/// Verified bearer token with the `admin` role.
pub struct AdminUser(pub Claims);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthenticatedUser(claims) =
            AuthenticatedUser::from_request_parts(parts, state).await?;
        if claims.role != "admin" {
            return Err(ServiceError::Forbidden(
                "Akses khusus admin".to_string(),
            ));
        }
        Ok(AdminUser(claims))
    }
}

/// Optional identity: guest checkout and public tracking pass through with
/// `None`, an invalid token is still rejected.
pub struct OptionalUser(pub Option<Claims>);

#[async_trait]
impl FromRequestParts<AppState> for OptionalUser {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match bearer_token(parts) {
            None => Ok(OptionalUser(None)),
            Some(token) => {
                let claims = verify_token(&state.config.jwt_secret, &token)?;
                Ok(OptionalUser(Some(claims)))
            }
        }
    }
}
