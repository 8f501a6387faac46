//! JWT authentication module.
//!
//! Tokens carry the caller's identity, role and home branch. Requests with
//! no `Authorization` header are treated as web-menu guests when they name a
//! branch with `?branch_id=`.

use axum::extract::{FromRequestParts, Query};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tavola_core::{CallerContext, Role};

use crate::error::ApiError;
use crate::AppState;

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (staff user id)
    pub sub: String,

    pub role: Role,

    /// Home branch; absent for owners
    #[serde(default)]
    pub branch_id: Option<String>,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    pub fn into_caller(self) -> Result<CallerContext, ApiError> {
        if self.role != Role::Owner && self.branch_id.is_none() {
            return Err(ApiError::Unauthorized("Token has no branch".to_string()));
        }
        Ok(CallerContext::new(self.sub, self.role, self.branch_id))
    }
}

/// JWT token manager.
pub struct JwtManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_lifetime_secs: i64,
}

impl JwtManager {
    pub fn new(secret: &str, access_lifetime_secs: i64) -> Self {
        JwtManager {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            access_lifetime_secs,
        }
    }

    /// Issue an access token for `caller`.
    pub fn issue(&self, caller: &CallerContext) -> Result<String, ApiError> {
        let now = Utc::now();
        let claims = Claims {
            sub: caller.user_id.clone(),
            role: caller.role,
            branch_id: caller.branch_id.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(self.access_lifetime_secs)).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("Failed to generate token: {}", e)))
    }

    /// Validate and decode a token.
    pub fn validate(&self, token: &str) -> Result<Claims, ApiError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| ApiError::Unauthorized(format!("Invalid token: {}", e)))
    }
}

/// Extract bearer token from authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header.strip_prefix("Bearer ").map(str::trim)
}

#[derive(Debug, Deserialize)]
struct GuestScope {
    branch_id: Option<String>,
}

/// Authenticated (or guest) caller of a handler.
#[derive(Debug, Clone)]
pub struct Caller(pub CallerContext);

impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        if let Some(header) = header {
            let token = extract_bearer_token(header)
                .ok_or_else(|| ApiError::Unauthorized("Invalid authorization header".to_string()))?;
            let claims = state.jwt.validate(token).inspect_err(|e| {
                tracing::warn!(error = %e, uri = %parts.uri, "Rejected bearer token");
            })?;
            return claims.into_caller().map(Caller);
        }

        let Query(scope) = Query::<GuestScope>::try_from_uri(&parts.uri)?;
        match scope.branch_id.filter(|b| !b.trim().is_empty()) {
            Some(branch_id) => Ok(Caller(CallerContext::guest(branch_id))),
            None => Err(ApiError::Unauthorized("Missing bearer token".to_string())),
        }
    }
}
