//! Password hashing, bearer tokens and the authenticated-user extractor.
//!
//! - Passwords are stored as `pbkdf2:<iterations>:<hex salt>:<hex hash>`
//!   (PBKDF2-HMAC-SHA256) and compared in constant time.
//! - `POST /auth/login` issues a JWT; every other protected route expects
//!   `Authorization: Bearer <jwt>`.
//! - The user row is reloaded on each request so role changes apply at once.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use tracing::warn;

use crate::{
    db::User,
    error::{ApiError, forbidden_error, repository_error, unauthorized_error},
    service::AppState,
};

const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    SmeLeader,
    SalesAgent,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::SmeLeader => "smeleader",
            Role::SalesAgent => "salesagent",
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("malformed password hash")]
    MalformedHash,
    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

pub fn hash_password(password: &str, iterations: u32) -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt);

    let mut hash = [0u8; HASH_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, iterations, &mut hash);

    format!(
        "pbkdf2:{}:{}:{}",
        iterations,
        hex::encode(salt),
        hex::encode(hash)
    )
}

pub fn verify_password(password: &str, stored: &str) -> Result<bool, AuthError> {
    let mut parts = stored.split(':');
    let (Some("pbkdf2"), Some(iterations), Some(salt), Some(expected), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return Err(AuthError::MalformedHash);
    };

    let iterations: u32 = iterations.parse().map_err(|_| AuthError::MalformedHash)?;
    let salt = hex::decode(salt).map_err(|_| AuthError::MalformedHash)?;
    let expected = hex::decode(expected).map_err(|_| AuthError::MalformedHash)?;
    if iterations == 0 || expected.is_empty() {
        return Err(AuthError::MalformedHash);
    }

    let mut actual = vec![0u8; expected.len()];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, iterations, &mut actual);

    Ok(constant_time_eq(&actual, &expected))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |diff, (x, y)| diff | (x ^ y)) == 0
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub username: String,
    pub role: Role,
    /// Issued-at unix seconds
    pub iat: i64,
    /// Expiration unix seconds
    pub exp: i64,
}

pub fn issue_jwt(user: &User, secret: &str, ttl_hours: i64) -> Result<(String, i64), AuthError> {
    let now = Utc::now();
    let exp = now + Duration::hours(ttl_hours.max(1));
    let claims = Claims {
        sub: user.id.to_string(),
        username: user.username.clone(),
        role: user.role,
        iat: now.timestamp(),
        exp: exp.timestamp(),
    };
    let token = jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok((token, claims.exp))
}

pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let token_data = jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

/// The user behind a valid bearer token.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    pub fn id(&self) -> i64 {
        self.0.id
    }

    pub fn role(&self) -> Role {
        self.0.role
    }

    pub fn require_role(&self, role: Role) -> Result<(), ApiError> {
        if self.0.role == role {
            Ok(())
        } else {
            Err(forbidden_error(
                "Access denied: you do not have permission to access this resource",
            ))
        }
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .unwrap_or("");

        let token = auth_header
            .strip_prefix("Bearer ")
            .or_else(|| auth_header.strip_prefix("bearer "))
            .unwrap_or("")
            .trim();

        if token.is_empty() {
            return Err(unauthorized_error("Missing Authorization header"));
        }

        let claims = verify_jwt(token, &state.config.jwt_secret).map_err(|e| {
            warn!(error = %e, "Rejected bearer token");
            unauthorized_error("Invalid or expired token")
        })?;

        let user_id: i64 = claims
            .sub
            .parse()
            .map_err(|_| unauthorized_error("Invalid or expired token"))?;

        let user = state
            .users
            .find_by_id(user_id)
            .await
            .map_err(|e| repository_error("Failed to load user", e))?
            .ok_or_else(|| unauthorized_error("User no longer exists"))?;

        Ok(CurrentUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> User {
        User {
            id: 7,
            username: "sara".to_string(),
            password_hash: String::new(),
            role,
            manager_id: None,
        }
    }

    #[test]
    fn password_round_trip() {
        let stored = hash_password("correct horse", 1_000);
        assert!(stored.starts_with("pbkdf2:1000:"));
        assert!(verify_password("correct horse", &stored).unwrap());
        assert!(!verify_password("wrong horse", &stored).unwrap());
    }

    #[test]
    fn salts_differ_between_hashes() {
        assert_ne!(hash_password("same", 1_000), hash_password("same", 1_000));
    }

    #[test]
    fn malformed_hashes_are_rejected() {
        for stored in ["", "plain", "pbkdf2:abc:00:00", "pbkdf2:10:zz:00", "scrypt:1:00:00", "pbkdf2:1:00:00:00"] {
            assert!(verify_password("x", stored).is_err(), "accepted {stored}");
        }
    }

    #[test]
    fn jwt_round_trip_keeps_identity() {
        let (token, exp) = issue_jwt(&user(Role::Manager), "secret", 24).unwrap();
        let claims = verify_jwt(&token, "secret").unwrap();

        assert_eq!(claims.sub, "7");
        assert_eq!(claims.role, Role::Manager);
        assert_eq!(claims.exp, exp);
        assert!(verify_jwt(&token, "other-secret").is_err());
    }

    #[test]
    fn role_guard() {
        let current = CurrentUser(user(Role::SalesAgent));
        assert!(current.require_role(Role::SalesAgent).is_ok());
        let (status, _) = current.require_role(Role::Manager).unwrap_err();
        assert_eq!(status, axum::http::StatusCode::FORBIDDEN);
    }

    #[test]
    fn roles_use_lowercase_names() {
        assert_eq!(serde_json::to_string(&Role::SmeLeader).unwrap(), "\"smeleader\"");
        assert_eq!(
            serde_json::from_str::<Role>("\"salesagent\"").unwrap(),
            Role::SalesAgent
        );
        assert_eq!(Role::SalesAgent.as_str(), "salesagent");
    }
}
