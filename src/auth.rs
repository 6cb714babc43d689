use actix_web::{http::header::AUTHORIZATION, HttpRequest};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, SaltString},
    Argon2, PasswordVerifier,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::{config::Config, db, errors::AppError, structs::Principal, AppState};

/// Claims embedded in every access token. `sub` and `email` both carry the
/// principal's email address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub email: String,
    pub exp: i64,
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &SaltString::generate(&mut OsRng))
        .map_err(|e| {
            log::error!("Failed to hash password: {}", e);
            AppError::PasswordError(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

/// Verify a plaintext password against a stored PHC-format hash.
/// `Ok(false)` on mismatch; an error only when the stored hash is malformed.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| AppError::PasswordError(format!("invalid hash format: {}", e)))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AppError::PasswordError(e.to_string())),
    }
}

pub fn issue_token(email: &str, role: &str, config: &Config) -> Result<String, AppError> {
    let claims = Claims {
        sub: email.to_string(),
        role: role.to_string(),
        email: email.to_string(),
        exp: Utc::now().timestamp() + config.token_ttl_minutes * 60,
    };
    encode(
        &Header::new(config.jwt_algorithm),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| {
        log::error!("Failed to sign token: {}", e);
        AppError::InternalServerError
    })
}

pub fn decode_token(token: &str, config: &Config) -> Result<Claims, AppError> {
    let validation = Validation::new(config.jwt_algorithm);
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::TokenExpired,
        _ => AppError::TokenInvalid,
    })
}

fn bearer_token(request: &HttpRequest) -> Result<&str, AppError> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(AppError::Unauthenticated)
}

/// Resolve the caller to either a user or an admin. Looks up the users
/// table first, then admins. Invalid or expired tokens answer 401, an
/// email that matches neither table answers 404.
pub async fn current_principal(
    state: &AppState,
    request: &HttpRequest,
) -> Result<Principal, AppError> {
    let token = bearer_token(request)?;
    let claims = decode_token(token, &state.config)?;
    if claims.sub.is_empty() {
        return Err(AppError::TokenInvalid);
    }

    if let Some(user) = db::get_user_by_email(state, &claims.sub).await? {
        return Ok(Principal::User(user));
    }
    if let Some(admin) = db::get_admin_by_email(state, &claims.sub).await? {
        return Ok(Principal::Admin(admin));
    }
    Err(AppError::NotFound("User".into()))
}

/// Resolve the caller as an admin, rejecting user-role tokens outright.
/// Only the admins table is consulted.
pub async fn current_admin(
    state: &AppState,
    request: &HttpRequest,
) -> Result<crate::structs::Admin, AppError> {
    let token = bearer_token(request)?;
    let claims = decode_token(token, &state.config)
        .map_err(|_| AppError::Forbidden("Could not validate credentials".into()))?;
    if claims.role != "admin" {
        return Err(AppError::Forbidden("Not authorized".into()));
    }
    if claims.sub.is_empty() {
        return Err(AppError::TokenInvalid);
    }
    db::get_admin_by_email(state, &claims.sub)
        .await?
        .ok_or_else(|| AppError::NotFound("Admin".into()))
}

/// Resolve the caller as a user, rejecting admin-role tokens outright.
/// Only the users table is consulted.
pub async fn current_user(
    state: &AppState,
    request: &HttpRequest,
) -> Result<crate::structs::User, AppError> {
    let token = bearer_token(request)?;
    let claims = decode_token(token, &state.config)
        .map_err(|_| AppError::Forbidden("Could not validate credentials".into()))?;
    if claims.role != "user" {
        return Err(AppError::Forbidden("Not authorized".into()));
    }
    db::get_user_by_email(state, &claims.email)
        .await?
        .ok_or_else(|| AppError::NotFound("User".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::Algorithm;

    fn test_config(ttl_minutes: i64) -> Config {
        Config {
            database_url: String::new(),
            bind_addr: String::new(),
            jwt_secret: "test-secret".into(),
            jwt_algorithm: Algorithm::HS256,
            token_ttl_minutes: ttl_minutes,
            upload_dir: "uploads".into(),
        }
    }

    #[test]
    fn password_roundtrip() {
        let hash = hash_password("hunter2hunter2!").unwrap();
        assert!(verify_password("hunter2hunter2!", &hash).unwrap());
        assert!(!verify_password("wrong-password", &hash).unwrap());
    }

    #[test]
    fn malformed_hash_is_an_error_not_a_mismatch() {
        assert!(verify_password("anything", "not-a-phc-hash").is_err());
    }

    #[test]
    fn token_roundtrip_preserves_claims() {
        let config = test_config(60);
        let token = issue_token("a@example.com", "admin", &config).unwrap();
        let claims = decode_token(&token, &config).unwrap();
        assert_eq!(claims.sub, "a@example.com");
        assert_eq!(claims.email, "a@example.com");
        assert_eq!(claims.role, "admin");
        assert!(claims.exp > Utc::now().timestamp());
    }

    #[test]
    fn expired_token_is_rejected() {
        // negative TTL puts exp well past the default validation leeway
        let config = test_config(-10);
        let token = issue_token("a@example.com", "user", &config).unwrap();
        match decode_token(&token, &config) {
            Err(AppError::TokenExpired) => {}
            other => panic!("expected TokenExpired, got {:?}", other.map(|c| c.role)),
        }
    }

    #[test]
    fn tampered_token_is_invalid() {
        let config = test_config(60);
        let token = issue_token("a@example.com", "user", &config).unwrap();
        let mut forged = token.clone();
        forged.truncate(token.len() - 2);
        match decode_token(&forged, &config) {
            Err(AppError::TokenInvalid) => {}
            other => panic!("expected TokenInvalid, got {:?}", other.map(|c| c.role)),
        }

        let other_config = Config {
            jwt_secret: "different-secret".into(),
            ..test_config(60)
        };
        assert!(matches!(
            decode_token(&token, &other_config),
            Err(AppError::TokenInvalid)
        ));
    }
}
