//! Admin authentication: PIN hashing, signed session tokens, and the
//! `AdminSession` request extractor.
//!
//! Sessions are HMAC-signed JWTs carried in an HttpOnly cookie. The token is
//! opaque to the client and embeds its own expiry; a missing, malformed, or
//! expired credential is treated identically as "unauthenticated". There is no
//! server-side session table, so logout only clears the client cookie.

use std::future::Future;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, StatusCode},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::env;
use uuid::Uuid;

use crate::db::{self, DbPool};

const AUTH_COOKIE_NAME: &str = "admin_session";
const SESSION_DAYS: i64 = 7;

/// Claims embedded in the session token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub name: String,
    pub exp: usize,
}

/// Authenticated admin identity, extracted from the session cookie (or a
/// Bearer header) on privileged routes.
pub struct AdminSession {
    pub admin_id: String,
    pub admin_name: String,
}

impl<S> FromRequestParts<S> for AdminSession
where
    S: Send + Sync + 'static,
{
    type Rejection = (StatusCode, String);

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        async move {
            let unauthorized = || {
                (
                    StatusCode::UNAUTHORIZED,
                    "No autorizado. Inicie sesión.".to_string(),
                )
            };
            let token = extract_token_from_headers(&parts.headers).ok_or_else(unauthorized)?;
            let claims = validate_token_str(&token).map_err(|_| unauthorized())?;
            Ok(AdminSession {
                admin_id: claims.sub,
                admin_name: claims.name,
            })
        }
    }
}

/// True for a well-formed PIN: 4 to 6 ASCII digits.
pub fn is_valid_pin(pin: &str) -> bool {
    (4..=6).contains(&pin.len()) && pin.bytes().all(|b| b.is_ascii_digit())
}

pub fn hash_pin(pin: &str) -> anyhow::Result<String> {
    Ok(bcrypt::hash(pin, bcrypt::DEFAULT_COST)?)
}

pub fn verify_pin(pin: &str, hash: &str) -> bool {
    bcrypt::verify(pin, hash).unwrap_or(false)
}

/// Mint a session token valid for seven days.
pub fn create_session_token(admin_id: &str, admin_name: &str) -> anyhow::Result<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::days(SESSION_DAYS))
        .expect("valid timestamp")
        .timestamp();

    let claims = Claims {
        sub: admin_id.to_string(),
        name: admin_name.to_string(),
        exp: expiration as usize,
    };

    let secret = env::var("JWT_SECRET")
        .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable not set"))?;
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )?;
    Ok(token)
}

/// Stateless session check: signature and embedded expiry only.
pub fn validate_token_str(token: &str) -> anyhow::Result<Claims> {
    let secret = env::var("JWT_SECRET")
        .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable not set"))?;
    let mut validation = Validation::default();
    validation.validate_exp = true;
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &validation,
    )?;
    Ok(data.claims)
}

pub fn extract_token_from_headers(headers: &HeaderMap) -> Option<String> {
    if let Some(auth_header) = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
    {
        if let Some(token) = auth_header.strip_prefix("Bearer ") {
            return Some(token.to_string());
        }
    }

    if let Some(cookie_header) = headers.get(header::COOKIE).and_then(|h| h.to_str().ok()) {
        for cookie in cookie_header.split(';') {
            let cookie = cookie.trim();
            if let Some((k, v)) = cookie.split_once('=') {
                if k == AUTH_COOKIE_NAME {
                    return Some(v.to_string());
                }
            }
        }
    }
    None
}

pub fn build_session_cookie(token: &str) -> String {
    let secure = env::var("RUST_ENV").unwrap_or_else(|_| "development".to_string()) == "production";
    let mut cookie = format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        AUTH_COOKIE_NAME,
        token,
        SESSION_DAYS * 24 * 60 * 60
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

pub fn clear_session_cookie() -> String {
    let secure = env::var("RUST_ENV").unwrap_or_else(|_| "development".to_string()) == "production";
    let mut cookie = format!(
        "{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0",
        AUTH_COOKIE_NAME
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

#[derive(Debug, PartialEq)]
pub enum RegisterOutcome {
    Created(String),
    InvalidPin,
    PinInUse,
}

/// Register a new admin. PINs must be unique across admins so that
/// first-match login is unambiguous, so the candidate PIN is checked against
/// every stored hash before the insert.
pub async fn register_admin(
    pool: &DbPool,
    name: &str,
    pin: &str,
) -> anyhow::Result<RegisterOutcome> {
    if !is_valid_pin(pin) {
        return Ok(RegisterOutcome::InvalidPin);
    }

    let admins = db::list_admins(pool).await?;
    if admins.iter().any(|a| verify_pin(pin, &a.pin_hash)) {
        return Ok(RegisterOutcome::PinInUse);
    }

    let id = Uuid::new_v4().to_string();
    let pin_hash = hash_pin(pin)?;
    db::create_admin(pool, &id, name, &pin_hash, Utc::now()).await?;
    Ok(RegisterOutcome::Created(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_secret() {
        std::env::set_var("JWT_SECRET", "test-secret-for-unit-tests");
    }

    #[test]
    fn pin_format_is_4_to_6_digits() {
        assert!(is_valid_pin("1234"));
        assert!(is_valid_pin("123456"));
        assert!(!is_valid_pin("123"));
        assert!(!is_valid_pin("1234567"));
        assert!(!is_valid_pin("12a4"));
        assert!(!is_valid_pin(""));
    }

    #[test]
    fn pin_hash_verifies_and_rejects() {
        let hash = bcrypt::hash("4321", 4).unwrap();
        assert!(verify_pin("4321", &hash));
        assert!(!verify_pin("1234", &hash));
        assert!(!verify_pin("4321", "not-a-hash"));
    }

    #[test]
    fn session_token_round_trips() {
        set_secret();
        let token = create_session_token("admin-1", "Padre José").unwrap();
        let claims = validate_token_str(&token).unwrap();
        assert_eq!(claims.sub, "admin-1");
        assert_eq!(claims.name, "Padre José");
        assert!(claims.exp as i64 > Utc::now().timestamp());
    }

    #[test]
    fn garbage_and_expired_tokens_are_rejected() {
        set_secret();
        assert!(validate_token_str("not-a-token").is_err());

        // Expired well past the default leeway.
        let claims = Claims {
            sub: "admin-1".to_string(),
            name: "X".to_string(),
            exp: (Utc::now().timestamp() - 3600) as usize,
        };
        let secret = std::env::var("JWT_SECRET").unwrap();
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_ref()),
        )
        .unwrap();
        assert!(validate_token_str(&token).is_err());
    }

    #[test]
    fn token_extraction_prefers_bearer_then_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, "other=1; admin_session=abc".parse().unwrap());
        assert_eq!(extract_token_from_headers(&headers), Some("abc".to_string()));

        headers.insert(header::AUTHORIZATION, "Bearer xyz".parse().unwrap());
        assert_eq!(extract_token_from_headers(&headers), Some("xyz".to_string()));
    }
}
