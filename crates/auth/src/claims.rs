use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use stockhouse_core::{UserId, Warehouse};

use crate::{Actor, Role};

/// Bearer token claims.
///
/// `iat` and `exp` are seconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: UserId,
    pub username: String,
    pub role: Role,
    #[serde(default)]
    pub warehouse: Option<Warehouse>,
    pub iat: i64,
    pub exp: i64,
}

impl JwtClaims {
    pub fn actor(&self) -> Actor {
        Actor {
            user_id: self.sub,
            username: self.username.clone(),
            role: self.role,
            warehouse: self.warehouse,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (iat is in the future)")]
    NotYetValid,

    #[error("invalid token time window (exp <= iat)")]
    InvalidTimeWindow,

    #[error("storekeeper token carries no warehouse")]
    MissingWarehouse,
}

/// Deterministically validate claims against `now`.
pub fn validate_claims(claims: &JwtClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    let now = now.timestamp();
    if claims.exp <= claims.iat {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.iat {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.exp {
        return Err(TokenValidationError::Expired);
    }
    if claims.role == Role::Storekeeper && claims.warehouse.is_none() {
        return Err(TokenValidationError::MissingWarehouse);
    }
    Ok(())
}

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("invalid token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Claims(#[from] TokenValidationError),
}

/// Verifies a bearer token and returns its claims.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, JwtError>;
}

/// HMAC-SHA256 signed tokens with a shared secret.
pub struct Hs256JwtValidator {
    decoding: DecodingKey,
    encoding: EncodingKey,
    validation: Validation,
}

impl Hs256JwtValidator {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Time window is checked by `validate_claims` against the caller's clock.
        validation.validate_exp = false;
        Self {
            decoding: DecodingKey::from_secret(secret.as_ref()),
            encoding: EncodingKey::from_secret(secret.as_ref()),
            validation,
        }
    }

    /// Sign claims (dev tooling and tests).
    pub fn issue(&self, claims: &JwtClaims) -> Result<String, JwtError> {
        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            claims,
            &self.encoding,
        )?)
    }
}

impl JwtValidator for Hs256JwtValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, JwtError> {
        let data = jsonwebtoken::decode::<JwtClaims>(token, &self.decoding, &self.validation)?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn claims(now: DateTime<Utc>) -> JwtClaims {
        JwtClaims {
            sub: UserId::new(),
            username: "jana".to_string(),
            role: Role::Storekeeper,
            warehouse: Some(Warehouse::Brno),
            iat: now.timestamp(),
            exp: (now + Duration::minutes(10)).timestamp(),
        }
    }

    #[test]
    fn issued_token_round_trips_through_validator() {
        let now = Utc::now();
        let v = Hs256JwtValidator::new("secret");
        let token = v.issue(&claims(now)).unwrap();

        let decoded = v.validate(&token, now).unwrap();
        assert_eq!(decoded.username, "jana");
        assert_eq!(decoded.actor().warehouse, Some(Warehouse::Brno));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let now = Utc::now();
        let token = Hs256JwtValidator::new("secret").issue(&claims(now)).unwrap();
        let err = Hs256JwtValidator::new("other").validate(&token, now).unwrap_err();
        assert!(matches!(err, JwtError::Invalid(_)));
    }

    #[test]
    fn time_window_is_enforced() {
        let now = Utc::now();
        let c = claims(now);
        assert_eq!(
            validate_claims(&c, now + Duration::minutes(11)),
            Err(TokenValidationError::Expired)
        );
        assert_eq!(
            validate_claims(&c, now - Duration::minutes(1)),
            Err(TokenValidationError::NotYetValid)
        );

        let mut bad = c.clone();
        bad.exp = bad.iat;
        assert_eq!(validate_claims(&bad, now), Err(TokenValidationError::InvalidTimeWindow));
    }

    #[test]
    fn storekeeper_without_warehouse_is_rejected() {
        let now = Utc::now();
        let mut c = claims(now);
        c.warehouse = None;
        assert_eq!(validate_claims(&c, now), Err(TokenValidationError::MissingWarehouse));

        c.role = Role::Admin;
        assert!(validate_claims(&c, now).is_ok());
    }
}
