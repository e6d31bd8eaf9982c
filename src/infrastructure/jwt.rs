//! Bearer-token authentication.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::ports::PrincipalResolver;
use crate::domain::principal::{Principal, Role};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub role: String,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
}

/// Resolves HS256 `Authorization: Bearer <token>` headers.
pub struct JwtPrincipalResolver {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtPrincipalResolver {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Signs a token for `principal` valid for `ttl`.
    pub fn issue(&self, principal: &Principal, ttl: Duration) -> Result<String, DomainError> {
        let claims = Claims {
            sub: principal.id.to_string(),
            role: principal.role.as_str().to_string(),
            exp: (Utc::now() + ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| DomainError::Internal(format!("token signing failed: {e}")))
    }

    fn validate(&self, token: &str) -> Result<Claims, DomainError> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => {
                    DomainError::Unauthenticated("access token expired".to_string())
                }
                _ => DomainError::Unauthenticated("invalid access token".to_string()),
            })
    }
}

impl PrincipalResolver for JwtPrincipalResolver {
    fn resolve(&self, authorization: Option<&str>) -> Result<Principal, DomainError> {
        let token = authorization
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| DomainError::Unauthenticated("missing access token".to_string()))?;

        let claims = self.validate(token)?;
        let id = Uuid::parse_str(&claims.sub)
            .map_err(|_| DomainError::Unauthenticated("invalid token subject".to_string()))?;
        Ok(Principal {
            id,
            role: Role::from_name(&claims.role),
        })
    }
}
