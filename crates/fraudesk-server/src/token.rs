//! Signed, time-limited bearer tokens.
//!
//! Tokens are HS256 JWTs signed with a key derived once from the configured
//! secret. They carry everything the gates need (subject rut, display name,
//! profile id and role) so no session state is kept on the server.

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use chrono::{DateTime, TimeDelta, Utc};
use fraudesk_core::account::Role;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::JwtConfig;

/// Shortest accepted HS256 secret, in bytes.
pub const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum TokenError {
  #[error("invalid token: {0}")]
  InvalidToken(String),

  #[error("signing secret is {0} bytes; at least {MIN_SECRET_LEN} are required")]
  WeakKey(usize),

  #[error("invalid token header name {0:?}")]
  HeaderName(String),

  #[error("token prefix {0:?} is not a valid header value")]
  Prefix(String),

  #[error("failed to sign token: {0}")]
  Signing(#[source] jsonwebtoken::errors::Error),
}

/// Claims embedded in every token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
  /// The identity's rut.
  pub sub:         String,
  /// Display name of the caller's profile.
  pub name:        String,
  /// Numeric id of the caller's client or manager profile.
  pub id:          i64,
  pub authorities: Vec<Role>,
  pub iat:         i64,
  pub exp:         i64,
  pub jti:         String,
}

/// Mints and verifies tokens, and knows how they travel over HTTP.
pub struct TokenCodec {
  encoding:   EncodingKey,
  decoding:   DecodingKey,
  validation: Validation,
  ttl:        TimeDelta,
  header:     HeaderName,
  prefix:     String,
}

impl TokenCodec {
  /// Build a codec from configuration. A weak secret, an unusable header
  /// name or a prefix that cannot appear in a header are startup errors.
  pub fn from_config(config: &JwtConfig) -> Result<Self, TokenError> {
    let secret = config.secret_key.as_bytes();
    if secret.len() < MIN_SECRET_LEN {
      return Err(TokenError::WeakKey(secret.len()));
    }
    let header = HeaderName::from_bytes(config.header.as_bytes())
      .map_err(|_| TokenError::HeaderName(config.header.clone()))?;
    HeaderValue::from_str(&config.token_prefix)
      .map_err(|_| TokenError::Prefix(config.token_prefix.clone()))?;

    // Expiry is checked by hand in `verify_at` so it can run against any
    // clock; the library still insists the claim is present.
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp", "sub"]);

    Ok(Self {
      encoding: EncodingKey::from_secret(secret),
      decoding: DecodingKey::from_secret(secret),
      validation,
      ttl: TimeDelta::hours(i64::from(config.ttl_hours)),
      header,
      prefix: config.token_prefix.clone(),
    })
  }

  pub fn mint(&self, subject: &str, name: &str, id: i64, role: Role) -> Result<String, TokenError> {
    self.mint_at(subject, name, id, role, Utc::now())
  }

  pub fn mint_at(
    &self,
    subject: &str,
    name: &str,
    id: i64,
    role: Role,
    issued_at: DateTime<Utc>,
  ) -> Result<String, TokenError> {
    let claims = Claims {
      sub:         subject.to_owned(),
      name:        name.to_owned(),
      id,
      authorities: vec![role],
      iat:         issued_at.timestamp(),
      exp:         (issued_at + self.ttl).timestamp(),
      jti:         Uuid::new_v4().to_string(),
    };
    encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(TokenError::Signing)
  }

  pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
    self.verify_at(token, Utc::now())
  }

  /// Verify the signature and shape of `token`, then reject it if `now` is at
  /// or past its expiry.
  pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
    let claims = decode::<Claims>(token, &self.decoding, &self.validation)
      .map_err(|e| TokenError::InvalidToken(e.to_string()))?
      .claims;

    if now.timestamp() >= claims.exp {
      return Err(TokenError::InvalidToken("token has expired".into()));
    }
    if claims.authorities.is_empty() {
      return Err(TokenError::InvalidToken("token carries no role".into()));
    }
    Ok(claims)
  }

  // ── Transport ─────────────────────────────────────────────────────────────

  pub fn header_name(&self) -> &HeaderName { &self.header }

  /// The header value announcing `token` to clients. Minted tokens are
  /// base64url text, so only the prefix can make this fail.
  pub fn header_value(&self, token: &str) -> Result<HeaderValue, TokenError> {
    HeaderValue::from_str(&format!("{}{token}", self.prefix))
      .map_err(|_| TokenError::Prefix(self.prefix.clone()))
  }

  /// The raw token carried by `headers`, if the configured header is present
  /// and starts with the configured prefix.
  pub fn bearer<'h>(&self, headers: &'h HeaderMap) -> Option<&'h str> {
    headers
      .get(&self.header)
      .and_then(|v| v.to_str().ok())
      .and_then(|v| v.strip_prefix(self.prefix.as_str()))
  }
}
