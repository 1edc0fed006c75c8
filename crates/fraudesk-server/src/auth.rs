//! The authentication gate (`POST /login`), the authorization gate that runs
//! on every other route, and the [`Caller`] identity they hand downstream.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use axum::{
  Json,
  extract::{FromRequestParts, Request, State, rejection::JsonRejection},
  http::{StatusCode, request::Parts},
  middleware::Next,
  response::{IntoResponse, Response},
};
use fraudesk_core::{
  account::{Identity, Profile, Role},
  store::DeskStore,
};
use rand_core::OsRng;
use serde::Deserialize;

use crate::{AppState, error::ApiError, token::Claims};

// ─── Caller ──────────────────────────────────────────────────────────────────

/// The verified identity behind a request, decoded from its bearer token.
///
/// As an extractor it fails with [`ApiError::Unauthenticated`] when the
/// authorization gate attached no identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
  pub rut:  String,
  pub name: String,
  /// Id of the caller's client or manager profile.
  pub id:   i64,
  pub role: Role,
}

impl Caller {
  pub fn from_claims(claims: Claims) -> Option<Self> {
    let role = claims.authorities.first().copied()?;
    Some(Self { rut: claims.sub, name: claims.name, id: claims.id, role })
  }
}

impl<S: Send + Sync> FromRequestParts<S> for Caller {
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
    parts
      .extensions
      .get::<Caller>()
      .cloned()
      .ok_or(ApiError::Unauthenticated)
  }
}

// ─── Passwords ───────────────────────────────────────────────────────────────

/// Hash `password` into an argon2 PHC string.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|h| h.to_string())
    .map_err(|e| ApiError::Internal(format!("argon2 error: {e}")))
}

fn verify_password(password: &str, hash: &str) -> Result<(), ApiError> {
  let parsed = PasswordHash::new(hash).map_err(|_| ApiError::Unauthenticated)?;
  Argon2::default()
    .verify_password(password.as_bytes(), &parsed)
    .map_err(|_| ApiError::Unauthenticated)
}

// ─── Authentication gate ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
  pub username: String,
  pub password: String,
}

/// Resolve the profile owned by `identity`, chosen by its role.
pub async fn resolve_profile<S: DeskStore>(
  store: &S,
  identity: &Identity,
) -> Result<Option<Profile>, ApiError> {
  let profile = match identity.role {
    Role::AccountHolder => store
      .find_client_by_rut(&identity.rut)
      .await
      .map_err(ApiError::store)?
      .map(Profile::Client),
    Role::Caseworker => store
      .find_manager_by_rut(&identity.rut)
      .await
      .map_err(ApiError::store)?
      .map(Profile::Manager),
  };
  Ok(profile)
}

/// Check an untrusted (rut, secret) pair against the credential store.
pub async fn authenticate<S: DeskStore>(
  store: &S,
  rut: &str,
  password: &str,
) -> Result<Profile, ApiError> {
  let identity = store
    .find_identity(rut)
    .await
    .map_err(ApiError::store)?
    .ok_or(ApiError::Unauthenticated)?;
  verify_password(password, &identity.password_hash)?;

  resolve_profile(store, &identity)
    .await?
    .ok_or(ApiError::Unauthenticated)
}

/// `POST /login`. On success, 200 with the token in the configured header.
pub async fn login<S: DeskStore>(
  State(state): State<AppState<S>>,
  payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
  let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

  let profile = match authenticate(state.store.as_ref(), &request.username, &request.password).await {
    Ok(profile) => profile,
    Err(e) => {
      tracing::debug!(rut = %request.username, "login refused");
      return Err(e);
    }
  };

  let token = state
    .codec
    .mint(&request.username, profile.display_name(), profile.id(), profile.role())
    .and_then(|t| state.codec.header_value(&t))
    .map_err(|e| ApiError::Internal(e.to_string()))?;

  tracing::info!(rut = %request.username, role = %profile.role(), "login");
  let mut response = StatusCode::OK.into_response();
  response.headers_mut().insert(state.codec.header_name().clone(), token);
  Ok(response)
}

// ─── Authorization gate ──────────────────────────────────────────────────────

/// Decode the bearer token, if any, and attach the [`Caller`] to the request.
///
/// A request without the header (or without the configured prefix) proceeds
/// anonymously; the route policy decides whether that is acceptable. A token
/// that fails verification ends the request with 401.
pub async fn authorize<S: DeskStore>(
  State(state): State<AppState<S>>,
  mut req: Request,
  next: Next,
) -> Response {
  let Some(token) = state.codec.bearer(req.headers()).map(str::to_owned) else {
    return next.run(req).await;
  };

  let caller = match state.codec.verify(&token) {
    Ok(claims) => Caller::from_claims(claims),
    Err(e) => {
      tracing::debug!(error = %e, "bearer token rejected");
      None
    }
  };

  match caller {
    Some(caller) => {
      req.extensions_mut().insert(caller);
      next.run(req).await
    }
    None => ApiError::Unauthenticated.into_response(),
  }
}
