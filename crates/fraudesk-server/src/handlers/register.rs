//! `POST /register`: public sign-up for account holders.

use axum::{
  Json,
  extract::{State, rejection::JsonRejection},
  http::StatusCode,
  response::IntoResponse,
};
use fraudesk_core::store::DeskStore;
use validator::Validate as _;

use crate::{
  AppState,
  auth::hash_password,
  error::ApiError,
  validate::{RegistrationRequest, violations},
};

/// Validate the body, hash the secret and store the new client. Responds
/// 201 with the client profile.
pub async fn handler<S: DeskStore>(
  State(state): State<AppState<S>>,
  payload: Result<Json<RegistrationRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
  let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
  request
    .validate()
    .map_err(|e| ApiError::Validation(violations(&e)))?;

  let password_hash = hash_password(&request.password)?;
  let client = state
    .store
    .register_client(request.into_new_client(password_hash))
    .await
    .map_err(ApiError::store)?
    .inspect_err(|r| tracing::debug!(reason = %r, "registration refused"))?;

  tracing::info!(rut = %client.rut, "client registered");
  Ok((StatusCode::CREATED, Json(client)))
}
