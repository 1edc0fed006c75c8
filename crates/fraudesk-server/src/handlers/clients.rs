//! `GET /clients`: every registered account holder (caseworkers only).

use axum::{Json, extract::State};
use fraudesk_core::{account::Client, store::DeskStore};

use crate::{AppState, error::ApiError};

pub async fn list<S: DeskStore>(State(state): State<AppState<S>>) -> Result<Json<Vec<Client>>, ApiError> {
  let clients = state.store.list_clients().await.map_err(ApiError::store)?;
  Ok(Json(clients))
}
