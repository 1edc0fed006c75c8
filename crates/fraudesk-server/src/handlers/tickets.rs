//! Handlers for `/tickets` endpoints.
//!
//! | Method | Path | Caller |
//! |--------|------|--------|
//! | `POST` | `/tickets` | account holder; body `{"card_type":"CREDIT","comment":"..."}` |
//! | `GET`  | `/tickets/mine` | account holder |
//! | `GET`  | `/tickets` | caseworker |
//! | `GET`  | `/tickets/open` | caseworker |
//! | `GET`  | `/tickets/pending` | caseworker; the caller's own queue |
//! | `GET`  | `/tickets/{id}` | caseworker |
//! | `POST` | `/tickets/{id}?status=open\|pending` | caseworker; claim or close |

use axum::{
  Json,
  extract::{Path, Query, State, rejection::{JsonRejection, PathRejection, QueryRejection}},
  http::StatusCode,
  response::IntoResponse,
};
use fraudesk_core::{
  store::DeskStore,
  ticket::{CardType, Ticket},
};
use serde::Deserialize;

use crate::{AppState, auth::Caller, error::ApiError, workflow::StatusChange};

type Tickets = Result<Json<Vec<Ticket>>, ApiError>;

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct NewTicketBody {
  pub card_type: CardType,
  pub comment:   String,
}

pub async fn create<S: DeskStore>(
  State(state): State<AppState<S>>,
  caller: Caller,
  payload: Result<Json<NewTicketBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
  let Json(body) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
  let ticket = state.desk.create(&caller, body.card_type, body.comment).await?;
  Ok((StatusCode::CREATED, Json(ticket)))
}

// ─── Lists ────────────────────────────────────────────────────────────────────

pub async fn list_all<S: DeskStore>(State(state): State<AppState<S>>) -> Tickets {
  Ok(Json(state.desk.list_all().await?))
}

pub async fn list_open<S: DeskStore>(State(state): State<AppState<S>>) -> Tickets {
  Ok(Json(state.desk.list_open().await?))
}

pub async fn list_pending<S: DeskStore>(State(state): State<AppState<S>>, caller: Caller) -> Tickets {
  Ok(Json(state.desk.list_pending_for(&caller).await?))
}

pub async fn list_mine<S: DeskStore>(State(state): State<AppState<S>>, caller: Caller) -> Tickets {
  Ok(Json(state.desk.list_mine(&caller).await?))
}

// ─── One ticket ───────────────────────────────────────────────────────────────

pub async fn get_one<S: DeskStore>(
  State(state): State<AppState<S>>,
  id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Ticket>, ApiError> {
  let Path(id) = id.map_err(|e| ApiError::BadRequest(e.body_text()))?;
  Ok(Json(state.desk.get(id).await?))
}

#[derive(Debug, Deserialize)]
pub struct StatusParams {
  pub status: String,
}

/// `POST /tickets/{id}?status=...`. An unrecognised status is refused before
/// the ticket is looked at.
pub async fn change_status<S: DeskStore>(
  State(state): State<AppState<S>>,
  caller: Caller,
  id: Result<Path<i64>, PathRejection>,
  params: Result<Query<StatusParams>, QueryRejection>,
) -> Result<Json<Ticket>, ApiError> {
  let Path(id) = id.map_err(|e| ApiError::BadRequest(e.body_text()))?;
  let Query(params) = params.map_err(|e| ApiError::BadRequest(e.body_text()))?;
  let change = StatusChange::parse(&params.status)?;
  Ok(Json(state.desk.change_status(&caller, id, change).await?))
}
