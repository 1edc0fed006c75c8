//! `GET /managers/{id}/report`: a caseworker's closed-ticket report.

use axum::{
  extract::{Path, State, rejection::PathRejection},
  http::header,
  response::IntoResponse,
};
use fraudesk_core::store::DeskStore;

use crate::{AppState, error::ApiError, report};

pub async fn report<S: DeskStore>(
  State(state): State<AppState<S>>,
  id: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
  let Path(id) = id.map_err(|e| ApiError::BadRequest(e.body_text()))?;
  let (manager, tickets) = state.desk.closed_by(id).await?;
  let body = report::render(&manager.full_name, &tickets);
  Ok((
    [
      (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
      (header::CONTENT_DISPOSITION, "attachment; filename=\"report.txt\""),
    ],
    body,
  ))
}
