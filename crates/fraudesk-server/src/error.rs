//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use fraudesk_core::Rejection;
use serde_json::json;
use thiserror::Error;

/// An error returned by a handler or one of the request-pipeline gates.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("unauthenticated")]
  Unauthenticated,

  #[error("forbidden")]
  Forbidden,

  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  /// One `"field: message"` entry per violated input rule.
  #[error("invalid request")]
  Validation(Vec<String>),

  #[error(transparent)]
  Rejected(#[from] Rejection),

  #[error("unknown ticket status {0:?}")]
  UnknownStatus(String),

  #[error("internal error: {0}")]
  Internal(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    ApiError::Store(Box::new(e))
  }

  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
      ApiError::Forbidden => StatusCode::FORBIDDEN,
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
      ApiError::Rejected(r) => match r {
        Rejection::TicketNotFound(_) => StatusCode::NOT_FOUND,
        Rejection::CapacityExceeded { .. }
        | Rejection::InvalidTransition { .. }
        | Rejection::NotOwner(_) => StatusCode::NOT_ACCEPTABLE,
        Rejection::DuplicateActiveTicket { .. }
        | Rejection::RutTaken
        | Rejection::AccountTaken
        | Rejection::EmailTaken => StatusCode::UNPROCESSABLE_ENTITY,
      },
      ApiError::UnknownStatus(_) => StatusCode::UNPROCESSABLE_ENTITY,
      ApiError::Internal(_) | ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    }
    let body = match &self {
      ApiError::Validation(errors) => json!({ "error": self.to_string(), "errors": errors }),
      _ => json!({ "error": self.to_string() }),
    };
    (status, Json(body)).into_response()
  }
}
