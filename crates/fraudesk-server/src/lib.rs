//! HTTP service for the fraudesk ticket desk.
//!
//! Exposes an axum [`Router`] backed by any [`DeskStore`]. Every request
//! except `POST /login` passes through the authorization gate, which decodes
//! the bearer token (if any), and then through the route policy, which
//! decides whether the resulting caller may proceed.

pub mod auth;
pub mod bootstrap;
pub mod error;
pub mod handlers;
pub mod notify;
pub mod policy;
pub mod report;
pub mod token;
pub mod validate;
pub mod workflow;

pub use error::ApiError;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router, middleware,
  routing::{get, post},
};
use fraudesk_core::{account::NewManager, store::DeskStore};
use serde::Deserialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use notify::Outbox;
use policy::RoutePolicy;
use token::{TokenCodec, TokenError};
use workflow::TicketDesk;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `FRAUDESK_*` environment variables (nested keys joined with `__`, e.g.
/// `FRAUDESK_JWT__SECRET_KEY`).
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:        String,
  pub port:        u16,
  pub store_path:  PathBuf,
  pub jwt:         JwtConfig,
  #[serde(default)]
  pub mail:        MailConfig,
  /// Caseworker accounts seeded at startup.
  #[serde(default)]
  pub caseworkers: Vec<NewManager>,
}

#[derive(Deserialize, Clone)]
#[serde(default)]
pub struct JwtConfig {
  pub secret_key:   String,
  pub header:       String,
  pub token_prefix: String,
  pub ttl_hours:    u32,
}

impl Default for JwtConfig {
  fn default() -> Self {
    Self {
      secret_key:   String::new(),
      header:       "Authorization".into(),
      token_prefix: "Bearer ".into(),
      ttl_hours:    14,
    }
  }
}

#[derive(Deserialize, Clone)]
#[serde(default)]
pub struct MailConfig {
  /// Sender address of outgoing notifications.
  pub from: String,
}

impl Default for MailConfig {
  fn default() -> Self { Self { from: "no-reply@fraudesk.local".into() } }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers and middleware.
pub struct AppState<S: DeskStore> {
  pub store:  Arc<S>,
  pub codec:  Arc<TokenCodec>,
  pub desk:   Arc<TicketDesk<S>>,
  pub config: Arc<ServerConfig>,
}

// Written out so the store itself need not be `Clone`.
impl<S: DeskStore> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      store:  self.store.clone(),
      codec:  self.codec.clone(),
      desk:   self.desk.clone(),
      config: self.config.clone(),
    }
  }
}

impl<S: DeskStore> AppState<S> {
  /// Assemble the state; notifications produced by the ticket desk are
  /// pushed onto `outbox`.
  pub fn new(store: S, config: ServerConfig, outbox: Outbox) -> Result<Self, TokenError> {
    let codec = TokenCodec::from_config(&config.jwt)?;
    let store = Arc::new(store);
    let desk = TicketDesk::new(store.clone(), outbox, config.mail.from.clone());
    Ok(Self {
      store,
      codec: Arc::new(codec),
      desk: Arc::new(desk),
      config: Arc::new(config),
    })
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the application [`Router`].
pub fn router<S>(state: AppState<S>) -> Router
where
  S: DeskStore + 'static,
{
  let route_policy = Arc::new(RoutePolicy::standard());
  // Browsers may only read the login token if its header is exposed.
  let cors = CorsLayer::permissive().expose_headers([state.codec.header_name().clone()]);

  Router::new()
    // Accounts
    .route("/register", post(handlers::register::handler::<S>))
    .route("/clients", get(handlers::clients::list::<S>))
    // Tickets
    .route("/tickets", get(handlers::tickets::list_all::<S>).post(handlers::tickets::create::<S>))
    .route("/tickets/open", get(handlers::tickets::list_open::<S>))
    .route("/tickets/pending", get(handlers::tickets::list_pending::<S>))
    .route("/tickets/mine", get(handlers::tickets::list_mine::<S>))
    .route(
      "/tickets/{id}",
      get(handlers::tickets::get_one::<S>).post(handlers::tickets::change_status::<S>),
    )
    // Reports
    .route("/managers/{id}/report", get(handlers::managers::report::<S>))
    .layer(middleware::from_fn_with_state(route_policy, policy::enforce))
    .layer(middleware::from_fn_with_state(state.clone(), auth::authorize::<S>))
    // The credential-submission route sits outside the authorization gate.
    .route("/login", post(auth::login::<S>))
    .layer(TraceLayer::new_for_http())
    .layer(cors)
    .with_state(state)
}

// ─── Integration tests ────────────────────────────────────────────────────────
