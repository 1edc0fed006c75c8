//! The `DeskStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g.
//! `fraudesk-store-sqlite`). The server crate depends on this abstraction,
//! not on any concrete backend.

use std::future::Future;

use chrono::NaiveDate;

use crate::{
  account::{Client, Identity, Manager, NewClient, NewManager},
  error::Rejection,
  ticket::{CardType, Ticket, TicketStatus},
};

/// The result of a rule-checked write: the outer `Result` carries backend
/// failures, the inner one the business rule that refused the write.
pub type Checked<T> = Result<T, Rejection>;

// ─── Query type ──────────────────────────────────────────────────────────────

/// Filter for [`DeskStore::list_tickets`] and [`DeskStore::count_tickets`].
/// Unset fields do not filter.
#[derive(Debug, Clone, Copy, Default)]
pub struct TicketQuery {
  pub status:     Option<TicketStatus>,
  pub manager_id: Option<i64>,
  pub client_id:  Option<i64>,
}

impl TicketQuery {
  pub fn with_status(status: TicketStatus) -> Self {
    Self { status: Some(status), ..Self::default() }
  }

  pub fn held_by(manager_id: i64, status: TicketStatus) -> Self {
    Self { status: Some(status), manager_id: Some(manager_id), client_id: None }
  }

  pub fn filed_by(client_id: i64) -> Self {
    Self { client_id: Some(client_id), ..Self::default() }
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a fraudesk store backend.
///
/// The three ticket writes ([`create_ticket`](Self::create_ticket),
/// [`claim_ticket`](Self::claim_ticket), [`close_ticket`](Self::close_ticket))
/// and [`register_client`](Self::register_client) are read-then-write
/// sequences. Implementations must run each one inside a single transaction
/// that excludes concurrent writers, so that two callers can never both pass
/// a check and both commit.
///
/// Lookups return `Ok(None)` for normal absence.
pub trait DeskStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Identities and accounts ───────────────────────────────────────────

  fn find_identity<'a>(
    &'a self,
    rut: &'a str,
  ) -> impl Future<Output = Result<Option<Identity>, Self::Error>> + Send + 'a;

  fn find_client_by_rut<'a>(
    &'a self,
    rut: &'a str,
  ) -> impl Future<Output = Result<Option<Client>, Self::Error>> + Send + 'a;

  fn find_manager_by_rut<'a>(
    &'a self,
    rut: &'a str,
  ) -> impl Future<Output = Result<Option<Manager>, Self::Error>> + Send + 'a;

  fn get_manager(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Manager>, Self::Error>> + Send + '_;

  fn list_clients(
    &self,
  ) -> impl Future<Output = Result<Vec<Client>, Self::Error>> + Send + '_;

  /// Insert an account-holder identity and its client profile.
  ///
  /// Refused with [`Rejection::RutTaken`], [`Rejection::AccountTaken`] or
  /// [`Rejection::EmailTaken`] when any of those keys is already in use.
  fn register_client(
    &self,
    input: NewClient,
  ) -> impl Future<Output = Result<Checked<Client>, Self::Error>> + Send + '_;

  /// Insert a caseworker identity and profile unless the rut or email is
  /// already present. Returns whether anything was written.
  fn ensure_manager(
    &self,
    input: NewManager,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Ticket writes ─────────────────────────────────────────────────────

  /// File a new `OPEN` ticket for `client_id`, unless the client already has
  /// an active ticket for `card_type`.
  fn create_ticket(
    &self,
    client_id: i64,
    card_type: CardType,
    comment: String,
    today: NaiveDate,
  ) -> impl Future<Output = Result<Checked<Ticket>, Self::Error>> + Send + '_;

  /// Move ticket `ticket_id` from `OPEN` to `PENDING` under `manager_id`.
  ///
  /// Checks, in order: the caseworker's capacity, that the ticket exists,
  /// that it is `OPEN`.
  fn claim_ticket(
    &self,
    manager_id: i64,
    ticket_id: i64,
  ) -> impl Future<Output = Result<Checked<Ticket>, Self::Error>> + Send + '_;

  /// Move ticket `ticket_id` from `PENDING` to `CLOSED`, stamping `today`
  /// as its end date.
  ///
  /// Checks, in order: that the ticket exists, that it is `PENDING`, that
  /// `manager_id` holds it.
  fn close_ticket(
    &self,
    manager_id: i64,
    ticket_id: i64,
    today: NaiveDate,
  ) -> impl Future<Output = Result<Checked<Ticket>, Self::Error>> + Send + '_;

  // ── Ticket reads ──────────────────────────────────────────────────────

  fn get_ticket(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Ticket>, Self::Error>> + Send + '_;

  /// Tickets matching `query`, ordered by id.
  fn list_tickets(
    &self,
    query: TicketQuery,
  ) -> impl Future<Output = Result<Vec<Ticket>, Self::Error>> + Send + '_;

  fn count_tickets(
    &self,
    query: TicketQuery,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;
}
