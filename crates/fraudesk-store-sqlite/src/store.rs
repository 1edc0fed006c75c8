//! [`SqliteStore`]: the SQLite implementation of [`DeskStore`].

use std::path::Path;

use chrono::NaiveDate;
use fraudesk_core::{
  account::{Client, Identity, Manager, NewClient, NewManager},
  store::{Checked, DeskStore, TicketQuery},
  ticket::{CardType, Ticket},
};

use crate::{Result, schema::SCHEMA, sql};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A fraudesk store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. All clones
/// share one connection thread, and every rule-checked write additionally
/// takes SQLite's write lock up front (`BEGIN IMMEDIATE`), so other processes
/// writing the same file are excluded too.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, mainly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    tracing::debug!("store schema ready");
    Ok(())
  }

  /// Run a statement body on the connection thread, flattening the
  /// connection-level and statement-level errors.
  async fn with_conn<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&mut rusqlite::Connection) -> Result<T> + Send + 'static,
  {
    self.conn.call(move |conn| Ok(f(conn))).await?
  }
}

// ─── DeskStore impl ──────────────────────────────────────────────────────────

impl DeskStore for SqliteStore {
  type Error = crate::Error;

  // ── Identities and accounts ───────────────────────────────────────────────

  async fn find_identity(&self, rut: &str) -> Result<Option<Identity>> {
    let rut = rut.to_owned();
    self.with_conn(move |conn| sql::find_identity(conn, &rut)).await
  }

  async fn find_client_by_rut(&self, rut: &str) -> Result<Option<Client>> {
    let rut = rut.to_owned();
    self.with_conn(move |conn| sql::find_client_by_rut(conn, &rut)).await
  }

  async fn find_manager_by_rut(&self, rut: &str) -> Result<Option<Manager>> {
    let rut = rut.to_owned();
    self.with_conn(move |conn| sql::find_manager_by_rut(conn, &rut)).await
  }

  async fn get_manager(&self, id: i64) -> Result<Option<Manager>> {
    self.with_conn(move |conn| sql::get_manager(conn, id)).await
  }

  async fn list_clients(&self) -> Result<Vec<Client>> {
    self.with_conn(|conn| sql::list_clients(conn)).await
  }

  async fn register_client(&self, input: NewClient) -> Result<Checked<Client>> {
    self.with_conn(move |conn| sql::register_client(conn, input)).await
  }

  async fn ensure_manager(&self, input: NewManager) -> Result<bool> {
    self.with_conn(move |conn| sql::ensure_manager(conn, input)).await
  }

  // ── Ticket writes ─────────────────────────────────────────────────────────

  async fn create_ticket(
    &self,
    client_id: i64,
    card_type: CardType,
    comment:   String,
    today:     NaiveDate,
  ) -> Result<Checked<Ticket>> {
    self
      .with_conn(move |conn| sql::create_ticket(conn, client_id, card_type, comment, today))
      .await
  }

  async fn claim_ticket(&self, manager_id: i64, ticket_id: i64) -> Result<Checked<Ticket>> {
    self
      .with_conn(move |conn| sql::claim_ticket(conn, manager_id, ticket_id))
      .await
  }

  async fn close_ticket(
    &self,
    manager_id: i64,
    ticket_id:  i64,
    today:      NaiveDate,
  ) -> Result<Checked<Ticket>> {
    self
      .with_conn(move |conn| sql::close_ticket(conn, manager_id, ticket_id, today))
      .await
  }

  // ── Ticket reads ──────────────────────────────────────────────────────────

  async fn get_ticket(&self, id: i64) -> Result<Option<Ticket>> {
    self.with_conn(move |conn| sql::get_ticket(conn, id)).await
  }

  async fn list_tickets(&self, query: TicketQuery) -> Result<Vec<Ticket>> {
    self.with_conn(move |conn| sql::list_tickets(conn, query)).await
  }

  async fn count_tickets(&self, query: TicketQuery) -> Result<u64> {
    self.with_conn(move |conn| sql::count_tickets(conn, query)).await
  }
}
