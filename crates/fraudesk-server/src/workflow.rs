//! The ticket workflow engine.
//!
//! [`TicketDesk`] resolves the caller's account, asks the store to apply a
//! transition under its transactional rules, logs the outcome, and queues
//! the closure notification. It is the only writer of ticket rows.

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use fraudesk_core::{
  Rejection,
  account::{Client, Manager},
  store::{Checked, DeskStore, TicketQuery},
  ticket::{CardType, Ticket, TicketStatus},
};

use crate::{
  auth::Caller,
  error::ApiError,
  notify::{Notification, Outbox},
};

/// What a `POST /tickets/{id}?status=...` asks for, named after the status
/// the ticket is expected to be leaving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
  /// `status=open`: claim the ticket.
  Claim,
  /// `status=pending`: close the ticket.
  Close,
}

impl StatusChange {
  pub fn parse(status: &str) -> Result<Self, ApiError> {
    match status {
      "open" => Ok(StatusChange::Claim),
      "pending" => Ok(StatusChange::Close),
      other => Err(ApiError::UnknownStatus(other.to_owned())),
    }
  }
}

pub struct TicketDesk<S> {
  store:     Arc<S>,
  outbox:    Outbox,
  mail_from: String,
}

impl<S: DeskStore> TicketDesk<S> {
  pub fn new(store: Arc<S>, outbox: Outbox, mail_from: String) -> Self {
    Self { store, outbox, mail_from }
  }

  fn today() -> NaiveDate { Local::now().date_naive() }

  // ── Caller resolution ─────────────────────────────────────────────────────

  async fn client_of(&self, caller: &Caller) -> Result<Client, ApiError> {
    self
      .store
      .find_client_by_rut(&caller.rut)
      .await
      .map_err(ApiError::store)?
      .ok_or(ApiError::Forbidden)
  }

  async fn manager_of(&self, caller: &Caller) -> Result<Manager, ApiError> {
    self
      .store
      .find_manager_by_rut(&caller.rut)
      .await
      .map_err(ApiError::store)?
      .ok_or(ApiError::Forbidden)
  }

  // ── Transitions ───────────────────────────────────────────────────────────

  /// File a new `OPEN` ticket for the calling account holder.
  pub async fn create(
    &self,
    caller: &Caller,
    card_type: CardType,
    comment: String,
  ) -> Result<Ticket, ApiError> {
    let client = self.client_of(caller).await?;
    let outcome = self
      .store
      .create_ticket(client.id, card_type, comment, Self::today())
      .await
      .map_err(ApiError::store)?;
    let ticket = settle(outcome, "create", &caller.rut)?;

    tracing::info!(ticket = ticket.id, card = %card_type, client = %caller.rut, "ticket created");
    Ok(ticket)
  }

  /// Take an `OPEN` ticket into the calling caseworker's queue.
  pub async fn claim(&self, caller: &Caller, ticket_id: i64) -> Result<Ticket, ApiError> {
    let manager = self.manager_of(caller).await?;
    let outcome = self
      .store
      .claim_ticket(manager.id, ticket_id)
      .await
      .map_err(ApiError::store)?;
    let ticket = settle(outcome, "claim", &caller.rut)?;

    tracing::info!(ticket = ticket.id, manager = %caller.rut, "ticket claimed");
    Ok(ticket)
  }

  /// Close a `PENDING` ticket held by the calling caseworker and notify the
  /// client. The notification is queued after the close is committed and
  /// cannot undo it.
  pub async fn close(&self, caller: &Caller, ticket_id: i64) -> Result<Ticket, ApiError> {
    let manager = self.manager_of(caller).await?;
    let outcome = self
      .store
      .close_ticket(manager.id, ticket_id, Self::today())
      .await
      .map_err(ApiError::store)?;
    let ticket = settle(outcome, "close", &caller.rut)?;

    tracing::info!(ticket = ticket.id, manager = %caller.rut, "ticket closed");
    if self
      .outbox
      .send(Notification::ticket_closed(&ticket, &self.mail_from))
      .is_err()
    {
      tracing::warn!(ticket = ticket.id, "notification outbox closed; client not notified");
    }
    Ok(ticket)
  }

  pub async fn change_status(
    &self,
    caller: &Caller,
    ticket_id: i64,
    change: StatusChange,
  ) -> Result<Ticket, ApiError> {
    match change {
      StatusChange::Claim => self.claim(caller, ticket_id).await,
      StatusChange::Close => self.close(caller, ticket_id).await,
    }
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  pub async fn get(&self, ticket_id: i64) -> Result<Ticket, ApiError> {
    self
      .store
      .get_ticket(ticket_id)
      .await
      .map_err(ApiError::store)?
      .ok_or(ApiError::Rejected(Rejection::TicketNotFound(ticket_id)))
  }

  /// The claimable queue.
  pub async fn list_open(&self) -> Result<Vec<Ticket>, ApiError> {
    self.list(TicketQuery::with_status(TicketStatus::Open)).await
  }

  /// Tickets the calling caseworker has claimed and not yet closed.
  pub async fn list_pending_for(&self, caller: &Caller) -> Result<Vec<Ticket>, ApiError> {
    let manager = self.manager_of(caller).await?;
    self.list(TicketQuery::held_by(manager.id, TicketStatus::Pending)).await
  }

  /// Tickets filed by the calling account holder.
  pub async fn list_mine(&self, caller: &Caller) -> Result<Vec<Ticket>, ApiError> {
    let client = self.client_of(caller).await?;
    self.list(TicketQuery::filed_by(client.id)).await
  }

  pub async fn list_all(&self) -> Result<Vec<Ticket>, ApiError> {
    self.list(TicketQuery::default()).await
  }

  /// A caseworker and the tickets they have closed, for reporting.
  pub async fn closed_by(&self, manager_id: i64) -> Result<(Manager, Vec<Ticket>), ApiError> {
    let manager = self
      .store
      .get_manager(manager_id)
      .await
      .map_err(ApiError::store)?
      .ok_or_else(|| ApiError::NotFound(format!("manager {manager_id}")))?;
    let tickets = self
      .list(TicketQuery::held_by(manager_id, TicketStatus::Closed))
      .await?;
    Ok((manager, tickets))
  }

  async fn list(&self, query: TicketQuery) -> Result<Vec<Ticket>, ApiError> {
    self.store.list_tickets(query).await.map_err(ApiError::store)
  }
}

fn settle(outcome: Checked<Ticket>, action: &str, actor: &str) -> Result<Ticket, ApiError> {
  outcome.map_err(|rejection| {
    tracing::debug!(action, actor, reason = %rejection, "ticket transition refused");
    ApiError::Rejected(rejection)
  })
}

#[cfg(test)]
mod tests {
  use fraudesk_core::{
    account::{NewClient, NewManager, Role},
    ticket::Transition,
  };
  use fraudesk_store_sqlite::SqliteStore;
  use tokio::sync::mpsc::UnboundedReceiver;

  use super::*;
  use crate::notify;

  struct Fixture {
    desk:   TicketDesk<SqliteStore>,
    inbox:  UnboundedReceiver<Notification>,
    client: Caller,
    marco:  Caller,
    juan:   Caller,
  }

  async fn fixture() -> Fixture {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let client = store
      .register_client(NewClient {
        rut:           "10744718-0".into(),
        password_hash: "x".into(),
        full_name:     "Ana Maria".into(),
        address:       "Calle 1".into(),
        email:         "ana@example.com".into(),
        account:       "12345678".into(),
        phone_number:  "+56987654321".into(),
      })
      .await
      .unwrap()
      .unwrap();

    let mut workers = Vec::new();
    for (rut, name) in [("13933875-8", "Marco Polo"), ("5126663-3", "Juan Perez")] {
      store
        .ensure_manager(NewManager {
          rut:           rut.into(),
          full_name:     name.into(),
          email:         format!("{rut}@example.com"),
          address:       "Calle 2".into(),
          password_hash: "x".into(),
        })
        .await
        .unwrap();
      let m = store.find_manager_by_rut(rut).await.unwrap().unwrap();
      workers.push(Caller { rut: m.rut, name: m.full_name, id: m.id, role: Role::Caseworker });
    }
    let juan = workers.pop().unwrap();
    let marco = workers.pop().unwrap();

    let (tx, inbox) = notify::outbox();
    Fixture {
      desk: TicketDesk::new(Arc::new(store), tx, "desk@example.com".into()),
      inbox,
      client: Caller {
        rut:  client.rut,
        name: client.full_name,
        id:   client.id,
        role: Role::AccountHolder,
      },
      marco,
      juan,
    }
  }

  #[test]
  fn status_parameter_is_exact() {
    assert_eq!(StatusChange::parse("open").unwrap(), StatusChange::Claim);
    assert_eq!(StatusChange::parse("pending").unwrap(), StatusChange::Close);
    assert!(matches!(StatusChange::parse("OPEN"), Err(ApiError::UnknownStatus(_))));
    assert!(matches!(StatusChange::parse("bogus"), Err(ApiError::UnknownStatus(_))));
  }

  #[tokio::test]
  async fn full_lifecycle_notifies_the_client() {
    let mut f = fixture().await;
    let t = f.desk.create(&f.client, CardType::Credit, "unauthorized purchase".into()).await.unwrap();
    assert_eq!(f.desk.list_open().await.unwrap().len(), 1);

    f.desk.claim(&f.marco, t.id).await.unwrap();
    assert_eq!(f.desk.list_pending_for(&f.marco).await.unwrap().len(), 1);
    assert!(f.desk.list_pending_for(&f.juan).await.unwrap().is_empty());

    let closed = f.desk.close(&f.marco, t.id).await.unwrap();
    assert_eq!(closed.status, TicketStatus::Closed);
    assert_eq!(closed.end_date, Some(Local::now().date_naive()));

    let note = f.inbox.try_recv().unwrap();
    assert_eq!(note.to, "ana@example.com");
    assert!(note.body.contains("Marco Polo"));
    assert!(f.inbox.try_recv().is_err());
  }

  #[tokio::test]
  async fn close_by_another_caseworker_is_refused() {
    let mut f = fixture().await;
    let t = f.desk.create(&f.client, CardType::Debit, "atm".into()).await.unwrap();
    f.desk.claim(&f.marco, t.id).await.unwrap();

    let err = f.desk.close(&f.juan, t.id).await.unwrap_err();
    assert!(matches!(err, ApiError::Rejected(Rejection::NotOwner(_))));
    assert_eq!(f.desk.get(t.id).await.unwrap().status, TicketStatus::Pending);
    assert!(f.inbox.try_recv().is_err());
  }

  #[tokio::test]
  async fn close_without_claim_is_an_invalid_transition() {
    let f = fixture().await;
    let t = f.desk.create(&f.client, CardType::Debit, "atm".into()).await.unwrap();
    let err = f.desk.change_status(&f.marco, t.id, StatusChange::Close).await.unwrap_err();
    assert!(matches!(
      err,
      ApiError::Rejected(Rejection::InvalidTransition { transition: Transition::Close, .. })
    ));
  }

  #[tokio::test]
  async fn caller_without_matching_account_is_forbidden() {
    let f = fixture().await;
    assert!(matches!(
      f.desk.create(&f.marco, CardType::Credit, "x".into()).await,
      Err(ApiError::Forbidden)
    ));
    assert!(matches!(f.desk.claim(&f.client, 1).await, Err(ApiError::Forbidden)));
  }

  #[tokio::test]
  async fn closed_by_lists_only_closed_tickets() {
    let f = fixture().await;
    let a = f.desk.create(&f.client, CardType::Credit, "a".into()).await.unwrap();
    let b = f.desk.create(&f.client, CardType::Debit, "b".into()).await.unwrap();
    f.desk.claim(&f.marco, a.id).await.unwrap();
    f.desk.claim(&f.marco, b.id).await.unwrap();
    f.desk.close(&f.marco, a.id).await.unwrap();

    let (manager, closed) = f.desk.closed_by(f.marco.id).await.unwrap();
    assert_eq!(manager.full_name, "Marco Polo");
    assert_eq!(closed.iter().map(|t| t.id).collect::<Vec<_>>(), vec![a.id]);

    assert!(matches!(f.desk.closed_by(999).await, Err(ApiError::NotFound(_))));
  }

  #[tokio::test]
  async fn missing_ticket_is_not_found() {
    let f = fixture().await;
    let err = f.desk.get(42).await.unwrap_err();
    assert_eq!(err.status().as_u16(), 404);
  }
}
