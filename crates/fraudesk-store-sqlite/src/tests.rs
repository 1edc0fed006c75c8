//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::NaiveDate;
use fraudesk_core::{
  Rejection,
  account::{NewClient, NewManager, Role},
  store::{DeskStore, TicketQuery},
  ticket::{CardType, TicketStatus, Transition},
};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn today() -> NaiveDate { NaiveDate::from_ymd_opt(2024, 5, 20).unwrap() }

fn new_client(n: u32) -> NewClient {
  NewClient {
    rut:           format!("1000000{n}-K"),
    password_hash: "hash".into(),
    full_name:     format!("Client Number {n}"),
    address:       "Calle falsa 123".into(),
    email:         format!("client{n}@example.com"),
    account:       format!("1234567{n}"),
    phone_number:  "+56912345678".into(),
  }
}

fn new_manager(n: u32) -> NewManager {
  NewManager {
    rut:           format!("2000000{n}-1"),
    full_name:     format!("Manager Number {n}"),
    email:         format!("manager{n}@example.com"),
    address:       "Calle falsa 2234".into(),
    password_hash: "hash".into(),
  }
}

/// Register client `n` and return its id.
async fn client_id(s: &SqliteStore, n: u32) -> i64 {
  s.register_client(new_client(n)).await.unwrap().unwrap().id
}

/// Seed manager `n` and return its id.
async fn manager_id(s: &SqliteStore, n: u32) -> i64 {
  assert!(s.ensure_manager(new_manager(n)).await.unwrap());
  s.find_manager_by_rut(&new_manager(n).rut).await.unwrap().unwrap().id
}

async fn open_ticket(s: &SqliteStore, client: i64, card: CardType) -> i64 {
  s.create_ticket(client, card, "unauthorized purchase".into(), today())
    .await
    .unwrap()
    .unwrap()
    .id
}

// ─── Accounts ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn register_client_creates_identity_and_profile() {
  let s = store().await;
  let client = s.register_client(new_client(1)).await.unwrap().unwrap();

  let identity = s.find_identity(&client.rut).await.unwrap().unwrap();
  assert_eq!(identity.role, Role::AccountHolder);
  assert_eq!(identity.id, client.identity_id);

  let fetched = s.find_client_by_rut(&client.rut).await.unwrap().unwrap();
  assert_eq!(fetched, client);
}

#[tokio::test]
async fn register_client_rejects_taken_keys() {
  let s = store().await;
  s.register_client(new_client(1)).await.unwrap().unwrap();

  let same_rut = NewClient { email: "other@example.com".into(), account: "99999999".into(), ..new_client(1) };
  assert_eq!(s.register_client(same_rut).await.unwrap(), Err(Rejection::RutTaken));

  let same_account = NewClient { rut: "12345678-5".into(), email: "other@example.com".into(), ..new_client(1) };
  assert_eq!(s.register_client(same_account).await.unwrap(), Err(Rejection::AccountTaken));

  let same_email = NewClient { rut: "12345678-5".into(), account: "99999999".into(), ..new_client(1) };
  assert_eq!(s.register_client(same_email).await.unwrap(), Err(Rejection::EmailTaken));

  assert_eq!(s.list_clients().await.unwrap().len(), 1);
}

#[tokio::test]
async fn missing_lookups_return_none() {
  let s = store().await;
  assert!(s.find_identity("1-9").await.unwrap().is_none());
  assert!(s.find_client_by_rut("1-9").await.unwrap().is_none());
  assert!(s.find_manager_by_rut("1-9").await.unwrap().is_none());
  assert!(s.get_manager(42).await.unwrap().is_none());
  assert!(s.get_ticket(42).await.unwrap().is_none());
}

#[tokio::test]
async fn ensure_manager_is_idempotent() {
  let s = store().await;
  assert!(s.ensure_manager(new_manager(1)).await.unwrap());
  assert!(!s.ensure_manager(new_manager(1)).await.unwrap());

  let identity = s.find_identity(&new_manager(1).rut).await.unwrap().unwrap();
  assert_eq!(identity.role, Role::Caseworker);
}

#[tokio::test]
async fn ensure_manager_skips_taken_email() {
  let s = store().await;
  assert!(s.ensure_manager(new_manager(1)).await.unwrap());
  let clash = NewManager { rut: "7-8".into(), ..new_manager(1) };
  assert!(!s.ensure_manager(clash).await.unwrap());
  assert!(s.find_identity("7-8").await.unwrap().is_none());
}

#[tokio::test]
async fn deleting_an_account_drops_its_identity() {
  let s = store().await;
  let client = s.register_client(new_client(1)).await.unwrap().unwrap();

  let id = client.id;
  s.conn
    .call(move |conn| {
      conn.execute("DELETE FROM clients WHERE client_id = ?1", [id])?;
      Ok(())
    })
    .await
    .unwrap();

  assert!(s.find_identity(&client.rut).await.unwrap().is_none());
}

// ─── Ticket creation ─────────────────────────────────────────────────────────

#[tokio::test]
async fn first_ticket_is_open_with_id_one() {
  let s = store().await;
  let client = client_id(&s, 1).await;

  let ticket = s
    .create_ticket(client, CardType::Credit, "unauthorized purchase".into(), today())
    .await
    .unwrap()
    .unwrap();

  assert_eq!(ticket.id, 1);
  assert_eq!(ticket.status, TicketStatus::Open);
  assert_eq!(ticket.start_date, today());
  assert_eq!(ticket.end_date, None);
  assert_eq!(ticket.client.id, client);
  assert!(ticket.manager.is_none());
}

#[tokio::test]
async fn second_active_ticket_for_same_card_is_refused() {
  let s = store().await;
  let client = client_id(&s, 1).await;
  let first = open_ticket(&s, client, CardType::Credit).await;

  let second = s
    .create_ticket(client, CardType::Credit, "again".into(), today())
    .await
    .unwrap();
  assert_eq!(
    second,
    Err(Rejection::DuplicateActiveTicket { card_type: CardType::Credit, ticket_id: first })
  );

  // A different card is unaffected.
  open_ticket(&s, client, CardType::Debit).await;
  assert_eq!(s.count_tickets(TicketQuery::filed_by(client)).await.unwrap(), 2);
}

#[tokio::test]
async fn closed_ticket_frees_the_card() {
  let s = store().await;
  let client = client_id(&s, 1).await;
  let manager = manager_id(&s, 1).await;
  let id = open_ticket(&s, client, CardType::Credit).await;

  s.claim_ticket(manager, id).await.unwrap().unwrap();
  s.close_ticket(manager, id, today()).await.unwrap().unwrap();

  let again = s
    .create_ticket(client, CardType::Credit, "new fraud".into(), today())
    .await
    .unwrap();
  assert!(again.is_ok());
}

// ─── Claim ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn claim_moves_ticket_to_pending() {
  let s = store().await;
  let client = client_id(&s, 1).await;
  let manager = manager_id(&s, 1).await;
  let id = open_ticket(&s, client, CardType::Credit).await;

  let claimed = s.claim_ticket(manager, id).await.unwrap().unwrap();
  assert_eq!(claimed.status, TicketStatus::Pending);
  assert_eq!(claimed.manager.as_ref().map(|m| m.id), Some(manager));

  let stored = s.get_ticket(id).await.unwrap().unwrap();
  assert_eq!(stored, claimed);

  let open = s.list_tickets(TicketQuery::with_status(TicketStatus::Open)).await.unwrap();
  assert!(open.is_empty());
}

#[tokio::test]
async fn claim_of_missing_ticket_is_not_found() {
  let s = store().await;
  let manager = manager_id(&s, 1).await;
  assert_eq!(s.claim_ticket(manager, 99).await.unwrap(), Err(Rejection::TicketNotFound(99)));
}

#[tokio::test]
async fn claim_of_pending_ticket_is_invalid() {
  let s = store().await;
  let client = client_id(&s, 1).await;
  let first = manager_id(&s, 1).await;
  let second = manager_id(&s, 2).await;
  let id = open_ticket(&s, client, CardType::Credit).await;

  s.claim_ticket(first, id).await.unwrap().unwrap();
  let err = s.claim_ticket(second, id).await.unwrap().unwrap_err();
  assert_eq!(err, Rejection::InvalidTransition {
    id,
    status:     TicketStatus::Pending,
    transition: Transition::Claim,
  });

  let stored = s.get_ticket(id).await.unwrap().unwrap();
  assert_eq!(stored.manager.map(|m| m.id), Some(first));
}

#[tokio::test]
async fn seventh_claim_exceeds_capacity() {
  let s = store().await;
  let manager = manager_id(&s, 1).await;

  let mut ids = Vec::new();
  for n in 0..4 {
    let client = client_id(&s, n).await;
    ids.push(open_ticket(&s, client, CardType::Credit).await);
    ids.push(open_ticket(&s, client, CardType::Debit).await);
  }

  for id in &ids[..6] {
    s.claim_ticket(manager, *id).await.unwrap().unwrap();
  }
  let err = s.claim_ticket(manager, ids[6]).await.unwrap().unwrap_err();
  assert_eq!(err, Rejection::CapacityExceeded { held: 6, limit: 6 });

  let seventh = s.get_ticket(ids[6]).await.unwrap().unwrap();
  assert_eq!(seventh.status, TicketStatus::Open);
  assert_eq!(
    s.count_tickets(TicketQuery::held_by(manager, TicketStatus::Pending)).await.unwrap(),
    6
  );
}

#[tokio::test]
async fn concurrent_claims_never_overshoot_capacity() {
  let s = store().await;
  let manager = manager_id(&s, 1).await;

  let mut ids = Vec::new();
  for n in 0..5 {
    let client = client_id(&s, n).await;
    ids.push(open_ticket(&s, client, CardType::Credit).await);
    ids.push(open_ticket(&s, client, CardType::Debit).await);
  }

  let mut tasks = tokio::task::JoinSet::new();
  for id in ids {
    let s = s.clone();
    tasks.spawn(async move { s.claim_ticket(manager, id).await.unwrap() });
  }

  let mut won = 0;
  let mut refused = 0;
  while let Some(outcome) = tasks.join_next().await {
    match outcome.unwrap() {
      Ok(_) => won += 1,
      Err(Rejection::CapacityExceeded { .. }) => refused += 1,
      Err(other) => panic!("unexpected rejection: {other}"),
    }
  }
  assert_eq!(won, 6);
  assert_eq!(refused, 4);
}

#[tokio::test]
async fn concurrent_creates_leave_one_active_ticket() {
  let s = store().await;
  let client = client_id(&s, 1).await;

  let mut tasks = tokio::task::JoinSet::new();
  for n in 0..8 {
    let s = s.clone();
    tasks.spawn(async move {
      s.create_ticket(client, CardType::Credit, format!("report {n}"), today())
        .await
    });
  }

  let mut created = Vec::new();
  let mut refused = 0;
  while let Some(outcome) = tasks.join_next().await {
    match outcome.unwrap() {
      Ok(Ok(ticket)) => created.push(ticket.id),
      Ok(Err(Rejection::DuplicateActiveTicket { card_type: CardType::Credit, .. })) => refused += 1,
      Ok(Err(other)) => panic!("unexpected rejection: {other}"),
      Err(e) => panic!("store error: {e}"),
    }
  }
  assert_eq!(created.len(), 1);
  assert_eq!(refused, 7);
  assert_eq!(s.count_tickets(TicketQuery::filed_by(client)).await.unwrap(), 1);
}

// ─── Close ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn close_by_owner_stamps_end_date() {
  let s = store().await;
  let client = client_id(&s, 1).await;
  let manager = manager_id(&s, 1).await;
  let id = open_ticket(&s, client, CardType::Debit).await;
  s.claim_ticket(manager, id).await.unwrap().unwrap();

  let closed = s.close_ticket(manager, id, today()).await.unwrap().unwrap();
  assert_eq!(closed.status, TicketStatus::Closed);
  assert_eq!(closed.end_date, Some(today()));
  assert_eq!(s.get_ticket(id).await.unwrap().unwrap(), closed);
}

#[tokio::test]
async fn close_by_other_manager_leaves_ticket_untouched() {
  let s = store().await;
  let client = client_id(&s, 1).await;
  let owner = manager_id(&s, 1).await;
  let other = manager_id(&s, 2).await;
  let id = open_ticket(&s, client, CardType::Debit).await;
  s.claim_ticket(owner, id).await.unwrap().unwrap();

  assert_eq!(s.close_ticket(other, id, today()).await.unwrap(), Err(Rejection::NotOwner(id)));

  let stored = s.get_ticket(id).await.unwrap().unwrap();
  assert_eq!(stored.status, TicketStatus::Pending);
  assert_eq!(stored.end_date, None);
}

#[tokio::test]
async fn close_of_open_ticket_is_invalid() {
  let s = store().await;
  let client = client_id(&s, 1).await;
  let manager = manager_id(&s, 1).await;
  let id = open_ticket(&s, client, CardType::Debit).await;

  let err = s.close_ticket(manager, id, today()).await.unwrap().unwrap_err();
  assert!(matches!(err, Rejection::InvalidTransition { status: TicketStatus::Open, .. }));
  assert_eq!(s.get_ticket(id).await.unwrap().unwrap().status, TicketStatus::Open);
}

// ─── Listing ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn list_filters_by_manager_and_status() {
  let s = store().await;
  let client = client_id(&s, 1).await;
  let first = manager_id(&s, 1).await;
  let second = manager_id(&s, 2).await;
  let a = open_ticket(&s, client, CardType::Credit).await;
  let b = open_ticket(&s, client, CardType::Debit).await;

  s.claim_ticket(first, a).await.unwrap().unwrap();
  s.claim_ticket(second, b).await.unwrap().unwrap();

  let mine = s
    .list_tickets(TicketQuery::held_by(first, TicketStatus::Pending))
    .await
    .unwrap();
  assert_eq!(mine.iter().map(|t| t.id).collect::<Vec<_>>(), vec![a]);

  let all = s.list_tickets(TicketQuery::default()).await.unwrap();
  assert_eq!(all.iter().map(|t| t.id).collect::<Vec<_>>(), vec![a, b]);
}
