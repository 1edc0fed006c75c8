//! Synchronous statement bodies run on the connection thread.
//!
//! Each rule-checked write opens its own `BEGIN IMMEDIATE` transaction, so the
//! check and the write hold SQLite's write lock together. A rejection returns
//! before anything is written; dropping the transaction rolls it back.

use chrono::NaiveDate;
use fraudesk_core::{
  Rejection,
  account::{Client, Identity, Manager, NewClient, NewManager, Role},
  store::{Checked, TicketQuery},
  ticket::{self, CardType, Ticket, TicketParty, TicketStatus},
};
use rusqlite::{Connection, OptionalExtension as _, TransactionBehavior, params};

use crate::{
  Error, Result,
  encode::{
    CLIENT_SELECT, MANAGER_SELECT, RawIdentity, RawTicket, TICKET_SELECT, client_from_row,
    encode_date, manager_from_row,
  },
};

// ─── Lookups ─────────────────────────────────────────────────────────────────

pub fn find_identity(conn: &Connection, rut: &str) -> Result<Option<Identity>> {
  conn
    .query_row(
      "SELECT identity_id, rut, password_hash, role FROM identities WHERE rut = ?1",
      params![rut],
      RawIdentity::from_row,
    )
    .optional()?
    .map(RawIdentity::into_identity)
    .transpose()
}

pub fn find_client_by_rut(conn: &Connection, rut: &str) -> Result<Option<Client>> {
  let sql = format!("{CLIENT_SELECT} WHERE rut = ?1");
  Ok(conn.query_row(&sql, params![rut], client_from_row).optional()?)
}

pub fn list_clients(conn: &Connection) -> Result<Vec<Client>> {
  let sql = format!("{CLIENT_SELECT} ORDER BY client_id");
  let mut stmt = conn.prepare(&sql)?;
  let rows = stmt
    .query_map([], client_from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

pub fn find_manager_by_rut(conn: &Connection, rut: &str) -> Result<Option<Manager>> {
  let sql = format!("{MANAGER_SELECT} WHERE rut = ?1");
  Ok(conn.query_row(&sql, params![rut], manager_from_row).optional()?)
}

pub fn get_manager(conn: &Connection, id: i64) -> Result<Option<Manager>> {
  let sql = format!("{MANAGER_SELECT} WHERE manager_id = ?1");
  Ok(conn.query_row(&sql, params![id], manager_from_row).optional()?)
}

pub fn get_ticket(conn: &Connection, id: i64) -> Result<Option<Ticket>> {
  let sql = format!("{TICKET_SELECT} WHERE t.ticket_id = ?1");
  conn
    .query_row(&sql, params![id], RawTicket::from_row)
    .optional()?
    .map(RawTicket::into_ticket)
    .transpose()
}

pub fn list_tickets(conn: &Connection, query: TicketQuery) -> Result<Vec<Ticket>> {
  let sql = format!(
    "{TICKET_SELECT}
     WHERE (?1 IS NULL OR t.status     = ?1)
       AND (?2 IS NULL OR t.manager_id = ?2)
       AND (?3 IS NULL OR t.client_id  = ?3)
     ORDER BY t.ticket_id"
  );
  let mut stmt = conn.prepare(&sql)?;
  let raws = stmt
    .query_map(
      params![query.status.map(TicketStatus::as_str), query.manager_id, query.client_id],
      RawTicket::from_row,
    )?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawTicket::into_ticket).collect()
}

pub fn count_tickets(conn: &Connection, query: TicketQuery) -> Result<u64> {
  let count: i64 = conn.query_row(
    "SELECT COUNT(*) FROM tickets t
     WHERE (?1 IS NULL OR t.status     = ?1)
       AND (?2 IS NULL OR t.manager_id = ?2)
       AND (?3 IS NULL OR t.client_id  = ?3)",
    params![query.status.map(TicketStatus::as_str), query.manager_id, query.client_id],
    |row| row.get(0),
  )?;
  Ok(count.max(0) as u64)
}

fn exists(conn: &Connection, sql: &str, key: &str) -> Result<bool> {
  Ok(conn.query_row(sql, params![key], |_| Ok(())).optional()?.is_some())
}

fn insert_identity(conn: &Connection, rut: &str, hash: &str, role: Role) -> Result<i64> {
  conn.execute(
    "INSERT INTO identities (rut, password_hash, role) VALUES (?1, ?2, ?3)",
    params![rut, hash, role.as_str()],
  )?;
  Ok(conn.last_insert_rowid())
}

// ─── Accounts ────────────────────────────────────────────────────────────────

pub fn register_client(conn: &mut Connection, input: NewClient) -> Result<Checked<Client>> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

  if exists(&tx, "SELECT 1 FROM identities WHERE rut = ?1", &input.rut)? {
    return Ok(Err(Rejection::RutTaken));
  }
  if exists(&tx, "SELECT 1 FROM clients WHERE account = ?1", &input.account)? {
    return Ok(Err(Rejection::AccountTaken));
  }
  if exists(&tx, "SELECT 1 FROM clients WHERE email = ?1", &input.email)? {
    return Ok(Err(Rejection::EmailTaken));
  }

  let identity_id = insert_identity(&tx, &input.rut, &input.password_hash, Role::AccountHolder)?;
  tx.execute(
    "INSERT INTO clients (identity_id, rut, full_name, address, email, account, phone_number)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    params![
      identity_id,
      input.rut,
      input.full_name,
      input.address,
      input.email,
      input.account,
      input.phone_number,
    ],
  )?;
  let client = Client {
    id: tx.last_insert_rowid(),
    rut: input.rut,
    full_name: input.full_name,
    address: input.address,
    email: input.email,
    account: input.account,
    phone_number: input.phone_number,
    identity_id,
  };

  tx.commit()?;
  Ok(Ok(client))
}

pub fn ensure_manager(conn: &mut Connection, input: NewManager) -> Result<bool> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

  if exists(&tx, "SELECT 1 FROM identities WHERE rut = ?1", &input.rut)?
    || exists(&tx, "SELECT 1 FROM managers WHERE email = ?1", &input.email)?
  {
    return Ok(false);
  }

  let identity_id = insert_identity(&tx, &input.rut, &input.password_hash, Role::Caseworker)?;
  tx.execute(
    "INSERT INTO managers (identity_id, rut, full_name, email, address)
     VALUES (?1, ?2, ?3, ?4, ?5)",
    params![identity_id, input.rut, input.full_name, input.email, input.address],
  )?;

  tx.commit()?;
  Ok(true)
}

// ─── Ticket writes ───────────────────────────────────────────────────────────

pub fn create_ticket(
  conn:      &mut Connection,
  client_id: i64,
  card_type: CardType,
  comment:   String,
  today:     NaiveDate,
) -> Result<Checked<Ticket>> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

  let active: Option<i64> = tx
    .query_row(
      "SELECT ticket_id FROM tickets
       WHERE client_id = ?1 AND card_type = ?2 AND status != 'CLOSED'
       LIMIT 1",
      params![client_id, card_type.as_str()],
      |row| row.get(0),
    )
    .optional()?;
  if let Err(rejection) = ticket::check_no_active(card_type, active) {
    return Ok(Err(rejection));
  }

  tx.execute(
    "INSERT INTO tickets (card_type, comment, status, start_date, client_id)
     VALUES (?1, ?2, ?3, ?4, ?5)",
    params![
      card_type.as_str(),
      comment,
      TicketStatus::Open.as_str(),
      encode_date(today),
      client_id,
    ],
  )?;
  let id = tx.last_insert_rowid();
  let created = get_ticket(&tx, id)?.ok_or(Error::Sqlite(rusqlite::Error::QueryReturnedNoRows))?;

  tx.commit()?;
  Ok(Ok(created))
}

pub fn claim_ticket(conn: &mut Connection, manager_id: i64, ticket_id: i64) -> Result<Checked<Ticket>> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

  let held = count_tickets(&tx, TicketQuery::held_by(manager_id, TicketStatus::Pending))?;
  if let Err(rejection) = ticket::check_capacity(held) {
    return Ok(Err(rejection));
  }

  let Some(mut ticket) = get_ticket(&tx, ticket_id)? else {
    return Ok(Err(Rejection::TicketNotFound(ticket_id)));
  };
  let manager = get_manager(&tx, manager_id)?.ok_or(Error::ManagerMissing(manager_id))?;
  let party = TicketParty {
    id:        manager.id,
    rut:       manager.rut,
    full_name: manager.full_name,
    email:     manager.email,
  };
  if let Err(rejection) = ticket.claim(party) {
    return Ok(Err(rejection));
  }

  tx.execute(
    "UPDATE tickets SET status = ?1, manager_id = ?2 WHERE ticket_id = ?3",
    params![ticket.status.as_str(), manager_id, ticket_id],
  )?;

  tx.commit()?;
  Ok(Ok(ticket))
}

pub fn close_ticket(
  conn:       &mut Connection,
  manager_id: i64,
  ticket_id:  i64,
  today:      NaiveDate,
) -> Result<Checked<Ticket>> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

  let Some(mut ticket) = get_ticket(&tx, ticket_id)? else {
    return Ok(Err(Rejection::TicketNotFound(ticket_id)));
  };
  if let Err(rejection) = ticket.close(manager_id, today) {
    return Ok(Err(rejection));
  }

  tx.execute(
    "UPDATE tickets SET status = ?1, end_date = ?2 WHERE ticket_id = ?3",
    params![ticket.status.as_str(), ticket.end_date.map(encode_date), ticket_id],
  )?;

  tx.commit()?;
  Ok(Ok(ticket))
}
