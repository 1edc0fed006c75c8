//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Dates are stored as `YYYY-MM-DD`. Enumerations are stored as their
//! upper-case names (`CREDIT`, `PENDING`, `CASEWORKER`, ...).

use chrono::NaiveDate;
use fraudesk_core::{
  account::{Client, Identity, Manager},
  ticket::{Ticket, TicketParty},
};

use crate::{Error, Result};

// ─── NaiveDate ────────────────────────────────────────────────────────────────

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn encode_date(d: NaiveDate) -> String { d.format(DATE_FORMAT).to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, DATE_FORMAT)
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Row mirrors ─────────────────────────────────────────────────────────────

/// Column order shared by every ticket read; see [`RawTicket::from_row`].
pub const TICKET_SELECT: &str = "
  SELECT t.ticket_id, t.card_type, t.comment, t.status, t.start_date, t.end_date,
         c.client_id, c.rut, c.full_name, c.email,
         m.manager_id, m.rut, m.full_name, m.email
  FROM tickets t
  JOIN clients c       ON c.client_id  = t.client_id
  LEFT JOIN managers m ON m.manager_id = t.manager_id";

/// A ticket row exactly as SQLite returns it.
pub struct RawTicket {
  pub ticket_id:     i64,
  pub card_type:     String,
  pub comment:       String,
  pub status:        String,
  pub start_date:    String,
  pub end_date:      Option<String>,
  pub client_id:     i64,
  pub client_rut:    String,
  pub client_name:   String,
  pub client_email:  String,
  pub manager_id:    Option<i64>,
  pub manager_rut:   Option<String>,
  pub manager_name:  Option<String>,
  pub manager_email: Option<String>,
}

impl RawTicket {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      ticket_id:     row.get(0)?,
      card_type:     row.get(1)?,
      comment:       row.get(2)?,
      status:        row.get(3)?,
      start_date:    row.get(4)?,
      end_date:      row.get(5)?,
      client_id:     row.get(6)?,
      client_rut:    row.get(7)?,
      client_name:   row.get(8)?,
      client_email:  row.get(9)?,
      manager_id:    row.get(10)?,
      manager_rut:   row.get(11)?,
      manager_name:  row.get(12)?,
      manager_email: row.get(13)?,
    })
  }

  pub fn into_ticket(self) -> Result<Ticket> {
    let manager = match (self.manager_id, self.manager_rut, self.manager_name, self.manager_email) {
      (Some(id), Some(rut), Some(full_name), Some(email)) => {
        Some(TicketParty { id, rut, full_name, email })
      }
      _ => None,
    };

    Ok(Ticket {
      id:         self.ticket_id,
      card_type:  self.card_type.parse()?,
      comment:    self.comment,
      status:     self.status.parse()?,
      start_date: decode_date(&self.start_date)?,
      end_date:   self.end_date.as_deref().map(decode_date).transpose()?,
      client:     TicketParty {
        id:        self.client_id,
        rut:       self.client_rut,
        full_name: self.client_name,
        email:     self.client_email,
      },
      manager,
    })
  }
}

pub struct RawIdentity {
  pub identity_id:   i64,
  pub rut:           String,
  pub password_hash: String,
  pub role:          String,
}

impl RawIdentity {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      identity_id:   row.get(0)?,
      rut:           row.get(1)?,
      password_hash: row.get(2)?,
      role:          row.get(3)?,
    })
  }

  pub fn into_identity(self) -> Result<Identity> {
    Ok(Identity {
      id:            self.identity_id,
      rut:           self.rut,
      password_hash: self.password_hash,
      role:          self.role.parse()?,
    })
  }
}

pub const CLIENT_SELECT: &str = "
  SELECT client_id, rut, full_name, address, email, account, phone_number, identity_id
  FROM clients";

pub fn client_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Client> {
  Ok(Client {
    id:           row.get(0)?,
    rut:          row.get(1)?,
    full_name:    row.get(2)?,
    address:      row.get(3)?,
    email:        row.get(4)?,
    account:      row.get(5)?,
    phone_number: row.get(6)?,
    identity_id:  row.get(7)?,
  })
}

pub const MANAGER_SELECT: &str = "
  SELECT manager_id, rut, full_name, email, address, identity_id
  FROM managers";

pub fn manager_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Manager> {
  Ok(Manager {
    id:          row.get(0)?,
    rut:         row.get(1)?,
    full_name:   row.get(2)?,
    email:       row.get(3)?,
    address:     row.get(4)?,
    identity_id: row.get(5)?,
  })
}
